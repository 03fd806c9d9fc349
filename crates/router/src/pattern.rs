//! Compilation of route path templates into anchored matchers.
//!
//! Template syntax:
//! - literal text matches verbatim, regex metacharacters included
//! - `:name` captures one or more characters up to the next `/`
//! - `:name(regex)` captures whatever `regex` matches
//! - trailing `/` are insignificant, both in the template and in the matched path
//!
//! A `:` that is not followed by a param name (e.g. `/at/12:30`) is a literal colon.

use crate::PathParams;
use crate::error::PatternError;
use regex::{Regex, RegexBuilder};

const DEFAULT_CAPTURE: &str = "[^/]+";

/// Every param is compiled into a named group with this prefix, so groups the route author
/// writes inside an override never shift the param positions.
const GROUP_PREFIX: &str = "__p";

/// Maximum allowed size for a compiled route regex (in bytes).
const MAX_REGEX_SIZE: usize = 1 << 20;

/// A compiled path template.
#[derive(Debug, Clone)]
pub struct PathPattern {
    template: String,
    regex: Regex,
    param_names: Vec<String>,
    group_indices: Vec<usize>,
}

impl PathPattern {
    /// Compiles `template` into a full-string anchored matcher.
    ///
    /// # Errors
    ///
    /// Returns a [`PatternError`] if a capture pattern is unterminated or not a valid regex,
    /// if a capture pattern has no param name, or if a param name is declared twice.
    pub fn compile(template: &str) -> Result<Self, PatternError> {
        let template = trim_trailing(template);
        let (source, param_names) = translate(template)?;

        let regex = RegexBuilder::new(&source)
            .size_limit(MAX_REGEX_SIZE)
            .build()
            .map_err(|e| PatternError::InvalidRegex { template: template.to_owned(), reason: e.to_string() })?;

        let group_indices = (0..param_names.len())
            .map(|position| {
                let group = group_name(position);
                regex.capture_names().position(|name| name == Some(group.as_str())).ok_or_else(|| {
                    PatternError::InvalidRegex {
                        template: template.to_owned(),
                        reason: format!("missing capture group {group}"),
                    }
                })
            })
            .collect::<Result<Vec<_>, _>>()?;

        Ok(Self { template: template.to_owned(), regex, param_names, group_indices })
    }

    /// The template with trailing separators stripped.
    pub fn template(&self) -> &str {
        &self.template
    }

    /// Param names in declaration order.
    pub fn param_names(&self) -> &[String] {
        &self.param_names
    }

    pub fn is_match(&self, path: &str) -> bool {
        self.regex.is_match(trim_trailing(path))
    }

    /// Matches `path` and binds the captured values to the declared param names.
    pub fn captures<'p, 'req>(&'p self, path: &'req str) -> Option<PathParams<'p, 'req>> {
        let captures = self.regex.captures(trim_trailing(path))?;

        let mut params = PathParams::with_capacity(self.param_names.len());
        for (name, index) in self.param_names.iter().zip(&self.group_indices) {
            if let Some(value) = captures.get(*index) {
                params.push(name.as_str(), value.as_str());
            }
        }
        Some(params)
    }
}

/// Strips every trailing `/`, so `/health/` and `/health` compare equal and `/` becomes empty.
#[inline]
pub fn trim_trailing(path: &str) -> &str {
    path.trim_end_matches('/')
}

fn group_name(position: usize) -> String {
    format!("{GROUP_PREFIX}{position}")
}

/// A param name starts with a letter or `_`, so `:30` in `/at/12:30` stays literal.
fn is_name_start(byte: u8) -> bool {
    byte.is_ascii_alphabetic() || byte == b'_'
}

fn is_name_byte(byte: u8) -> bool {
    byte.is_ascii_alphanumeric() || byte == b'_'
}

/// Length of the param name starting at `start`, zero when there is none.
fn name_len(bytes: &[u8], start: usize) -> usize {
    match bytes.get(start) {
        Some(&first) if is_name_start(first) => {
            1 + bytes[start + 1..].iter().take_while(|b| is_name_byte(**b)).count()
        }
        _ => 0,
    }
}

/// Translates a template into regex source plus its ordered param names.
///
/// Only ASCII bytes are inspected, so every slice boundary lands on a char boundary.
fn translate(template: &str) -> Result<(String, Vec<String>), PatternError> {
    let bytes = template.as_bytes();
    let mut source = String::with_capacity(template.len() * 2 + 2);
    let mut names: Vec<String> = Vec::new();

    source.push('^');
    let mut literal_start = 0;
    let mut i = 0;

    while i < bytes.len() {
        if bytes[i] != b':' {
            i += 1;
            continue;
        }

        let name_start = i + 1;
        let name_end = name_start + name_len(bytes, name_start);
        let has_pattern = bytes.get(name_end) == Some(&b'(');

        if name_end == name_start {
            if has_pattern {
                return Err(PatternError::EmptyParamName { template: template.to_owned() });
            }
            // literal colon
            i += 1;
            continue;
        }

        let name = &template[name_start..name_end];
        if names.iter().any(|existing| existing == name) {
            return Err(PatternError::DuplicateParam { template: template.to_owned(), name: name.to_owned() });
        }

        let (capture, next) = if has_pattern {
            let close = closing_paren(bytes, name_end).ok_or_else(|| PatternError::UnterminatedPattern {
                template: template.to_owned(),
                name: name.to_owned(),
            })?;
            (&template[name_end + 1..close], close + 1)
        } else {
            (DEFAULT_CAPTURE, name_end)
        };

        source.push_str(&regex::escape(&template[literal_start..i]));
        source.push_str("(?P<");
        source.push_str(&group_name(names.len()));
        source.push('>');
        source.push_str(capture);
        source.push(')');

        names.push(name.to_owned());
        literal_start = next;
        i = next;
    }

    source.push_str(&regex::escape(&template[literal_start..]));
    source.push('$');
    Ok((source, names))
}

/// Finds the `)` closing the `(` at `open`, skipping escapes and character classes.
fn closing_paren(bytes: &[u8], open: usize) -> Option<usize> {
    let mut depth = 0_usize;
    let mut i = open;

    while i < bytes.len() {
        match bytes[i] {
            b'\\' => i += 1,
            b'[' => {
                i += 1;
                // a `]` right after `[` or `[^` is part of the class
                if bytes.get(i) == Some(&b'^') {
                    i += 1;
                }
                if bytes.get(i) == Some(&b']') {
                    i += 1;
                }
                while i < bytes.len() && bytes[i] != b']' {
                    if bytes[i] == b'\\' {
                        i += 1;
                    }
                    i += 1;
                }
            }
            b'(' => depth += 1,
            b')' => {
                depth -= 1;
                if depth == 0 {
                    return Some(i);
                }
            }
            _ => {}
        }
        i += 1;
    }
    None
}
