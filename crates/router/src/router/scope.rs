use crate::middleware::SharedMiddleware;

/// The prefix and inherited middleware of one registration scope.
#[derive(Clone, Default)]
pub struct ScopeFrame {
    prefix: String,
    middlewares: Vec<SharedMiddleware>,
}

impl std::fmt::Debug for ScopeFrame {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ScopeFrame").field("prefix", &self.prefix).field("middlewares", &self.middlewares.len()).finish()
    }
}

impl ScopeFrame {
    pub fn prefix(&self) -> &str {
        &self.prefix
    }

    /// Middleware of every enclosing group, outermost first.
    pub fn middlewares(&self) -> &[SharedMiddleware] {
        &self.middlewares
    }
}

/// The stack of open groups during registration.
///
/// The root frame carries the base path and is never popped. Each group pushes a frame whose
/// prefix and middleware extend the current one, so popping restores the parent exactly.
#[derive(Debug, Clone)]
pub struct ScopeStack {
    frames: Vec<ScopeFrame>,
}

impl Default for ScopeStack {
    fn default() -> Self {
        Self::new("")
    }
}

impl ScopeStack {
    pub fn new(base_path: &str) -> Self {
        let root = ScopeFrame { prefix: join_path("", base_path), middlewares: Vec::new() };
        Self { frames: vec![root] }
    }

    pub fn current(&self) -> &ScopeFrame {
        // the root frame is never popped
        &self.frames[self.frames.len() - 1]
    }

    /// Number of open groups, zero at the root.
    pub fn depth(&self) -> usize {
        self.frames.len() - 1
    }

    /// The full template of `path` registered in the current scope.
    pub fn resolve(&self, path: &str) -> String {
        join_path(self.current().prefix(), path)
    }

    /// The frozen chain of a route registered here: the group middleware followed by `route`.
    pub fn chain_for(&self, route: impl IntoIterator<Item = SharedMiddleware>) -> Vec<SharedMiddleware> {
        self.current().middlewares.iter().cloned().chain(route).collect()
    }

    pub fn push(&mut self, prefix: &str, middlewares: impl IntoIterator<Item = SharedMiddleware>) {
        let frame = ScopeFrame { prefix: self.resolve(prefix), middlewares: self.chain_for(middlewares) };
        self.frames.push(frame);
    }

    /// Closes the innermost group; the root frame stays.
    pub fn pop(&mut self) -> Option<ScopeFrame> {
        if self.frames.len() > 1 { self.frames.pop() } else { None }
    }
}

/// Joins `segment` onto `prefix` with exactly one `/` between them.
///
/// Joining an empty or `/` segment yields the prefix itself, so the root route of an empty
/// prefix is the empty template, which matches `/`.
pub fn join_path(prefix: &str, segment: &str) -> String {
    let prefix = prefix.trim_end_matches('/');
    let segment = segment.trim_matches('/');
    if segment.is_empty() {
        return prefix.to_owned();
    }
    format!("{prefix}/{segment}")
}
