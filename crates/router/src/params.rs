//! Path parameters captured while matching a request path against a route.

/// Represents path parameters extracted from the URL path of a request.
///
/// Names borrow from the route table and values borrow from the dispatched path. Entries keep
/// the order in which the params are declared in the route template, so for `/users/:id/posts/:post_id`
/// iteration always yields `id` before `post_id`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PathParams<'router, 'req> {
    entries: Vec<(&'router str, &'req str)>,
}

impl<'router, 'req> PathParams<'router, 'req> {
    /// Creates an empty PathParams instance with no parameters
    #[inline]
    pub fn empty() -> Self {
        Self { entries: Vec::new() }
    }

    pub(crate) fn with_capacity(capacity: usize) -> Self {
        Self { entries: Vec::with_capacity(capacity) }
    }

    pub(crate) fn push(&mut self, name: &'router str, value: &'req str) {
        self.entries.push((name, value));
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Gets the value of a path parameter by its name
    /// Returns None if the parameter doesn't exist
    #[inline]
    pub fn get(&self, name: impl AsRef<str>) -> Option<&'req str> {
        let name = name.as_ref();
        self.entries.iter().find(|(key, _)| *key == name).map(|(_, value)| *value)
    }

    /// Iterates `(name, value)` pairs in declaration order.
    pub fn iter(&self) -> impl ExactSizeIterator<Item = (&'router str, &'req str)> + '_ {
        self.entries.iter().copied()
    }

    pub fn names(&self) -> impl ExactSizeIterator<Item = &'router str> + '_ {
        self.entries.iter().map(|(name, _)| *name)
    }

    /// Copies the params out, detaching them from the router and request lifetimes.
    pub fn to_owned_pairs(&self) -> Vec<(String, String)> {
        self.entries.iter().map(|(name, value)| ((*name).to_owned(), (*value).to_owned())).collect()
    }
}

impl<'a, 'router, 'req> IntoIterator for &'a PathParams<'router, 'req> {
    type Item = (&'router str, &'req str);
    type IntoIter = std::iter::Copied<std::slice::Iter<'a, (&'router str, &'req str)>>;

    fn into_iter(self) -> Self::IntoIter {
        self.entries.iter().copied()
    }
}

#[cfg(test)]
mod tests {
    use super::PathParams;

    #[test]
    fn keeps_declaration_order() {
        let mut params = PathParams::empty();
        params.push("id", "42");
        params.push("post_id", "7");

        assert_eq!(params.len(), 2);
        assert_eq!(params.get("id"), Some("42"));
        assert_eq!(params.get("post_id"), Some("7"));
        assert_eq!(params.get("missing"), None);
        assert_eq!(params.names().collect::<Vec<_>>(), vec!["id", "post_id"]);
        assert_eq!(params.to_owned_pairs(), vec![("id".to_owned(), "42".to_owned()), ("post_id".to_owned(), "7".to_owned())]);
    }

    #[test]
    fn empty_params() {
        let params = PathParams::empty();
        assert!(params.is_empty());
        assert_eq!((&params).into_iter().count(), 0);
    }
}
