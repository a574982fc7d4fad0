use crate::model::{TreeDataLoader, TreeFilter};

/// Case-insensitive substring query over item names.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct SearchQuery {
    raw: String,
    needle: String,
}

impl SearchQuery {
    pub fn new(value: impl Into<String>) -> Self {
        let raw = value.into();
        let needle = raw.to_lowercase();
        Self { raw, needle }
    }

    /// The text as typed.
    pub fn as_str(&self) -> &str {
        &self.raw
    }

    pub fn is_empty(&self) -> bool {
        self.raw.is_empty()
    }

    pub fn push(&mut self, ch: char) {
        self.raw.push(ch);
        // Final sigma lowercases by context.
        self.needle = self.raw.to_lowercase();
    }

    pub fn pop(&mut self) {
        self.raw.pop();
        self.needle = self.raw.to_lowercase();
    }

    /// Empty queries match nothing.
    pub fn matches(&self, name: &str) -> bool {
        !self.needle.is_empty() && name.to_lowercase().contains(&self.needle)
    }
}

impl<T: TreeDataLoader> TreeFilter<T> for SearchQuery {
    #[inline]
    fn is_match(&self, loader: &T, id: T::Id) -> bool {
        self.matches(&loader.item_name(id))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn matching_ignores_case() {
        let query = SearchQuery::new("ALP");
        assert!(query.matches("alpha"));
        assert!(query.matches("Calpurnia"));
        assert!(!query.matches("beta"));
    }

    #[test]
    fn empty_query_matches_nothing() {
        assert!(!SearchQuery::default().matches("anything"));
    }

    #[test]
    fn editing_keeps_needle_in_sync() {
        let mut query = SearchQuery::new("a");
        query.push('B');
        assert_eq!(query.as_str(), "aB");
        assert!(query.matches("xaby"));

        query.pop();
        query.pop();
        assert!(query.is_empty());
        assert!(!query.matches("a"));
    }

    #[test]
    fn typed_query_matches_like_a_whole_one() {
        let mut typed = SearchQuery::default();
        typed.push('Α');
        typed.push('Σ');

        assert_eq!(typed.matches("ΑΣ"), SearchQuery::new("ΑΣ").matches("ΑΣ"));
        assert!(typed.matches("ΑΣ"));
    }
}
