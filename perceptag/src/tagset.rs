use crate::error::{Error, Result};

/// The Universal Dependencies UPOS tags.
pub const UNIVERSAL_TAGS: [&str; 17] = [
    "ADJ", "ADP", "ADV", "AUX", "CCONJ", "DET", "INTJ", "NOUN", "NUM", "PART", "PRON", "PROPN",
    "PUNCT", "SCONJ", "SYM", "VERB", "X",
];

/// Tagset is the fixed, non-empty collection of labels the scorer chooses from.
/// Tags are kept deduplicated and in ascending order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Tagset {
    tags: Vec<String>,
}

impl Tagset {
    /// Creates a new [`Tagset`] from any collection of labels.
    ///
    /// # Arguments
    /// * `tags` - The labels the scorer may predict. Duplicates are removed.
    ///
    /// # Errors
    /// Returns [`Error::EmptyTagset`] if no label is given.
    ///
    /// # Example
    /// ```
    /// use perceptag::tagset::Tagset;
    ///
    /// let tagset = Tagset::new(["NOUN", "DET", "NOUN"]).unwrap();
    /// assert_eq!(tagset.len(), 2);
    /// assert!(Tagset::new(Vec::<String>::new()).is_err());
    /// ```
    pub fn new<I, S>(tags: I) -> Result<Self>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut tags: Vec<String> = tags.into_iter().map(Into::into).collect();
        tags.sort();
        tags.dedup();
        if tags.is_empty() {
            return Err(Error::EmptyTagset);
        }
        Ok(Tagset { tags })
    }

    /// Returns the 17 Universal Dependencies part-of-speech tags.
    pub fn universal() -> Self {
        Tagset {
            tags: UNIVERSAL_TAGS.iter().map(|t| t.to_string()).collect(),
        }
    }

    pub fn contains(&self, tag: &str) -> bool {
        self.tags.binary_search_by(|t| t.as_str().cmp(tag)).is_ok()
    }

    pub fn len(&self) -> usize {
        self.tags.len()
    }

    /// Never true: construction rejects an empty tagset.
    pub fn is_empty(&self) -> bool {
        self.tags.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.tags.iter().map(String::as_str)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_sorts_and_dedups() {
        let tagset = Tagset::new(["VERB", "DET", "NOUN", "DET"]).unwrap();
        let tags: Vec<&str> = tagset.iter().collect();
        assert_eq!(tags, vec!["DET", "NOUN", "VERB"]);
    }

    #[test]
    fn test_new_empty() {
        let result = Tagset::new(Vec::<&str>::new());
        assert!(matches!(result, Err(Error::EmptyTagset)));
    }

    #[test]
    fn test_universal() {
        let tagset = Tagset::universal();
        assert_eq!(tagset.len(), 17);
        assert!(tagset.contains("PROPN"));
        assert!(tagset.contains("X"));
        assert!(!tagset.contains("NN"));
    }
}
