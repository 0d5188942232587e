use super::error::{Result, SimilarityError};
use std::collections::HashMap;

/// Token <-> id bijection, ids contiguous from 0 in insertion order.
#[derive(Clone, Debug, Default)]
pub struct Vocabulary {
    tokens: Vec<String>,
    ids: HashMap<String, usize>,
}

impl Vocabulary {
    pub fn from_tokens<I, S>(tokens: I) -> Result<Self>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut vocab = Self::default();
        for token in tokens {
            let token = token.into();
            if vocab.ids.contains_key(&token) {
                return Err(SimilarityError::DuplicateToken(token));
            }
            vocab.ids.insert(token.clone(), vocab.tokens.len());
            vocab.tokens.push(token);
        }
        Ok(vocab)
    }

    pub fn id_of(&self, token: &str) -> Result<usize> {
        self.ids
            .get(token)
            .copied()
            .ok_or_else(|| SimilarityError::UnknownToken(token.to_string()))
    }

    pub fn token_of(&self, id: usize) -> Result<&str> {
        self.tokens
            .get(id)
            .map(String::as_str)
            .ok_or(SimilarityError::OutOfRange {
                id,
                len: self.tokens.len(),
            })
    }

    pub fn contains(&self, token: &str) -> bool {
        self.ids.contains_key(token)
    }

    pub fn len(&self) -> usize {
        self.tokens.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tokens.is_empty()
    }

    /// Tokens in id order.
    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.tokens.iter().map(String::as_str)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ids_follow_insertion_order() {
        let vocab = Vocabulary::from_tokens(["a", "b", "c"]).unwrap();
        assert_eq!(vocab.len(), 3);
        assert_eq!(vocab.id_of("a").unwrap(), 0);
        assert_eq!(vocab.id_of("c").unwrap(), 2);
        assert_eq!(vocab.token_of(1).unwrap(), "b");
        assert_eq!(vocab.iter().collect::<Vec<_>>(), vec!["a", "b", "c"]);
    }

    #[test]
    fn unknown_token_is_reported() {
        let vocab = Vocabulary::from_tokens(["a"]).unwrap();
        assert_eq!(
            vocab.id_of("zebra"),
            Err(SimilarityError::UnknownToken("zebra".to_string()))
        );
        assert!(!vocab.contains("zebra"));
    }

    #[test]
    fn id_past_end_is_out_of_range() {
        let vocab = Vocabulary::from_tokens(["a", "b"]).unwrap();
        assert_eq!(
            vocab.token_of(2),
            Err(SimilarityError::OutOfRange { id: 2, len: 2 })
        );
    }

    #[test]
    fn duplicate_token_breaks_bijection() {
        let err = Vocabulary::from_tokens(["a", "b", "a"]).unwrap_err();
        assert_eq!(err, SimilarityError::DuplicateToken("a".to_string()));
    }

    #[test]
    fn empty_vocabulary() {
        let vocab = Vocabulary::from_tokens(Vec::<String>::new()).unwrap();
        assert!(vocab.is_empty());
        assert!(vocab.token_of(0).is_err());
    }
}
