use crate::{Error, Result};
use ahash::AHashMap;

/// Token to dimension mapping, built once from the whole corpus.
///
/// Indices are contiguous in `[0, len)` and assigned in first-seen order.
/// Document frequencies are collected during the same scan.
#[derive(Debug, Clone)]
pub struct Vocabulary {
    terms: Vec<String>,
    index: AHashMap<String, u32>,
    // number of documents containing each term, by dimension
    doc_freq: Vec<u32>,
    num_docs: usize,
}

impl Vocabulary {
    /// Scan every token of every document exactly once, in the given order.
    ///
    /// Fails with [`Error::EmptyCorpus`] when no token is found at all.
    pub fn build(documents: &[Vec<String>]) -> Result<Self> {
        let mut terms: Vec<String> = Vec::new();
        let mut index: AHashMap<String, u32> = AHashMap::new();
        let mut doc_freq: Vec<u32> = Vec::new();
        // last document that counted towards each term's df
        let mut last_seen: Vec<usize> = Vec::new();

        for (doc_idx, tokens) in documents.iter().enumerate() {
            for token in tokens {
                let idx = match index.get(token.as_str()) {
                    Some(&idx) => idx as usize,
                    None => {
                        let idx = terms.len();
                        terms.push(token.clone());
                        index.insert(token.clone(), idx as u32);
                        doc_freq.push(0);
                        last_seen.push(usize::MAX);
                        idx
                    }
                };
                if last_seen[idx] != doc_idx {
                    last_seen[idx] = doc_idx;
                    doc_freq[idx] += 1;
                }
            }
        }

        if terms.is_empty() {
            return Err(Error::EmptyCorpus);
        }

        Ok(Self {
            terms,
            index,
            doc_freq,
            num_docs: documents.len(),
        })
    }

    /// Reassemble a vocabulary from persisted parts
    pub fn from_parts(terms: Vec<String>, doc_freq: Vec<u32>, num_docs: usize) -> Result<Self> {
        if terms.is_empty() {
            return Err(Error::EmptyCorpus);
        }
        if terms.len() != doc_freq.len() {
            return Err(Error::InvalidConfig(format!(
                "vocabulary has {} terms but {} document frequencies",
                terms.len(),
                doc_freq.len()
            )));
        }

        let mut index = AHashMap::with_capacity(terms.len());
        for (idx, term) in terms.iter().enumerate() {
            if index.insert(term.clone(), idx as u32).is_some() {
                return Err(Error::InvalidConfig(format!("duplicate vocabulary term: {}", term)));
            }
        }

        Ok(Self {
            terms,
            index,
            doc_freq,
            num_docs,
        })
    }

    #[inline]
    pub fn get(&self, token: &str) -> Option<u32> {
        self.index.get(token).copied()
    }

    #[inline]
    pub fn contains(&self, token: &str) -> bool {
        self.index.contains_key(token)
    }

    #[inline]
    pub fn term(&self, idx: u32) -> Option<&str> {
        self.terms.get(idx as usize).map(String::as_str)
    }

    #[inline]
    pub fn terms(&self) -> &[String] {
        &self.terms
    }

    #[inline]
    pub fn doc_freq(&self, idx: u32) -> u32 {
        self.doc_freq.get(idx as usize).copied().unwrap_or(0)
    }

    #[inline]
    pub fn doc_freqs(&self) -> &[u32] {
        &self.doc_freq
    }

    /// Corpus size N the document frequencies were counted over
    #[inline]
    pub fn num_docs(&self) -> usize {
        self.num_docs
    }

    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.terms.len()
    }

    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.terms.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn docs(raw: &[&str]) -> Vec<Vec<String>> {
        raw.iter()
            .map(|d| d.split_whitespace().map(str::to_string).collect())
            .collect()
    }

    #[test]
    fn test_first_seen_order() {
        let vocab = Vocabulary::build(&docs(&[
            "space adventure action",
            "space opera drama",
            "cooking show reality",
        ]))
        .unwrap();

        assert_eq!(
            vocab.terms(),
            &["space", "adventure", "action", "opera", "drama", "cooking", "show", "reality"]
        );
        assert_eq!(vocab.get("opera"), Some(3));
        assert_eq!(vocab.get("missing"), None);
    }

    #[test]
    fn test_document_frequency_counts_documents_not_occurrences() {
        let vocab = Vocabulary::build(&docs(&["space space space", "space opera", "drama"])).unwrap();
        assert_eq!(vocab.doc_freq(vocab.get("space").unwrap()), 2);
        assert_eq!(vocab.doc_freq(vocab.get("drama").unwrap()), 1);
        assert_eq!(vocab.num_docs(), 3);
    }

    #[test]
    fn test_empty_corpus() {
        let empty: Vec<Vec<String>> = vec![vec![], vec![]];
        assert!(matches!(Vocabulary::build(&empty), Err(Error::EmptyCorpus)));

        let none: Vec<Vec<String>> = Vec::new();
        assert!(matches!(Vocabulary::build(&none), Err(Error::EmptyCorpus)));
    }

    #[test]
    fn test_from_parts_rejects_mismatch() {
        assert!(Vocabulary::from_parts(vec!["a".into(), "b".into()], vec![1], 1).is_err());
        assert!(Vocabulary::from_parts(vec!["a".into(), "a".into()], vec![1, 1], 1).is_err());
        let vocab = Vocabulary::from_parts(vec!["a".into(), "b".into()], vec![1, 2], 2).unwrap();
        assert_eq!(vocab.get("b"), Some(1));
    }
}
