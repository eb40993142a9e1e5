//! TF-IDF feature encoding
//!
//! `weight(item, token) = tf(token, item) * idf(token)` with the smoothed
//! inverse document frequency `idf = ln((1 + N) / (1 + df)) + 1`, followed by
//! L2 normalization. Weights are accumulated in ascending dimension order so
//! the same corpus always produces bit-identical vectors.

use crate::rebuild::CancelToken;
use crate::{Error, FeatureVector, Result, SparseRow, Tokenizer, Vocabulary};
use rayon::prelude::*;

/// Smoothed IDF. Computed in f64 and rounded once.
#[inline]
pub fn smoothed_idf(doc_freq: u32, num_docs: usize) -> f32 {
    (((1.0 + num_docs as f64) / (1.0 + doc_freq as f64)).ln() + 1.0) as f32
}

#[derive(Debug, Clone)]
pub struct TfIdfEncoder {
    tokenizer: Tokenizer,
    vocabulary: Vocabulary,
    idf: Vec<f32>,
}

impl TfIdfEncoder {
    /// Build the vocabulary and IDF table from tokenized documents
    pub fn fit(tokenizer: Tokenizer, documents: &[Vec<String>]) -> Result<Self> {
        let vocabulary = Vocabulary::build(documents)?;
        let idf = vocabulary
            .doc_freqs()
            .iter()
            .map(|&df| smoothed_idf(df, vocabulary.num_docs()))
            .collect();
        Ok(Self {
            tokenizer,
            vocabulary,
            idf,
        })
    }

    /// Reassemble an encoder from a persisted vocabulary and IDF table
    pub fn from_parts(tokenizer: Tokenizer, vocabulary: Vocabulary, idf: Vec<f32>) -> Result<Self> {
        if idf.len() != vocabulary.len() {
            return Err(Error::InvalidConfig(format!(
                "idf table has {} entries for {} vocabulary terms",
                idf.len(),
                vocabulary.len()
            )));
        }
        Ok(Self {
            tokenizer,
            vocabulary,
            idf,
        })
    }

    #[inline]
    pub fn tokenizer(&self) -> &Tokenizer {
        &self.tokenizer
    }

    #[inline]
    pub fn vocabulary(&self) -> &Vocabulary {
        &self.vocabulary
    }

    #[inline]
    pub fn idf(&self) -> &[f32] {
        &self.idf
    }

    /// Vector dimension V
    #[inline]
    pub fn dim(&self) -> usize {
        self.vocabulary.len()
    }

    /// Normalized TF-IDF weights of one tokenized document.
    /// Tokens outside the vocabulary are ignored.
    pub fn encode_sparse(&self, tokens: &[String]) -> SparseRow {
        let mut dims: Vec<u32> = tokens
            .iter()
            .filter_map(|t| self.vocabulary.get(t))
            .collect();
        dims.sort_unstable();

        let mut row = SparseRow::default();
        let mut i = 0;
        while i < dims.len() {
            let dim = dims[i];
            let mut tf = 0u32;
            while i < dims.len() && dims[i] == dim {
                tf += 1;
                i += 1;
            }
            row.indices.push(dim);
            row.values.push(tf as f32 * self.idf[dim as usize]);
        }

        let norm = row.norm();
        if norm > 0.0 {
            for value in &mut row.values {
                *value /= norm;
            }
        }
        row
    }

    #[inline]
    pub fn encode(&self, tokens: &[String]) -> FeatureVector {
        FeatureVector::from_sparse(self.dim(), &self.encode_sparse(tokens))
    }

    /// Tokenize and encode free text against the built vocabulary
    pub fn encode_text(&self, text: &str) -> FeatureVector {
        self.encode(&self.tokenizer.tokenize(text))
    }

    /// Encode every document, preserving input order.
    ///
    /// Documents are independent once the vocabulary is fixed, so the work is
    /// spread over the rayon pool when `parallel` is set. The cancel token is
    /// checked before each document.
    pub fn encode_all(
        &self,
        documents: &[Vec<String>],
        parallel: bool,
        cancel: &CancelToken,
    ) -> Result<Vec<SparseRow>> {
        let encode_one = |tokens: &Vec<String>| {
            if cancel.is_cancelled() {
                return Err(Error::Cancelled);
            }
            Ok(self.encode_sparse(tokens))
        };

        if parallel {
            documents.par_iter().map(encode_one).collect()
        } else {
            documents.iter().map(encode_one).collect()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn fit(raw: &[&str]) -> (TfIdfEncoder, Vec<Vec<String>>) {
        let tokenizer = Tokenizer::default();
        let docs: Vec<Vec<String>> = raw.iter().map(|d| tokenizer.tokenize(d)).collect();
        (TfIdfEncoder::fit(tokenizer, &docs).unwrap(), docs)
    }

    #[test]
    fn test_smoothed_idf() {
        // term in every document keeps weight 1
        assert!((smoothed_idf(3, 3) - 1.0).abs() < 1e-7);
        let expected = ((4.0f64 / 2.0).ln() + 1.0) as f32;
        assert_eq!(smoothed_idf(1, 3), expected);
    }

    #[test]
    fn test_weights_and_normalization() {
        let (encoder, docs) = fit(&["space adventure action", "space opera drama", "cooking show reality"]);
        assert_eq!(encoder.dim(), 8);

        let row = encoder.encode_sparse(&docs[0]);
        assert_eq!(row.indices, vec![0, 1, 2]);

        let idf_space = smoothed_idf(2, 3);
        let idf_rare = smoothed_idf(1, 3);
        let norm = (idf_space * idf_space + 2.0 * idf_rare * idf_rare).sqrt();
        assert!((row.values[0] - idf_space / norm).abs() < 1e-6);
        assert!((row.values[1] - idf_rare / norm).abs() < 1e-6);
        assert!((row.norm() - 1.0).abs() < 1e-6);
    }

    #[test]
    fn test_term_frequency_counts_repeats() {
        let (encoder, _) = fit(&["alpha alpha beta", "beta gamma"]);
        let row = encoder.encode_sparse(&["alpha".to_string(), "alpha".to_string(), "beta".to_string()]);
        let alpha = row.values[0] / smoothed_idf(1, 2);
        let beta = row.values[1] / smoothed_idf(2, 2);
        assert!((alpha / beta - 2.0).abs() < 1e-5);
    }

    #[test]
    fn test_unknown_tokens_give_zero_vector() {
        let (encoder, _) = fit(&["space opera"]);
        let v = encoder.encode_text("cooking");
        assert_eq!(v.dim(), 2);
        assert!(v.is_zero());
    }

    #[test]
    fn test_parallel_matches_sequential() {
        let (encoder, docs) = fit(&[
            "space adventure action",
            "space opera drama",
            "cooking show reality",
            "drama drama romance",
        ]);
        let cancel = CancelToken::new();
        let seq = encoder.encode_all(&docs, false, &cancel).unwrap();
        let par = encoder.encode_all(&docs, true, &cancel).unwrap();
        assert_eq!(seq, par);
    }

    #[test]
    fn test_cancelled_encoding() {
        let (encoder, docs) = fit(&["space opera"]);
        let cancel = CancelToken::new();
        cancel.cancel();
        assert!(matches!(encoder.encode_all(&docs, true, &cancel), Err(Error::Cancelled)));
    }

    #[test]
    fn test_from_parts_checks_dimension() {
        let (encoder, _) = fit(&["space opera"]);
        let vocab = encoder.vocabulary().clone();
        assert!(matches!(
            TfIdfEncoder::from_parts(Tokenizer::default(), vocab, vec![1.0]),
            Err(Error::InvalidConfig(_))
        ));
    }
}
