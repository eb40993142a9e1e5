// Text normalization for feature extraction
use ahash::AHashSet;
use serde::{Deserialize, Serialize};

/// Built-in English stop words.
/// Function words only: content words like "show" or "space" must survive.
pub const ENGLISH_STOP_WORDS: &[&str] = &[
    "a", "about", "above", "after", "again", "against", "all", "am", "an", "and",
    "any", "are", "as", "at", "be", "because", "been", "before", "being", "below",
    "between", "both", "but", "by", "can", "could", "did", "do", "does", "doing",
    "down", "during", "each", "few", "for", "from", "further", "had", "has", "have",
    "having", "he", "her", "here", "hers", "herself", "him", "himself", "his", "how",
    "i", "if", "in", "into", "is", "it", "its", "itself", "just", "me",
    "more", "most", "my", "myself", "no", "nor", "not", "now", "of", "off",
    "on", "once", "only", "or", "other", "our", "ours", "ourselves", "out", "over",
    "own", "same", "she", "should", "so", "some", "such", "than", "that", "the",
    "their", "theirs", "them", "themselves", "then", "there", "these", "they", "this", "those",
    "through", "to", "too", "under", "until", "up", "very", "was", "we", "were",
    "what", "when", "where", "which", "while", "who", "whom", "why", "will", "with",
    "would", "you", "your", "yours", "yourself", "yourselves",
];

/// Which stop-word set the tokenizer discards
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum StopWords {
    #[default]
    English,
    None,
    Custom(Vec<String>),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenizerConfig {
    /// Tokens shorter than this many characters are dropped
    pub min_token_len: usize,
    pub stop_words: StopWords,
}

impl Default for TokenizerConfig {
    fn default() -> Self {
        Self {
            min_token_len: 1,
            stop_words: StopWords::English,
        }
    }
}

/// Splits raw text into lowercase alphabetic tokens.
///
/// Every non-alphabetic character separates tokens, so whitespace,
/// punctuation, digits and the `|` joining multi-valued fields all split.
#[derive(Debug, Clone)]
pub struct Tokenizer {
    config: TokenizerConfig,
    stop_words: AHashSet<String>,
}

impl Tokenizer {
    pub fn new(config: TokenizerConfig) -> Self {
        let stop_words = match &config.stop_words {
            StopWords::English => ENGLISH_STOP_WORDS.iter().map(|w| w.to_string()).collect(),
            StopWords::None => AHashSet::new(),
            StopWords::Custom(words) => words.iter().map(|w| w.to_lowercase()).collect(),
        };
        Self { config, stop_words }
    }

    #[inline]
    pub fn config(&self) -> &TokenizerConfig {
        &self.config
    }

    #[inline]
    pub fn is_stop_word(&self, token: &str) -> bool {
        self.stop_words.contains(token)
    }

    /// Tokenize text, preserving token order
    pub fn tokenize(&self, text: &str) -> Vec<String> {
        let min_len = self.config.min_token_len.max(1);
        text.to_lowercase()
            .split(|c: char| !c.is_alphabetic())
            .filter(|s| !s.is_empty() && s.chars().count() >= min_len)
            .filter(|s| !self.is_stop_word(s))
            .map(str::to_string)
            .collect()
    }
}

impl Default for Tokenizer {
    fn default() -> Self {
        Self::new(TokenizerConfig::default())
    }
}
