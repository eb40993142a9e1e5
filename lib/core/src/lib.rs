//! # simrec Core
//!
//! Core library for the simrec recommendation engine.
//!
//! This crate turns textual item attributes into TF-IDF feature vectors and
//! answers nearest-neighbor queries over them:
//!
//! - [`Tokenizer`] - Lowercase alphabetic tokens with stop-word removal
//! - [`Vocabulary`] - Token to dimension mapping in first-seen order
//! - [`TfIdfEncoder`] - Smoothed TF-IDF weights, L2-normalized
//! - [`SimilarityIndex`] - Exact top-k cosine similarity (flat or inverted layout)
//! - [`Engine`] - Owns the live [`Generation`] and swaps it on rebuild
//! - [`RecommendationService`] - Item-to-item recommendations
//!
//! ## Example
//!
//! ```rust
//! use simrec_core::{Engine, EngineConfig, Item, ItemId, RecommendationService};
//! use std::sync::Arc;
//!
//! let items = vec![
//!     Item::new("A", "space adventure action"),
//!     Item::new("B", "space opera drama"),
//!     Item::new("C", "cooking show reality"),
//! ];
//! let engine = Arc::new(Engine::build(&items, EngineConfig::default()).unwrap());
//! let service = RecommendationService::new(engine);
//!
//! let ids = service.recommend(&ItemId::from("A"), 1).unwrap();
//! assert_eq!(ids, vec![ItemId::from("B")]);
//! ```

pub mod error;
pub mod item;
pub mod tokenizer;
pub mod vocabulary;
pub mod vector;
pub mod encoder;
pub mod index;
pub mod engine;
pub mod rebuild;
pub mod recommend;

/// Dot products for the similarity scan
///
/// Dispatches to AVX2/FMA on x86_64 and NEON on ARM64, with a scalar fallback.
pub mod simd;

pub use error::{Error, Result};
pub use item::{Item, ItemId};
pub use tokenizer::{Tokenizer, TokenizerConfig, StopWords, ENGLISH_STOP_WORDS};
pub use vocabulary::Vocabulary;
pub use vector::{FeatureVector, SparseRow};
pub use encoder::{TfIdfEncoder, smoothed_idf};
pub use index::{SimilarityIndex, IndexKind};
pub use engine::{Engine, EngineConfig, Generation, NORM_TOLERANCE};
pub use rebuild::{CancelToken, RebuildHandle, RebuildJob};
pub use recommend::{Recommendation, RecommendationService};
