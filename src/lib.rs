//! # simrec
//!
//! Content-based item-to-item recommendations.
//!
//! Item titles and textual attributes are tokenized, weighted with smoothed
//! TF-IDF and L2-normalized; recommendations are the nearest items by cosine
//! similarity in an exact in-memory index.
//!
//! ## Quick Start
//!
//! ### As a Server
//!
//! ```bash
//! simrec --movies data/movies.csv --tags data/tags.csv --http-port 8000
//! curl -X POST localhost:8000/recommend -d '{"title": "Toy Story (1995)"}' \
//!      -H 'content-type: application/json'
//! ```
//!
//! ### As a Library
//!
//! ```rust
//! use simrec::prelude::*;
//! use std::sync::Arc;
//!
//! let items = vec![
//!     Item::new(1u64, "Alien (1979)").with_attribute("Horror Sci-Fi"),
//!     Item::new(2u64, "Aliens (1986)").with_attribute("Action Horror Sci-Fi"),
//!     Item::new(3u64, "Ratatouille (2007)").with_attribute("Animation Children"),
//! ];
//! let engine = Arc::new(Engine::build(&items, EngineConfig::default()).unwrap());
//! let service = RecommendationService::new(engine);
//!
//! let recs = service.recommend_by_title("Alien (1979)", 1).unwrap();
//! assert_eq!(recs[0].title, "Aliens (1986)");
//! ```
//!
//! ## Crate Structure
//!
//! - [`simrec-core`](https://docs.rs/simrec-core) - Tokenizer, TF-IDF encoder, similarity index, engine
//! - [`simrec-storage`](https://docs.rs/simrec-storage) - Corpus loaders and snapshots
//! - [`simrec-api`](https://docs.rs/simrec-api) - REST API

// Re-export core types
pub use simrec_core::{
    CancelToken, Engine, EngineConfig, Error, FeatureVector, Generation, IndexKind, Item, ItemId,
    Recommendation, RecommendationService, RebuildHandle, Result, SimilarityIndex, SparseRow,
    StopWords, TfIdfEncoder, Tokenizer, TokenizerConfig, Vocabulary,
};

// Re-export storage
pub use simrec_storage::{load_items_json, MovieLensLoader, SnapshotDescription, SnapshotManager};

// Re-export API
pub use simrec_api::RestApi;

/// Prelude module for convenient imports
pub mod prelude {
    pub use crate::{
        Engine, EngineConfig, Error, IndexKind, Item, ItemId, Recommendation,
        RecommendationService, Result, SnapshotManager, MovieLensLoader,
    };
}
