use crate::rebuild::{CancelToken, RebuildHandle, RebuildJob};
use crate::{
    Error, IndexKind, Item, ItemId, Result, SimilarityIndex, TfIdfEncoder, Tokenizer,
    TokenizerConfig, Vocabulary,
};
use ahash::AHashMap;
use chrono::{DateTime, Utc};
use parking_lot::{Mutex, RwLock};
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, info, warn};

/// Stored vectors must have a norm within this distance of 1, or be zero
pub const NORM_TOLERANCE: f32 = 1e-4;

/// Configuration for building an engine
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EngineConfig {
    pub tokenizer: TokenizerConfig,
    pub index_kind: IndexKind,
    /// Tokenize and encode items on the rayon pool
    pub parallel: bool,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            tokenizer: TokenizerConfig::default(),
            index_kind: IndexKind::Inverted,
            parallel: true,
        }
    }
}

/// One complete, immutable build: vocabulary, IDF table, vectors and titles
#[derive(Debug)]
pub struct Generation {
    number: u64,
    built_at: DateTime<Utc>,
    config: EngineConfig,
    encoder: TfIdfEncoder,
    index: SimilarityIndex,
    /// titles aligned with `index.ids()`
    titles: Vec<String>,
    /// first row carrying each title, in corpus order
    title_rows: AHashMap<String, usize>,
}

impl Generation {
    /// Run the whole build phase over `items`, in their given order
    pub fn build(items: &[Item], config: &EngineConfig, number: u64, cancel: &CancelToken) -> Result<Self> {
        let started = Instant::now();
        info!("Building generation {} from {} items", number, items.len());

        let tokenizer = Tokenizer::new(config.tokenizer.clone());
        let tokenize = |item: &Item| tokenizer.tokenize(&item.feature_text());
        let documents: Vec<Vec<String>> = if config.parallel {
            items.par_iter().map(tokenize).collect()
        } else {
            items.iter().map(tokenize).collect()
        };
        cancel.check()?;

        let encoder = TfIdfEncoder::fit(tokenizer.clone(), &documents)?;
        debug!("Vocabulary built: {} dimensions", encoder.dim());
        cancel.check()?;

        let rows = encoder.encode_all(&documents, config.parallel, cancel)?;
        let empty = rows.iter().filter(|r| r.is_empty()).count();
        if empty > 0 {
            warn!("{} items have no recognized tokens and get a zero vector", empty);
        }

        let rows = items.iter().map(|item| item.id.clone()).zip(rows).collect();
        let index = SimilarityIndex::from_rows(config.index_kind, encoder.dim(), rows)?;
        cancel.check()?;

        let titles = items.iter().map(|item| item.title.clone()).collect();
        let generation = Self::assemble(number, Utc::now(), config.clone(), encoder, index, titles);

        info!(
            "Generation {} built: {} items, {} dimensions, {} index in {:?}",
            number,
            generation.len(),
            generation.dim(),
            config.index_kind,
            started.elapsed()
        );
        Ok(generation)
    }

    /// Reassemble a generation from persisted parts without re-encoding.
    ///
    /// Rejects parts whose dimensions disagree or whose vectors are not
    /// L2-normalized.
    pub fn from_parts(
        number: u64,
        built_at: DateTime<Utc>,
        config: EngineConfig,
        encoder: TfIdfEncoder,
        index: SimilarityIndex,
        titles: Vec<String>,
    ) -> Result<Self> {
        if encoder.dim() != index.dim() {
            return Err(Error::InvalidConfig(format!(
                "encoder has {} dimensions but index has {}",
                encoder.dim(),
                index.dim()
            )));
        }
        if titles.len() != index.len() {
            return Err(Error::InvalidConfig(format!(
                "{} titles for {} indexed items",
                titles.len(),
                index.len()
            )));
        }
        for (id, row) in index.rows() {
            let norm = row.norm();
            if !row.is_empty() && (!norm.is_finite() || (norm - 1.0).abs() > NORM_TOLERANCE) {
                return Err(Error::InvalidConfig(format!(
                    "vector of item {} is not normalized (norm {})",
                    id, norm
                )));
            }
        }
        Ok(Self::assemble(number, built_at, config, encoder, index, titles))
    }

    fn assemble(
        number: u64,
        built_at: DateTime<Utc>,
        config: EngineConfig,
        encoder: TfIdfEncoder,
        index: SimilarityIndex,
        titles: Vec<String>,
    ) -> Self {
        let mut title_rows = AHashMap::with_capacity(titles.len());
        for (row, title) in titles.iter().enumerate() {
            title_rows.entry(title.clone()).or_insert(row);
        }
        Self {
            number,
            built_at,
            config,
            encoder,
            index,
            titles,
            title_rows,
        }
    }

    #[inline]
    pub fn number(&self) -> u64 {
        self.number
    }

    #[inline]
    pub fn built_at(&self) -> DateTime<Utc> {
        self.built_at
    }

    #[inline]
    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    #[inline]
    pub fn encoder(&self) -> &TfIdfEncoder {
        &self.encoder
    }

    #[inline]
    pub fn vocabulary(&self) -> &Vocabulary {
        self.encoder.vocabulary()
    }

    #[inline]
    pub fn index(&self) -> &SimilarityIndex {
        &self.index
    }

    #[inline]
    pub fn titles(&self) -> &[String] {
        &self.titles
    }

    pub fn title(&self, id: &ItemId) -> Option<&str> {
        self.index.position(id).map(|row| self.titles[row].as_str())
    }

    /// First item in corpus order with exactly this title
    pub fn find_by_title(&self, title: &str) -> Option<&ItemId> {
        self.title_rows.get(title).map(|&row| &self.index.ids()[row])
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.index.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.index.is_empty()
    }

    #[inline]
    pub fn dim(&self) -> usize {
        self.index.dim()
    }
}

/// Owns the live generation and replaces it on rebuild.
///
/// Readers clone the `Arc` of the live generation and work on it without
/// further locking; a rebuild builds the next generation completely and only
/// then swaps the pointer, so a reader sees either the old generation or the
/// new one, never a mix.
pub struct Engine {
    config: EngineConfig,
    live: RwLock<Arc<Generation>>,
    next_number: AtomicU64,
    // serializes rebuilds so generation numbers are installed in order
    build_lock: Mutex<()>,
}

impl Engine {
    /// Build generation 1 from the full corpus
    pub fn build(items: &[Item], config: EngineConfig) -> Result<Self> {
        let generation = Generation::build(items, &config, 1, &CancelToken::new())?;
        Ok(Self::from_generation(generation))
    }

    /// Wrap an already built (e.g. restored) generation
    pub fn from_generation(generation: Generation) -> Self {
        let next = generation.number() + 1;
        Self {
            config: generation.config().clone(),
            live: RwLock::new(Arc::new(generation)),
            next_number: AtomicU64::new(next),
            build_lock: Mutex::new(()),
        }
    }

    #[inline]
    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// The live generation
    #[inline]
    pub fn current(&self) -> Arc<Generation> {
        self.live.read().clone()
    }

    #[inline]
    pub fn generation(&self) -> u64 {
        self.live.read().number()
    }

    /// Build a new generation from `items` and install it
    pub fn rebuild(&self, items: &[Item]) -> Result<u64> {
        self.rebuild_with(items, &CancelToken::new())
    }

    /// Rebuild with a cancellation token. On any error, including
    /// cancellation, the live generation is left untouched.
    pub fn rebuild_with(&self, items: &[Item], cancel: &CancelToken) -> Result<u64> {
        let _guard = self.build_lock.lock();
        let number = self.next_number.fetch_add(1, Ordering::AcqRel);

        let generation = match Generation::build(items, &self.config, number, cancel) {
            Ok(generation) => generation,
            Err(e) => {
                warn!("Rebuild of generation {} aborted: {}", number, e);
                return Err(e);
            }
        };
        cancel.check()?;

        *self.live.write() = Arc::new(generation);
        info!("Generation {} is live", number);
        Ok(number)
    }

    /// Rebuild on a background thread. Dropping the returned handle cancels it.
    pub fn spawn_rebuild(self: &Arc<Self>, items: Vec<Item>) -> Result<RebuildHandle> {
        RebuildJob::new(self.clone(), items).spawn()
    }
}
