// Snapshot support: a built generation saved to disk so a restart does not re-encode
use anyhow::{anyhow, bail, Context, Result};
use atomicwrites::{AtomicFile, OverwriteBehavior};
use chrono::{DateTime, Utc};
use flate2::read::GzDecoder;
use flate2::write::GzEncoder;
use flate2::Compression;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use simrec_core::{
    EngineConfig, Generation, ItemId, SimilarityIndex, SparseRow, TfIdfEncoder, Tokenizer,
    Vocabulary,
};
use std::fs;
use std::io::{BufReader, Write};
use std::path::{Path, PathBuf};
use tracing::{debug, info};

const SNAPSHOT_EXTENSION: &str = "snapshot";
const CHECKSUM_EXTENSION: &str = "sha256";
const FORMAT_VERSION: u32 = 1;

/// Snapshot description for API responses and listings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SnapshotDescription {
    pub name: String,
    pub creation_time: Option<String>,
    pub size: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub checksum: Option<String>,
}

/// Ids are stored tagged: the untagged JSON form cannot be read back by bincode
#[derive(Debug, Clone, Serialize, Deserialize)]
enum IdData {
    Integer(u64),
    String(String),
}

impl From<&ItemId> for IdData {
    fn from(id: &ItemId) -> Self {
        match id {
            ItemId::Integer(i) => IdData::Integer(*i),
            ItemId::String(s) => IdData::String(s.clone()),
        }
    }
}

impl From<IdData> for ItemId {
    fn from(id: IdData) -> Self {
        match id {
            IdData::Integer(i) => ItemId::Integer(i),
            IdData::String(s) => ItemId::String(s),
        }
    }
}

#[derive(Debug, Serialize, Deserialize)]
struct ItemData {
    id: IdData,
    title: String,
    vector: SparseRow,
}

/// Everything needed to query a generation without re-encoding
#[derive(Debug, Serialize, Deserialize)]
struct GenerationData {
    format_version: u32,
    generation: u64,
    built_at_ms: i64,
    config: EngineConfig,
    dim: usize,
    /// vectors were stored L2-normalized
    normalized: bool,
    terms: Vec<String>,
    doc_freq: Vec<u32>,
    num_docs: usize,
    idf: Vec<f32>,
    items: Vec<ItemData>,
}

impl GenerationData {
    fn capture(generation: &Generation) -> Self {
        let vocabulary = generation.vocabulary();
        let items = generation
            .index()
            .rows()
            .zip(generation.titles())
            .map(|((id, row), title)| ItemData {
                id: id.into(),
                title: title.clone(),
                vector: row.clone(),
            })
            .collect();

        Self {
            format_version: FORMAT_VERSION,
            generation: generation.number(),
            built_at_ms: generation.built_at().timestamp_millis(),
            config: generation.config().clone(),
            dim: generation.dim(),
            normalized: true,
            terms: vocabulary.terms().to_vec(),
            doc_freq: vocabulary.doc_freqs().to_vec(),
            num_docs: vocabulary.num_docs(),
            idf: generation.encoder().idf().to_vec(),
            items,
        }
    }

    fn restore(self) -> Result<Generation> {
        if self.format_version != FORMAT_VERSION {
            bail!("unsupported snapshot format version {}", self.format_version);
        }
        if !self.normalized {
            bail!("snapshot vectors are not normalized");
        }
        if self.terms.len() != self.dim {
            bail!("snapshot vocabulary has {} terms for dimension {}", self.terms.len(), self.dim);
        }

        let built_at = DateTime::<Utc>::from_timestamp_millis(self.built_at_ms)
            .ok_or_else(|| anyhow!("invalid build timestamp {}", self.built_at_ms))?;

        let vocabulary = Vocabulary::from_parts(self.terms, self.doc_freq, self.num_docs)?;
        let tokenizer = Tokenizer::new(self.config.tokenizer.clone());
        let encoder = TfIdfEncoder::from_parts(tokenizer, vocabulary, self.idf)?;

        let mut titles = Vec::with_capacity(self.items.len());
        let mut rows = Vec::with_capacity(self.items.len());
        for item in self.items {
            titles.push(item.title);
            rows.push((ItemId::from(item.id), item.vector));
        }
        let index = SimilarityIndex::from_rows(self.config.index_kind, self.dim, rows)?;

        Ok(Generation::from_parts(
            self.generation,
            built_at,
            self.config,
            encoder,
            index,
            titles,
        )?)
    }
}

/// Saves and restores generations as gzip-compressed bincode files with a
/// SHA-256 checksum stored next to each snapshot
pub struct SnapshotManager {
    snapshot_dir: PathBuf,
}

impl SnapshotManager {
    pub fn new<P: AsRef<Path>>(snapshot_dir: P) -> Result<Self> {
        let snapshot_dir = snapshot_dir.as_ref().to_path_buf();
        fs::create_dir_all(&snapshot_dir)?;
        Ok(Self { snapshot_dir })
    }

    #[inline]
    pub fn snapshot_dir(&self) -> &Path {
        &self.snapshot_dir
    }

    /// Timestamped name, so lexicographic order is chronological
    fn generate_snapshot_name(generation: u64) -> String {
        let now: DateTime<Utc> = Utc::now();
        format!(
            "simrec-{}-g{}.{}",
            now.format("%Y%m%dT%H%M%S%3f"),
            generation,
            SNAPSHOT_EXTENSION
        )
    }

    fn snapshot_path(&self, name: &str) -> PathBuf {
        self.snapshot_dir.join(name)
    }

    fn checksum_path(&self, name: &str) -> PathBuf {
        self.snapshot_dir.join(format!("{}.{}", name, CHECKSUM_EXTENSION))
    }

    /// Save a generation. Both files are written atomically.
    pub fn save(&self, generation: &Generation) -> Result<SnapshotDescription> {
        let name = Self::generate_snapshot_name(generation.number());
        let data = GenerationData::capture(generation);

        let mut encoder = GzEncoder::new(Vec::new(), Compression::default());
        bincode::serialize_into(&mut encoder, &data)
            .map_err(|e| anyhow!("Serialization error: {}", e))?;
        let bytes = encoder.finish()?;
        let checksum = format!("{:x}", Sha256::digest(&bytes));

        AtomicFile::new(self.snapshot_path(&name), OverwriteBehavior::AllowOverwrite)
            .write(|f| f.write_all(&bytes))
            .with_context(|| format!("writing snapshot {}", name))?;
        AtomicFile::new(self.checksum_path(&name), OverwriteBehavior::AllowOverwrite)
            .write(|f| f.write_all(checksum.as_bytes()))
            .with_context(|| format!("writing checksum for {}", name))?;

        info!(
            "Snapshot {} saved: generation {}, {} items, {} bytes",
            name,
            generation.number(),
            generation.len(),
            bytes.len()
        );
        self.describe(&name)
    }

    /// Load and verify a snapshot by name
    pub fn load(&self, name: &str) -> Result<Generation> {
        let path = self.snapshot_path(name);
        let bytes = fs::read(&path).with_context(|| format!("reading {}", path.display()))?;

        let expected = fs::read_to_string(self.checksum_path(name))
            .with_context(|| format!("reading checksum for {}", name))?;
        let actual = format!("{:x}", Sha256::digest(&bytes));
        if expected.trim() != actual {
            bail!("checksum mismatch for snapshot {}", name);
        }

        let decoder = GzDecoder::new(BufReader::new(bytes.as_slice()));
        let data: GenerationData = bincode::deserialize_from(decoder)
            .map_err(|e| anyhow!("Deserialization error: {}", e))?;
        debug!("Snapshot {} decoded: generation {}", name, data.generation);

        let generation = data.restore()?;
        info!(
            "Snapshot {} restored: generation {}, {} items",
            name,
            generation.number(),
            generation.len()
        );
        Ok(generation)
    }

    /// Load the newest snapshot, if any
    pub fn load_latest(&self) -> Result<Option<Generation>> {
        match self.latest()? {
            Some(description) => self.load(&description.name).map(Some),
            None => Ok(None),
        }
    }

    /// Newest snapshot by name order
    pub fn latest(&self) -> Result<Option<SnapshotDescription>> {
        Ok(self.list()?.into_iter().last())
    }

    /// All snapshots, oldest first
    pub fn list(&self) -> Result<Vec<SnapshotDescription>> {
        let mut names = Vec::new();
        for entry in fs::read_dir(&self.snapshot_dir)? {
            let path = entry?.path();
            if path.extension().and_then(|e| e.to_str()) == Some(SNAPSHOT_EXTENSION) {
                if let Some(name) = path.file_name().and_then(|n| n.to_str()) {
                    names.push(name.to_string());
                }
            }
        }
        names.sort();
        names.iter().map(|name| self.describe(name)).collect()
    }

    /// Delete a snapshot and its checksum
    pub fn delete(&self, name: &str) -> Result<bool> {
        let path = self.snapshot_path(name);
        if !path.exists() {
            return Ok(false);
        }
        fs::remove_file(&path)?;
        let checksum = self.checksum_path(name);
        if checksum.exists() {
            fs::remove_file(checksum)?;
        }
        Ok(true)
    }

    fn describe(&self, name: &str) -> Result<SnapshotDescription> {
        let metadata = fs::metadata(self.snapshot_path(name))?;
        let creation_time = metadata
            .modified()
            .ok()
            .map(DateTime::<Utc>::from)
            .map(|dt| dt.format("%Y-%m-%dT%H:%M:%SZ").to_string());
        let checksum = fs::read_to_string(self.checksum_path(name))
            .ok()
            .map(|c| c.trim().to_string());

        Ok(SnapshotDescription {
            name: name.to_string(),
            creation_time,
            size: metadata.len(),
            checksum,
        })
    }
}
