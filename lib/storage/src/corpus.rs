// Corpus loading: MovieLens CSV files and plain JSON item lists
use anyhow::{Context, Result};
use serde::Deserialize;
use simrec_core::Item;
use std::collections::{HashMap, HashSet};
use std::fs::File;
use std::io::BufReader;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

#[derive(Debug, Deserialize)]
struct MovieRecord {
    #[serde(rename = "movieId")]
    movie_id: u64,
    title: String,
    genres: String,
}

#[derive(Debug, Deserialize)]
struct TagRecord {
    #[serde(rename = "movieId")]
    movie_id: u64,
    #[serde(default)]
    tag: String,
}

/// Loads items from a MovieLens `movies.csv` and an optional `tags.csv`.
///
/// Each movie becomes an item whose attributes are its genres (`|` replaced
/// by spaces) and all of its tags joined by spaces, in file order.
#[derive(Debug, Clone)]
pub struct MovieLensLoader {
    movies: PathBuf,
    tags: Option<PathBuf>,
}

impl MovieLensLoader {
    pub fn new<P: AsRef<Path>>(movies: P) -> Self {
        Self {
            movies: movies.as_ref().to_path_buf(),
            tags: None,
        }
    }

    #[must_use]
    pub fn with_tags<P: AsRef<Path>>(mut self, tags: P) -> Self {
        self.tags = Some(tags.as_ref().to_path_buf());
        self
    }

    /// Load items in `movies.csv` order
    pub fn load(&self) -> Result<Vec<Item>> {
        let tags = match &self.tags {
            Some(path) => Self::load_tags(path)?,
            None => HashMap::new(),
        };

        let mut reader = csv::Reader::from_path(&self.movies)
            .with_context(|| format!("opening {}", self.movies.display()))?;

        let mut seen: HashSet<u64> = HashSet::new();
        let mut items = Vec::new();
        let mut skipped = 0usize;

        for (line, record) in reader.deserialize::<MovieRecord>().enumerate() {
            let movie = match record {
                Ok(movie) => movie,
                Err(e) => {
                    warn!("Skipping malformed movie row {}: {}", line + 2, e);
                    skipped += 1;
                    continue;
                }
            };
            if !seen.insert(movie.movie_id) {
                warn!("Skipping duplicate movie id {}", movie.movie_id);
                skipped += 1;
                continue;
            }

            let tag_text = tags
                .get(&movie.movie_id)
                .map(|t| t.join(" "))
                .unwrap_or_default();
            items.push(
                Item::new(movie.movie_id, movie.title)
                    .with_attribute(movie.genres.replace('|', " "))
                    .with_attribute(tag_text),
            );
        }

        info!(
            "Loaded {} movies from {} ({} rows skipped)",
            items.len(),
            self.movies.display(),
            skipped
        );
        Ok(items)
    }

    fn load_tags(path: &Path) -> Result<HashMap<u64, Vec<String>>> {
        let mut reader = csv::Reader::from_path(path)
            .with_context(|| format!("opening {}", path.display()))?;

        let mut tags: HashMap<u64, Vec<String>> = HashMap::new();
        let mut count = 0usize;
        for (line, record) in reader.deserialize::<TagRecord>().enumerate() {
            match record {
                Ok(record) => {
                    tags.entry(record.movie_id).or_default().push(record.tag);
                    count += 1;
                }
                Err(e) => warn!("Skipping malformed tag row {}: {}", line + 2, e),
            }
        }
        debug!("Loaded {} tags for {} movies", count, tags.len());
        Ok(tags)
    }
}

/// Load a JSON array of `{"id", "title", "attributes"}` objects
pub fn load_items_json<P: AsRef<Path>>(path: P) -> Result<Vec<Item>> {
    let path = path.as_ref();
    let file = File::open(path).with_context(|| format!("opening {}", path.display()))?;
    let items: Vec<Item> = serde_json::from_reader(BufReader::new(file))
        .with_context(|| format!("parsing {}", path.display()))?;
    info!("Loaded {} items from {}", items.len(), path.display());
    Ok(items)
}

#[cfg(test)]
mod tests {
    use super::*;
    use simrec_core::ItemId;
    use std::fs;

    #[test]
    fn test_load_movies_and_tags() {
        let dir = tempfile::tempdir().unwrap();
        let movies = dir.path().join("movies.csv");
        let tags = dir.path().join("tags.csv");
        fs::write(
            &movies,
            "movieId,title,genres\n\
             1,Toy Story (1995),Adventure|Animation|Children|Comedy|Fantasy\n\
             2,Jumanji (1995),Adventure|Children|Fantasy\n\
             3,\"American President, The (1995)\",Comedy|Drama|Romance\n",
        )
        .unwrap();
        fs::write(
            &tags,
            "userId,movieId,tag,timestamp\n\
             2,1,pixar,1445714994\n\
             5,3,politics,1445714995\n\
             7,1,fun,1445715000\n\
             9,99,orphan,1445715001\n",
        )
        .unwrap();

        let items = MovieLensLoader::new(&movies).with_tags(&tags).load().unwrap();
        assert_eq!(items.len(), 3);
        assert_eq!(items[0].id, ItemId::Integer(1));
        assert_eq!(items[0].title, "Toy Story (1995)");
        assert_eq!(items[0].attributes[0], "Adventure Animation Children Comedy Fantasy");
        assert_eq!(items[0].attributes[1], "pixar fun");
        assert_eq!(items[1].attributes[1], "");
        assert_eq!(items[2].title, "American President, The (1995)");
    }

    #[test]
    fn test_duplicate_and_malformed_rows_skipped() {
        let dir = tempfile::tempdir().unwrap();
        let movies = dir.path().join("movies.csv");
        fs::write(
            &movies,
            "movieId,title,genres\n\
             1,Heat (1995),Action|Crime\n\
             abc,Broken,Drama\n\
             1,Heat again (1995),Action\n",
        )
        .unwrap();

        let items = MovieLensLoader::new(&movies).load().unwrap();
        assert_eq!(items.len(), 1);
        assert_eq!(items[0].title, "Heat (1995)");
        assert_eq!(items[0].attributes, vec!["Action Crime".to_string(), String::new()]);
    }

    #[test]
    fn test_missing_file() {
        assert!(MovieLensLoader::new("/nonexistent/movies.csv").load().is_err());
    }

    #[test]
    fn test_load_items_json() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("items.json");
        fs::write(
            &path,
            r#"[{"id": 7, "title": "Alien", "attributes": ["space horror"]},
                {"id": "b-2", "title": "Chef"}]"#,
        )
        .unwrap();

        let items = load_items_json(&path).unwrap();
        assert_eq!(items[0].id, ItemId::Integer(7));
        assert_eq!(items[1].id, ItemId::from("b-2"));
        assert!(items[1].attributes.is_empty());
    }
}
