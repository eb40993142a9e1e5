use crate::{Engine, Error, Generation, ItemId, Result};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// A ranked neighbor with its display title
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Recommendation {
    pub id: ItemId,
    pub title: String,
    pub score: f32,
}

/// Item-to-item recommendations over the engine's live generation.
///
/// Every call reads a single generation, so a concurrent rebuild never
/// mixes two vocabularies within one answer.
#[derive(Clone)]
pub struct RecommendationService {
    engine: Arc<Engine>,
}

impl RecommendationService {
    pub fn new(engine: Arc<Engine>) -> Self {
        Self { engine }
    }

    #[inline]
    pub fn engine(&self) -> &Arc<Engine> {
        &self.engine
    }

    /// Ids of the `k` items most similar to `item_id`, best first.
    ///
    /// The item itself is excluded. Fewer than `k` ids come back when the
    /// corpus is too small.
    pub fn recommend(&self, item_id: &ItemId, k: usize) -> Result<Vec<ItemId>> {
        let generation = self.engine.current();
        Ok(Self::neighbors(&generation, item_id, k)?
            .into_iter()
            .map(|(id, _)| id)
            .collect())
    }

    /// Like [`recommend`](Self::recommend), with titles and scores
    pub fn recommend_scored(&self, item_id: &ItemId, k: usize) -> Result<Vec<Recommendation>> {
        let generation = self.engine.current();
        let neighbors = Self::neighbors(&generation, item_id, k)?;
        Ok(Self::with_titles(&generation, neighbors))
    }

    /// Recommendations for the first item carrying exactly `title`
    pub fn recommend_by_title(&self, title: &str, k: usize) -> Result<Vec<Recommendation>> {
        let generation = self.engine.current();
        let item_id = generation
            .find_by_title(title)
            .cloned()
            .ok_or_else(|| Error::ItemNotFound(title.to_string()))?;
        let neighbors = Self::neighbors(&generation, &item_id, k)?;
        Ok(Self::with_titles(&generation, neighbors))
    }

    /// Items most similar to free text, encoded with the live vocabulary
    pub fn search_text(&self, text: &str, k: usize) -> Result<Vec<Recommendation>> {
        let generation = self.engine.current();
        let query = generation.encoder().encode_text(text);
        let hits = generation.index().query(&query, k)?;
        Ok(Self::with_titles(&generation, hits))
    }

    /// Query k + 1 neighbors and drop the item itself by id.
    ///
    /// Removal is by id rather than by position: another item with an
    /// identical vector may outrank the query item on the id tie-break.
    fn neighbors(generation: &Generation, item_id: &ItemId, k: usize) -> Result<Vec<(ItemId, f32)>> {
        let vector = generation
            .index()
            .vector(item_id)
            .ok_or_else(|| Error::ItemNotFound(item_id.to_string()))?;

        let mut results = generation.index().query(&vector, k.saturating_add(1))?;
        results.retain(|(id, _)| id != item_id);
        results.truncate(k);
        Ok(results)
    }

    fn with_titles(generation: &Generation, hits: Vec<(ItemId, f32)>) -> Vec<Recommendation> {
        hits.into_iter()
            .map(|(id, score)| Recommendation {
                title: generation.title(&id).unwrap_or_default().to_string(),
                id,
                score,
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{EngineConfig, Item};

    fn service(items: &[Item]) -> RecommendationService {
        RecommendationService::new(Arc::new(Engine::build(items, EngineConfig::default()).unwrap()))
    }

    fn example() -> Vec<Item> {
        vec![
            Item::new("A", "space adventure action"),
            Item::new("B", "space opera drama"),
            Item::new("C", "cooking show reality"),
        ]
    }

    #[test]
    fn test_recommend_shared_token_wins() {
        let service = service(&example());
        assert_eq!(service.recommend(&ItemId::from("A"), 1).unwrap(), vec![ItemId::from("B")]);
    }

    #[test]
    fn test_recommend_excludes_self() {
        let service = service(&example());
        let ids = service.recommend(&ItemId::from("A"), 10).unwrap();
        assert_eq!(ids.len(), 2);
        assert!(!ids.contains(&ItemId::from("A")));
    }

    #[test]
    fn test_unknown_item() {
        let service = service(&example());
        let err = service.recommend(&ItemId::from("nonexistent-id"), 5).unwrap_err();
        assert!(err.is_not_found());
    }

    #[test]
    fn test_zero_k() {
        let service = service(&example());
        assert!(service.recommend(&ItemId::from("A"), 0).unwrap().is_empty());
    }

    #[test]
    fn test_duplicate_vector_is_kept() {
        // 1 and 2 have identical vectors; 1 outranks 2 on the id tie-break
        let items = vec![
            Item::new(1u64, "space opera"),
            Item::new(2u64, "space opera"),
            Item::new(3u64, "cooking show"),
        ];
        let service = service(&items);
        assert_eq!(service.recommend(&ItemId::Integer(2), 1).unwrap(), vec![ItemId::Integer(1)]);
        assert_eq!(service.recommend(&ItemId::Integer(1), 1).unwrap(), vec![ItemId::Integer(2)]);
    }

    #[test]
    fn test_recommend_by_title() {
        let service = service(&example());
        let recs = service.recommend_by_title("space opera drama", 1).unwrap();
        assert_eq!(recs.len(), 1);
        assert_eq!(recs[0].id, ItemId::from("A"));
        assert_eq!(recs[0].title, "space adventure action");
        assert!(recs[0].score > 0.0);

        assert!(service.recommend_by_title("Missing (2000)", 1).unwrap_err().is_not_found());
    }

    #[test]
    fn test_search_text() {
        let service = service(&example());
        let hits = service.search_text("a reality cooking competition", 1).unwrap();
        assert_eq!(hits[0].id, ItemId::from("C"));
    }
}
