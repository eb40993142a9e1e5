use serde::{Deserialize, Serialize};

/// Identity of an item.
///
/// The derived ordering is the tie-break order used by every ranked result:
/// all integer ids sort before all string ids, integers numerically and
/// strings lexicographically.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ItemId {
    Integer(u64),
    String(String),
}

impl ItemId {
    /// Parse an id from text: all-digit strings become integer ids
    pub fn parse(s: &str) -> Self {
        match s.parse::<u64>() {
            Ok(i) => ItemId::Integer(i),
            Err(_) => ItemId::String(s.to_string()),
        }
    }
}

impl std::fmt::Display for ItemId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ItemId::Integer(i) => write!(f, "{}", i),
            ItemId::String(s) => write!(f, "{}", s),
        }
    }
}

impl From<String> for ItemId {
    fn from(s: String) -> Self {
        ItemId::String(s)
    }
}

impl From<&str> for ItemId {
    fn from(s: &str) -> Self {
        ItemId::String(s.to_string())
    }
}

impl From<u64> for ItemId {
    fn from(i: u64) -> Self {
        ItemId::Integer(i)
    }
}

/// A record to recommend: an id, a display title and the raw text
/// attributes that are combined into its feature string
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Item {
    pub id: ItemId,
    pub title: String,
    #[serde(default)]
    pub attributes: Vec<String>,
}

impl Item {
    #[inline]
    #[must_use]
    pub fn new(id: impl Into<ItemId>, title: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            title: title.into(),
            attributes: Vec::new(),
        }
    }

    #[inline]
    #[must_use]
    pub fn with_attribute(mut self, attribute: impl Into<String>) -> Self {
        self.attributes.push(attribute.into());
        self
    }

    /// Title followed by every attribute, space separated
    pub fn feature_text(&self) -> String {
        let capacity = self.title.len() + self.attributes.iter().map(|a| a.len() + 1).sum::<usize>();
        let mut text = String::with_capacity(capacity);
        text.push_str(&self.title);
        for attribute in &self.attributes {
            text.push(' ');
            text.push_str(attribute);
        }
        text
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_item_id_ordering() {
        let mut ids = vec![
            ItemId::from("b"),
            ItemId::Integer(10),
            ItemId::from("a"),
            ItemId::Integer(2),
        ];
        ids.sort();
        assert_eq!(
            ids,
            vec![
                ItemId::Integer(2),
                ItemId::Integer(10),
                ItemId::from("a"),
                ItemId::from("b"),
            ]
        );
    }

    #[test]
    fn test_item_id_parse() {
        assert_eq!(ItemId::parse("42"), ItemId::Integer(42));
        assert_eq!(ItemId::parse("tt0114709"), ItemId::from("tt0114709"));
    }

    #[test]
    fn test_feature_text() {
        let item = Item::new(1u64, "Toy Story (1995)")
            .with_attribute("Adventure Animation")
            .with_attribute("");
        assert_eq!(item.feature_text(), "Toy Story (1995) Adventure Animation ");
    }
}
