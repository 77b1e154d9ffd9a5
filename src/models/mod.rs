use serde::{Deserialize, Serialize};

// ── Quote ─────────────────────────────────────────────────────────────────────

/// One quotation block as scraped from a listing page.
///
/// Field order is the key order of the JSON export.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Quote {
    #[serde(rename = "texto")]
    pub text: String,
    #[serde(rename = "autor")]
    pub author: String,
    pub tags: Vec<String>,
}

impl Quote {
    #[cfg(test)]
    pub fn new(text: impl Into<String>, author: impl Into<String>, tags: &[&str]) -> Self {
        Self {
            text: text.into(),
            author: author.into(),
            tags: tags.iter().map(|t| t.to_string()).collect(),
        }
    }

    /// Tags flattened for the tabular export: "life, love".
    pub fn joined_tags(&self) -> String {
        self.tags.join(", ")
    }
}

// ── Row read back from the relational store ──────────────────────────────────

/// Tags are not persisted; the table only carries text and author.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredQuote {
    pub id: i64,
    pub text: String,
    pub author: String,
}

// ── CSV row ───────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct CsvRow {
    #[serde(rename = "Citacao")]
    pub citacao: String,
    #[serde(rename = "Autor")]
    pub autor: String,
    #[serde(rename = "Tags")]
    pub tags: String,
}

impl From<&Quote> for CsvRow {
    fn from(q: &Quote) -> Self {
        Self {
            citacao: q.text.clone(),
            autor: q.author.clone(),
            tags: q.joined_tags(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_joined_tags() {
        let q = Quote::new("x", "y", &["life", "love"]);
        assert_eq!(q.joined_tags(), "life, love");
        assert_eq!(Quote::new("x", "y", &[]).joined_tags(), "");
    }

    #[test]
    fn test_json_keys_in_order() {
        let q = Quote::new("Be bold.", "J. Doe", &["courage"]);
        let json = serde_json::to_string(&q).unwrap();
        assert_eq!(json, r#"{"texto":"Be bold.","autor":"J. Doe","tags":["courage"]}"#);
    }
}
