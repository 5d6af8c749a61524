use serde::{Deserialize, Serialize};

use super::ContentType;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CatalogStats {
    pub total: usize,
    pub by_type: Vec<TypeCount>,
    pub top_genres: Vec<ValueCount>,
    pub top_epochs: Vec<ValueCount>,
    pub needs_ai: usize,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TypeCount {
    #[serde(rename = "type")]
    pub kind: ContentType,
    pub count: usize,
}

/// `value` is `None` for rows where the column is NULL.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ValueCount {
    pub value: Option<String>,
    pub count: usize,
}
