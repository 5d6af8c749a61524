use serde::{Deserialize, Serialize};

/// Kind of work a catalog record describes.
///
/// Variant order matches the lowercase names alphabetically, so the derived
/// `Ord` agrees with ordering by the stored `type` column.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ContentType {
    Book,
    Movie,
    Music,
}

impl ContentType {
    pub const ALL: [ContentType; 3] = [Self::Book, Self::Movie, Self::Music];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Book => "book",
            Self::Movie => "movie",
            Self::Music => "music",
        }
    }
}

impl std::fmt::Display for ContentType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for ContentType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "book" => Ok(Self::Book),
            "movie" => Ok(Self::Movie),
            "music" => Ok(Self::Music),
            _ => Err(format!("Invalid ContentType: {s}")),
        }
    }
}

/// One row of the `content` table.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ContentRecord {
    pub id: i64,
    #[serde(rename = "type")]
    pub kind: ContentType,
    pub title: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub creator: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image_url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub year: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rating: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mood: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub genre: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub epoch: Option<String>,

    /// `true` while the record still waits for a generated description.
    pub needs_ai: bool,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source_id: Option<String>,

    /// Numeric columns (`year`, `rating`) that held a non-blank value which
    /// is not a number. The parsed field is `None`, the column is still filled.
    #[serde(skip)]
    pub unparsed: Vec<&'static str>,
}

impl ContentRecord {
    /// A bare record with every optional field empty. `id` is assigned by the
    /// store on insert, so the value given here is only used for in-memory work.
    pub fn new(id: i64, kind: ContentType, title: impl Into<String>) -> Self {
        Self {
            id,
            kind,
            title: title.into(),
            creator: None,
            description: None,
            image_url: None,
            year: None,
            rating: None,
            mood: None,
            genre: None,
            epoch: None,
            needs_ai: true,
            source_id: None,
            unparsed: Vec::new(),
        }
    }

    pub fn with_creator(mut self, creator: impl Into<String>) -> Self {
        self.creator = Some(creator.into());
        self
    }

    /// Whether `column` held a value the store could not parse.
    pub fn has_unparsed(&self, column: &str) -> bool {
        self.unparsed.iter().any(|c| *c == column)
    }

    pub fn identity_key(&self) -> IdentityKey {
        IdentityKey::new(&self.title, self.creator.as_deref(), self.kind)
    }
}

/// Normalized `(title, creator-or-empty, type)` triple two records must share
/// to count as the same work.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct IdentityKey {
    pub title: String,
    pub creator: String,
    #[serde(rename = "type")]
    pub kind: ContentType,
}

impl IdentityKey {
    pub fn new(title: &str, creator: Option<&str>, kind: ContentType) -> Self {
        Self {
            title: normalize(title),
            creator: creator.map(normalize).unwrap_or_default(),
            kind,
        }
    }
}

/// Lowercase and trim. No other folding is applied.
pub fn normalize(s: &str) -> String {
    s.trim().to_lowercase()
}
