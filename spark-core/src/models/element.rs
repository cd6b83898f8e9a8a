use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize, Serializer};
use serde_json::{Map, Value};
use uuid::Uuid;

use crate::prompt::metadata::{filename_field, resolve_url, string_field};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ElementType {
    Thought,
    Article,
    Image,
    File,
    Scout,
    Spark,
}

impl ElementType {
    pub fn as_str(&self) -> &'static str {
        match self {
            ElementType::Thought => "thought",
            ElementType::Article => "article",
            ElementType::Image => "image",
            ElementType::File => "file",
            ElementType::Scout => "scout",
            ElementType::Spark => "spark",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "thought" => Some(ElementType::Thought),
            "article" => Some(ElementType::Article),
            "image" => Some(ElementType::Image),
            "file" => Some(ElementType::File),
            "scout" => Some(ElementType::Scout),
            "spark" => Some(ElementType::Spark),
            _ => None,
        }
    }

    /// Types a user may capture directly; scouts and sparks come from the LLM.
    pub fn is_user_capturable(&self) -> bool {
        matches!(
            self,
            ElementType::Thought | ElementType::Article | ElementType::Image | ElementType::File
        )
    }

    /// Types that carry an uploaded attachment.
    pub fn has_attachment(&self) -> bool {
        matches!(self, ElementType::Image | ElementType::File)
    }
}

impl std::fmt::Display for ElementType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ElementSource {
    User,
    Ai,
}

impl ElementSource {
    pub fn as_str(&self) -> &'static str {
        match self {
            ElementSource::User => "user",
            ElementSource::Ai => "ai",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "user" => Some(ElementSource::User),
            "ai" => Some(ElementSource::Ai),
            _ => None,
        }
    }
}

/// Keys that map onto typed fields. Anything else, and any of these whose
/// value is not a non-empty string, lands in `extra`.
const KNOWN_KEYS: &[&str] = &[
    "url",
    "public_url",
    "filename",
    "file_name",
    "title",
    "description",
    "note",
    "summary",
    "deeper",
];

/// Element metadata after legacy keys have been folded into canonical ones.
///
/// Built once when a row is loaded (or a capture request arrives), so readers
/// never have to know that `public_url` or `file_name` ever existed.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ElementMetadata {
    pub url: Option<String>,
    pub filename: Option<String>,
    pub title: Option<String>,
    pub description: Option<String>,
    pub note: Option<String>,
    pub summary: Option<String>,
    pub deeper: Option<String>,
    /// Unknown keys, plus known keys the typed fields cannot hold (objects,
    /// arrays, numbers, blank strings). Written back untouched.
    pub extra: Map<String, Value>,
}

impl Serialize for ElementMetadata {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        self.to_map().serialize(serializer)
    }
}

impl ElementMetadata {
    pub fn from_map(raw: &Map<String, Value>) -> Self {
        let extra = raw
            .iter()
            .filter(|(k, _)| !KNOWN_KEYS.contains(&k.as_str()) || string_field(raw, k).is_none())
            .map(|(k, v)| (k.clone(), v.clone()))
            .collect();

        Self {
            url: resolve_url(raw),
            filename: filename_field(raw),
            title: string_field(raw, "title"),
            description: string_field(raw, "description"),
            note: string_field(raw, "note"),
            summary: string_field(raw, "summary"),
            deeper: string_field(raw, "deeper"),
            extra,
        }
    }

    /// Normalise an arbitrary JSON value; non-objects yield empty metadata.
    pub fn from_value(raw: &Value) -> Self {
        match raw.as_object() {
            Some(map) => Self::from_map(map),
            None => Self::default(),
        }
    }

    /// Canonical map: `extra` with every present typed field laid over it.
    pub fn to_map(&self) -> Map<String, Value> {
        let mut map = self.extra.clone();
        let typed = [
            ("url", &self.url),
            ("filename", &self.filename),
            ("title", &self.title),
            ("description", &self.description),
            ("note", &self.note),
            ("summary", &self.summary),
            ("deeper", &self.deeper),
        ];
        for (key, value) in typed {
            if let Some(value) = value {
                map.insert(key.to_string(), Value::String(value.clone()));
            }
        }
        map
    }

    /// Canonical JSON form written back to storage.
    pub fn to_value(&self) -> Value {
        Value::Object(self.to_map())
    }
}

/// Raw `elements` row as stored in Postgres.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct ElementRow {
    pub id: Uuid,
    pub user_id: Uuid,
    pub idea_id: Option<Uuid>,
    #[sqlx(rename = "type")]
    pub element_type: String,
    pub source: String,
    pub content: Option<String>,
    pub metadata: Value,
    pub is_archived: bool,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize)]
pub struct Element {
    pub id: Uuid,
    pub user_id: Uuid,
    pub idea_id: Option<Uuid>,
    #[serde(rename = "type")]
    pub element_type: ElementType,
    pub source: ElementSource,
    pub content: Option<String>,
    pub metadata: ElementMetadata,
    pub is_archived: bool,
    pub created_at: Option<DateTime<Utc>>,
}

impl Element {
    /// Content with surrounding whitespace removed; blank counts as absent.
    pub fn content(&self) -> Option<&str> {
        self.content
            .as_deref()
            .map(str::trim)
            .filter(|c| !c.is_empty())
    }
}

impl From<ElementRow> for Element {
    fn from(row: ElementRow) -> Self {
        let element_type = ElementType::parse(&row.element_type).unwrap_or_else(|| {
            tracing::warn!(id = %row.id, element_type = %row.element_type, "Unknown element type, treating as thought");
            ElementType::Thought
        });
        let source = ElementSource::parse(&row.source).unwrap_or(ElementSource::User);

        Self {
            id: row.id,
            user_id: row.user_id,
            idea_id: row.idea_id,
            element_type,
            source,
            content: row.content,
            metadata: ElementMetadata::from_value(&row.metadata),
            is_archived: row.is_archived,
            created_at: Some(row.created_at),
        }
    }
}
