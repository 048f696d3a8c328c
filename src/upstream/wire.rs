//! JSON shapes returned by the upstream catalog API.
//!
//! Every optional field is explicit. List payloads are decoded entry by entry so one
//! malformed record is skipped instead of failing the whole page.

use crate::model::RawChapterRecord;
use serde::de::DeserializeOwned;
use serde::Deserialize;
use std::collections::BTreeMap;

/// `GET /manga/{id}/feed` envelope. `data` is required; its absence is a permanent failure.
#[derive(Debug, Deserialize)]
pub struct FeedEnvelope {
    pub data: Option<Vec<serde_json::Value>>,
    #[serde(default)]
    pub total: Option<u64>,
}

/// One chapter entry in a feed page.
#[derive(Debug, Deserialize)]
pub struct ChapterEntry {
    pub id: String,
    #[serde(default)]
    pub attributes: ChapterAttributes,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChapterAttributes {
    #[serde(default)]
    pub chapter: Option<String>,
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub translated_language: Option<OneOrMany>,
    #[serde(default)]
    pub pages: Option<u32>,
}

/// `translatedLanguage` arrives as a single code on some endpoints and as a list on others.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
pub enum OneOrMany {
    One(String),
    Many(Vec<String>),
}

impl OneOrMany {
    pub fn into_vec(self) -> Vec<String> {
        match self {
            OneOrMany::One(s) => vec![s],
            OneOrMany::Many(v) => v,
        }
    }
}

impl From<ChapterEntry> for RawChapterRecord {
    fn from(entry: ChapterEntry) -> Self {
        let a = entry.attributes;
        RawChapterRecord {
            id: entry.id,
            chapter_number: a.chapter,
            title: a.title,
            languages: a
                .translated_language
                .map(OneOrMany::into_vec)
                .unwrap_or_default(),
            page_count: a.pages,
        }
    }
}

/// Generic `{ "data": [...] }` list envelope (search, tags).
#[derive(Debug, Deserialize)]
pub struct ListEnvelope {
    pub data: Option<Vec<serde_json::Value>>,
}

/// Generic `{ "data": {...} }` single-entity envelope.
#[derive(Debug, Deserialize)]
pub struct EntityEnvelope<T> {
    pub data: Option<T>,
}

/// Manga entity as returned by `/manga` with `includes[]=cover_art`.
#[derive(Debug, Deserialize)]
pub struct MangaEntry {
    pub id: String,
    pub attributes: MangaAttributes,
    #[serde(default)]
    pub relationships: Vec<Relationship>,
}

#[derive(Debug, Default, Deserialize)]
pub struct MangaAttributes {
    #[serde(default, deserialize_with = "lenient")]
    pub title: BTreeMap<String, String>,
    #[serde(default, deserialize_with = "lenient")]
    pub description: BTreeMap<String, String>,
    #[serde(default, deserialize_with = "lenient")]
    pub links: BTreeMap<String, String>,
}

#[derive(Debug, Deserialize)]
pub struct Relationship {
    pub id: String,
    #[serde(rename = "type")]
    pub kind: String,
    #[serde(default)]
    pub attributes: Option<serde_json::Value>,
}

impl Relationship {
    /// `attributes.fileName` for cover_art relationships.
    pub fn file_name(&self) -> Option<&str> {
        self.attributes
            .as_ref()
            .and_then(|a| a.get("fileName"))
            .and_then(|f| f.as_str())
    }
}

/// Tag entity from `/manga/tag`.
#[derive(Debug, Deserialize)]
pub struct TagEntry {
    pub id: String,
    pub attributes: TagAttributes,
}

#[derive(Debug, Deserialize)]
pub struct TagAttributes {
    #[serde(default)]
    pub name: BTreeMap<String, String>,
    #[serde(default)]
    pub group: Option<String>,
}

/// Chapter entity from `/chapter/{id}` with manga and cover_art includes.
#[derive(Debug, Deserialize)]
pub struct ChapterDetail {
    pub id: String,
    #[serde(default)]
    pub relationships: Vec<Relationship>,
}

/// `GET /at-home/server/{chapterId}` response.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AtHomeResponse {
    #[serde(default)]
    pub base_url: Option<String>,
    #[serde(default)]
    pub chapter: Option<AtHomeChapter>,
}

#[derive(Debug, Deserialize)]
pub struct AtHomeChapter {
    pub hash: String,
    #[serde(default)]
    pub data: Option<Vec<String>>,
}

/// Empty maps come back as `[]` or `null` from the API; anything that is not the
/// expected shape decodes as the default.
fn lenient<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: serde::Deserializer<'de>,
    T: Default + DeserializeOwned,
{
    let value = serde_json::Value::deserialize(deserializer)?;
    Ok(serde_json::from_value(value).unwrap_or_default())
}

/// Decode each value independently, dropping entries that do not fit `T`.
pub fn decode_entries<T: DeserializeOwned>(values: Vec<serde_json::Value>, what: &str) -> Vec<T> {
    let mut out = Vec::with_capacity(values.len());
    for value in values {
        match serde_json::from_value::<T>(value) {
            Ok(v) => out.push(v),
            Err(e) => tracing::debug!(kind = what, error = %e, "skipping malformed entry"),
        }
    }
    out
}
