//! Canonical data model for chapter feeds, catalog entries, and favorites.
//!
//! Upstream JSON is decoded into the types in `upstream::wire` first; everything here is
//! already validated and is what the reducer, renderers, and favorites store consume.

use serde::{Deserialize, Serialize};

/// One chapter entry as reported by the upstream feed.
///
/// Several records may share a chapter number (one per scanlation group). `id` is unique
/// per record, not per logical chapter.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawChapterRecord {
    pub id: String,
    /// Free-form chapter label. May be non-numeric, empty, or missing.
    pub chapter_number: Option<String>,
    pub title: Option<String>,
    pub languages: Vec<String>,
    /// Missing or zero means the page count is unknown or not yet available.
    pub page_count: Option<u32>,
}

impl RawChapterRecord {
    pub fn has_language(&self, language: &str) -> bool {
        self.languages.iter().any(|l| l == language)
    }
}

/// Deduplicated, display-ready chapter. Serializes as `{ id, title, chapter, pages }`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CanonicalChapter {
    pub id: String,
    pub title: String,
    #[serde(rename = "chapter")]
    pub chapter_number: String,
    #[serde(rename = "pages")]
    pub page_count: u32,
}

impl CanonicalChapter {
    /// Turn this chapter back into a feed record tagged with `language`.
    ///
    /// A page count of 0 maps back to "unknown" so a second reduction keeps the entry.
    pub fn to_record(&self, language: &str) -> RawChapterRecord {
        RawChapterRecord {
            id: self.id.clone(),
            chapter_number: Some(self.chapter_number.clone()),
            title: Some(self.title.clone()),
            languages: vec![language.to_string()],
            page_count: (self.page_count > 0).then_some(self.page_count),
        }
    }
}

/// Search or featured result shown in listings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MangaSummary {
    pub id: String,
    pub title: String,
    #[serde(rename = "coverImage")]
    pub cover_image: String,
    pub description: String,
    #[serde(rename = "mangaPlusUrl", skip_serializing_if = "Option::is_none", default)]
    pub manga_plus_url: Option<String>,
}

/// Genre/theme tag usable as a search filter.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Tag {
    pub id: String,
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub group: Option<String>,
}

/// Metadata about a single chapter and the manga it belongs to.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChapterInfo {
    pub id: String,
    #[serde(rename = "mangaId")]
    pub manga_id: Option<String>,
    #[serde(rename = "mangaTitle")]
    pub manga_title: String,
    #[serde(rename = "mangaDescription")]
    pub manga_description: String,
    #[serde(rename = "coverImage")]
    pub cover_image: Option<String>,
}

/// Entry in the local favorites list.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FavoriteManga {
    pub id: String,
    pub title: String,
    #[serde(rename = "coverImage")]
    pub cover_image: String,
    pub description: String,
}

impl From<&MangaSummary> for FavoriteManga {
    fn from(m: &MangaSummary) -> Self {
        FavoriteManga {
            id: m.id.clone(),
            title: m.title.clone(),
            cover_image: m.cover_image.clone(),
            description: m.description.clone(),
        }
    }
}
