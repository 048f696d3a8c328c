//! Catalog lookups around the chapter feed: search, tags, featured series, chapter
//! metadata, and page-image URLs.

use crate::model::{ChapterInfo, MangaSummary, Tag};
use crate::upstream::wire::{
    decode_entries, AtHomeResponse, ChapterDetail, EntityEnvelope, ListEnvelope, MangaAttributes,
    MangaEntry, TagEntry,
};
use crate::upstream::{validate_id, ApiClient, UpstreamError};

const COVER_BASE: &str = "https://uploads.mangadex.org/covers";
const MANGA_PLUS_BASE: &str = "https://mangaplus.shueisha.co.jp/titles";
pub const DEFAULT_SEARCH_LIMIT: u32 = 12;
const FEATURED_SEARCH_LIMIT: u32 = 15;

/// Parameters for [`search_manga`].
#[derive(Debug, Clone)]
pub struct SearchQuery {
    pub title: Option<String>,
    /// Tag ids that every result must carry.
    pub genres: Vec<String>,
    pub limit: u32,
    /// Only series with chapters available in this language.
    pub language: String,
}

impl Default for SearchQuery {
    fn default() -> Self {
        Self {
            title: None,
            genres: Vec::new(),
            limit: DEFAULT_SEARCH_LIMIT,
            language: "en".to_string(),
        }
    }
}

/// Thumbnail URL for a cover file.
pub fn cover_url(manga_id: &str, file_name: &str) -> String {
    format!("{}/{}/{}.256.jpg", COVER_BASE, manga_id, file_name)
}

/// English title if present, else the title under the lowest language code.
fn display_title(attrs: &MangaAttributes) -> Option<String> {
    attrs
        .title
        .get("en")
        .or_else(|| attrs.title.values().next())
        .map(|t| t.trim().to_string())
        .filter(|t| !t.is_empty())
}

fn summarize(entry: MangaEntry) -> MangaSummary {
    let title = display_title(&entry.attributes).unwrap_or_default();
    let cover_image = entry
        .relationships
        .iter()
        .find(|r| r.kind == "cover_art")
        .and_then(|r| r.file_name())
        .map(|f| cover_url(&entry.id, f))
        .unwrap_or_default();
    let description = entry
        .attributes
        .description
        .get("en")
        .cloned()
        .unwrap_or_default();
    let manga_plus_url = entry
        .attributes
        .links
        .get("mangaplus")
        .filter(|code| !code.is_empty())
        .map(|code| format!("{}/{}", MANGA_PLUS_BASE, code));
    MangaSummary {
        id: entry.id,
        title,
        cover_image,
        description,
        manga_plus_url,
    }
}

fn search_params(query: &SearchQuery) -> Vec<(&'static str, String)> {
    let mut params = vec![
        ("limit", query.limit.max(1).to_string()),
        ("order[followedCount]", "desc".to_string()),
        ("includes[]", "cover_art".to_string()),
        ("availableTranslatedLanguage[]", query.language.clone()),
    ];
    if let Some(title) = query.title.as_deref().map(str::trim).filter(|t| !t.is_empty()) {
        params.push(("title", title.to_string()));
    }
    for genre in &query.genres {
        params.push(("includedTags[]", genre.clone()));
    }
    params
}

fn fetch_manga_list(
    client: &ApiClient,
    params: &[(&str, String)],
) -> Result<Vec<MangaSummary>, UpstreamError> {
    let envelope: ListEnvelope = client.get_json("/manga", params)?;
    let data = envelope.data.ok_or_else(|| UpstreamError::MalformedPayload {
        url: format!("{}/manga", client.base_url()),
        reason: "missing 'data' array".to_string(),
    })?;
    Ok(decode_entries::<MangaEntry>(data, "manga")
        .into_iter()
        .map(summarize)
        .collect())
}

/// Search the catalog, most-followed first. Results missing a title, cover, or
/// description are dropped.
pub fn search_manga(
    client: &ApiClient,
    query: &SearchQuery,
) -> Result<Vec<MangaSummary>, UpstreamError> {
    let results = fetch_manga_list(client, &search_params(query))?;
    let total = results.len();
    let complete: Vec<MangaSummary> = results
        .into_iter()
        .filter(|m| !m.title.is_empty() && !m.cover_image.is_empty() && !m.description.is_empty())
        .collect();
    tracing::debug!(total, kept = complete.len(), "search results");
    Ok(complete)
}

/// All tags, sorted by English name.
pub fn list_tags(client: &ApiClient) -> Result<Vec<Tag>, UpstreamError> {
    let envelope: ListEnvelope = client.get_json("/manga/tag", &[])?;
    let data = envelope.data.ok_or_else(|| UpstreamError::MalformedPayload {
        url: format!("{}/manga/tag", client.base_url()),
        reason: "missing 'data' array".to_string(),
    })?;
    let mut tags: Vec<Tag> = decode_entries::<TagEntry>(data, "tag")
        .into_iter()
        .filter_map(|t| {
            let name = t
                .attributes
                .name
                .get("en")
                .or_else(|| t.attributes.name.values().next())?
                .clone();
            Some(Tag {
                id: t.id,
                name,
                group: t.attributes.group,
            })
        })
        .collect();
    tags.sort_by(|a, b| a.name.to_lowercase().cmp(&b.name.to_lowercase()));
    Ok(tags)
}

/// A series shown on the front page, with the search terms used to find it and the
/// title fragments that mark spin-offs to skip.
#[derive(Debug, Clone, Copy)]
pub struct FeaturedSeries {
    pub preferred: &'static str,
    pub search_terms: &'static [&'static str],
    pub exclude_terms: &'static [&'static str],
}

pub const FEATURED: &[FeaturedSeries] = &[
    FeaturedSeries {
        preferred: "Kage no Jitsuryokusha ni Naritakute!",
        search_terms: &["Kage no Jitsuryokusha ni Naritakute", "The Eminence in Shadow"],
        exclude_terms: &["Master of Garden", "Shichikage", "side story", "spin-off"],
    },
    FeaturedSeries {
        preferred: "Chainsaw Man",
        search_terms: &["Chainsaw Man"],
        exclude_terms: &[],
    },
    FeaturedSeries {
        preferred: "Berserk",
        search_terms: &["Berserk"],
        exclude_terms: &["Gluttony", "of Gluttony", "Golden Age"],
    },
    FeaturedSeries {
        preferred: "The Breaker",
        search_terms: &["The Breaker"],
        exclude_terms: &["New Waves", "Eternal Force", "Doom Breaker", "Doom"],
    },
    FeaturedSeries {
        preferred: "Horimiya",
        search_terms: &["Horimiya"],
        exclude_terms: &["piece", "omake"],
    },
    FeaturedSeries {
        preferred: "Eyeshield 21",
        search_terms: &["Eyeshield 21"],
        exclude_terms: &["Brain x Brave", "side story", "special"],
    },
];

impl FeaturedSeries {
    /// Index of the best candidate: not excluded, title overlaps a search term, shortest
    /// title wins (main series over spin-offs), first wins on equal length.
    pub fn best_match(&self, candidates: &[MangaSummary]) -> Option<usize> {
        let terms: Vec<String> = self.search_terms.iter().map(|t| t.to_lowercase()).collect();
        let excludes: Vec<String> = self.exclude_terms.iter().map(|t| t.to_lowercase()).collect();
        candidates
            .iter()
            .enumerate()
            .filter(|(_, m)| !m.title.is_empty())
            .filter(|(_, m)| {
                let title = m.title.to_lowercase();
                !excludes.iter().any(|x| title.contains(x.as_str()))
                    && terms
                        .iter()
                        .any(|t| title.contains(t.as_str()) || t.contains(title.as_str()))
            })
            .min_by_key(|(i, m)| (m.title.chars().count(), *i))
            .map(|(i, _)| i)
    }
}

/// Resolve every [`FEATURED`] series. Lookups that fail or find nothing are logged and skipped.
pub fn featured(client: &ApiClient, language: &str) -> Vec<MangaSummary> {
    let mut out = Vec::new();
    for series in FEATURED {
        let found = series.search_terms.iter().find_map(|term| {
            let query = SearchQuery {
                title: Some(term.to_string()),
                genres: Vec::new(),
                limit: FEATURED_SEARCH_LIMIT,
                language: language.to_string(),
            };
            let params: Vec<_> = search_params(&query)
                .into_iter()
                .filter(|(k, _)| *k != "order[followedCount]")
                .collect();
            match fetch_manga_list(client, &params) {
                Ok(mut candidates) => series
                    .best_match(&candidates)
                    .map(|i| candidates.swap_remove(i)),
                Err(e) => {
                    tracing::warn!(term = *term, error = %e, "featured lookup failed");
                    None
                }
            }
        });
        match found {
            Some(m) => out.push(m),
            None => tracing::info!(series = series.preferred, "featured series not found"),
        }
    }
    out
}

fn chapter_info_from(detail: ChapterDetail) -> ChapterInfo {
    let manga = detail.relationships.iter().find(|r| r.kind == "manga");
    let manga_id = manga.map(|r| r.id.clone());
    let attrs: MangaAttributes = manga
        .and_then(|r| r.attributes.clone())
        .and_then(|v| serde_json::from_value(v).ok())
        .unwrap_or_default();
    let cover_image = detail
        .relationships
        .iter()
        .find(|r| r.kind == "cover_art")
        .and_then(|r| r.file_name())
        .zip(manga_id.as_deref())
        .map(|(file, id)| cover_url(id, file));
    ChapterInfo {
        id: detail.id,
        manga_id,
        manga_title: attrs
            .title
            .get("en")
            .cloned()
            .unwrap_or_else(|| "Manga".to_string()),
        manga_description: attrs.description.get("en").cloned().unwrap_or_default(),
        cover_image,
    }
}

/// Metadata for one chapter, including the id and title of its manga.
pub fn chapter_info(client: &ApiClient, chapter_id: &str) -> Result<ChapterInfo, UpstreamError> {
    validate_id(chapter_id)?;
    let path = format!("/chapter/{}", chapter_id);
    let params = [
        ("includes[]", "manga".to_string()),
        ("includes[]", "cover_art".to_string()),
    ];
    let envelope: EntityEnvelope<ChapterDetail> = client.get_json(&path, &params)?;
    let detail = envelope.data.ok_or_else(|| UpstreamError::MalformedPayload {
        url: format!("{}{}", client.base_url(), path),
        reason: "missing 'data' object".to_string(),
    })?;
    Ok(chapter_info_from(detail))
}

/// Full image URLs for a chapter's pages, from an at-home server response.
pub fn page_urls(response: AtHomeResponse) -> Vec<String> {
    let (Some(base), Some(chapter)) = (response.base_url, response.chapter) else {
        return Vec::new();
    };
    let base = base.trim_end_matches('/');
    chapter
        .data
        .unwrap_or_default()
        .iter()
        .map(|file| format!("{}/data/{}/{}", base, chapter.hash, file))
        .collect()
}

/// Page image URLs for a chapter. Any failure yields an empty list.
pub fn chapter_pages(client: &ApiClient, chapter_id: &str) -> Vec<String> {
    if let Err(e) = validate_id(chapter_id) {
        tracing::warn!(error = %e, "not fetching pages");
        return Vec::new();
    }
    let path = format!("/at-home/server/{}", chapter_id);
    match client.get_json::<AtHomeResponse>(&path, &[]) {
        Ok(response) => page_urls(response),
        Err(e) => {
            tracing::warn!(chapter_id, error = %e, "could not resolve chapter pages");
            Vec::new()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::error::Error;

    fn summary(title: &str) -> MangaSummary {
        MangaSummary {
            id: title.to_lowercase().replace(' ', "-"),
            title: title.to_string(),
            cover_image: String::new(),
            description: String::new(),
            manga_plus_url: None,
        }
    }

    fn series(name: &str) -> Result<&'static FeaturedSeries, String> {
        FEATURED
            .iter()
            .find(|s| s.preferred == name)
            .ok_or_else(|| format!("{} not featured", name))
    }

    #[test]
    fn cover_url_uses_thumbnail_suffix() {
        assert_eq!(
            cover_url("m1", "abc.jpg"),
            "https://uploads.mangadex.org/covers/m1/abc.jpg.256.jpg"
        );
    }

    #[test]
    fn summarize_prefers_english_and_builds_links() -> Result<(), Box<dyn Error>> {
        let entry: MangaEntry = serde_json::from_str(
            r#"{
                "id": "m1",
                "attributes": {
                    "title": {"ja-ro": "Chainsaw Man (ja)", "en": "Chainsaw Man"},
                    "description": {"en": "Denji has a debt."},
                    "links": {"mangaplus": "100037"}
                },
                "relationships": [
                    {"id": "a", "type": "author"},
                    {"id": "c", "type": "cover_art", "attributes": {"fileName": "f.png"}}
                ]
            }"#,
        )?;
        let m = summarize(entry);
        assert_eq!(m.title, "Chainsaw Man");
        assert_eq!(m.cover_image, cover_url("m1", "f.png"));
        assert_eq!(m.description, "Denji has a debt.");
        assert_eq!(
            m.manga_plus_url.as_deref(),
            Some("https://mangaplus.shueisha.co.jp/titles/100037")
        );
        Ok(())
    }

    #[test]
    fn summarize_without_cover_or_english_title() -> Result<(), Box<dyn Error>> {
        let entry: MangaEntry = serde_json::from_str(
            r#"{"id": "m2", "attributes": {"title": {"ko": "Title"}, "description": []}}"#,
        )?;
        let m = summarize(entry);
        assert_eq!(m.title, "Title");
        assert!(m.cover_image.is_empty());
        assert!(m.description.is_empty());
        assert!(m.manga_plus_url.is_none());
        Ok(())
    }

    #[test]
    fn non_english_title_falls_back_by_language_code() -> Result<(), Box<dyn Error>> {
        let entry: MangaEntry = serde_json::from_str(
            r#"{"id": "m3", "attributes": {"title": {"ja-ro": "Shingeki no Kyojin", "ja": "進撃の巨人"}}}"#,
        )?;
        assert_eq!(summarize(entry).title, "進撃の巨人");
        Ok(())
    }

    #[test]
    fn search_params_include_title_and_genres() {
        let q = SearchQuery {
            title: Some("  Berserk ".to_string()),
            genres: vec!["t1".to_string(), "t2".to_string()],
            ..SearchQuery::default()
        };
        let params = search_params(&q);
        assert!(params.contains(&("title", "Berserk".to_string())));
        assert!(params.contains(&("limit", "12".to_string())));
        assert_eq!(params.iter().filter(|(k, _)| *k == "includedTags[]").count(), 2);
        assert!(params.contains(&("availableTranslatedLanguage[]", "en".to_string())));
    }

    #[test]
    fn search_params_skip_blank_title() {
        let q = SearchQuery {
            title: Some("   ".to_string()),
            ..SearchQuery::default()
        };
        assert!(!search_params(&q).iter().any(|(k, _)| *k == "title"));
    }

    #[test]
    fn featured_excludes_spin_offs_and_prefers_shortest() -> Result<(), String> {
        let berserk = series("Berserk")?;
        let candidates = vec![
            summary("Berserk of Gluttony"),
            summary("Berserk: The Prototype"),
            summary("Berserk"),
        ];
        assert_eq!(berserk.best_match(&candidates), Some(2));
        Ok(())
    }

    #[test]
    fn featured_matches_alternate_term_and_containment_both_ways() -> Result<(), String> {
        let shadow = series("Kage no Jitsuryokusha ni Naritakute!")?;
        let candidates = vec![
            summary("The Eminence in Shadow: Master of Garden"),
            summary("Eminence in Shadow"),
        ];
        // "the eminence in shadow" contains "eminence in shadow".
        assert_eq!(shadow.best_match(&candidates), Some(1));
        Ok(())
    }

    #[test]
    fn featured_no_match() -> Result<(), String> {
        let horimiya = series("Horimiya")?;
        let candidates = vec![summary("Horimiya: piece"), summary("Something Else")];
        assert_eq!(horimiya.best_match(&candidates), None);
        assert_eq!(horimiya.best_match(&[]), None);
        Ok(())
    }

    #[test]
    fn page_urls_joins_base_hash_and_files() -> Result<(), Box<dyn Error>> {
        let resp: AtHomeResponse = serde_json::from_str(
            r#"{"result":"ok","baseUrl":"https://node.example.org/","chapter":{"hash":"h1","data":["1.png","2.png"],"dataSaver":[]}}"#,
        )?;
        assert_eq!(
            page_urls(resp),
            vec![
                "https://node.example.org/data/h1/1.png",
                "https://node.example.org/data/h1/2.png"
            ]
        );
        Ok(())
    }

    #[test]
    fn page_urls_empty_without_chapter_data() -> Result<(), Box<dyn Error>> {
        let resp: AtHomeResponse = serde_json::from_str(r#"{"baseUrl":"https://x"}"#)?;
        assert!(page_urls(resp).is_empty());
        let resp: AtHomeResponse =
            serde_json::from_str(r#"{"baseUrl":"https://x","chapter":{"hash":"h"}}"#)?;
        assert!(page_urls(resp).is_empty());
        Ok(())
    }

    #[test]
    fn chapter_info_reads_manga_relationship() -> Result<(), Box<dyn Error>> {
        let env: EntityEnvelope<ChapterDetail> = serde_json::from_str(
            r#"{"data": {"id": "ch1", "relationships": [
                {"id": "m1", "type": "manga", "attributes": {"title": {"en": "Horimiya"}, "description": {"en": "School."}}},
                {"id": "g1", "type": "scanlation_group"}
            ]}}"#,
        )?;
        let info = chapter_info_from(env.data.ok_or("no data")?);
        assert_eq!(info.manga_id.as_deref(), Some("m1"));
        assert_eq!(info.manga_title, "Horimiya");
        assert_eq!(info.manga_description, "School.");
        assert!(info.cover_image.is_none());
        Ok(())
    }

    #[test]
    fn chapter_info_defaults_title() -> Result<(), Box<dyn Error>> {
        let env: EntityEnvelope<ChapterDetail> =
            serde_json::from_str(r#"{"data": {"id": "ch1"}}"#)?;
        let info = chapter_info_from(env.data.ok_or("no data")?);
        assert_eq!(info.manga_id, None);
        assert_eq!(info.manga_title, "Manga");
        Ok(())
    }
}
