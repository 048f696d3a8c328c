//! Chapter reducer: filter raw feed records to one language, keep one entry per chapter
//! number, and order the result by chapter number.

use crate::model::{CanonicalChapter, RawChapterRecord};
use std::cmp::Ordering;
use std::collections::HashMap;

/// Reduce raw feed records to the canonical chapter list for `language`.
///
/// Records are dropped when the chapter number is missing or empty, the language tag is
/// absent, or the page count is explicitly zero. Among records sharing a chapter number
/// (compared as raw strings, so "10" and "10.0" stay separate) the one with the most pages
/// wins; ties keep the first seen. Output is sorted by the numeric prefix of each chapter
/// number ("12a" sorts as 12), with labels lacking one placed last in first-seen order.
pub fn reduce(records: &[RawChapterRecord], language: &str) -> Vec<CanonicalChapter> {
    let mut slots: HashMap<&str, usize> = HashMap::new();
    let mut best: Vec<CanonicalChapter> = Vec::new();

    for record in records.iter().filter(|r| accepts(r, language)) {
        let Some(number) = record.chapter_number.as_deref() else {
            continue;
        };
        let candidate = canonicalize(record, number);
        match slots.get(number) {
            Some(&i) => {
                if candidate.page_count > best[i].page_count {
                    best[i] = candidate;
                }
            }
            None => {
                slots.insert(number, best.len());
                best.push(candidate);
            }
        }
    }

    // Stable: equal keys and unparseable labels keep first-seen order.
    best.sort_by(|a, b| compare_chapter_numbers(&a.chapter_number, &b.chapter_number));
    best
}

fn accepts(record: &RawChapterRecord, language: &str) -> bool {
    let has_number = record
        .chapter_number
        .as_deref()
        .is_some_and(|n| !n.is_empty());
    has_number && record.has_language(language) && record.page_count != Some(0)
}

fn canonicalize(record: &RawChapterRecord, number: &str) -> CanonicalChapter {
    let title = record
        .title
        .as_deref()
        .filter(|t| !t.trim().is_empty())
        .map(String::from)
        .unwrap_or_else(|| format!("Chapter {}", number));
    CanonicalChapter {
        id: record.id.clone(),
        title,
        chapter_number: number.to_string(),
        page_count: record.page_count.unwrap_or(0),
    }
}

/// Numeric value of a chapter label: the longest leading decimal number after leading
/// whitespace, so "12a" reads as 12. `None` when there is no numeric prefix or the value
/// is not finite.
pub fn chapter_value(label: &str) -> Option<f64> {
    let s = label.trim_start();
    let bytes = s.as_bytes();
    let mut end = usize::from(matches!(bytes.first(), Some(b'+' | b'-')));
    let int_digits = count_digits(&bytes[end..]);
    end += int_digits;
    let mut frac_digits = 0;
    if bytes.get(end) == Some(&b'.') {
        frac_digits = count_digits(&bytes[end + 1..]);
        if int_digits > 0 || frac_digits > 0 {
            end += 1 + frac_digits;
        }
    }
    if int_digits == 0 && frac_digits == 0 {
        return None;
    }
    if matches!(bytes.get(end), Some(b'e' | b'E')) {
        let mut exp = end + 1;
        if matches!(bytes.get(exp), Some(b'+' | b'-')) {
            exp += 1;
        }
        let exp_digits = count_digits(&bytes[exp..]);
        if exp_digits > 0 {
            end = exp + exp_digits;
        }
    }
    s[..end].parse::<f64>().ok().filter(|v| v.is_finite())
}

fn count_digits(bytes: &[u8]) -> usize {
    bytes.iter().take_while(|b| b.is_ascii_digit()).count()
}

/// "0" or a digit run without a leading zero that fits a u32 below `u32::MAX`.
fn is_plain_integer(label: &str) -> bool {
    let canonical = label == "0"
        || (!label.is_empty()
            && !label.starts_with('0')
            && label.bytes().all(|b| b.is_ascii_digit()));
    canonical && label.parse::<u32>().is_ok_and(|n| n < u32::MAX)
}

/// Numeric labels ascending; any label without a numeric value sorts after all of them.
/// Among labels with the same value, plain integers ("12") precede the rest ("12a",
/// "12.0"); remaining ties keep first-seen order.
fn compare_chapter_numbers(a: &str, b: &str) -> Ordering {
    match (chapter_value(a), chapter_value(b)) {
        (Some(x), Some(y)) => x
            .partial_cmp(&y)
            .unwrap_or(Ordering::Equal)
            .then_with(|| is_plain_integer(b).cmp(&is_plain_integer(a))),
        (Some(_), None) => Ordering::Less,
        (None, Some(_)) => Ordering::Greater,
        (None, None) => Ordering::Equal,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use std::collections::HashSet;

    fn rec(id: &str, chapter: Option<&str>, langs: &[&str], pages: Option<u32>) -> RawChapterRecord {
        RawChapterRecord {
            id: id.to_string(),
            chapter_number: chapter.map(String::from),
            title: None,
            languages: langs.iter().map(|l| l.to_string()).collect(),
            page_count: pages,
        }
    }

    #[test]
    fn reference_scenario() {
        let input = vec![
            rec("a", Some("1"), &["en"], Some(5)),
            rec("b", Some("1"), &["en"], Some(8)),
            rec("c", Some("2"), &["fr"], Some(10)),
            rec("d", Some(""), &["en"], Some(3)),
        ];
        let out = reduce(&input, "en");
        assert_eq!(
            out,
            vec![CanonicalChapter {
                id: "b".to_string(),
                title: "Chapter 1".to_string(),
                chapter_number: "1".to_string(),
                page_count: 8,
            }]
        );
    }

    #[test]
    fn absent_page_count_is_accepted_zero_is_not() {
        let input = vec![
            rec("unknown", Some("3"), &["en"], None),
            rec("zero", Some("4"), &["en"], Some(0)),
        ];
        let out = reduce(&input, "en");
        assert_eq!(out.len(), 1);
        assert_eq!(out[0].id, "unknown");
        assert_eq!(out[0].page_count, 0);
    }

    #[test]
    fn missing_chapter_number_is_dropped() {
        let input = vec![rec("x", None, &["en"], Some(12))];
        assert!(reduce(&input, "en").is_empty());
    }

    #[test]
    fn tie_keeps_first_seen() {
        let input = vec![
            rec("first", Some("7"), &["en"], Some(20)),
            rec("second", Some("7"), &["en"], Some(20)),
        ];
        let out = reduce(&input, "en");
        assert_eq!(out.len(), 1);
        assert_eq!(out[0].id, "first");
    }

    #[test]
    fn unknown_pages_lose_to_known_pages() {
        let input = vec![
            rec("unknown", Some("7"), &["en"], None),
            rec("known", Some("7"), &["en"], Some(1)),
        ];
        assert_eq!(reduce(&input, "en")[0].id, "known");
    }

    #[test]
    fn dedup_key_is_raw_string() {
        let input = vec![
            rec("ten", Some("10"), &["en"], Some(5)),
            rec("ten-point-oh", Some("10.0"), &["en"], Some(5)),
        ];
        let out = reduce(&input, "en");
        assert_eq!(out.len(), 2);
        assert_eq!(out[0].id, "ten");
        assert_eq!(out[1].id, "ten-point-oh");
    }

    #[test]
    fn title_kept_when_present_and_synthesized_when_blank() {
        let mut titled = rec("t", Some("2"), &["en"], Some(9));
        titled.title = Some("Power".to_string());
        let mut blank = rec("b", Some("3"), &["en"], Some(9));
        blank.title = Some("   ".to_string());
        let mut padded = rec("p", Some("4"), &["en"], Some(9));
        padded.title = Some(" Makima ".to_string());
        let out = reduce(&[titled, blank, padded], "en");
        assert_eq!(out[0].title, "Power");
        assert_eq!(out[1].title, "Chapter 3");
        assert_eq!(out[2].title, " Makima ");
    }

    #[test]
    fn sorts_numerically_not_lexically() {
        let input = vec![
            rec("c10", Some("10"), &["en"], Some(1)),
            rec("c2", Some("2"), &["en"], Some(1)),
            rec("c1_5", Some("1.5"), &["en"], Some(1)),
            rec("c1", Some("1"), &["en"], Some(1)),
        ];
        let order: Vec<_> = reduce(&input, "en")
            .into_iter()
            .map(|c| c.chapter_number)
            .collect();
        assert_eq!(order, vec!["1", "1.5", "2", "10"]);
    }

    #[test]
    fn unparseable_labels_go_last_in_first_seen_order() {
        let input = vec![
            rec("omake", Some("Omake"), &["en"], Some(4)),
            rec("c2", Some("2"), &["en"], Some(4)),
            rec("extra", Some("Extra"), &["en"], Some(4)),
            rec("c1", Some("1"), &["en"], Some(4)),
            rec("nan", Some("NaN"), &["en"], Some(4)),
        ];
        let order: Vec<_> = reduce(&input, "en").into_iter().map(|c| c.id).collect();
        assert_eq!(order, vec!["c1", "c2", "omake", "extra", "nan"]);
    }

    #[test]
    fn multi_language_record_matches_target() {
        let input = vec![rec("m", Some("1"), &["ja", "en"], Some(3))];
        assert_eq!(reduce(&input, "en").len(), 1);
        assert!(reduce(&input, "de").is_empty());
    }

    #[test]
    fn chapter_value_parses_decimals_and_rejects_labels() {
        assert_eq!(chapter_value("12.5"), Some(12.5));
        assert_eq!(chapter_value(" 3 "), Some(3.0));
        assert_eq!(chapter_value("Omake"), None);
        assert_eq!(chapter_value("inf"), None);
        assert_eq!(chapter_value("1e999"), None);
        assert_eq!(chapter_value(""), None);
        assert_eq!(chapter_value("."), None);
    }

    #[test]
    fn chapter_value_reads_numeric_prefix() {
        assert_eq!(chapter_value("12a"), Some(12.0));
        assert_eq!(chapter_value("3.5b"), Some(3.5));
        assert_eq!(chapter_value("7 (end)"), Some(7.0));
        assert_eq!(chapter_value(".5"), Some(0.5));
        assert_eq!(chapter_value("5."), Some(5.0));
        assert_eq!(chapter_value("2e"), Some(2.0));
        assert_eq!(chapter_value("1e2x"), Some(100.0));
        assert_eq!(chapter_value("-1"), Some(-1.0));
        assert_eq!(chapter_value("v2"), None);
    }

    #[test]
    fn lettered_chapters_sort_beside_their_number() {
        let input = vec![
            rec("c12a", Some("12a"), &["en"], Some(4)),
            rec("c13", Some("13"), &["en"], Some(4)),
            rec("c1", Some("1"), &["en"], Some(4)),
            rec("c12", Some("12"), &["en"], Some(4)),
        ];
        let order: Vec<_> = reduce(&input, "en")
            .into_iter()
            .map(|c| c.chapter_number)
            .collect();
        assert_eq!(order, vec!["1", "12", "12a", "13"]);
    }

    #[test]
    fn plain_integer_detection() {
        assert!(is_plain_integer("0"));
        assert!(is_plain_integer("12"));
        assert!(!is_plain_integer("012"));
        assert!(!is_plain_integer("12.0"));
        assert!(!is_plain_integer("12a"));
        assert!(!is_plain_integer(""));
        assert!(!is_plain_integer("4294967295"));
    }

    fn any_record() -> impl Strategy<Value = RawChapterRecord> {
        let chapter = prop_oneof![
            Just(None),
            Just(Some(String::new())),
            (0u32..30).prop_map(|n| Some(n.to_string())),
            (0u32..30).prop_map(|n| Some(format!("{}.5", n))),
            Just(Some("Omake".to_string())),
        ];
        let langs = prop_oneof![
            Just(vec!["en".to_string()]),
            Just(vec!["fr".to_string()]),
            Just(vec!["en".to_string(), "ja".to_string()]),
            Just(Vec::new()),
        ];
        let pages = prop_oneof![Just(None), (0u32..40).prop_map(Some)];
        ("[a-z0-9]{8}", chapter, langs, pages).prop_map(|(id, chapter_number, languages, page_count)| {
            RawChapterRecord {
                id,
                chapter_number,
                title: None,
                languages,
                page_count,
            }
        })
    }

    proptest! {
        #[test]
        fn output_has_unique_chapter_numbers(records in proptest::collection::vec(any_record(), 0..80)) {
            let out = reduce(&records, "en");
            let keys: HashSet<_> = out.iter().map(|c| c.chapter_number.clone()).collect();
            prop_assert_eq!(keys.len(), out.len());
        }

        #[test]
        fn winner_has_max_pages(records in proptest::collection::vec(any_record(), 0..80)) {
            let out = reduce(&records, "en");
            for ch in &out {
                let max = records
                    .iter()
                    .filter(|r| accepts(r, "en"))
                    .filter(|r| r.chapter_number.as_deref() == Some(ch.chapter_number.as_str()))
                    .map(|r| r.page_count.unwrap_or(0))
                    .max();
                prop_assert_eq!(Some(ch.page_count), max);
            }
        }

        #[test]
        fn filtered_records_never_appear(records in proptest::collection::vec(any_record(), 0..80)) {
            let out = reduce(&records, "en");
            let ids: HashSet<_> = out.iter().map(|c| c.id.as_str()).collect();
            for r in records.iter().filter(|r| !accepts(r, "en")) {
                // Ids are random; a rejected record may share an id with an accepted one.
                let shadowed = records.iter().any(|o| accepts(o, "en") && o.id == r.id);
                prop_assert!(shadowed || !ids.contains(r.id.as_str()));
            }
        }

        #[test]
        fn numeric_prefix_is_non_decreasing(records in proptest::collection::vec(any_record(), 0..80)) {
            let out = reduce(&records, "en");
            let values: Vec<f64> = out.iter().filter_map(|c| chapter_value(&c.chapter_number)).collect();
            prop_assert!(values.windows(2).all(|w| w[0] <= w[1]));
            // Every numeric entry precedes every non-numeric one.
            let first_label = out.iter().position(|c| chapter_value(&c.chapter_number).is_none());
            if let Some(pos) = first_label {
                prop_assert!(out[pos..].iter().all(|c| chapter_value(&c.chapter_number).is_none()));
            }
        }

        #[test]
        fn reduction_is_idempotent(records in proptest::collection::vec(any_record(), 0..80)) {
            let once = reduce(&records, "en");
            let again_input: Vec<_> = once.iter().map(|c| c.to_record("en")).collect();
            let twice = reduce(&again_input, "en");
            prop_assert_eq!(once, twice);
        }

        #[test]
        fn reduction_is_deterministic(records in proptest::collection::vec(any_record(), 0..80)) {
            prop_assert_eq!(reduce(&records, "en"), reduce(&records, "en"));
        }
    }
}
