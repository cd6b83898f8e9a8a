//! Bounded digest of an idea's elements for the system prompt.
//!
//! The ten most recent elements keep up to 300 characters each; the long
//! tail is squeezed to 80 so the digest stays roughly the same size no
//! matter how much the user has collected.

use std::cmp::Reverse;

use crate::models::{Element, ElementSource};

/// Number of most-recent elements shown at full fidelity.
pub const RECENT_WINDOW: usize = 10;

/// Character budget for elements inside the recent window.
pub const RECENT_CHAR_LIMIT: usize = 300;

/// Character budget for elements past the recent window.
pub const TAIL_CHAR_LIMIT: usize = 80;

/// Character budget for user notes, applied independently of content.
pub const NOTE_CHAR_LIMIT: usize = 100;

const ELLIPSIS: &str = "...";

/// Cut `text` to `max` characters, marking the cut with an ellipsis.
pub fn truncate_chars(text: &str, max: usize) -> String {
    if text.chars().count() <= max {
        return text.to_string();
    }
    let mut cut: String = text.chars().take(max).collect();
    cut.push_str(ELLIPSIS);
    cut
}

/// Marker inserted after the recent window when older elements follow.
pub fn earlier_marker(total: usize) -> String {
    format!(
        "\n[...{} earlier elements, summarized...]",
        total.saturating_sub(RECENT_WINDOW)
    )
}

fn line_prefix(element: &Element) -> String {
    match element.source {
        ElementSource::Ai => "[spark]".to_string(),
        ElementSource::User => format!("[{}]", element.element_type),
    }
}

fn line_content(element: &Element) -> String {
    let meta = &element.metadata;

    let mut content = meta
        .title
        .clone()
        .or_else(|| element.content().map(str::to_string))
        .unwrap_or_default();

    if let Some(description) = meta.description.as_deref() {
        if content.is_empty() {
            content = description.to_string();
        } else if !content.contains(description) {
            content = format!("{} — {}", content, description);
        }
    }

    if content.is_empty() {
        if let Some(url) = meta.url.as_deref() {
            content = url.to_string();
        } else if let Some(filename) = meta.filename.as_deref() {
            content = filename.to_string();
        }
    }

    content
}

/// Digest line for the element at `index` in recency order.
pub fn summary_line(element: &Element, index: usize) -> String {
    let limit = if index >= RECENT_WINDOW {
        TAIL_CHAR_LIMIT
    } else {
        RECENT_CHAR_LIMIT
    };

    let content = truncate_chars(&line_content(element), limit);
    let mut line = format!("{} {}", line_prefix(element), content)
        .trim_end()
        .to_string();

    if let Some(note) = element.metadata.note.as_deref() {
        line.push_str(&format!(
            " [user note: \"{}\"]",
            truncate_chars(note, NOTE_CHAR_LIMIT)
        ));
    }

    line
}

/// Build the digest for an unordered collection of elements.
///
/// Elements are ordered newest first. Elements without a timestamp sort
/// after every timestamped element and keep their relative input order.
/// An empty collection yields an empty string.
pub fn build_elements_summary(elements: &[Element]) -> String {
    if elements.is_empty() {
        return String::new();
    }

    let mut ordered: Vec<&Element> = elements.iter().collect();
    ordered.sort_by_key(|e| Reverse(e.created_at));

    let mut lines: Vec<String> = ordered
        .iter()
        .enumerate()
        .map(|(i, e)| summary_line(e, i))
        .collect();

    if elements.len() > RECENT_WINDOW {
        lines.insert(RECENT_WINDOW, earlier_marker(elements.len()));
    }

    lines.join("\n")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{ElementMetadata, ElementType};
    use chrono::{Duration, TimeZone, Utc};
    use serde_json::json;
    use uuid::Uuid;

    fn element_at(minutes: Option<i64>, content: &str, metadata: serde_json::Value) -> Element {
        let base = Utc.with_ymd_and_hms(2026, 3, 1, 9, 0, 0).unwrap();
        Element {
            id: Uuid::new_v4(),
            user_id: Uuid::nil(),
            idea_id: None,
            element_type: ElementType::Thought,
            source: ElementSource::User,
            content: Some(content.to_string()),
            metadata: ElementMetadata::from_value(&metadata),
            is_archived: false,
            created_at: minutes.map(|m| base + Duration::minutes(m)),
        }
    }

    fn numbered(count: usize, content: &str) -> Vec<Element> {
        (0..count)
            .map(|i| element_at(Some(i as i64), &format!("{}-{}", i, content), json!({})))
            .collect()
    }

    #[test]
    fn test_empty_collection_is_empty_string() {
        assert_eq!(build_elements_summary(&[]), "");
    }

    #[test]
    fn test_newest_first() {
        let elements = vec![
            element_at(Some(0), "oldest", json!({})),
            element_at(Some(10), "newest", json!({})),
            element_at(Some(5), "middle", json!({})),
        ];
        assert_eq!(
            build_elements_summary(&elements),
            "[thought] newest\n[thought] middle\n[thought] oldest"
        );
    }

    #[test]
    fn test_untimestamped_elements_trail_in_input_order() {
        let elements = vec![
            element_at(None, "first-undated", json!({})),
            element_at(Some(1), "dated", json!({})),
            element_at(None, "second-undated", json!({})),
        ];
        assert_eq!(
            build_elements_summary(&elements),
            "[thought] dated\n[thought] first-undated\n[thought] second-undated"
        );
    }

    #[test]
    fn test_small_collections_use_300_char_budget() {
        let long = "x".repeat(500);
        let elements = numbered(10, &long);
        let summary = build_elements_summary(&elements);
        for line in summary.lines() {
            let body = line.trim_start_matches("[thought] ");
            // "<n>-" prefix plus 300 - len("<n>-") chars of x, then the ellipsis
            assert_eq!(body.chars().count(), RECENT_CHAR_LIMIT + ELLIPSIS.len());
            assert!(body.ends_with("..."));
        }
        assert!(!summary.contains("earlier elements"));
    }

    #[test]
    fn test_tail_uses_80_char_budget() {
        let long = "y".repeat(500);
        let elements = numbered(12, &long);
        let summary = build_elements_summary(&elements);
        let lines: Vec<&str> = summary.split('\n').collect();

        // 10 recent, blank + marker, then the 2 oldest
        assert_eq!(lines.len(), 14);
        for line in &lines[..10] {
            assert_eq!(
                line.trim_start_matches("[thought] ").chars().count(),
                RECENT_CHAR_LIMIT + 3
            );
        }
        for line in &lines[12..] {
            assert_eq!(
                line.trim_start_matches("[thought] ").chars().count(),
                TAIL_CHAR_LIMIT + 3
            );
        }
    }

    #[test]
    fn test_single_marker_after_tenth_line() {
        let elements = numbered(25, "note");
        let summary = build_elements_summary(&elements);
        let lines: Vec<&str> = summary.split('\n').collect();

        let markers: Vec<usize> = lines
            .iter()
            .enumerate()
            .filter(|(_, l)| l.contains("earlier elements, summarized"))
            .map(|(i, _)| i)
            .collect();
        assert_eq!(markers, vec![11]);
        assert_eq!(lines[10], "");
        assert_eq!(lines[11], "[...15 earlier elements, summarized...]");
        assert_eq!(lines[9], "[thought] 15-note");
        assert_eq!(lines[12], "[thought] 14-note");
    }

    #[test]
    fn test_exactly_ten_has_no_marker() {
        let summary = build_elements_summary(&numbered(10, "n"));
        assert_eq!(summary.lines().count(), 10);
        assert!(!summary.contains("[..."));
    }

    #[test]
    fn test_note_survives_tail_truncation() {
        let mut elements = numbered(11, &"z".repeat(200));
        elements[0] = element_at(
            Some(0),
            &"z".repeat(200),
            json!({"note": "keep this in mind"}),
        );
        let summary = build_elements_summary(&elements);
        let last = summary.lines().last().unwrap();
        assert!(last.contains("..."));
        assert!(last.ends_with("[user note: \"keep this in mind\"]"));
    }

    #[test]
    fn test_note_truncated_independently() {
        let elements = vec![element_at(Some(0), "short", json!({"note": "n".repeat(150)}))];
        let summary = build_elements_summary(&elements);
        let expected_note = format!("{}...", "n".repeat(NOTE_CHAR_LIMIT));
        assert_eq!(
            summary,
            format!("[thought] short [user note: \"{}\"]", expected_note)
        );
    }

    #[test]
    fn test_ai_elements_use_spark_prefix() {
        let mut e = element_at(Some(0), "What if the constraint is the feature?", json!({}));
        e.source = ElementSource::Ai;
        e.element_type = ElementType::Spark;
        assert_eq!(
            build_elements_summary(&[e]),
            "[spark] What if the constraint is the feature?"
        );
    }

    #[test]
    fn test_title_preferred_and_description_appended() {
        let mut e = element_at(
            Some(0),
            "raw pasted text",
            json!({"title": "On Slowness", "description": "An essay about pace."}),
        );
        e.element_type = ElementType::Article;
        assert_eq!(
            build_elements_summary(&[e]),
            "[article] On Slowness — An essay about pace."
        );
    }

    #[test]
    fn test_description_not_repeated_when_contained() {
        let e = element_at(
            Some(0),
            "Quote: less but better, said Rams",
            json!({"description": "less but better"}),
        );
        assert_eq!(
            build_elements_summary(&[e]),
            "[thought] Quote: less but better, said Rams"
        );
    }

    #[test]
    fn test_description_used_when_content_empty() {
        let e = element_at(Some(0), "", json!({"description": "only a description"}));
        assert_eq!(build_elements_summary(&[e]), "[thought] only a description");
    }

    #[test]
    fn test_url_then_filename_fallbacks() {
        let mut link = element_at(Some(1), "", json!({"public_url": "https://example.com"}));
        link.element_type = ElementType::Article;
        let mut file = element_at(Some(0), "", json!({"file_name": "report.pdf"}));
        file.element_type = ElementType::File;
        assert_eq!(
            build_elements_summary(&[file, link]),
            "[article] https://example.com\n[file] report.pdf"
        );
    }

    #[test]
    fn test_bare_element_has_no_trailing_space() {
        let e = element_at(Some(0), "", json!({}));
        assert_eq!(build_elements_summary(&[e]), "[thought]");
    }

    #[test]
    fn test_truncate_counts_chars_not_bytes() {
        let s = "é".repeat(5);
        assert_eq!(truncate_chars(&s, 3), "ééé...");
        assert_eq!(truncate_chars(&s, 5), s);
    }
}
