//! Single-element context block used by mini-sparks.

use crate::models::{Element, ElementMetadata, ElementType};
use crate::prompt::metadata::DEFAULT_FILENAME;

/// Render one element as newline-separated lines for an LLM prompt.
///
/// Order is fixed: content, URL, title, description, then the attachment
/// name for files and images. Lines whose source is empty are dropped.
pub fn build_element_context(
    content: Option<&str>,
    element_type: ElementType,
    metadata: &ElementMetadata,
    url: Option<&str>,
    filename: &str,
) -> String {
    let mut lines: Vec<String> = Vec::with_capacity(5);

    if let Some(content) = content {
        lines.push(content.to_string());
    }
    if let Some(url) = url {
        lines.push(format!("URL: {}", url));
    }
    if let Some(title) = metadata.title.as_deref() {
        lines.push(format!("Title: {}", title));
    }
    if let Some(description) = metadata.description.as_deref() {
        lines.push(format!("Description: {}", description));
    }
    if element_type.has_attachment() && !filename.is_empty() {
        lines.push(format!("File: {}", filename));
    }

    lines
        .into_iter()
        .filter(|l| !l.trim().is_empty())
        .collect::<Vec<_>>()
        .join("\n")
}

/// Context block for a loaded element, using its normalised metadata.
pub fn element_context(element: &Element) -> String {
    let filename = element
        .metadata
        .filename
        .as_deref()
        .unwrap_or(DEFAULT_FILENAME);
    build_element_context(
        element.content(),
        element.element_type,
        &element.metadata,
        element.metadata.url.as_deref(),
        filename,
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::ElementSource;
    use serde_json::json;
    use uuid::Uuid;

    fn element(element_type: ElementType, content: Option<&str>, metadata: serde_json::Value) -> Element {
        Element {
            id: Uuid::new_v4(),
            user_id: Uuid::new_v4(),
            idea_id: None,
            element_type,
            source: ElementSource::User,
            content: content.map(str::to_string),
            metadata: ElementMetadata::from_value(&metadata),
            is_archived: false,
            created_at: None,
        }
    }

    #[test]
    fn test_content_only_is_exact() {
        let e = element(ElementType::Thought, Some("hello"), json!({}));
        assert_eq!(element_context(&e), "hello");
    }

    #[test]
    fn test_article_lines_in_order() {
        let e = element(
            ElementType::Article,
            Some("worth a read"),
            json!({
                "url": "https://example.com/post",
                "title": "On Slowness",
                "description": "An essay."
            }),
        );
        assert_eq!(
            element_context(&e),
            "worth a read\nURL: https://example.com/post\nTitle: On Slowness\nDescription: An essay."
        );
    }

    #[test]
    fn test_file_line_uses_default_name() {
        let e = element(ElementType::File, None, json!({}));
        assert_eq!(element_context(&e), "File: File");
    }

    #[test]
    fn test_image_uses_legacy_url_and_name() {
        let e = element(
            ElementType::Image,
            None,
            json!({"public_url": "https://cdn.example/x.png", "file_name": "x.png"}),
        );
        assert_eq!(element_context(&e), "URL: https://cdn.example/x.png\nFile: x.png");
    }

    #[test]
    fn test_thought_never_gets_file_line() {
        let e = element(ElementType::Thought, Some("idea"), json!({"filename": "stray.txt"}));
        assert_eq!(element_context(&e), "idea");
    }

    #[test]
    fn test_empty_element_is_empty_string() {
        let e = element(ElementType::Thought, Some("   "), json!({}));
        assert_eq!(element_context(&e), "");
    }
}
