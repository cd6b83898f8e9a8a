//! Link preview subsystem — fills in title/description for article elements
//!
//! Runs in tokio::spawn AFTER the capture response is sent — never blocks the
//! caller. Fetch failures are logged and otherwise ignored; the element just
//! keeps whatever metadata the user supplied.

use std::collections::HashMap;
use std::sync::OnceLock;
use std::time::Duration;

use regex::Regex;
use spark_core::config::LinkPreviewConfig;
use spark_core::models::{ElementMetadata, ElementRow};
use sqlx::PgPool;
use uuid::Uuid;

use crate::subsystems::elements;

/// Title/description scraped from a page.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LinkPreview {
    pub title: Option<String>,
    pub description: Option<String>,
}

impl LinkPreview {
    pub fn is_empty(&self) -> bool {
        self.title.is_none() && self.description.is_none()
    }
}

fn meta_tag_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"(?is)<meta\s[^>]*>").expect("valid meta regex"))
}

fn attr_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r#"(?s)([A-Za-z_:][-A-Za-z0-9_:.]*)\s*=\s*(?:"([^"]*)"|'([^']*)')"#)
            .expect("valid attribute regex")
    })
}

fn title_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"(?is)<title[^>]*>(.*?)</title>").expect("valid title regex"))
}

fn decode_entities(text: &str) -> String {
    text.replace("&quot;", "\"")
        .replace("&#39;", "'")
        .replace("&#x27;", "'")
        .replace("&apos;", "'")
        .replace("&lt;", "<")
        .replace("&gt;", ">")
        .replace("&nbsp;", " ")
        .replace("&amp;", "&")
}

fn clean(text: &str) -> Option<String> {
    let decoded = decode_entities(text);
    let collapsed = decoded.split_whitespace().collect::<Vec<_>>().join(" ");
    Some(collapsed).filter(|s| !s.is_empty())
}

/// Extract a preview from raw HTML.
///
/// Open Graph tags win over `<title>` and `<meta name="description">`.
pub fn extract_preview(html: &str) -> LinkPreview {
    let mut meta: HashMap<String, String> = HashMap::new();

    for tag in meta_tag_re().find_iter(html) {
        let mut attrs: HashMap<String, String> = HashMap::new();
        for cap in attr_re().captures_iter(tag.as_str()) {
            let value = cap
                .get(2)
                .or_else(|| cap.get(3))
                .map(|m| m.as_str())
                .unwrap_or_default();
            attrs.insert(cap[1].to_ascii_lowercase(), value.to_string());
        }

        let key = attrs.get("property").or_else(|| attrs.get("name"));
        if let (Some(key), Some(content)) = (key, attrs.get("content")) {
            meta.entry(key.to_ascii_lowercase())
                .or_insert_with(|| content.clone());
        }
    }

    let pick = |keys: &[&str]| keys.iter().find_map(|k| meta.get(*k).and_then(|v| clean(v)));

    let title = pick(&["og:title", "twitter:title"]).or_else(|| {
        title_re()
            .captures(html)
            .and_then(|c| c.get(1))
            .and_then(|m| clean(m.as_str()))
    });
    let description = pick(&["og:description", "description", "twitter:description"]);

    LinkPreview { title, description }
}

/// Fill absent title/description fields. Returns whether anything changed.
pub fn apply_preview(metadata: &mut ElementMetadata, preview: &LinkPreview) -> bool {
    let mut changed = false;
    if metadata.title.is_none() {
        if let Some(title) = &preview.title {
            metadata.title = Some(title.clone());
            changed = true;
        }
    }
    if metadata.description.is_none() {
        if let Some(description) = &preview.description {
            metadata.description = Some(description.clone());
            changed = true;
        }
    }
    changed
}

/// Fetch a page (up to `max_bytes`) and extract its preview.
pub async fn fetch_preview(url: &str, config: &LinkPreviewConfig) -> anyhow::Result<LinkPreview> {
    if !(url.starts_with("http://") || url.starts_with("https://")) {
        anyhow::bail!("unsupported url scheme: {}", url);
    }

    let client = reqwest::Client::builder()
        .timeout(Duration::from_secs(config.timeout_seconds))
        .user_agent(concat!("spark-link-preview/", env!("CARGO_PKG_VERSION")))
        .build()?;

    let mut response = client.get(url).send().await?;

    if !response.status().is_success() {
        anyhow::bail!("link preview fetch returned {}", response.status());
    }

    let is_html = response
        .headers()
        .get(reqwest::header::CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .map(|ct| ct.contains("html"))
        .unwrap_or(true);
    if !is_html {
        return Ok(LinkPreview::default());
    }

    let mut body: Vec<u8> = Vec::new();
    while let Some(chunk) = response.chunk().await? {
        body.extend_from_slice(&chunk);
        if body.len() >= config.max_bytes {
            body.truncate(config.max_bytes);
            break;
        }
    }

    Ok(extract_preview(&String::from_utf8_lossy(&body)))
}

/// Fetch a preview for `url` and merge it into the element's metadata.
///
/// Returns Ok(true) if metadata was updated.
pub async fn enrich_element(
    id: Uuid,
    url: &str,
    pool: &PgPool,
    config: &LinkPreviewConfig,
) -> anyhow::Result<bool> {
    let preview = fetch_preview(url, config).await?;
    if preview.is_empty() {
        return Ok(false);
    }

    let row: Option<ElementRow> = sqlx::query_as(
        "SELECT id, user_id, idea_id, type, source, content, metadata, is_archived, created_at
         FROM elements WHERE id = $1",
    )
    .bind(id)
    .fetch_optional(pool)
    .await?;

    let Some(row) = row else {
        tracing::debug!(id = %id, "Element gone before link preview finished");
        return Ok(false);
    };

    let mut metadata = ElementMetadata::from_value(&row.metadata);
    if !apply_preview(&mut metadata, &preview) {
        return Ok(false);
    }

    elements::write_metadata(pool, id, &metadata).await?;
    Ok(true)
}

/// Spawn an async task to enrich an article element with its link preview.
pub fn spawn_preview_task(id: Uuid, url: String, pool: PgPool, config: LinkPreviewConfig) {
    tokio::spawn(async move {
        match enrich_element(id, &url, &pool, &config).await {
            Ok(true) => tracing::info!(id = %id, "Link preview stored"),
            Ok(false) => tracing::debug!(id = %id, "Link preview had nothing to add"),
            Err(e) => tracing::warn!(id = %id, url = %url, error = %e, "Link preview failed"),
        }
    });
}
