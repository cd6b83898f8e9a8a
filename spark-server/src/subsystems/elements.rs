//! Elements subsystem — captured notes, links, images, files and AI output
//!
//! Metadata is normalised to canonical keys on the way in, so rows written
//! by this service never carry `public_url` / `file_name`. Rows written by
//! older clients are normalised when loaded (see `ElementMetadata`).

use spark_core::api::{ElementChanges, NewElement};
use spark_core::error::Result;
use spark_core::models::{Element, ElementMetadata, ElementRow, ElementSource, ElementType};
use spark_core::SparkError;
use sqlx::{PgConnection, PgPool};
use uuid::Uuid;

use crate::context::SparkContext;
use crate::subsystems::{ideas, link_preview};

const ELEMENT_COLUMNS: &str =
    "id, user_id, idea_id, type, source, content, metadata, is_archived, created_at";

/// Validated capture ready to insert.
#[derive(Debug, Clone, PartialEq)]
pub struct ValidCapture {
    pub element_type: ElementType,
    pub content: Option<String>,
    pub metadata: ElementMetadata,
}

/// Check a capture request and normalise its content and metadata.
///
/// Only user-capturable types are accepted, and the element must carry
/// something: text, a URL, or an attachment name.
pub fn validate_capture(new: &NewElement) -> Result<ValidCapture> {
    if !new.element_type.is_user_capturable() {
        return Err(SparkError::Invalid(format!(
            "elements of type '{}' cannot be captured directly",
            new.element_type
        )));
    }

    let content = new
        .content
        .as_deref()
        .map(str::trim)
        .filter(|c| !c.is_empty())
        .map(str::to_string);
    let metadata = ElementMetadata::from_value(&new.metadata);

    if content.is_none() && metadata.url.is_none() && metadata.filename.is_none() {
        return Err(SparkError::Invalid(
            "element needs content, a url, or a filename".into(),
        ));
    }

    if new.element_type == ElementType::Article && metadata.url.is_none() {
        return Err(SparkError::Invalid("article elements need a url".into()));
    }

    Ok(ValidCapture {
        element_type: new.element_type,
        content,
        metadata,
    })
}

/// Values an element update will write.
#[derive(Debug, Clone, PartialEq)]
pub struct ElementPatch {
    pub idea_id: Option<Uuid>,
    pub metadata: ElementMetadata,
    pub is_archived: bool,
}

/// Merge requested changes into an element.
pub fn apply_element_changes(element: &Element, changes: &ElementChanges) -> ElementPatch {
    let idea_id = if changes.unfile {
        None
    } else {
        changes.idea_id.or(element.idea_id)
    };

    let mut metadata = element.metadata.clone();
    if let Some(note) = changes.note.as_deref() {
        metadata.note = Some(note.trim().to_string()).filter(|n| !n.is_empty());
    }

    ElementPatch {
        idea_id,
        metadata,
        is_archived: changes.is_archived.unwrap_or(element.is_archived),
    }
}

/// Insert an element row. Used for captures as well as AI output.
pub async fn insert_element(
    pool: &PgPool,
    user_id: Uuid,
    idea_id: Option<Uuid>,
    element_type: ElementType,
    source: ElementSource,
    content: Option<&str>,
    metadata: &ElementMetadata,
) -> Result<Element> {
    let row: ElementRow = sqlx::query_as(&format!(
        "INSERT INTO elements (user_id, idea_id, type, source, content, metadata)
         VALUES ($1, $2, $3, $4, $5, $6)
         RETURNING {}",
        ELEMENT_COLUMNS
    ))
    .bind(user_id)
    .bind(idea_id)
    .bind(element_type.as_str())
    .bind(source.as_str())
    .bind(content)
    .bind(metadata.to_value())
    .fetch_one(pool)
    .await?;

    tracing::info!(
        id = %row.id,
        element_type = %element_type,
        source = source.as_str(),
        "Inserted element"
    );
    Ok(row.into())
}

/// Capture a user element, optionally filed under an idea.
///
/// Articles with a URL get a background link preview fetch.
pub async fn capture_element(ctx: &SparkContext, user_id: Uuid, new: NewElement) -> Result<Element> {
    let capture = validate_capture(&new)?;

    if let Some(idea_id) = new.idea_id {
        ideas::get_idea(&ctx.pool, user_id, idea_id).await?;
    }

    let element = insert_element(
        &ctx.pool,
        user_id,
        new.idea_id,
        capture.element_type,
        ElementSource::User,
        capture.content.as_deref(),
        &capture.metadata,
    )
    .await?;

    if element.element_type == ElementType::Article && ctx.config.link_preview.enabled {
        if let Some(url) = element.metadata.url.clone() {
            link_preview::spawn_preview_task(
                element.id,
                url,
                ctx.pool.clone(),
                ctx.config.link_preview.clone(),
            );
        }
    }

    Ok(element)
}

pub async fn get_element(pool: &PgPool, user_id: Uuid, id: Uuid) -> Result<Element> {
    let row: Option<ElementRow> = sqlx::query_as(&format!(
        "SELECT {} FROM elements WHERE id = $1 AND user_id = $2",
        ELEMENT_COLUMNS
    ))
    .bind(id)
    .bind(user_id)
    .fetch_optional(pool)
    .await?;

    row.map(Element::from)
        .ok_or_else(|| SparkError::NotFound(format!("Element {}", id)))
}

/// Non-archived elements of an idea, newest first.
pub async fn list_idea_elements(pool: &PgPool, user_id: Uuid, idea_id: Uuid) -> Result<Vec<Element>> {
    ideas::get_idea(pool, user_id, idea_id).await?;

    let rows: Vec<ElementRow> = sqlx::query_as(&format!(
        "SELECT {} FROM elements
         WHERE idea_id = $1 AND user_id = $2 AND NOT is_archived
         ORDER BY created_at DESC",
        ELEMENT_COLUMNS
    ))
    .bind(idea_id)
    .bind(user_id)
    .fetch_all(pool)
    .await?;

    Ok(rows.into_iter().map(Element::from).collect())
}

/// Unfiled, non-archived elements awaiting triage, newest first.
pub async fn list_inbox(pool: &PgPool, user_id: Uuid) -> Result<Vec<Element>> {
    let rows: Vec<ElementRow> = sqlx::query_as(&format!(
        "SELECT {} FROM elements
         WHERE idea_id IS NULL AND user_id = $1 AND NOT is_archived
         ORDER BY created_at DESC",
        ELEMENT_COLUMNS
    ))
    .bind(user_id)
    .fetch_all(pool)
    .await?;

    Ok(rows.into_iter().map(Element::from).collect())
}

pub async fn update_element(
    pool: &PgPool,
    user_id: Uuid,
    id: Uuid,
    changes: &ElementChanges,
) -> Result<Element> {
    let element = get_element(pool, user_id, id).await?;
    let patch = apply_element_changes(&element, changes);

    if let Some(idea_id) = patch.idea_id {
        if Some(idea_id) != element.idea_id {
            ideas::get_idea(pool, user_id, idea_id).await?;
        }
    }

    let row: ElementRow = sqlx::query_as(&format!(
        "UPDATE elements SET idea_id = $1, metadata = $2, is_archived = $3
         WHERE id = $4 AND user_id = $5
         RETURNING {}",
        ELEMENT_COLUMNS
    ))
    .bind(patch.idea_id)
    .bind(patch.metadata.to_value())
    .bind(patch.is_archived)
    .bind(id)
    .bind(user_id)
    .fetch_one(pool)
    .await?;

    tracing::debug!(id = %id, idea_id = ?patch.idea_id, "Updated element");
    Ok(row.into())
}

/// File an inbox element under `idea_id`. Returns None when the element is
/// missing or already filed.
pub async fn file_unfiled_element(
    conn: &mut PgConnection,
    user_id: Uuid,
    id: Uuid,
    idea_id: Uuid,
) -> Result<Option<Element>> {
    let row: Option<ElementRow> = sqlx::query_as(&format!(
        "UPDATE elements SET idea_id = $1
         WHERE id = $2 AND user_id = $3 AND idea_id IS NULL
         RETURNING {}",
        ELEMENT_COLUMNS
    ))
    .bind(idea_id)
    .bind(id)
    .bind(user_id)
    .fetch_optional(conn)
    .await?;

    Ok(row.map(Element::from))
}

/// Overwrite an element's metadata (enrichment only; content never changes).
pub async fn write_metadata(pool: &PgPool, id: Uuid, metadata: &ElementMetadata) -> Result<()> {
    let result = sqlx::query("UPDATE elements SET metadata = $1 WHERE id = $2")
        .bind(metadata.to_value())
        .bind(id)
        .execute(pool)
        .await?;

    if result.rows_affected() == 0 {
        return Err(SparkError::NotFound(format!("Element {}", id)));
    }
    Ok(())
}

pub async fn delete_element(pool: &PgPool, user_id: Uuid, id: Uuid) -> Result<()> {
    let result = sqlx::query("DELETE FROM elements WHERE id = $1 AND user_id = $2")
        .bind(id)
        .bind(user_id)
        .execute(pool)
        .await?;

    if result.rows_affected() == 0 {
        return Err(SparkError::NotFound(format!("Element {}", id)));
    }

    tracing::info!(id = %id, "Deleted element");
    Ok(())
}
