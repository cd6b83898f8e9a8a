//! Ideas subsystem — the top-level containers elements are filed under
//!
//! Enforces the per-user cap on active ideas at creation and restore time.
//! Deleting an idea removes its elements through the `ON DELETE CASCADE`
//! foreign key.

use chrono::{DateTime, Utc};
use spark_core::config::LimitsConfig;
use spark_core::error::Result;
use spark_core::models::{Idea, IdeaRow, IdeaStatus};
use spark_core::SparkError;
use sqlx::{PgConnection, PgExecutor, PgPool};
use uuid::Uuid;

/// Maximum idea title length in characters
pub const MAX_TITLE_CHARS: usize = 200;

const IDEA_COLUMNS: &str = "id, user_id, title, current_thinking, current_thinking_updated_at, \
                            status, created_at, updated_at";

/// Trim and validate an idea title.
pub fn validate_title(title: &str) -> Result<String> {
    let title = title.trim();
    if title.is_empty() {
        return Err(SparkError::Invalid("title cannot be empty".into()));
    }
    if title.chars().count() > MAX_TITLE_CHARS {
        return Err(SparkError::Invalid(format!(
            "title cannot exceed {} characters",
            MAX_TITLE_CHARS
        )));
    }
    Ok(title.to_string())
}

/// Column values an update will write.
#[derive(Debug, Clone, PartialEq)]
pub struct IdeaUpdate {
    pub title: String,
    pub current_thinking: Option<String>,
    pub current_thinking_updated_at: Option<DateTime<Utc>>,
}

/// Merge a partial update into an existing idea.
///
/// `current_thinking` of `Some("")` clears it. The thinking timestamp only
/// moves when the thinking text actually changes.
pub fn apply_idea_update(
    existing: &Idea,
    title: Option<&str>,
    current_thinking: Option<&str>,
    now: DateTime<Utc>,
) -> Result<IdeaUpdate> {
    let title = match title {
        Some(t) => validate_title(t)?,
        None => existing.title.clone(),
    };

    let (thinking, thinking_at) = match current_thinking {
        None => (
            existing.current_thinking.clone(),
            existing.current_thinking_updated_at,
        ),
        Some(t) => {
            let new = Some(t.trim().to_string()).filter(|t| !t.is_empty());
            if new == existing.current_thinking {
                (new, existing.current_thinking_updated_at)
            } else {
                let at = new.as_ref().map(|_| now);
                (new, at)
            }
        }
    };

    Ok(IdeaUpdate {
        title,
        current_thinking: thinking,
        current_thinking_updated_at: thinking_at,
    })
}

pub async fn count_active<'e, E: PgExecutor<'e>>(executor: E, user_id: Uuid) -> Result<i64> {
    let row: (i64,) =
        sqlx::query_as("SELECT COUNT(*) FROM ideas WHERE user_id = $1 AND status = 'active'")
            .bind(user_id)
            .fetch_one(executor)
            .await?;
    Ok(row.0)
}

async fn ensure_below_limit(
    conn: &mut PgConnection,
    limits: &LimitsConfig,
    user_id: Uuid,
) -> Result<()> {
    let active = count_active(&mut *conn, user_id).await?;
    if active >= limits.max_active_ideas {
        tracing::info!(user_id = %user_id, active, "Active idea limit reached");
        return Err(SparkError::LimitReached {
            limit: limits.max_active_ideas,
        });
    }
    Ok(())
}

pub async fn create_idea(
    pool: &PgPool,
    limits: &LimitsConfig,
    user_id: Uuid,
    title: &str,
    current_thinking: Option<&str>,
) -> Result<Idea> {
    let mut conn = pool.acquire().await?;
    create_idea_in(&mut conn, limits, user_id, title, current_thinking).await
}

/// [`create_idea`] on a caller-held connection, so it can join a transaction.
pub async fn create_idea_in(
    conn: &mut PgConnection,
    limits: &LimitsConfig,
    user_id: Uuid,
    title: &str,
    current_thinking: Option<&str>,
) -> Result<Idea> {
    let title = validate_title(title)?;
    ensure_below_limit(&mut *conn, limits, user_id).await?;

    let thinking = current_thinking
        .map(str::trim)
        .filter(|t| !t.is_empty())
        .map(str::to_string);
    let thinking_at = thinking.as_ref().map(|_| Utc::now());

    let row: IdeaRow = sqlx::query_as(&format!(
        "INSERT INTO ideas (user_id, title, current_thinking, current_thinking_updated_at)
         VALUES ($1, $2, $3, $4)
         RETURNING {}",
        IDEA_COLUMNS
    ))
    .bind(user_id)
    .bind(&title)
    .bind(&thinking)
    .bind(thinking_at)
    .fetch_one(&mut *conn)
    .await?;

    tracing::info!(id = %row.id, user_id = %user_id, "Created idea");
    Ok(row.into())
}

pub async fn get_idea(pool: &PgPool, user_id: Uuid, id: Uuid) -> Result<Idea> {
    let row: Option<IdeaRow> = sqlx::query_as(&format!(
        "SELECT {} FROM ideas WHERE id = $1 AND user_id = $2",
        IDEA_COLUMNS
    ))
    .bind(id)
    .bind(user_id)
    .fetch_optional(pool)
    .await?;

    row.map(Idea::from)
        .ok_or_else(|| SparkError::NotFound(format!("Idea {}", id)))
}

pub async fn list_ideas(pool: &PgPool, user_id: Uuid, status: IdeaStatus) -> Result<Vec<Idea>> {
    let rows: Vec<IdeaRow> = sqlx::query_as(&format!(
        "SELECT {} FROM ideas WHERE user_id = $1 AND status = $2 ORDER BY updated_at DESC",
        IDEA_COLUMNS
    ))
    .bind(user_id)
    .bind(status.as_str())
    .fetch_all(pool)
    .await?;

    Ok(rows.into_iter().map(Idea::from).collect())
}

pub async fn update_idea(
    pool: &PgPool,
    user_id: Uuid,
    id: Uuid,
    title: Option<&str>,
    current_thinking: Option<&str>,
) -> Result<Idea> {
    let existing = get_idea(pool, user_id, id).await?;
    let update = apply_idea_update(&existing, title, current_thinking, Utc::now())?;

    let row: IdeaRow = sqlx::query_as(&format!(
        "UPDATE ideas
         SET title = $1, current_thinking = $2, current_thinking_updated_at = $3, updated_at = now()
         WHERE id = $4 AND user_id = $5
         RETURNING {}",
        IDEA_COLUMNS
    ))
    .bind(&update.title)
    .bind(&update.current_thinking)
    .bind(update.current_thinking_updated_at)
    .bind(id)
    .bind(user_id)
    .fetch_one(pool)
    .await?;

    tracing::debug!(id = %id, "Updated idea");
    Ok(row.into())
}

async fn set_status(pool: &PgPool, user_id: Uuid, id: Uuid, status: IdeaStatus) -> Result<Idea> {
    let row: Option<IdeaRow> = sqlx::query_as(&format!(
        "UPDATE ideas SET status = $1, updated_at = now()
         WHERE id = $2 AND user_id = $3
         RETURNING {}",
        IDEA_COLUMNS
    ))
    .bind(status.as_str())
    .bind(id)
    .bind(user_id)
    .fetch_optional(pool)
    .await?;

    row.map(Idea::from)
        .ok_or_else(|| SparkError::NotFound(format!("Idea {}", id)))
}

pub async fn archive_idea(pool: &PgPool, user_id: Uuid, id: Uuid) -> Result<Idea> {
    let idea = set_status(pool, user_id, id, IdeaStatus::Archived).await?;
    tracing::info!(id = %id, "Archived idea");
    Ok(idea)
}

/// Reactivate an archived idea, subject to the active idea cap.
pub async fn restore_idea(
    pool: &PgPool,
    limits: &LimitsConfig,
    user_id: Uuid,
    id: Uuid,
) -> Result<Idea> {
    let existing = get_idea(pool, user_id, id).await?;
    if existing.is_active() {
        return Ok(existing);
    }

    let mut conn = pool.acquire().await?;
    ensure_below_limit(&mut conn, limits, user_id).await?;
    drop(conn);
    let idea = set_status(pool, user_id, id, IdeaStatus::Active).await?;
    tracing::info!(id = %id, "Restored idea");
    Ok(idea)
}

/// Permanently delete an idea and, by cascade, its elements.
pub async fn delete_idea(pool: &PgPool, user_id: Uuid, id: Uuid) -> Result<()> {
    let result = sqlx::query("DELETE FROM ideas WHERE id = $1 AND user_id = $2")
        .bind(id)
        .bind(user_id)
        .execute(pool)
        .await?;

    if result.rows_affected() == 0 {
        return Err(SparkError::NotFound(format!("Idea {}", id)));
    }

    tracing::info!(id = %id, "Deleted idea");
    Ok(())
}
