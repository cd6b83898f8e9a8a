use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IdeaStatus {
    Active,
    Archived,
}

impl IdeaStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            IdeaStatus::Active => "active",
            IdeaStatus::Archived => "archived",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "active" => Some(IdeaStatus::Active),
            "archived" => Some(IdeaStatus::Archived),
            _ => None,
        }
    }
}

/// Raw `ideas` row as stored in Postgres.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct IdeaRow {
    pub id: Uuid,
    pub user_id: Uuid,
    pub title: String,
    pub current_thinking: Option<String>,
    pub current_thinking_updated_at: Option<DateTime<Utc>>,
    pub status: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Idea {
    pub id: Uuid,
    pub user_id: Uuid,
    pub title: String,
    pub current_thinking: Option<String>,
    pub current_thinking_updated_at: Option<DateTime<Utc>>,
    pub status: IdeaStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Idea {
    pub fn is_active(&self) -> bool {
        self.status == IdeaStatus::Active
    }

    /// Current thinking, treating whitespace-only text as unwritten.
    pub fn thinking(&self) -> Option<&str> {
        self.current_thinking
            .as_deref()
            .map(str::trim)
            .filter(|t| !t.is_empty())
    }
}

impl From<IdeaRow> for Idea {
    fn from(row: IdeaRow) -> Self {
        let status = IdeaStatus::parse(&row.status).unwrap_or_else(|| {
            tracing::warn!(id = %row.id, status = %row.status, "Unknown idea status, treating as active");
            IdeaStatus::Active
        });
        Self {
            id: row.id,
            user_id: row.user_id,
            title: row.title,
            current_thinking: row.current_thinking,
            current_thinking_updated_at: row.current_thinking_updated_at,
            status,
            created_at: row.created_at,
            updated_at: row.updated_at,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn row(status: &str, thinking: Option<&str>) -> IdeaRow {
        let now = Utc::now();
        IdeaRow {
            id: Uuid::new_v4(),
            user_id: Uuid::new_v4(),
            title: "Cities as organisms".to_string(),
            current_thinking: thinking.map(str::to_string),
            current_thinking_updated_at: None,
            status: status.to_string(),
            created_at: now,
            updated_at: now,
        }
    }

    #[test]
    fn test_status_round_trips_through_row() {
        assert_eq!(Idea::from(row("archived", None)).status, IdeaStatus::Archived);
        assert!(Idea::from(row("active", None)).is_active());
    }

    #[test]
    fn test_unknown_status_defaults_to_active() {
        assert_eq!(Idea::from(row("frozen", None)).status, IdeaStatus::Active);
    }

    #[test]
    fn test_blank_thinking_counts_as_absent() {
        assert_eq!(Idea::from(row("active", Some("   "))).thinking(), None);
        assert_eq!(
            Idea::from(row("active", Some(" growth rings "))).thinking(),
            Some("growth rings")
        );
    }
}
