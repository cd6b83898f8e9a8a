//! Request/response envelope shared by the router and the HTTP layer.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::SparkError;
use crate::models::{ElementType, IdeaStatus};

fn default_true() -> bool {
    true
}

/// Fields accepted when a user captures an element.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewElement {
    pub idea_id: Option<Uuid>,
    #[serde(rename = "type")]
    pub element_type: ElementType,
    pub content: Option<String>,
    #[serde(default)]
    pub metadata: serde_json::Value,
}

/// Partial update of an element. Absent fields are left alone.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ElementChanges {
    /// File the element under this idea.
    pub idea_id: Option<Uuid>,
    /// Move the element back to the inbox. Wins over `idea_id`.
    #[serde(default)]
    pub unfile: bool,
    /// New user note; an empty string clears it.
    pub note: Option<String>,
    pub is_archived: Option<bool>,
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(tag = "action", rename_all = "snake_case")]
pub enum SparkRequest {
    Ping,
    Health,
    ListIdeas {
        user_id: Uuid,
        status: Option<IdeaStatus>,
    },
    GetIdea {
        user_id: Uuid,
        id: Uuid,
    },
    CreateIdea {
        user_id: Uuid,
        title: String,
        current_thinking: Option<String>,
    },
    UpdateIdea {
        user_id: Uuid,
        id: Uuid,
        title: Option<String>,
        /// An empty string clears the current thinking.
        current_thinking: Option<String>,
    },
    ArchiveIdea {
        user_id: Uuid,
        id: Uuid,
    },
    RestoreIdea {
        user_id: Uuid,
        id: Uuid,
    },
    DeleteIdea {
        user_id: Uuid,
        id: Uuid,
    },
    /// Elements of an idea, or the inbox when `idea_id` is `None`.
    ListElements {
        user_id: Uuid,
        idea_id: Option<Uuid>,
    },
    CaptureElement {
        user_id: Uuid,
        element: NewElement,
    },
    UpdateElement {
        user_id: Uuid,
        id: Uuid,
        changes: ElementChanges,
    },
    DeleteElement {
        user_id: Uuid,
        id: Uuid,
    },
    Spark {
        user_id: Uuid,
        idea_id: Uuid,
        spark_type: String,
        #[serde(default = "default_true")]
        save: bool,
    },
    MiniSpark {
        user_id: Uuid,
        element_id: Uuid,
        /// Mini-spark action id; the envelope tag already uses `action`.
        mini_action: String,
    },
    GenerateScouts {
        user_id: Uuid,
        topic: String,
        count: Option<usize>,
    },
    ConvertScout {
        user_id: Uuid,
        id: Uuid,
    },
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct SparkResponse {
    pub status: String,
    pub data: Option<serde_json::Value>,
    pub error: Option<String>,
    /// HTTP-style status code for errors.
    pub code: Option<u16>,
    pub version: String,
}

impl SparkResponse {
    pub fn ok(data: serde_json::Value) -> Self {
        Self {
            status: "ok".to_string(),
            data: Some(data),
            error: None,
            code: None,
            version: env!("CARGO_PKG_VERSION").to_string(),
        }
    }

    pub fn err(msg: impl Into<String>) -> Self {
        Self {
            status: "error".to_string(),
            data: None,
            error: Some(msg.into()),
            code: Some(500),
            version: env!("CARGO_PKG_VERSION").to_string(),
        }
    }

    pub fn from_error(error: &SparkError) -> Self {
        let mut resp = Self::err(error.to_string());
        resp.code = Some(error.status_code());
        resp
    }

    pub fn pong() -> Self {
        Self::ok(serde_json::json!({"pong": true}))
    }

    pub fn is_ok(&self) -> bool {
        self.status == "ok"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_spark_request_defaults_to_save() {
        let req: SparkRequest = serde_json::from_value(json!({
            "action": "spark",
            "user_id": Uuid::nil(),
            "idea_id": Uuid::nil(),
            "spark_type": "challenge"
        }))
        .unwrap();
        match req {
            SparkRequest::Spark { save, .. } => assert!(save),
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn test_mini_spark_request_carries_its_own_action() {
        let req: SparkRequest = serde_json::from_value(json!({
            "action": "mini_spark",
            "user_id": Uuid::nil(),
            "element_id": Uuid::nil(),
            "mini_action": "summarize"
        }))
        .unwrap();
        match req {
            SparkRequest::MiniSpark { mini_action, .. } => assert_eq!(mini_action, "summarize"),
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn test_new_element_uses_type_key() {
        let el: NewElement = serde_json::from_value(json!({
            "type": "article",
            "metadata": { "url": "https://example.com" }
        }))
        .unwrap();
        assert_eq!(el.element_type, ElementType::Article);
        assert!(el.idea_id.is_none());
        assert!(el.content.is_none());
    }

    #[test]
    fn test_error_response_carries_status_code() {
        let resp = SparkResponse::from_error(&SparkError::NotFound("Idea".into()));
        assert!(!resp.is_ok());
        assert_eq!(resp.code, Some(404));
        assert_eq!(resp.error.as_deref(), Some("Idea not found"));
    }

    #[test]
    fn test_pong() {
        let resp = SparkResponse::pong();
        assert!(resp.is_ok());
        assert_eq!(resp.data.unwrap()["pong"], true);
    }
}
