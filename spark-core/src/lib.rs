pub mod api;
pub mod config;
pub mod db;
pub mod error;
pub mod llm;
pub mod mock;
pub mod models;
pub mod prompt;

pub use api::{ElementChanges, NewElement, SparkRequest, SparkResponse};
pub use config::SparkConfig;
pub use error::SparkError;
pub use llm::{create_backend, AnthropicClient, AnthropicConfig, LlmBackend, LlmError, LlmRequest};
pub use models::{Element, ElementMetadata, ElementSource, ElementType, Idea, IdeaStatus};
pub use prompt::{PromptPair, SparkAction, TemplateRegistry};
