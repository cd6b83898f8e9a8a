use std::sync::Arc;

use spark_core::error::Result;
use spark_core::{LlmBackend, SparkConfig, SparkError, TemplateRegistry};
use sqlx::PgPool;

/// Everything a request handler needs: storage, config, LLM and templates.
#[derive(Clone)]
pub struct SparkContext {
    pub pool: PgPool,
    pub config: SparkConfig,
    pub llm: Option<Arc<dyn LlmBackend>>,
    pub templates: Arc<TemplateRegistry>,
}

impl SparkContext {
    /// Build a context, creating the LLM backend from config.
    ///
    /// A backend that cannot be created (e.g. no API key) is logged and left
    /// unset; LLM-backed requests then fail with `Unavailable` while the rest
    /// of the API keeps working.
    pub fn new(pool: PgPool, config: SparkConfig) -> Self {
        let llm: Option<Arc<dyn LlmBackend>> = match spark_core::create_backend(&config) {
            Ok(backend) => {
                tracing::info!(backend = backend.name(), model = %config.llm.model, "LLM backend ready");
                Some(Arc::from(backend))
            }
            Err(e) => {
                tracing::warn!("LLM backend unavailable: {}", e);
                None
            }
        };
        Self::with_llm(pool, config, llm)
    }

    pub fn with_llm(pool: PgPool, config: SparkConfig, llm: Option<Arc<dyn LlmBackend>>) -> Self {
        let templates = Arc::new(TemplateRegistry::with_overrides(&config.prompts));
        Self {
            pool,
            config,
            llm,
            templates,
        }
    }

    pub fn llm(&self) -> Result<&dyn LlmBackend> {
        self.llm.as_deref().ok_or_else(|| {
            SparkError::Unavailable("LLM backend is not configured (check ANTHROPIC_API_KEY)".into())
        })
    }
}
