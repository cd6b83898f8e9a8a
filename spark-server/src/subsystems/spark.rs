//! Spark subsystem — whole-idea LLM responses
//!
//! This subsystem implements `SparkRequest::Spark`:
//! - Loads the idea and its non-archived elements
//! - Builds the system prompt (preamble + idea context + maturity hint) and
//!   the action template
//! - Calls the LLM once
//! - Optionally writes the response back as a `spark` element (`source = ai`)
//!
//! Concurrent sparks on the same idea are not coordinated; each one simply
//! adds its own element.

use serde::Serialize;
use spark_core::error::Result;
use spark_core::models::{Element, ElementMetadata, ElementSource, ElementType, Idea};
use spark_core::prompt::{build_spark_prompts, SparkAction};
use spark_core::{LlmBackend, LlmRequest, SparkError, TemplateRegistry};
use uuid::Uuid;

use crate::context::SparkContext;
use crate::subsystems::{elements, ideas};

/// Stored `spark_type` for ids the registry does not recognise.
pub const GENERIC_SPARK_TYPE: &str = "generic";

#[derive(Debug, Serialize)]
pub struct SparkOutcome {
    pub idea_id: Uuid,
    pub spark_type: String,
    pub text: String,
    pub element: Option<Element>,
}

/// Canonical action id for storage, or [`GENERIC_SPARK_TYPE`] for unknown
/// and element-only ids.
pub fn canonical_spark_type(spark_type: &str) -> &'static str {
    SparkAction::parse_spark(spark_type)
        .map(|a| a.as_str())
        .unwrap_or(GENERIC_SPARK_TYPE)
}

/// Build the prompts for `idea` and ask the LLM for a spark.
pub async fn generate_spark(
    llm: &dyn LlmBackend,
    registry: &TemplateRegistry,
    idea: &Idea,
    elements: &[Element],
    spark_type: &str,
    max_tokens: u32,
) -> Result<String> {
    let prompts = build_spark_prompts(idea, elements, spark_type, registry);

    tracing::debug!(
        idea_id = %idea.id,
        spark_type,
        elements = elements.len(),
        system_chars = prompts.system.len(),
        "Requesting spark"
    );

    let request = LlmRequest {
        system: prompts.system,
        user: prompts.user,
        max_tokens,
    };

    match llm.complete(&request).await {
        Ok(text) => Ok(text),
        Err(e) => {
            tracing::error!(idea_id = %idea.id, backend = llm.name(), error = %e, "Spark generation failed");
            Err(e.into())
        }
    }
}

/// Run a spark on an idea, saving the response as an element when `save`.
pub async fn run_spark(
    ctx: &SparkContext,
    user_id: Uuid,
    idea_id: Uuid,
    spark_type: &str,
    save: bool,
) -> Result<SparkOutcome> {
    let idea = ideas::get_idea(&ctx.pool, user_id, idea_id).await?;
    if !idea.is_active() {
        return Err(SparkError::Invalid("archived ideas cannot be sparked".into()));
    }

    let llm = ctx.llm()?;
    let collected = elements::list_idea_elements(&ctx.pool, user_id, idea_id).await?;

    let text = generate_spark(
        llm,
        &ctx.templates,
        &idea,
        &collected,
        spark_type,
        ctx.config.llm.max_tokens,
    )
    .await?;

    let stored_type = canonical_spark_type(spark_type);

    let element = if save {
        let mut metadata = ElementMetadata::default();
        metadata
            .extra
            .insert("spark_type".to_string(), serde_json::json!(stored_type));

        Some(
            elements::insert_element(
                &ctx.pool,
                user_id,
                Some(idea_id),
                ElementType::Spark,
                ElementSource::Ai,
                Some(&text),
                &metadata,
            )
            .await?,
        )
    } else {
        None
    };

    tracing::info!(
        idea_id = %idea_id,
        spark_type = stored_type,
        saved = element.is_some(),
        "Spark completed"
    );

    Ok(SparkOutcome {
        idea_id,
        spark_type: stored_type.to_string(),
        text,
        element,
    })
}
