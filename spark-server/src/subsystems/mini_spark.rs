//! Mini-spark subsystem — single-element LLM actions
//!
//! A mini-spark sees one element only (its content, URL or attachment name),
//! never the rest of the idea. Results for `summarize` and `go_deeper` are
//! stored on the element's metadata; any other action id gets the generic
//! prompt and is returned without being stored.

use serde::Serialize;
use spark_core::error::Result;
use spark_core::models::{Element, ElementMetadata};
use spark_core::prompt::{build_mini_spark_prompts, SparkAction};
use spark_core::{LlmBackend, LlmRequest, TemplateRegistry};
use uuid::Uuid;

use crate::context::SparkContext;
use crate::subsystems::elements;

#[derive(Debug, Serialize)]
pub struct MiniSparkOutcome {
    pub element_id: Uuid,
    pub action: String,
    pub text: String,
    /// Metadata key the result was written to, if any.
    pub stored_as: Option<&'static str>,
}

pub async fn generate_mini_spark(
    llm: &dyn LlmBackend,
    registry: &TemplateRegistry,
    element: &Element,
    action: &str,
    max_tokens: u32,
) -> Result<String> {
    let prompts = build_mini_spark_prompts(element, action, registry);
    let request = LlmRequest {
        system: prompts.system,
        user: prompts.user,
        max_tokens,
    };

    llm.complete(&request).await.map_err(|e| {
        tracing::error!(element_id = %element.id, action, error = %e, "Mini-spark failed");
        e.into()
    })
}

/// Metadata with `text` stored under the action's key, or None if the
/// action's result is not kept.
pub fn store_result(metadata: &ElementMetadata, action: &str, text: &str) -> Option<(&'static str, ElementMetadata)> {
    let key = SparkAction::parse(action)?.metadata_key()?;
    let mut updated = metadata.clone();
    match key {
        "summary" => updated.summary = Some(text.to_string()),
        "deeper" => updated.deeper = Some(text.to_string()),
        other => {
            updated
                .extra
                .insert(other.to_string(), serde_json::json!(text));
        }
    }
    Some((key, updated))
}

pub async fn run_mini_spark(
    ctx: &SparkContext,
    user_id: Uuid,
    element_id: Uuid,
    action: &str,
) -> Result<MiniSparkOutcome> {
    let element = elements::get_element(&ctx.pool, user_id, element_id).await?;
    let llm = ctx.llm()?;

    let text = generate_mini_spark(llm, &ctx.templates, &element, action, ctx.config.llm.max_tokens).await?;

    let stored_as = match store_result(&element.metadata, action, &text) {
        Some((key, metadata)) => {
            elements::write_metadata(&ctx.pool, element_id, &metadata).await?;
            Some(key)
        }
        None => None,
    };

    tracing::info!(element_id = %element_id, action, stored = stored_as.is_some(), "Mini-spark completed");

    Ok(MiniSparkOutcome {
        element_id,
        action: action.to_string(),
        text,
        stored_as,
    })
}
