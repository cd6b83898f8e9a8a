//! Scouts subsystem — topic provocations that land in the inbox
//!
//! The LLM is asked for a JSON array of `{title, provocation}` objects. Models
//! do not always comply, so parsing first looks for the outermost `[...]`
//! slice and falls back to one scout per non-empty line.
//!
//! Scouts are stored as unfiled `scout` elements (`source = ai`) carrying
//! `title` and `topic` in their metadata. Converting a scout creates an idea
//! titled after it and files the scout under that idea, both in one
//! transaction. Only inbox scouts can be converted.

use serde::{Deserialize, Serialize};
use spark_core::error::Result;
use spark_core::models::{Element, ElementMetadata, ElementSource, ElementType, Idea};
use spark_core::prompt::templates::{scout_prompt, SCOUT_SYSTEM_PROMPT};
use spark_core::{LlmRequest, SparkError};
use uuid::Uuid;

use crate::context::SparkContext;
use crate::subsystems::{elements, ideas};

/// Upper bound on scouts per request.
pub const MAX_SCOUTS: usize = 10;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScoutDraft {
    pub title: String,
    pub provocation: String,
}

#[derive(Debug, Serialize)]
pub struct ConvertedScout {
    pub idea: Idea,
    pub element: Element,
}

fn first_words(text: &str, n: usize) -> String {
    text.split_whitespace().take(n).collect::<Vec<_>>().join(" ")
}

fn strip_list_marker(line: &str) -> &str {
    let line = line.trim();
    let line = line.trim_start_matches(['-', '*', '•']);
    let digits = line.trim_start_matches(|c: char| c.is_ascii_digit());
    let line = if digits.len() < line.len() {
        digits.trim_start_matches(['.', ')'])
    } else {
        line
    };
    line.trim()
}

fn from_line(line: &str) -> Option<ScoutDraft> {
    let line = strip_list_marker(line);
    if line.is_empty() || line.starts_with('[') || line.starts_with(']') || line.starts_with("```") {
        return None;
    }

    let (title, provocation) = match line.split_once(": ") {
        Some((title, rest)) if !rest.trim().is_empty() && title.split_whitespace().count() <= 8 => {
            (title.trim_matches('*').trim().to_string(), rest.trim().to_string())
        }
        _ => (first_words(line, 6), line.to_string()),
    };

    Some(ScoutDraft { title, provocation })
}

/// Parse an LLM scout response into at most `count` drafts.
pub fn parse_scouts(text: &str, count: usize) -> Vec<ScoutDraft> {
    let json_slice = match (text.find('['), text.rfind(']')) {
        (Some(start), Some(end)) if start < end => Some(&text[start..=end]),
        _ => None,
    };

    let parsed = json_slice
        .and_then(|slice| serde_json::from_str::<Vec<ScoutDraft>>(slice).ok())
        .map(|drafts| {
            drafts
                .into_iter()
                .filter_map(|d| {
                    let provocation = d.provocation.trim().to_string();
                    if provocation.is_empty() {
                        return None;
                    }
                    let title = Some(d.title.trim().to_string())
                        .filter(|t| !t.is_empty())
                        .unwrap_or_else(|| first_words(&provocation, 6));
                    Some(ScoutDraft { title, provocation })
                })
                .collect::<Vec<_>>()
        });

    let drafts = match parsed {
        Some(drafts) if !drafts.is_empty() => drafts,
        _ => {
            tracing::debug!("Scout response was not a JSON array, falling back to lines");
            text.lines().filter_map(from_line).collect()
        }
    };

    drafts.into_iter().take(count).collect()
}

/// Ask the LLM for scouts on `topic` and store them in the inbox.
pub async fn generate_scouts(
    ctx: &SparkContext,
    user_id: Uuid,
    topic: &str,
    count: Option<usize>,
) -> Result<Vec<Element>> {
    let topic = topic.trim();
    if topic.is_empty() {
        return Err(SparkError::Invalid("topic cannot be empty".into()));
    }
    let count = count.unwrap_or(ctx.config.limits.scout_count).clamp(1, MAX_SCOUTS);

    let llm = ctx.llm()?;
    let request = LlmRequest {
        system: SCOUT_SYSTEM_PROMPT.to_string(),
        user: scout_prompt(topic, count),
        max_tokens: ctx.config.llm.scout_max_tokens,
    };
    let text = llm.complete(&request).await?;

    let drafts = parse_scouts(&text, count);
    if drafts.is_empty() {
        tracing::warn!(topic, "Scout response contained no usable provocations");
        return Err(SparkError::Other("LLM returned no usable scouts".into()));
    }

    let mut stored = Vec::with_capacity(drafts.len());
    for draft in drafts {
        let mut metadata = ElementMetadata {
            title: Some(draft.title),
            ..Default::default()
        };
        metadata
            .extra
            .insert("topic".to_string(), serde_json::json!(topic));

        let element = elements::insert_element(
            &ctx.pool,
            user_id,
            None,
            ElementType::Scout,
            ElementSource::Ai,
            Some(&draft.provocation),
            &metadata,
        )
        .await?;
        stored.push(element);
    }

    tracing::info!(topic, count = stored.len(), "Generated scouts");
    Ok(stored)
}

/// Only an unfiled scout can become an idea.
pub fn ensure_convertible(element: &Element) -> Result<()> {
    if element.element_type != ElementType::Scout {
        return Err(SparkError::Invalid(format!("element {} is not a scout", element.id)));
    }
    if let Some(idea_id) = element.idea_id {
        return Err(SparkError::Invalid(format!(
            "scout {} is already filed under idea {}",
            element.id, idea_id
        )));
    }
    Ok(())
}

/// Idea title for a converted scout.
pub fn scout_idea_title(scout: &Element) -> String {
    let title = scout
        .metadata
        .title
        .clone()
        .or_else(|| scout.content().map(|c| first_words(c, 8)))
        .unwrap_or_else(|| "Untitled scout".to_string());
    title.chars().take(ideas::MAX_TITLE_CHARS).collect()
}

/// Promote a scout to an idea of its own.
pub async fn convert_scout(ctx: &SparkContext, user_id: Uuid, id: Uuid) -> Result<ConvertedScout> {
    let scout = elements::get_element(&ctx.pool, user_id, id).await?;
    ensure_convertible(&scout)?;
    let title = scout_idea_title(&scout);

    let mut tx = ctx.pool.begin().await?;
    let idea = ideas::create_idea_in(&mut tx, &ctx.config.limits, user_id, &title, None).await?;
    // Filed by a concurrent request since the check above; the rollback drops the idea
    let element = elements::file_unfiled_element(&mut tx, user_id, id, idea.id)
        .await?
        .ok_or_else(|| SparkError::Invalid(format!("scout {} is already filed", id)))?;
    tx.commit().await?;

    tracing::info!(scout_id = %id, idea_id = %idea.id, "Converted scout to idea");
    Ok(ConvertedScout { idea, element })
}
