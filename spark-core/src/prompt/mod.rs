//! Prompt assembly pipeline.
//!
//! Pure string transformations from an idea snapshot to the prompts sent to
//! the LLM. Nothing in here touches storage or the network, and nothing in
//! here can fail: every lookup has a defined default.

pub mod context;
pub mod metadata;
pub mod summary;
pub mod system;
pub mod templates;

pub use context::{build_element_context, element_context};
pub use metadata::{resolve_filename, resolve_url};
pub use summary::build_elements_summary;
pub use system::{compose_system_prompt, IdeaContext};
pub use templates::{SparkAction, TemplateRegistry, GENERIC_PROMPT};

use crate::models::{Element, Idea};

/// The pair of prompts sent to the LLM for one request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PromptPair {
    pub system: String,
    pub user: String,
}

/// Build the prompts for a whole-idea spark.
///
/// `action_id` is looked up in `registry`; unknown and element-only ids get
/// the generic prompt.
pub fn build_spark_prompts(
    idea: &Idea,
    elements: &[Element],
    action_id: &str,
    registry: &TemplateRegistry,
) -> PromptPair {
    let summary = build_elements_summary(elements);
    let system = compose_system_prompt(&IdeaContext {
        title: &idea.title,
        current_thinking: idea.thinking(),
        elements_summary: &summary,
        element_count: elements.len(),
    });

    PromptPair {
        system,
        user: registry.spark_template(action_id).to_string(),
    }
}

/// Build the prompts for a single-element mini-spark.
///
/// Whole-idea actions get the generic prompt, since the element context
/// carries no idea or thinking.
pub fn build_mini_spark_prompts(
    element: &Element,
    action_id: &str,
    registry: &TemplateRegistry,
) -> PromptPair {
    let context = element_context(element);
    let template = registry.mini_template(action_id);
    let user = if context.is_empty() {
        template.to_string()
    } else {
        format!("{}\n\nELEMENT ({}):\n{}", template, element.element_type, context)
    };

    PromptPair {
        system: system::SPARK_PREAMBLE.to_string(),
        user,
    }
}
