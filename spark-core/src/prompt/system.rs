//! System prompt assembly: preamble, idea context, maturity hint.

/// Fixed behavioural rules shared by every spark.
pub const SPARK_PREAMBLE: &str = "You are Spark, a warm provocateur who helps one person \
develop their thinking. You are curious, direct, and kind, never flattering.

Rules:
- Always end your response with a single genuine question the person has not asked themselves yet.
- Never be generic. Every sentence must refer to something specific in their idea or material.
- Write in plain prose only: no markdown, no headings, no bullet points, no bold.
- Keep responses under 150 words, in at most two short paragraphs.
- Offer one focused insight at a time rather than a list.";

/// Substituted when the idea has no current thinking yet.
pub const NO_THINKING_PLACEHOLDER: &str =
    "The user hasn't written their current thinking on this idea yet.";

/// Substituted when no elements have been collected.
pub const NO_ELEMENTS_PLACEHOLDER: &str =
    "No elements have been collected for this idea yet.";

/// Appended for ideas with three or fewer elements.
pub const EARLY_STAGE_NOTE: &str = "Note: this idea is at an early stage with very little \
collected material. Focus on clarifying what the person actually means and what drew them \
to it, rather than drawing conclusions.";

/// Appended for ideas with fifteen or more elements.
pub const SUBSTANTIAL_NOTE: &str = "Note: this idea has substantial material collected. \
Look for patterns, tensions, and connections across the elements rather than reacting to \
any single one.";

pub const EARLY_STAGE_MAX: usize = 3;
pub const SUBSTANTIAL_MIN: usize = 15;

/// Per-request inputs to [`compose_system_prompt`].
#[derive(Debug, Clone, Copy)]
pub struct IdeaContext<'a> {
    pub title: &'a str,
    pub current_thinking: Option<&'a str>,
    pub elements_summary: &'a str,
    pub element_count: usize,
}

/// Maturity hint for the given element count, if any.
pub fn maturity_hint(element_count: usize) -> Option<&'static str> {
    if element_count <= EARLY_STAGE_MAX {
        Some(EARLY_STAGE_NOTE)
    } else if element_count >= SUBSTANTIAL_MIN {
        Some(SUBSTANTIAL_NOTE)
    } else {
        None
    }
}

/// Preamble, then the context block, then the maturity hint.
pub fn compose_system_prompt(ctx: &IdeaContext<'_>) -> String {
    let thinking = ctx
        .current_thinking
        .map(str::trim)
        .filter(|t| !t.is_empty())
        .unwrap_or(NO_THINKING_PLACEHOLDER);

    let summary = if ctx.elements_summary.trim().is_empty() {
        NO_ELEMENTS_PLACEHOLDER
    } else {
        ctx.elements_summary
    };

    let mut prompt = String::with_capacity(
        SPARK_PREAMBLE.len() + ctx.title.len() + thinking.len() + summary.len() + 512,
    );

    prompt.push_str(SPARK_PREAMBLE);
    prompt.push_str("\n\n---\n\n");
    prompt.push_str(&format!("IDEA: \"{}\"\n\n", ctx.title));
    prompt.push_str("CURRENT THINKING:\n");
    prompt.push_str(thinking);
    prompt.push_str("\n\n");
    prompt.push_str(&format!("COLLECTED ELEMENTS ({}):\n", ctx.element_count));
    prompt.push_str(summary);

    if let Some(hint) = maturity_hint(ctx.element_count) {
        prompt.push_str("\n\n");
        prompt.push_str(hint);
    }

    prompt
}
