//! Action id → instruction template table.
//!
//! Templates are data: defaults live in [`DEFAULT_TEMPLATES`] and any of them
//! can be replaced from the `[prompts]` config section without touching code.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SparkAction {
    Synthesize,
    Challenge,
    Expand,
    SoWhat,
    Summarize,
    GoDeeper,
}

impl SparkAction {
    pub const ALL: [SparkAction; 6] = [
        SparkAction::Synthesize,
        SparkAction::Challenge,
        SparkAction::Expand,
        SparkAction::SoWhat,
        SparkAction::Summarize,
        SparkAction::GoDeeper,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            SparkAction::Synthesize => "synthesize",
            SparkAction::Challenge => "challenge",
            SparkAction::Expand => "expand",
            SparkAction::SoWhat => "so_what",
            SparkAction::Summarize => "summarize",
            SparkAction::GoDeeper => "go_deeper",
        }
    }

    /// Parse an action id. Accepts `-` or `_` separators and any case.
    pub fn parse(id: &str) -> Option<Self> {
        let normalized = id.trim().to_ascii_lowercase().replace('-', "_");
        match normalized.as_str() {
            "synthesize" => Some(SparkAction::Synthesize),
            "challenge" => Some(SparkAction::Challenge),
            "expand" => Some(SparkAction::Expand),
            "so_what" | "sowhat" => Some(SparkAction::SoWhat),
            "summarize" => Some(SparkAction::Summarize),
            "go_deeper" | "deeper" => Some(SparkAction::GoDeeper),
            _ => None,
        }
    }

    /// Parse an action id that applies to a whole idea.
    pub fn parse_spark(id: &str) -> Option<Self> {
        Self::parse(id).filter(|a| !a.is_mini())
    }

    /// Parse an action id that applies to a single element.
    pub fn parse_mini(id: &str) -> Option<Self> {
        Self::parse(id).filter(SparkAction::is_mini)
    }

    /// Mini-sparks work on a single element rather than a whole idea.
    pub fn is_mini(&self) -> bool {
        matches!(self, SparkAction::Summarize | SparkAction::GoDeeper)
    }

    /// Metadata key a mini-spark result is stored under.
    pub fn metadata_key(&self) -> Option<&'static str> {
        match self {
            SparkAction::Summarize => Some("summary"),
            SparkAction::GoDeeper => Some("deeper"),
            _ => None,
        }
    }
}

/// Prompt used for any action id the registry does not recognise.
pub const GENERIC_PROMPT: &str = "Look at where this thinking stands right now. \
What do you think? Offer one honest, specific observation about it, not a list. \
End with a genuine question that moves the thinking forward.";

pub const DEFAULT_TEMPLATES: &[(SparkAction, &str)] = &[
    (
        SparkAction::Synthesize,
        "Synthesize: find the single thread that connects the collected elements \
and the current thinking. Name one focused insight that the pieces reveal together \
but none of them states alone. Do not list or summarize each element. \
End with a genuine question that tests whether the thread holds.",
    ),
    (
        SparkAction::Challenge,
        "Challenge: identify the weakest assumption in the current thinking and \
push on it. Make one focused counter-argument, grounded in the collected material \
where you can, rather than a list of objections. \
End with a genuine question the thinker has to answer to keep the idea standing.",
    ),
    (
        SparkAction::Expand,
        "Expand: take the idea one step further than the thinker has. Offer one \
focused adjacent direction, analogy, or implication they have not explored yet, \
not a menu of options. \
End with a genuine question that invites them to follow it.",
    ),
    (
        SparkAction::SoWhat,
        "So what: ask why this idea matters. Point to one focused consequence for \
the thinker, their work, or the people they care about, and name what would change \
if the idea were true. Do not list stakes. \
End with a genuine question about what they will do with it.",
    ),
    (
        SparkAction::Summarize,
        "Summarize this element in two or three sentences of plain prose. Capture \
the one focused point that makes it worth keeping, not a list of contents. \
End with a genuine question about how it might connect to the user's thinking.",
    ),
    (
        SparkAction::GoDeeper,
        "Go deeper on this element. Surface one focused idea hiding underneath it: \
a premise, a tension, or a consequence the surface does not show. Avoid lists. \
End with a genuine question that invites the user to dig further.",
    ),
];

/// System prompt for scout generation.
pub const SCOUT_SYSTEM_PROMPT: &str = "You are Spark's scout: you roam a topic and bring \
back provocations that make a curious person want to think. Each provocation is one or \
two sentences of plain prose, specific rather than generic, and ends with a question. \
Respond with JSON only: an array of objects with \"title\" (at most eight words) and \
\"provocation\" fields. No markdown, no commentary.";

/// User prompt asking for `count` scouts on `topic`.
pub fn scout_prompt(topic: &str, count: usize) -> String {
    format!(
        "Topic: {}\n\nReturn exactly {} provocations as a JSON array.",
        topic.trim(),
        count
    )
}

#[derive(Debug, Clone)]
pub struct TemplateRegistry {
    templates: HashMap<SparkAction, String>,
}

impl Default for TemplateRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl TemplateRegistry {
    pub fn new() -> Self {
        let templates = DEFAULT_TEMPLATES
            .iter()
            .map(|(action, text)| (*action, (*text).to_string()))
            .collect();
        Self { templates }
    }

    /// Defaults with per-action replacements; unknown ids are ignored.
    pub fn with_overrides(overrides: &HashMap<String, String>) -> Self {
        let mut registry = Self::new();
        for (id, text) in overrides {
            match SparkAction::parse(id) {
                Some(action) if !text.trim().is_empty() => {
                    registry.templates.insert(action, text.clone());
                }
                Some(_) => {
                    tracing::warn!(action = %id, "Ignoring empty prompt override");
                }
                None => {
                    tracing::warn!(action = %id, "Ignoring prompt override for unknown action");
                }
            }
        }
        registry
    }

    pub fn template(&self, action: SparkAction) -> &str {
        self.templates
            .get(&action)
            .map(String::as_str)
            .unwrap_or(GENERIC_PROMPT)
    }

    /// Whole-idea template; element-only actions get [`GENERIC_PROMPT`].
    pub fn spark_template(&self, id: &str) -> &str {
        match SparkAction::parse_spark(id) {
            Some(action) => self.template(action),
            None => GENERIC_PROMPT,
        }
    }

    /// Single-element template; whole-idea actions get [`GENERIC_PROMPT`].
    pub fn mini_template(&self, id: &str) -> &str {
        match SparkAction::parse_mini(id) {
            Some(action) => self.template(action),
            None => GENERIC_PROMPT,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_every_action_has_a_default() {
        let registry = TemplateRegistry::new();
        for action in SparkAction::ALL {
            assert_ne!(registry.template(action), GENERIC_PROMPT, "{:?}", action);
        }
    }

    #[test]
    fn test_templates_demand_one_insight_and_a_question() {
        for (action, text) in DEFAULT_TEMPLATES {
            assert!(text.contains("one focused"), "{:?} must ask for one insight", action);
            assert!(text.contains("genuine question"), "{:?} must end on a question", action);
        }
        assert!(GENERIC_PROMPT.contains("genuine question"));
    }

    #[test]
    fn test_unknown_action_falls_back_to_generic() {
        let registry = TemplateRegistry::new();
        assert_eq!(registry.spark_template("reticulate"), GENERIC_PROMPT);
        assert_eq!(registry.mini_template(""), GENERIC_PROMPT);
    }

    #[test]
    fn test_parse_accepts_dashes_and_case() {
        assert_eq!(SparkAction::parse("so-what"), Some(SparkAction::SoWhat));
        assert_eq!(SparkAction::parse("So_What"), Some(SparkAction::SoWhat));
        assert_eq!(SparkAction::parse(" Challenge "), Some(SparkAction::Challenge));
        assert_eq!(SparkAction::parse("deeper"), Some(SparkAction::GoDeeper));
    }

    #[test]
    fn test_as_str_parses_back() {
        for action in SparkAction::ALL {
            assert_eq!(SparkAction::parse(action.as_str()), Some(action));
        }
    }

    #[test]
    fn test_overrides_replace_known_actions_only() {
        let mut overrides = HashMap::new();
        overrides.insert("challenge".to_string(), "Argue with me.".to_string());
        overrides.insert("reticulate".to_string(), "ignored".to_string());
        overrides.insert("expand".to_string(), "   ".to_string());

        let registry = TemplateRegistry::with_overrides(&overrides);
        assert_eq!(registry.template(SparkAction::Challenge), "Argue with me.");
        assert_eq!(registry.spark_template("reticulate"), GENERIC_PROMPT);
        assert_ne!(registry.template(SparkAction::Expand), "   ");
    }

    #[test]
    fn test_mini_actions() {
        assert!(SparkAction::Summarize.is_mini());
        assert!(SparkAction::GoDeeper.is_mini());
        assert!(!SparkAction::Synthesize.is_mini());
        assert_eq!(SparkAction::Summarize.metadata_key(), Some("summary"));
        assert_eq!(SparkAction::Challenge.metadata_key(), None);
    }

    #[test]
    fn test_scoped_lookup_keeps_actions_in_their_lane() {
        let registry = TemplateRegistry::new();
        assert_eq!(registry.spark_template("summarize"), GENERIC_PROMPT);
        assert_eq!(registry.spark_template("go-deeper"), GENERIC_PROMPT);
        assert_eq!(registry.spark_template("challenge"), registry.template(SparkAction::Challenge));
        assert_eq!(registry.mini_template("challenge"), GENERIC_PROMPT);
        assert_eq!(registry.mini_template("summarize"), registry.template(SparkAction::Summarize));
        assert_eq!(SparkAction::parse_spark("summarize"), None);
        assert_eq!(SparkAction::parse_mini("so_what"), None);
    }

    #[test]
    fn test_scout_prompt_mentions_topic_and_count() {
        let prompt = scout_prompt("  urban beekeeping ", 3);
        assert!(prompt.starts_with("Topic: urban beekeeping\n"));
        assert!(prompt.contains("exactly 3 provocations"));
    }
}
