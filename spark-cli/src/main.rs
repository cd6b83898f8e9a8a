//! spark-cli — command-line frontend for the Spark HTTP API
//!
//! # Subcommands
//! - `status`                                      — show server health
//! - `ideas [--archived]`                          — list ideas
//! - `new <title> [--thinking <text>]`             — create an idea
//! - `spark <idea-id> <type> [--no-save] [--json]` — run a spark on an idea
//! - `scouts <topic> [-n <count>]`                 — generate scouts into the inbox
//!
//! Every command except `status` acts on behalf of `--user` (or
//! `SPARK_USER_ID`), sent to the server as the `x-spark-user` header.

use clap::{Parser, Subcommand};
use reqwest::blocking::{Client, RequestBuilder};
use serde::Deserialize;
use uuid::Uuid;

const DEFAULT_SERVER: &str = "http://127.0.0.1:8787";
const USER_HEADER: &str = "x-spark-user";
const DEFAULT_SCOUTS: usize = 3;

// ============================================================================
// CLI Definition
// ============================================================================

#[derive(Debug, Parser)]
#[command(name = "spark-cli", version, about = "Spark — develop your thinking from the terminal")]
struct Cli {
    /// Spark HTTP server URL (overrides SPARK_HTTP_URL env var)
    #[arg(long, env = "SPARK_HTTP_URL", default_value = DEFAULT_SERVER)]
    server: String,

    /// User id to act as (overrides SPARK_USER_ID env var)
    #[arg(long, env = "SPARK_USER_ID")]
    user: Option<Uuid>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// Show Spark server status
    Status,

    /// List ideas (active by default)
    Ideas {
        /// List archived ideas instead
        #[arg(long)]
        archived: bool,
    },

    /// Create a new idea
    New {
        /// Idea title
        title: String,

        /// Initial current thinking
        #[arg(long)]
        thinking: Option<String>,
    },

    /// Run a spark on an idea
    Spark {
        idea_id: Uuid,

        /// synthesize, challenge, expand, so_what (anything else gets the generic prompt)
        spark_type: String,

        /// Do not store the response as an element
        #[arg(long)]
        no_save: bool,

        /// Print the raw JSON response
        #[arg(long)]
        json: bool,
    },

    /// Generate scouts for a topic into the inbox
    Scouts {
        topic: String,

        #[arg(short = 'n', long, default_value_t = DEFAULT_SCOUTS)]
        count: usize,
    },
}

// ============================================================================
// API Response Types
// ============================================================================

#[derive(Debug, Deserialize)]
pub struct IdeaSummary {
    pub id: String,
    pub title: String,
    pub current_thinking: Option<String>,
    pub status: String,
}

#[derive(Debug, Deserialize)]
pub struct StoredElement {
    pub id: String,
    pub content: Option<String>,
    #[serde(default)]
    pub metadata: serde_json::Value,
}

#[derive(Debug, Deserialize)]
pub struct SparkResult {
    pub spark_type: String,
    pub text: String,
    pub element: Option<StoredElement>,
    pub took_ms: Option<u64>,
}

// ============================================================================
// Output formatting
// ============================================================================

/// "#" followed by the first 6 hex chars of a UUID string.
pub fn short_id(id: &str) -> String {
    let hex = id.replace('-', "");
    format!("#{}", &hex[..6.min(hex.len())])
}

fn first_line(text: &str, max_chars: usize) -> String {
    let line = text.lines().find(|l| !l.trim().is_empty()).unwrap_or("").trim();
    if line.chars().count() > max_chars {
        let cut: String = line.chars().take(max_chars).collect();
        format!("{}...", cut)
    } else {
        line.to_string()
    }
}

pub fn format_idea(idea: &IdeaSummary) -> String {
    let mut out = format!("{} {}", short_id(&idea.id), idea.title);
    if idea.status != "active" {
        out.push_str(&format!(" ({})", idea.status));
    }
    if let Some(thinking) = idea.current_thinking.as_deref().filter(|t| !t.trim().is_empty()) {
        out.push_str(&format!("\n    {}", first_line(thinking, 72)));
    }
    out
}

pub fn format_scout(scout: &StoredElement) -> String {
    let title = scout.metadata["title"].as_str().unwrap_or("Scout");
    let provocation = scout.content.as_deref().unwrap_or("");
    format!("{} {}\n    {}", short_id(&scout.id), title, provocation)
}

pub fn format_spark(result: &SparkResult) -> String {
    let mut out = format!("[{}]\n\n{}\n", result.spark_type, result.text.trim());
    match &result.element {
        Some(element) => out.push_str(&format!("\nSaved as {}", short_id(&element.id))),
        None => out.push_str("\nNot saved"),
    }
    if let Some(ms) = result.took_ms {
        out.push_str(&format!(" ({} ms)", ms));
    }
    out
}

// ============================================================================
// HTTP Client Calls
// ============================================================================

struct Api {
    client: Client,
    server: String,
    user: Option<Uuid>,
}

impl Api {
    fn new(server: &str, user: Option<Uuid>, timeout_secs: u64) -> anyhow::Result<Self> {
        let client = Client::builder()
            .timeout(std::time::Duration::from_secs(timeout_secs))
            .build()?;
        Ok(Self {
            client,
            server: server.trim_end_matches('/').to_string(),
            user,
        })
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.server, path)
    }

    fn authed(&self, builder: RequestBuilder) -> anyhow::Result<RequestBuilder> {
        let user = self
            .user
            .ok_or_else(|| anyhow::anyhow!("no user id: pass --user or set SPARK_USER_ID"))?;
        Ok(builder.header(USER_HEADER, user.to_string()))
    }

    fn send(&self, builder: RequestBuilder) -> anyhow::Result<serde_json::Value> {
        let resp = self.authed(builder)?.send()?;
        let status = resp.status();
        let body: serde_json::Value = resp.json().unwrap_or_default();
        if !status.is_success() {
            let message = body["error"].as_str().unwrap_or("unknown error");
            anyhow::bail!("server returned {}: {}", status, message);
        }
        Ok(body)
    }

    fn get(&self, path: &str) -> anyhow::Result<serde_json::Value> {
        self.send(self.client.get(self.url(path)))
    }

    fn post(&self, path: &str, body: serde_json::Value) -> anyhow::Result<serde_json::Value> {
        self.send(self.client.post(self.url(path)).json(&body))
    }
}

/// Show the server status by calling GET /health.
fn do_status(api: &Api) -> anyhow::Result<()> {
    let url = api.url("/health");
    match api.client.get(&url).send() {
        Ok(r) if r.status().is_success() => {
            let body: serde_json::Value = r.json().unwrap_or_default();
            println!("Spark server: {}", body["status"].as_str().unwrap_or("unknown"));
            println!("Version:      {}", body["version"].as_str().unwrap_or("?"));
            println!("PostgreSQL:   {}", body["postgresql"].as_str().unwrap_or("?"));
            println!("LLM:          {}", body["llm"].as_str().unwrap_or("unavailable"));
            Ok(())
        }
        Ok(r) => anyhow::bail!("server unhealthy (HTTP {})", r.status()),
        Err(e) => anyhow::bail!("cannot reach {}: {}", url, e),
    }
}

fn do_ideas(api: &Api, archived: bool) -> anyhow::Result<()> {
    let path = if archived { "/ideas?status=archived" } else { "/ideas" };
    let ideas: Vec<IdeaSummary> = serde_json::from_value(api.get(path)?)?;
    if ideas.is_empty() {
        eprintln!("No ideas yet. Start one with: spark-cli new <title>");
        return Ok(());
    }
    for idea in &ideas {
        println!("{}", format_idea(idea));
    }
    Ok(())
}

fn do_new(api: &Api, title: &str, thinking: Option<String>) -> anyhow::Result<()> {
    let body = serde_json::json!({"title": title, "current_thinking": thinking});
    let idea: IdeaSummary = serde_json::from_value(api.post("/ideas", body)?)?;
    println!("Created {} {}", short_id(&idea.id), idea.title);
    println!("{}", idea.id);
    Ok(())
}

fn do_spark(api: &Api, idea_id: Uuid, spark_type: &str, save: bool, json: bool) -> anyhow::Result<()> {
    let body = serde_json::json!({"spark_type": spark_type, "save": save});
    let value = api.post(&format!("/ideas/{}/spark", idea_id), body)?;
    if json {
        println!("{}", serde_json::to_string_pretty(&value)?);
        return Ok(());
    }
    let result: SparkResult = serde_json::from_value(value)?;
    println!("{}", format_spark(&result));
    Ok(())
}

fn do_scouts(api: &Api, topic: &str, count: usize) -> anyhow::Result<()> {
    let body = serde_json::json!({"topic": topic, "count": count});
    let scouts: Vec<StoredElement> = serde_json::from_value(api.post("/scouts", body)?)?;
    for scout in &scouts {
        println!("{}\n", format_scout(scout));
    }
    eprintln!("{} scouts added to the inbox", scouts.len());
    Ok(())
}

// ============================================================================
// Main
// ============================================================================

fn main() {
    let cli = Cli::parse();

    // LLM-backed commands need a longer timeout than plain CRUD
    let timeout = match cli.command {
        Commands::Spark { .. } | Commands::Scouts { .. } => 120,
        _ => 10,
    };

    let result = Api::new(&cli.server, cli.user, timeout).and_then(|api| match cli.command {
        Commands::Status => do_status(&api),
        Commands::Ideas { archived } => do_ideas(&api, archived),
        Commands::New { title, thinking } => do_new(&api, &title, thinking),
        Commands::Spark {
            idea_id,
            spark_type,
            no_save,
            json,
        } => do_spark(&api, idea_id, &spark_type, !no_save, json),
        Commands::Scouts { topic, count } => do_scouts(&api, &topic, count),
    });

    if let Err(e) = result {
        eprintln!("spark-cli: {}", e);
        std::process::exit(1);
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    fn idea(thinking: Option<&str>, status: &str) -> IdeaSummary {
        IdeaSummary {
            id: "7b5c24ab-1234-5678-9abc-def012345678".to_string(),
            title: "Walkable suburbs".to_string(),
            current_thinking: thinking.map(str::to_string),
            status: status.to_string(),
        }
    }

    #[test]
    fn test_short_id() {
        assert_eq!(short_id("7b5c24ab-1234-5678-9abc-def012345678"), "#7b5c24");
        assert_eq!(short_id("abc"), "#abc");
    }

    #[test]
    fn test_format_idea_active_without_thinking() {
        assert_eq!(format_idea(&idea(None, "active")), "#7b5c24 Walkable suburbs");
    }

    #[test]
    fn test_format_idea_shows_status_and_thinking() {
        let out = format_idea(&idea(Some("\nDensity isn't the point\nmore"), "archived"));
        assert_eq!(
            out,
            "#7b5c24 Walkable suburbs (archived)\n    Density isn't the point"
        );
    }

    #[test]
    fn test_format_idea_truncates_long_thinking() {
        let long = "x".repeat(100);
        let out = format_idea(&idea(Some(&long), "active"));
        assert!(out.ends_with(&format!("{}...", "x".repeat(72))));
    }

    #[test]
    fn test_format_scout() {
        let scout: StoredElement = serde_json::from_value(serde_json::json!({
            "id": "deadbeef-cafe-babe-face-feeddeadbeef",
            "content": "What if every street had a ceiling?",
            "metadata": {"title": "Streets as rooms", "topic": "urban design"}
        }))
        .unwrap();
        assert_eq!(
            format_scout(&scout),
            "#deadbe Streets as rooms\n    What if every street had a ceiling?"
        );
    }

    #[test]
    fn test_format_spark_saved_and_unsaved() {
        let mut result: SparkResult = serde_json::from_value(serde_json::json!({
            "idea_id": "7b5c24ab-1234-5678-9abc-def012345678",
            "spark_type": "challenge",
            "text": "  Who is this for?  ",
            "element": {"id": "deadbeef-cafe-babe-face-feeddeadbeef", "content": "Who is this for?"},
            "took_ms": 812
        }))
        .unwrap();
        assert_eq!(
            format_spark(&result),
            "[challenge]\n\nWho is this for?\n\nSaved as #deadbe (812 ms)"
        );

        result.element = None;
        result.took_ms = None;
        assert!(format_spark(&result).ends_with("\nNot saved"));
    }
}
