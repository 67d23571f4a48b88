//! Stage definition models for `.contentflow/stages/*.md`.
//!
//! Stages are defined as Markdown files with YAML front matter. The front
//! matter declares the stage's identity, its expected inputs and how to run
//! it; the file body is the prompt template handed to the generator.

use crate::activity_models::{ContentChange, ContentPair, KnowledgeUsage};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use ts_rs::TS;

/// Which adapter executes a stage.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, Default, PartialEq, Eq, TS)]
#[serde(rename_all = "snake_case")]
pub enum StageKind {
    /// Deterministic stage driven entirely by its `script` block.
    #[default]
    Scripted,

    /// External generator process speaking the NDJSON stage protocol.
    Command,
}

/// Program and arguments for a `Command` stage.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq, TS)]
pub struct CommandSpec {
    pub program: String,
    #[serde(default)]
    pub args: Vec<String>,
    /// Working directory; defaults to the current directory.
    #[serde(default)]
    pub working_dir: Option<String>,
}

/// Canned behavior for a `Scripted` stage.
#[derive(Serialize, Deserialize, Debug, Clone, Default, PartialEq, TS)]
#[serde(rename_all = "kebab-case")]
pub struct ScriptSpec {
    #[serde(default)]
    pub decisions: Vec<String>,
    #[serde(default)]
    pub knowledge: Vec<KnowledgeUsage>,
    #[serde(default)]
    pub content_pair: Option<ContentPair>,
    #[serde(default)]
    pub changes: Vec<ContentChange>,
    #[serde(default)]
    pub input_tokens: u64,
    #[serde(default)]
    pub output_tokens: u64,
    /// Explicit cost; when absent the tracker's pricing table is used.
    #[serde(default)]
    pub cost: Option<f64>,
    #[serde(default)]
    pub badges: Vec<String>,
    #[serde(default)]
    pub warnings: Vec<String>,
    #[serde(default)]
    pub quality: BTreeMap<String, f64>,
    /// When set, the stage fails with this message after logging its trace.
    #[serde(default)]
    pub fail: Option<String>,
    #[serde(default)]
    pub delay_ms: u64,
}

/// A content-generation stage's configuration and prompt template.
///
/// # Example
///
/// ```markdown
/// ---
/// name: keyword-research
/// description: Finds primary and secondary keywords for the topic
/// tag: research
/// model: gpt-4o-mini
/// kind: scripted
/// script:
///   decisions:
///     - Picked long-tail keywords with low competition
///   input-tokens: 420
///   output-tokens: 180
/// ---
///
/// Research keywords for "{{topic}}".
/// ```
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, TS)]
pub struct StageDefinition {
    /// Unique identifier used by pipeline definitions.
    pub name: String,

    pub description: String,

    /// Category tag recorded on activity records. Defaults to the name.
    #[serde(default)]
    pub tag: Option<String>,

    /// Model the stage's generator is expected to use.
    #[serde(default)]
    pub model: String,

    #[serde(default)]
    pub kind: StageKind,

    /// Names of earlier stages whose outputs this stage reads.
    #[serde(default)]
    pub inputs: Vec<String>,

    #[serde(default)]
    pub command: Option<CommandSpec>,

    #[serde(default)]
    pub script: Option<ScriptSpec>,

    /// The Markdown body; not part of the front matter.
    #[serde(skip)]
    pub prompt: String,
}

impl StageDefinition {
    pub fn tag(&self) -> &str {
        self.tag.as_deref().unwrap_or(&self.name)
    }
}
