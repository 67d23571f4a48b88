//! Pipeline definition models for `.contentflow/pipelines/*.yaml`.
//!
//! A pipeline maps one content-type tag to the ordered list of stages that
//! produce that kind of content.

use serde::{Deserialize, Serialize};
use ts_rs::TS;

/// Defines the ordered stage sequence for a content type.
///
/// # Example
///
/// ```yaml
/// content-type: social-post
/// description: Short-form post for social channels
/// stages:
///   - hook-writer
///   - post-drafter
///   - hashtag-optimizer
/// ```
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq, TS)]
#[serde(rename_all = "kebab-case")]
pub struct PipelineDefinition {
    /// Content-type tag that selects this pipeline.
    pub content_type: String,

    #[serde(default)]
    pub description: String,

    /// Stage names, executed strictly in this order.
    pub stages: Vec<String>,
}
