//! Content brief models.
//!
//! A brief is the caller's request: what to write about and for which
//! content type. It is handed read-only to every stage of a run.

use serde::{Deserialize, Serialize};
use ts_rs::TS;

/// The topic brief a pipeline run turns into finished content.
///
/// # Example
///
/// ```json
/// {
///   "content_type": "blog-post",
///   "topic": "Zero-downtime Postgres migrations",
///   "audience": "platform engineers",
///   "keywords": ["postgres", "migrations"]
/// }
/// ```
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, TS)]
pub struct ContentBrief {
    /// Content-type tag; selects the pipeline definition to run.
    pub content_type: String,

    /// The subject of the content.
    pub topic: String,

    /// Intended readership, if the caller specified one.
    #[serde(default)]
    pub audience: Option<String>,

    /// Target keywords supplied by the caller.
    #[serde(default)]
    pub keywords: Vec<String>,

    /// Free-form extra instructions passed through to stages untouched.
    #[serde(default)]
    pub extra: serde_json::Value,
}

impl ContentBrief {
    pub fn new(content_type: impl Into<String>, topic: impl Into<String>) -> Self {
        Self {
            content_type: content_type.into(),
            topic: topic.into(),
            audience: None,
            keywords: Vec::new(),
            extra: serde_json::Value::Null,
        }
    }

    pub fn with_audience(mut self, audience: impl Into<String>) -> Self {
        self.audience = Some(audience.into());
        self
    }

    pub fn with_keywords(mut self, keywords: Vec<String>) -> Self {
        self.keywords = keywords;
        self
    }

    pub fn with_extra(mut self, extra: serde_json::Value) -> Self {
        self.extra = extra;
        self
    }
}
