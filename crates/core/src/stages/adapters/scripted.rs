//! Deterministic stage driven by its configuration.
//!
//! A `ScriptedStage` replays the trace described in its `script` block:
//! decisions, knowledge usage, content changes, model usage and so on. It is
//! what the default templates use for dry runs, and what tests use when they
//! need a stage with predictable behavior.

use crate::stages::base::{PriorOutputs, Stage, StageError, StageOutput};
use crate::tracker::StageScope;
use async_trait::async_trait;
use cf_protocol::brief_models::ContentBrief;
use cf_protocol::stage_models::{ScriptSpec, StageDefinition};
use std::time::Duration;

#[derive(Debug, Clone)]
pub struct ScriptedStage {
    name: String,
    tag: String,
    model: String,
    inputs: Vec<String>,
    prompt: String,
    script: ScriptSpec,
    available: bool,
}

impl ScriptedStage {
    pub fn new(name: impl Into<String>, script: ScriptSpec) -> Self {
        let name = name.into();
        Self {
            tag: name.clone(),
            name,
            model: String::new(),
            inputs: Vec::new(),
            prompt: String::new(),
            script,
            available: true,
        }
    }

    pub fn from_definition(definition: &StageDefinition) -> Self {
        Self {
            name: definition.name.clone(),
            tag: definition.tag().to_string(),
            model: definition.model.clone(),
            inputs: definition.inputs.clone(),
            prompt: definition.prompt.clone(),
            script: definition.script.clone().unwrap_or_default(),
            available: true,
        }
    }

    pub fn with_tag(mut self, tag: impl Into<String>) -> Self {
        self.tag = tag.into();
        self
    }

    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = model.into();
        self
    }

    pub fn with_inputs(mut self, inputs: Vec<String>) -> Self {
        self.inputs = inputs;
        self
    }

    pub fn with_prompt(mut self, prompt: impl Into<String>) -> Self {
        self.prompt = prompt.into();
        self
    }

    /// Make the stage report itself as unavailable.
    pub fn unavailable(mut self) -> Self {
        self.available = false;
        self
    }

    fn render_prompt(&self, brief: &ContentBrief) -> String {
        self.prompt
            .replace("{{topic}}", &brief.topic)
            .replace("{{content_type}}", &brief.content_type)
            .replace("{{audience}}", brief.audience.as_deref().unwrap_or("general readers"))
            .replace("{{keywords}}", &brief.keywords.join(", "))
            .trim()
            .to_string()
    }
}

#[async_trait]
impl Stage for ScriptedStage {
    fn name(&self) -> &str {
        &self.name
    }

    fn tag(&self) -> &str {
        &self.tag
    }

    fn inputs(&self) -> &[String] {
        &self.inputs
    }

    async fn check_availability(&self) -> bool {
        self.available
    }

    async fn execute(
        &self,
        scope: &mut StageScope<'_>,
        brief: &ContentBrief,
        prior: &PriorOutputs,
    ) -> Result<StageOutput, StageError> {
        let script = &self.script;
        if script.delay_ms > 0 {
            tokio::time::sleep(Duration::from_millis(script.delay_ms)).await;
        }

        for decision in &script.decisions {
            scope.log_decision(decision.as_str(), None).await;
        }
        for usage in &script.knowledge {
            scope.log_knowledge_usage(usage.clone()).await;
        }
        if let Some(pair) = &script.content_pair {
            scope
                .record_content_pair(pair.before.as_str(), pair.after.as_str())
                .await;
        }
        for change in &script.changes {
            scope.log_content_change(change.clone()).await;
        }
        if script.input_tokens > 0 || script.output_tokens > 0 || script.cost.is_some() {
            scope
                .log_model_usage(
                    &self.model,
                    script.input_tokens,
                    script.output_tokens,
                    script.cost,
                )
                .await;
        }
        for badge in &script.badges {
            scope.add_badge(badge.as_str()).await;
        }
        for warning in &script.warnings {
            scope.add_warning(warning.as_str()).await;
        }

        if let Some(message) = &script.fail {
            return Err(StageError::Execution(message.clone()));
        }

        let text = match &script.content_pair {
            Some(pair) => pair.after.clone(),
            None => self.render_prompt(brief),
        };
        let inputs: serde_json::Map<String, serde_json::Value> = self
            .inputs
            .iter()
            .filter_map(|input| prior.get(input).map(|value| (input.clone(), value.clone())))
            .collect();

        let mut output = StageOutput::new(serde_json::json!({
            "stage": self.name,
            "text": text,
            "inputs": inputs,
        }))
        .with_summary(serde_json::json!({
            "characters": text.chars().count(),
            "decisions": script.decisions.len(),
        }));
        if !script.quality.is_empty() {
            output = output.with_quality(script.quality.clone());
        }
        Ok(output)
    }
}
