//! Inference: one data transformation step of a skill
//!
//! Flow and memory procedures are built in. Console, javascript and prolog
//! steps are delegated to registered collaborators.

use anyhow::Result;
use async_trait::async_trait;
use regex::RegexBuilder;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;
use std::sync::Arc;
use std::time::Duration;
use crate::core::argument::{has_variable, Argument};
use crate::core::matcher::TimeoutMatcher;
use crate::core::paths::{defaults, observation, phrase::REGEX_SIZE_LIMIT};
use crate::core::skill::SkillError;
use crate::core::thought::Thought;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum InferenceType {
    Console,
    Flow,
    Memory,
    Javascript,
    Prolog,
}

impl InferenceType {
    /// Score factor cardinality, including "no inference"
    pub const COUNT: i64 = 6;

    pub fn subscore(&self) -> i64 { *self as i64 + 1 }

    pub fn as_str(&self) -> &'static str {
        match self {
            InferenceType::Console => "console",
            InferenceType::Flow => "flow",
            InferenceType::Memory => "memory",
            InferenceType::Javascript => "javascript",
            InferenceType::Prolog => "prolog",
        }
    }
}

impl fmt::Display for InferenceType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result { f.write_str(self.as_str()) }
}

/// Raw inference definition (for serialization)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InferenceDef {
    #[serde(rename = "type")]
    pub kind: InferenceType,
    #[serde(default)]
    pub expression: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub definition: Option<Value>,
}

/// External data source for delegated inference types
#[async_trait]
pub trait Collaborator: Send + Sync {
    fn handles(&self, kind: InferenceType) -> bool;
    async fn deduce(&self, kind: InferenceType, expression: &str, definition: Option<&Value>) -> Result<Thought>;
}

/// What an inference step may reach while it runs
#[derive(Clone)]
pub struct InferenceContext {
    pub matcher: TimeoutMatcher,
    pub timeout: Duration,
    pub collaborators: Vec<Arc<dyn Collaborator>>,
}

impl Default for InferenceContext {
    fn default() -> Self {
        Self {
            matcher: TimeoutMatcher::default(),
            timeout: Duration::from_millis(defaults::INFERENCE_TIMEOUT_MS),
            collaborators: Vec::new(),
        }
    }
}

impl fmt::Debug for InferenceContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("InferenceContext")
            .field("matcher", &self.matcher)
            .field("timeout", &self.timeout)
            .field("collaborators", &self.collaborators.len())
            .finish()
    }
}

#[derive(Debug, Clone)]
pub struct Inference {
    kind: InferenceType,
    expression: String,
    definition: Option<Value>,
}

impl Inference {
    pub fn from_def(def: InferenceDef) -> Result<Self, SkillError> {
        if def.expression.trim().is_empty() && def.definition.is_none() {
            return Err(SkillError::Inference(format!("{} step has neither expression nor definition", def.kind)));
        }
        Ok(Self { kind: def.kind, expression: def.expression.trim().to_string(), definition: def.definition })
    }

    pub fn kind(&self) -> InferenceType { self.kind }
    pub fn expression(&self) -> &str { &self.expression }
    pub fn definition(&self) -> Option<&Value> { self.definition.as_ref() }

    pub fn to_def(&self) -> InferenceDef {
        InferenceDef { kind: self.kind, expression: self.expression.clone(), definition: self.definition.clone() }
    }

    /// Unify the expression against `flow` and execute it. Failure of any kind is an empty thought.
    pub async fn apply(&self, flow: &mut Argument, ctx: &InferenceContext) -> Thought {
        let expression = flow.unify(&self.expression);
        tracing::debug!(kind = %self.kind, expression = %expression, "inference");
        let mut thought = match self.kind {
            InferenceType::Flow => flow_procedure(&expression, flow),
            InferenceType::Memory => memory_procedure(&expression, &ctx.matcher).await,
            kind => self.delegate(kind, &expression, ctx).await,
        };
        if !thought.is_failed() { thought.set_process(self.kind.as_str()); }
        thought
    }

    async fn delegate(&self, kind: InferenceType, expression: &str, ctx: &InferenceContext) -> Thought {
        let Some(collaborator) = ctx.collaborators.iter().find(|c| c.handles(kind)) else {
            tracing::warn!(kind = %kind, "no collaborator for inference type");
            return Thought::new();
        };
        match tokio::time::timeout(ctx.timeout, collaborator.deduce(kind, expression, self.definition.as_ref())).await {
            Ok(Ok(thought)) => thought,
            Ok(Err(e)) => {
                tracing::warn!(kind = %kind, error = %e, "collaborator failed");
                Thought::new()
            }
            Err(_) => {
                tracing::warn!(kind = %kind, timeout_ms = ctx.timeout.as_millis() as u64, "collaborator timed out");
                Thought::new()
            }
        }
    }
}

fn flow_procedure(expression: &str, flow: &mut Argument) -> Thought {
    match expression.trim() {
        "SQUASH" => {
            let squashed = flow.mindmeld(true);
            flow.amnesia();
            squashed
        }
        "FIRST" => {
            let mut recall = flow.rethink();
            recall.first_row();
            recall
        }
        "REST" => {
            let mut recall = flow.rethink();
            recall.drop_first_row();
            recall
        }
        other => {
            tracing::warn!(expression = other, "unknown flow procedure");
            Thought::new()
        }
    }
}

/// `rest` after `keyword` when the expression starts with it as a whole word.
fn keyword<'a>(expression: &'a str, keyword: &str) -> Option<&'a str> {
    let rest = expression.strip_prefix(keyword)?;
    if rest.is_empty() || rest.starts_with(char::is_whitespace) { Some(rest.trim()) } else { None }
}

fn assignment(rest: &str) -> Option<(&str, &str)> {
    let (name, value) = rest.split_once('=')?;
    let name = name.trim();
    if name.is_empty() { None } else { Some((name, value.trim())) }
}

/// Full match of `value` against `pattern`: its first group, or the whole value without groups.
async fn see(matcher: &TimeoutMatcher, value: &str, pattern: &str) -> Option<String> {
    let regex = match RegexBuilder::new(&format!("^(?:{})$", pattern)).size_limit(REGEX_SIZE_LIMIT).build() {
        Ok(r) => Arc::new(r),
        Err(e) => {
            tracing::warn!(pattern, error = %e, "bad memory pattern");
            return None;
        }
    };
    let groups = matcher.captures(&regex, value).await?;
    groups.get(1).cloned().flatten().or_else(|| groups.into_iter().next().flatten())
}

fn observed(name: &str, value: impl Into<String>) -> Thought { Thought::builder().observation(name, value).build() }

async fn memory_procedure(expression: &str, matcher: &TimeoutMatcher) -> Thought {
    let e = expression.trim();
    if let Some(rest) = keyword(e, "SET") {
        let Some((name, value)) = assignment(rest) else { return Thought::new() };
        if let Some((value, pattern)) = value.split_once(" MATCHING ") {
            return match see(matcher, value.trim(), pattern.trim()).await {
                Some(seen) => observed(name, seen),
                None => Thought::new(),
            };
        }
        return observed(name, value);
    }
    if let Some(name) = keyword(e, "CLEAR") {
        return if name.is_empty() { Thought::new() } else { observed(name, "") };
    }
    if let Some(rest) = keyword(e, "IF") {
        let expected = match assignment(rest) {
            Some((value, pattern)) => see(matcher, value, pattern).await,
            None => Some(rest.to_string()),
        };
        return match expected {
            Some(v) if !v.is_empty() && !has_variable(&v) => observed(observation::EXPECTED, v),
            _ => Thought::new(),
        };
    }
    if let Some(rest) = keyword(e, "NOT") {
        if rest.is_empty() { return observed(observation::REJECTED, ""); }
        return match assignment(rest) {
            Some((value, pattern)) => match see(matcher, value, pattern).await {
                Some(_) => Thought::new(),
                None => observed(&format!("{}({})", observation::REJECTED, pattern), value),
            },
            None if has_variable(rest) => observed(observation::REJECTED, rest),
            None => Thought::new(),
        };
    }
    tracing::warn!(expression = e, "unknown memory procedure");
    Thought::new()
}
