//! Skill: phrases, inference chain, actions, index keys and score
//!
//! A skill is immutable once built. Reloading a knowledge file builds new
//! skills and swaps them in whole under the same id.

use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::fmt;
use thiserror::Error;
use crate::core::action::{Action, ActionDef, DialogType};
use crate::core::argument::Argument;
use crate::core::inference::{Inference, InferenceContext, InferenceDef, InferenceType};
use crate::core::linguistics::Token;
use crate::core::matcher::{Groups, TimeoutMatcher};
use crate::core::paths::{observation, skill as consts};
use crate::core::phrase::{extract_meat, Phrase, PhraseDef, PhraseType};
use crate::core::thought::Thought;

#[derive(Debug, Error)]
pub enum SkillError {
    #[error("malformed phrase `{expression}`: {reason}")]
    Phrase { expression: String, reason: String },
    #[error("malformed action: {0}")]
    Action(String),
    #[error("malformed inference: {0}")]
    Inference(String),
    #[error("skill has no phrases")]
    MissingPhrases,
    #[error("skill has no actions")]
    MissingActions,
    #[error("skill has no non-empty response template")]
    NoTemplate,
    #[error("malformed skill definition: {0}")]
    Definition(#[from] serde_json::Error),
}

/// Raw skill definition as found in a knowledge file
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SkillDef {
    #[serde(default)]
    pub phrases: Vec<PhraseDef>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub process: Vec<InferenceDef>,
    #[serde(default)]
    pub actions: Vec<ActionDef>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub keys: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub score: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub comment: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub example: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub expect: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

impl SkillDef {
    pub fn from_value(value: Value) -> Result<Self, SkillError> { Ok(serde_json::from_value(value)?) }
}

/// Stable content hash of phrases and actions
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct SkillId(String);

impl SkillId {
    pub fn as_str(&self) -> &str { &self.0 }
}

impl fmt::Display for SkillId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result { f.write_str(&self.0) }
}

/// Ranking of a skill. Higher wins.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Score {
    pub value: i64,
    pub log: String,
}

#[derive(Debug, Clone)]
pub struct Skill {
    id: SkillId,
    source: String,
    keys: Vec<String>,
    phrases: Vec<Phrase>,
    inferences: Vec<Inference>,
    actions: Vec<Action>,
    user_subscore: i64,
    comment: Option<String>,
    example: Option<String>,
    expect: Option<String>,
    description: Option<String>,
    score: Score,
}

impl Skill {
    pub fn from_def(def: SkillDef, source: &str) -> Result<Self, SkillError> {
        if def.phrases.is_empty() { return Err(SkillError::MissingPhrases); }
        if def.actions.is_empty() { return Err(SkillError::MissingActions); }
        let phrases = def.phrases.iter().map(Phrase::compile).collect::<Result<Vec<_>, _>>()?;
        let inferences = def.process.into_iter().map(Inference::from_def).collect::<Result<Vec<_>, _>>()?;
        let actions = def.actions.into_iter().map(Action::from_def).collect::<Result<Vec<_>, _>>()?;
        if !actions.iter().any(Action::has_template) { return Err(SkillError::NoTemplate); }

        let declared: Vec<String> = def.keys.unwrap_or_default().iter()
            .map(|k| k.trim().to_lowercase())
            .filter(|k| !k.is_empty())
            .collect();
        let keys = if declared.is_empty() { compute_keys(&phrases) } else { declared };
        let user_subscore = def.score.unwrap_or(consts::DEFAULT_SCORE);
        let score = score(&phrases, &inferences, &actions, user_subscore);
        Ok(Self {
            id: skill_id(&phrases, &actions),
            source: source.to_string(),
            keys,
            phrases,
            inferences,
            actions,
            user_subscore,
            comment: def.comment,
            example: def.example,
            expect: def.expect,
            description: def.description,
            score,
        })
    }

    pub fn id(&self) -> &SkillId { &self.id }
    pub fn source(&self) -> &str { &self.source }
    pub fn keys(&self) -> &[String] { &self.keys }
    pub fn phrases(&self) -> &[Phrase] { &self.phrases }
    pub fn inferences(&self) -> &[Inference] { &self.inferences }
    pub fn actions(&self) -> &[Action] { &self.actions }
    pub fn score(&self) -> &Score { &self.score }
    pub fn comment(&self) -> Option<&str> { self.comment.as_deref() }
    pub fn example(&self) -> Option<&str> { self.example.as_deref() }
    pub fn expect(&self) -> Option<&str> { self.expect.as_deref() }
    pub fn description(&self) -> Option<&str> { self.description.as_deref() }

    pub fn is_catchall(&self) -> bool { self.keys.iter().any(|k| k == consts::CATCHALL_KEY) }

    /// Match groups of every phrase accepting the normalized query, in phrase order.
    pub async fn matches(&self, matcher: &TimeoutMatcher, query: &str) -> Vec<Groups> {
        let mut found = Vec::new();
        for phrase in &self.phrases {
            if let Some(groups) = phrase.matches(matcher, query).await { found.push(groups); }
        }
        found
    }

    /// Run the inference chain once per matching alternative; the first alternative
    /// that makes progress on every step yields the argument, actions attached.
    pub async fn consideration(
        &self,
        recall: &Thought,
        token: Option<&Token>,
        alternatives: &[Groups],
        ctx: &InferenceContext,
    ) -> Option<Argument> {
        'alternatives: for groups in alternatives {
            let mut flow = Argument::new();
            if recall.count() > 0 { flow.think(recall.clone()); }
            let mut keynote = Thought::from_match(groups);
            if let Some(token) = token {
                keynote.add_observation(observation::TOKEN_ORIGINAL, token.original.as_str());
                keynote.add_observation(observation::TOKEN_CANONICAL, token.canonical.as_str());
                keynote.add_observation(observation::TOKEN_CATEGORIZED, token.categorized.as_str());
            }
            tracing::debug!(skill = %self.id, source = %self.source, "idea");
            flow.think(keynote);

            for inference in &self.inferences {
                let implication = inference.apply(&mut flow, ctx).await;
                if implication.is_failed() || flow.mindstate() == Some(&implication) {
                    tracing::debug!(skill = %self.id, kind = %inference.kind(), "no progress, abandoning alternative");
                    continue 'alternatives;
                }
                flow.think(implication);
            }

            match flow.mindstate_mut() {
                Some(mindstate) => { mindstate.add_actions(self.actions.iter().cloned()); }
                None => {
                    let mut carrier = Thought::new();
                    carrier.add_actions(self.actions.iter().cloned());
                    flow.think(carrier);
                }
            }
            if !self.source.is_empty() { flow.add_skill(self.source.as_str()); }
            return Some(flow);
        }
        None
    }

    pub fn to_def(&self) -> SkillDef {
        SkillDef {
            phrases: self.phrases.iter().map(Phrase::to_def).collect(),
            process: self.inferences.iter().map(Inference::to_def).collect(),
            actions: self.actions.iter().cloned().map(ActionDef::from).collect(),
            keys: Some(self.keys.clone()),
            score: Some(self.user_subscore),
            comment: self.comment.clone(),
            example: self.example.clone(),
            expect: self.expect.clone(),
            description: self.description.clone(),
        }
    }

    pub fn summary(&self) -> Value {
        json!({
            "id": self.id,
            "source": self.source,
            "keys": self.keys,
            "score": self.score,
            "phrases": self.phrases.iter().map(|p| p.expression()).collect::<Vec<_>>(),
            "comment": self.comment,
        })
    }
}

fn skill_id(phrases: &[Phrase], actions: &[Action]) -> SkillId {
    let phrases: Vec<PhraseDef> = phrases.iter().map(Phrase::to_def).collect();
    let actions: Vec<ActionDef> = actions.iter().cloned().map(ActionDef::from).collect();
    let canonical = json!({"phrases": phrases, "actions": actions}).to_string();
    SkillId(blake3::hash(canonical.as_bytes()).to_hex().to_string())
}

/// Index keys derived from the literal tokens of the compiled phrases.
pub fn compute_keys(phrases: &[Phrase]) -> Vec<String> {
    let catchall = || vec![consts::CATCHALL_KEY.to_string()];
    let per_phrase: Vec<Vec<String>> = phrases.iter().map(|p| {
        let mut tokens: Vec<String> = Vec::new();
        for word in p.expression().split(' ') {
            let meat = extract_meat(&word.to_lowercase());
            if meat.chars().count() > 1 && !tokens.contains(&meat) { tokens.push(meat); }
        }
        tokens
    }).collect();
    if per_phrase.iter().any(Vec::is_empty) { return catchall(); }

    let mut union: Vec<String> = Vec::new();
    for token in per_phrase.iter().flatten() {
        if !union.contains(token) { union.push(token.clone()); }
    }
    if union.is_empty() { return catchall(); }

    // narrowed to the single first common token
    match union.iter().find(|t| per_phrase.iter().all(|p| p.contains(t))) {
        Some(first) => vec![first.clone()],
        None => union,
    }
}

fn score(phrases: &[Phrase], inferences: &[Inference], actions: &[Action], user_subscore: i64) -> Score {
    let dialog = actions.iter().map(Action::dialog_type).max().unwrap_or(DialogType::Answer).subscore();
    let tier = phrases.iter().map(Phrase::subscore).min().unwrap_or(0);
    let meat = phrases.iter().map(Phrase::meatsize).max().unwrap_or(0) as i64;
    let wholesize = phrases.iter().map(|p| p.expression().chars().count().min(consts::MAX_MEATSIZE)).max().unwrap_or(0) as i64;
    let inference = inferences.iter().map(|i| i.kind().subscore()).max().unwrap_or(0);

    let mut value = 0;
    value = value * DialogType::COUNT + dialog;
    value = value * PhraseType::TIERS + tier;
    value = value * 100 + meat;
    value = value * 100 + wholesize;
    value = value * InferenceType::COUNT + inference;
    value += value * 1000 + user_subscore.min(consts::MAX_USER_SUBSCORE);

    let log = format!(
        "dialog={}, phrase={}, inference={}, meatscore={}, wholesize={}, subscore={}, pattern={}",
        dialog, tier, inference, meat, wholesize, user_subscore,
        phrases.first().map(|p| p.expression()).unwrap_or_default(),
    );
    Score { value, log }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn skill(value: Value) -> Result<Skill, SkillError> { Skill::from_def(SkillDef::from_value(value)?, "test.json") }

    fn answer(phrases: &[&str], answer: &str) -> Skill {
        skill(json!({"phrases": phrases, "actions": [{"type": "answer", "phrases": [answer]}]})).unwrap()
    }

    #[test]
    fn test_compute_keys() {
        assert_eq!(answer(&["weather *"], "x").keys(), ["weather"]);
        assert_eq!(answer(&["*"], "x").keys(), ["*"]);
        assert_eq!(answer(&["hello *", "*"], "x").keys(), ["*"]);
        assert_eq!(answer(&["what is the weather", "weather today"], "x").keys(), ["weather"]);
        assert_eq!(answer(&["hi there", "good morning"], "x").keys(), ["hi", "there", "good", "morning"]);
    }

    #[test]
    fn test_declared_keys() {
        let s = skill(json!({"phrases": ["hello"], "keys": ["Greet"], "actions": [{"type": "answer", "phrases": ["hi"]}]})).unwrap();
        assert_eq!(s.keys(), ["greet"]);
        let s = skill(json!({"phrases": ["hello"], "keys": [""], "actions": [{"type": "answer", "phrases": ["hi"]}]})).unwrap();
        assert_eq!(s.keys(), ["hello"]);
    }

    #[test]
    fn test_exact_outranks_wildcard() {
        let exact = answer(&["weather"], "sunny");
        let wild = answer(&["weather *"], "sunny");
        assert!(exact.score().value > wild.score().value, "{} vs {}", exact.score().log, wild.score().log);
        let all = answer(&["*"], "sunny");
        assert!(wild.score().value > all.score().value);
    }

    #[test]
    fn test_user_subscore_breaks_ties() {
        let low = skill(json!({"phrases": ["hello"], "score": 5, "actions": [{"type": "answer", "phrases": ["a"]}]})).unwrap();
        let high = skill(json!({"phrases": ["hello"], "score": 50, "actions": [{"type": "answer", "phrases": ["a"]}]})).unwrap();
        assert!(high.score().value > low.score().value);
        assert_eq!(low.id(), high.id());
    }

    #[test]
    fn test_rejected_definitions() {
        assert!(matches!(skill(json!({"phrases": [], "actions": [{"type": "answer", "phrases": ["a"]}]})), Err(SkillError::MissingPhrases)));
        assert!(matches!(skill(json!({"phrases": ["a"], "actions": []})), Err(SkillError::MissingActions)));
        assert!(matches!(skill(json!({"phrases": ["a"], "actions": [{"type": "answer", "phrases": [" "]}]})), Err(SkillError::NoTemplate)));
        assert!(matches!(skill(json!({"phrases": [{"type": "regex", "expression": "(a"}], "actions": [{"type": "answer", "phrases": ["a"]}]})), Err(SkillError::Phrase { .. })));
        assert!(matches!(skill(json!({"phrases": "a"})), Err(SkillError::Definition(_))));
    }

    #[test]
    fn test_id_is_stable() {
        assert_eq!(answer(&["hello *"], "hi $1$!").id(), answer(&["Hello *"], "hi $1$!").id());
        assert_ne!(answer(&["hello *"], "hi $1$!").id(), answer(&["hello *"], "hey $1$!").id());
    }

    #[tokio::test]
    async fn test_consideration_attaches_actions() {
        let ctx = InferenceContext::default();
        let s = answer(&["hello *"], "hi $1$!");
        let alternatives = s.matches(&ctx.matcher, "hello world").await;
        assert_eq!(alternatives.len(), 1);
        let mut flow = s.consideration(&Thought::new(), None, &alternatives, &ctx).await.unwrap();
        let finding = flow.finding();
        assert_eq!(finding.actions()[0].expression(), Some("hi world!"));
        assert_eq!(finding.skills(), ["test.json".to_string()]);
    }

    #[tokio::test]
    async fn test_consideration_stops_without_progress() {
        let ctx = InferenceContext::default();
        let s = skill(json!({
            "phrases": ["remember *"],
            "process": [
                {"type": "memory", "expression": "SET thing = $1$"},
                {"type": "memory", "expression": "SET thing = $1$"},
            ],
            "actions": [{"type": "answer", "phrases": ["ok"]}]
        })).unwrap();
        let alternatives = s.matches(&ctx.matcher, "remember milk").await;
        assert!(s.consideration(&Thought::new(), None, &alternatives, &ctx).await.is_none());
    }
}
