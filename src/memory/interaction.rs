//! Interaction: one persisted user turn

use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use crate::core::action::RenderType;
use crate::core::paths::observation;
use crate::core::thought::{value_string, Thought};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Interaction {
    pub query: String,
    pub query_date: DateTime<Utc>,
    pub answer_date: DateTime<Utc>,
    /// milliseconds between query and answer
    pub answer_time: u64,
    /// the dispute: answer thoughts in rank order
    #[serde(default)]
    pub answers: Vec<Thought>,
    pub client_id: String,
}

impl Interaction {
    pub fn new(query: impl Into<String>, query_date: DateTime<Utc>, answers: Vec<Thought>, client: &str) -> Self {
        let answer_date = Utc::now();
        Self {
            query: query.into(),
            query_date,
            answer_date,
            answer_time: (answer_date - query_date).num_milliseconds().max(0) as u64,
            answers,
            client_id: client_id(client),
        }
    }

    /// Text of the first answer action of the best answer
    pub fn answer(&self) -> Option<String> {
        let action = self.answers.first()?.actions().iter().find(|a| a.render_type() == RenderType::Answer)?;
        action.expression().map(str::to_string).or_else(|| action.phrases().first().cloned())
    }

    pub fn skills(&self) -> &[String] { self.answers.first().map(|a| a.skills()).unwrap_or_default() }

    /// Thought remembering this turn: query, answer, skill source and the
    /// `_`-prefixed variables of the best answer, which outlive the turn.
    pub fn recall_dispute(&self) -> Thought {
        let mut t = Thought::builder().observation(observation::QUERY, self.query.as_str()).build();
        if let Some(answer) = self.answer() { t.add_observation(observation::ANSWER, answer); }
        if let Some(source) = self.skills().first() { t.add_observation(observation::SKILL_SOURCE, source.as_str()); }
        if let Some(row) = self.answers.first().and_then(|a| a.data().first()) {
            for (key, value) in row.iter().filter(|(k, _)| k.starts_with(observation::PERSISTENT_PREFIX)) {
                t.add_observation(key, value_string(value));
            }
        }
        t
    }
}

/// Opaque, reversible id of a client key as stored in records
pub fn client_id(client: &str) -> String { URL_SAFE_NO_PAD.encode(client.as_bytes()) }

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::action::{Action, ActionDef};

    #[test]
    fn test_recall_dispute() {
        let action = Action::from_def(ActionDef::answer(&["hi $1$!"])).unwrap().rendered("hi world!".into());
        let mut answer = Thought::new();
        answer.add_action(action).add_skill("greetings.json");
        let i = Interaction::new("hello world", Utc::now(), vec![answer], "alice");
        let t = i.recall_dispute();
        assert_eq!(t.observation("query").as_deref(), Some("hello world"));
        assert_eq!(t.observation("answer").as_deref(), Some("hi world!"));
        assert_eq!(t.observation("skill_source").as_deref(), Some("greetings.json"));
        assert_eq!(i.client_id, "YWxpY2U");
    }

    #[test]
    fn test_persistent_variables_survive() {
        let action = Action::from_def(ActionDef::answer(&["ok"])).unwrap().rendered("ok".into());
        let mut answer = Thought::builder().observation("_name", "bob").observation("mood", "fine").build();
        answer.add_action(action);
        let t = Interaction::new("my name is bob", Utc::now(), vec![answer], "bob").recall_dispute();
        assert_eq!(t.observation("_name").as_deref(), Some("bob"));
        assert!(t.observation("mood").is_none());
    }

    #[test]
    fn test_unanswered_turn() {
        let i = Interaction::new("mumble", Utc::now(), Vec::new(), "bob");
        assert!(i.answer().is_none());
        assert_eq!(i.recall_dispute().count(), 1);
        let line = serde_json::to_string(&i).unwrap();
        let back: Interaction = serde_json::from_str(&line).unwrap();
        assert_eq!(back.query, "mumble");
    }
}
