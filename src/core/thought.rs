//! Thought: one result table with metadata, the unit of working memory

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use crate::core::action::Action;
use crate::core::matcher::Groups;

/// One row of a thought: flat key → primitive value
pub type Record = Map<String, Value>;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ThoughtMetadata {
    #[serde(default)] pub offset: usize,
    #[serde(default)] pub hits: usize,
    #[serde(default)] pub count: usize,
    #[serde(default, skip_serializing_if = "Option::is_none")] pub query: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")] pub process: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")] pub scraper_info: Option<String>,
    /// number of thoughts melded into this one
    #[serde(default, skip_serializing_if = "is_zero")] pub times: usize,
}

fn is_zero(n: &usize) -> bool { *n == 0 }

/// A result set. `metadata.count` always equals `data.len()`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(from = "RawThought")]
pub struct Thought {
    metadata: ThoughtMetadata,
    data: Vec<Record>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    actions: Vec<Action>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    skills: Vec<String>,
}

#[derive(Deserialize)]
struct RawThought {
    #[serde(default)] metadata: ThoughtMetadata,
    #[serde(default)] data: Vec<Record>,
    #[serde(default)] actions: Vec<Action>,
    #[serde(default)] skills: Vec<String>,
}

impl From<RawThought> for Thought {
    fn from(raw: RawThought) -> Self {
        let mut t = Thought { metadata: raw.metadata, data: Vec::new(), actions: raw.actions, skills: raw.skills };
        t.set_data(raw.data);
        t
    }
}

/// Thoughts are equal when their data tables are equal.
impl PartialEq for Thought {
    fn eq(&self, other: &Self) -> bool { self.data == other.data }
}

impl Thought {
    pub fn new() -> Self { Self::default() }
    pub fn builder() -> ThoughtBuilder { ThoughtBuilder::default() }

    /// Keynote of a phrase match: `"0"` is the whole match, `"N"` the Nth group.
    pub fn from_match(groups: &Groups) -> Self {
        let row: Record = groups.iter().enumerate()
            .filter_map(|(i, g)| g.as_ref().map(|g| (i.to_string(), Value::String(g.clone()))))
            .collect();
        Self::builder().offset(0).hits(1).row(row).build()
    }

    pub fn metadata(&self) -> &ThoughtMetadata { &self.metadata }
    pub fn data(&self) -> &[Record] { &self.data }
    pub fn count(&self) -> usize { self.metadata.count }
    pub fn actions(&self) -> &[Action] { &self.actions }
    pub fn skills(&self) -> &[String] { &self.skills }

    pub fn set_data(&mut self, data: Vec<Record>) -> &mut Self { self.data = data; self.sync(); self }
    pub fn set_query(&mut self, query: impl Into<String>) -> &mut Self { self.metadata.query = Some(query.into()); self }
    pub fn set_process(&mut self, process: impl Into<String>) -> &mut Self { self.metadata.process = Some(process.into()); self }
    pub fn set_hits(&mut self, hits: usize) -> &mut Self { self.metadata.hits = hits; self }
    pub fn set_times(&mut self, times: usize) -> &mut Self { self.metadata.times = times; self }

    fn sync(&mut self) { self.metadata.count = self.data.len(); }

    pub fn first_row(&mut self) -> &mut Self { self.data.truncate(1); self.sync(); self }
    pub fn drop_first_row(&mut self) -> &mut Self {
        if !self.data.is_empty() { self.data.remove(0); }
        self.sync();
        self
    }

    /// An empty thought signals failure.
    pub fn is_failed(&self) -> bool { self.data.is_empty() && self.actions.is_empty() }

    pub fn has_empty_observation(&self, name: &str) -> bool {
        self.observation(name).map(|v| v.is_empty()).unwrap_or(true)
    }

    /// Record an observation in front of existing observations of the same name,
    /// so the newest value is found first while older ones stay for backtracking.
    pub fn add_observation(&mut self, name: &str, value: impl Into<String>) -> &mut Self {
        let value = Value::String(value.into());
        match self.data.iter().position(|row| row.contains_key(name)) {
            Some(0) => {
                let mut row = Record::new();
                row.insert(name.to_string(), value);
                self.data.insert(0, row);
            }
            Some(i) => { self.data[i - 1].insert(name.to_string(), value); }
            None => match self.data.first_mut() {
                Some(row) => { row.insert(name.to_string(), value); }
                None => {
                    let mut row = Record::new();
                    row.insert(name.to_string(), value);
                    self.data.push(row);
                }
            },
        }
        self.sync();
        self
    }

    pub fn observation(&self, name: &str) -> Option<String> {
        self.data.iter().find_map(|row| row.get(name)).map(value_string)
    }

    pub fn observations(&self, name: &str) -> Vec<String> {
        self.data.iter().filter_map(|row| row.get(name)).map(value_string).collect()
    }

    /// Value for a unification variable; `a.b` reaches into an object value.
    pub fn resolve(&self, name: &str) -> Option<String> {
        if let Some(v) = self.observation(name) { return Some(v); }
        let (key, sub) = name.split_once('.')?;
        self.data.iter().find_map(|row| row.get(key).and_then(|v| v.get(sub))).map(value_string)
    }

    /// Merge a table into this thought. Rows merge positionally; an identical row
    /// ends the merge, a row sharing no key starts a new row.
    pub fn assertz(&mut self, table: &[Record]) -> &mut Self {
        let mut cursor = 0;
        'rows: for incoming in table {
            while cursor < self.data.len() {
                if same_row(incoming, &self.data[cursor]) { break 'rows; }
                if !incoming.keys().any(|k| self.data[cursor].contains_key(k)) { break; }
                cursor += 1;
            }
            if cursor >= self.data.len() { self.data.push(Record::new()); }
            for (k, v) in incoming { self.data[cursor].insert(k.clone(), v.clone()); }
        }
        self.sync();
        self
    }

    pub fn add_action(&mut self, action: Action) -> &mut Self { self.actions.push(action); self }
    pub fn add_actions(&mut self, actions: impl IntoIterator<Item = Action>) -> &mut Self { self.actions.extend(actions); self }
    pub fn take_actions(&mut self) -> Vec<Action> { std::mem::take(&mut self.actions) }
    pub fn set_actions(&mut self, actions: Vec<Action>) -> &mut Self { self.actions = actions; self }

    pub fn add_skill(&mut self, skill: impl Into<String>) -> &mut Self {
        let skill = skill.into();
        if !self.skills.contains(&skill) { self.skills.push(skill); }
        self
    }
    pub fn set_skills(&mut self, skills: Vec<String>) -> &mut Self { self.skills = skills; self }
}

fn same_row(a: &Record, b: &Record) -> bool {
    a.len() == b.len() && a.iter().all(|(k, v)| b.get(k).map(|w| value_string(v) == value_string(w)).unwrap_or(false))
}

pub(crate) fn value_string(v: &Value) -> String {
    match v {
        Value::String(s) => s.clone(),
        Value::Null => String::new(),
        other => other.to_string(),
    }
}

/// Builder for thoughts produced by procedures and collaborators
#[derive(Debug, Default)]
pub struct ThoughtBuilder {
    thought: Thought,
}

impl ThoughtBuilder {
    pub fn offset(mut self, offset: usize) -> Self { self.thought.metadata.offset = offset; self }
    pub fn hits(mut self, hits: usize) -> Self { self.thought.metadata.hits = hits; self }
    pub fn query(mut self, query: impl Into<String>) -> Self { self.thought.metadata.query = Some(query.into()); self }
    pub fn process(mut self, process: impl Into<String>) -> Self { self.thought.metadata.process = Some(process.into()); self }
    pub fn scraper_info(mut self, info: impl Into<String>) -> Self { self.thought.metadata.scraper_info = Some(info.into()); self }
    pub fn row(mut self, row: Record) -> Self { self.thought.data.push(row); self }
    pub fn rows(mut self, rows: impl IntoIterator<Item = Record>) -> Self { self.thought.data.extend(rows); self }
    pub fn observation(mut self, name: &str, value: impl Into<String>) -> Self { self.thought.add_observation(name, value); self }
    pub fn build(mut self) -> Thought { self.thought.sync(); self.thought }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn row(v: Value) -> Record { v.as_object().cloned().unwrap() }

    #[test]
    fn test_count_tracks_data() {
        let mut t = Thought::builder().row(row(json!({"a": 1}))).row(row(json!({"a": 2}))).build();
        assert_eq!(t.count(), 2);
        t.drop_first_row();
        assert_eq!(t.count(), 1);
        t.add_observation("b", "x");
        assert_eq!(t.count(), 1);
        t.add_observation("b", "y");
        assert_eq!(t.count(), 2);
        assert_eq!(t.observation("b").as_deref(), Some("y"));
        assert_eq!(t.observations("b"), vec!["y", "x"]);
    }

    #[test]
    fn test_from_match_and_failure() {
        let t = Thought::from_match(&vec![Some("hello world".into()), Some("world".into()), None]);
        assert_eq!(t.observation("0").as_deref(), Some("hello world"));
        assert_eq!(t.observation("1").as_deref(), Some("world"));
        assert!(t.observation("2").is_none());
        assert!(!t.is_failed());
        assert!(Thought::new().is_failed());
    }

    #[test]
    fn test_equality_is_data_only() {
        let a = Thought::builder().query("q1").observation("x", "1").build();
        let b = Thought::builder().query("q2").observation("x", "1").build();
        assert_eq!(a, b);
    }

    #[test]
    fn test_assertz_merges_rows() {
        let mut t = Thought::builder().row(row(json!({"query": "hi"}))).build();
        t.assertz(&[row(json!({"answer": "hello"}))]);
        assert_eq!(t.count(), 1);
        assert_eq!(t.observation("answer").as_deref(), Some("hello"));
        t.assertz(&[row(json!({"query": "hi", "answer": "hello"}))]);
        assert_eq!(t.count(), 1);
        let mut u = Thought::builder().row(row(json!({"a": "1"}))).build();
        u.assertz(&[row(json!({"a": "2"})), row(json!({"a": "3"}))]);
        assert_eq!(u.observations("a"), vec!["1", "2", "3"]);
    }

    #[test]
    fn test_resolve_nested() {
        let t = Thought::builder().row(row(json!({"place": {"city": "berlin"}, "n": 3}))).build();
        assert_eq!(t.resolve("place.city").as_deref(), Some("berlin"));
        assert_eq!(t.resolve("n").as_deref(), Some("3"));
        assert!(t.resolve("place.zip").is_none());
    }

    #[test]
    fn test_deserialize_restores_count() {
        let t: Thought = serde_json::from_value(json!({"metadata": {"count": 9}, "data": [{"a": "1"}]})).unwrap();
        assert_eq!(t.count(), 1);
    }
}
