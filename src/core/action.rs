//! Action: response templates rendered against a finished argument

use rand::Rng;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use crate::core::skill::SkillError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RenderType {
    Answer,
    Table,
    Piechart,
    Rss,
    Websearch,
    Anchor,
    Map,
    Stop,
}

impl RenderType {
    fn required(&self) -> &'static [&'static str] {
        match self {
            RenderType::Answer | RenderType::Stop => &[],
            RenderType::Table => &["columns"],
            RenderType::Piechart => &["total", "key", "value", "unit"],
            RenderType::Rss => &["title", "description", "link"],
            RenderType::Websearch => &["query"],
            RenderType::Anchor => &["link", "text"],
            RenderType::Map => &["latitude", "longitude", "zoom"],
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SelectionType {
    #[default]
    Random,
    Roundrobin,
}

/// Conversational purpose of a response, inferred from its shape
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum DialogType {
    Answer,
    Question,
    Reply,
}

impl DialogType {
    pub const COUNT: i64 = 3;

    pub fn subscore(&self) -> i64 { *self as i64 }

    /// A `?` past the first few characters makes a question, a reply if it also has a sentence break.
    pub fn of(phrase: &str) -> Self {
        match phrase.find('?') {
            Some(p) if p > 3 => if phrase.contains(". ") { DialogType::Reply } else { DialogType::Question },
            _ => DialogType::Answer,
        }
    }
}

/// Raw action definition (for serialization)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ActionDef {
    #[serde(rename = "type")]
    pub render_type: RenderType,
    #[serde(default, skip_serializing_if = "Option::is_none")] pub select: Option<SelectionType>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")] pub phrases: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")] pub expression: Option<String>,
    #[serde(flatten)] pub attrs: Map<String, Value>,
}

impl ActionDef {
    pub fn answer(phrases: &[&str]) -> Self {
        Self {
            render_type: RenderType::Answer,
            select: Some(SelectionType::Random),
            phrases: phrases.iter().map(|p| p.to_string()).collect(),
            expression: None,
            attrs: Map::new(),
        }
    }
}

/// Validated action. The round-robin cursor is shared between clones of one declaration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(try_from = "ActionDef", into = "ActionDef")]
pub struct Action {
    render_type: RenderType,
    select: SelectionType,
    phrases: Vec<String>,
    expression: Option<String>,
    attrs: Map<String, Value>,
    cursor: Arc<AtomicUsize>,
}

impl Action {
    pub fn from_def(def: ActionDef) -> Result<Self, SkillError> {
        let mut attrs = def.attrs;
        if def.render_type == RenderType::Answer && def.expression.is_none() && def.phrases.is_empty() {
            return Err(SkillError::Action("the answer action needs a phrases object".into()));
        }
        for key in def.render_type.required() {
            if !attrs.contains_key(*key) {
                return Err(SkillError::Action(format!("the {:?} action needs a {} object", def.render_type, key).to_lowercase()));
            }
        }
        if matches!(def.render_type, RenderType::Table | RenderType::Rss) && !attrs.contains_key("count") {
            attrs.insert("count".into(), Value::from(-1));
        }
        Ok(Self {
            render_type: def.render_type,
            select: def.select.unwrap_or_default(),
            phrases: def.phrases,
            expression: def.expression,
            attrs,
            cursor: Arc::new(AtomicUsize::new(0)),
        })
    }

    pub fn from_value(value: Value) -> Result<Self, SkillError> {
        let def: ActionDef = serde_json::from_value(value).map_err(|e| SkillError::Action(e.to_string()))?;
        Self::from_def(def)
    }

    pub fn render_type(&self) -> RenderType { self.render_type }
    pub fn phrases(&self) -> &[String] { &self.phrases }
    pub fn attr(&self, key: &str) -> Option<&Value> { self.attrs.get(key) }
    pub fn expression(&self) -> Option<&str> { self.expression.as_deref() }

    /// Read the rendered expression once; it is gone afterwards.
    pub fn take_expression(&mut self) -> Option<String> { self.expression.take() }

    /// Response templates: a fixed expression, or the alternative phrases.
    pub fn templates(&self) -> Vec<&str> {
        match &self.expression {
            Some(e) => vec![e.as_str()],
            None => self.phrases.iter().map(String::as_str).collect(),
        }
    }

    pub fn has_template(&self) -> bool {
        match self.render_type {
            RenderType::Answer => self.templates().iter().any(|t| !t.trim().is_empty()),
            _ => true,
        }
    }

    pub fn dialog_type(&self) -> DialogType {
        if self.render_type != RenderType::Answer { return DialogType::Answer; }
        self.templates().iter().map(|p| DialogType::of(p)).fold(DialogType::Reply, DialogType::min)
    }

    pub fn select_template(&self) -> Option<String> {
        let templates = self.templates();
        if templates.is_empty() { return None; }
        let i = match self.select {
            SelectionType::Random => rand::thread_rng().gen_range(0..templates.len()),
            SelectionType::Roundrobin => self.cursor.fetch_add(1, Ordering::Relaxed) % templates.len(),
        };
        Some(templates[i].to_string())
    }

    /// Copy carrying a rendered expression, leaving the declaration untouched.
    pub fn rendered(&self, expression: String) -> Self {
        let mut a = self.clone();
        a.expression = Some(expression);
        a
    }

    /// Copy with every string attribute passed through `f`.
    pub fn map_attrs(&self, f: impl Fn(&str) -> String) -> Self {
        let mut a = self.clone();
        for v in a.attrs.values_mut() {
            if let Value::String(s) = v { *s = f(s); }
        }
        a
    }
}

impl TryFrom<ActionDef> for Action {
    type Error = SkillError;
    fn try_from(def: ActionDef) -> Result<Self, Self::Error> { Action::from_def(def) }
}

impl From<Action> for ActionDef {
    fn from(a: Action) -> Self {
        ActionDef {
            render_type: a.render_type,
            select: (a.render_type == RenderType::Answer).then_some(a.select),
            phrases: a.phrases,
            expression: a.expression,
            attrs: a.attrs,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_dialog_type() {
        assert_eq!(DialogType::of("hi there"), DialogType::Answer);
        assert_eq!(DialogType::of("how are you?"), DialogType::Question);
        assert_eq!(DialogType::of("I see. How are you?"), DialogType::Reply);
        assert_eq!(DialogType::of("ok?"), DialogType::Answer);

        let a = Action::from_def(ActionDef::answer(&["how are you?", "fine"])).unwrap();
        assert_eq!(a.dialog_type(), DialogType::Answer);
        let q = Action::from_def(ActionDef::answer(&["how are you?"])).unwrap();
        assert_eq!(q.dialog_type(), DialogType::Question);
    }

    #[test]
    fn test_validation() {
        assert!(Action::from_value(json!({"type": "answer"})).is_err());
        assert!(Action::from_value(json!({"type": "anchor", "link": "x"})).is_err());
        assert!(Action::from_value(json!({"type": "dance"})).is_err());
        let table = Action::from_value(json!({"type": "table", "columns": {"a": "A"}})).unwrap();
        assert_eq!(table.attr("count"), Some(&json!(-1)));
        let blank = Action::from_def(ActionDef::answer(&["  "])).unwrap();
        assert!(!blank.has_template());
    }

    #[test]
    fn test_roundrobin_selection() {
        let a = Action::from_value(json!({"type": "answer", "select": "roundrobin", "phrases": ["a", "b"]})).unwrap();
        let shared = a.clone();
        assert_eq!(a.select_template().as_deref(), Some("a"));
        assert_eq!(shared.select_template().as_deref(), Some("b"));
        assert_eq!(a.select_template().as_deref(), Some("a"));
    }

    #[test]
    fn test_rendered_expression_read_once() {
        let a = Action::from_def(ActionDef::answer(&["hi"])).unwrap();
        let mut r = a.rendered("hi world".into());
        assert!(a.expression().is_none());
        let json = serde_json::to_value(&r).unwrap();
        assert_eq!(json["expression"], "hi world");
        assert_eq!(r.take_expression().as_deref(), Some("hi world"));
        assert!(r.take_expression().is_none());
    }
}
