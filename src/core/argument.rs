//! Argument: the stack of thoughts of one reasoning pass
//!
//! The latest thought is the mindstate. Unification walks the stack backwards,
//! so newer observations shadow older ones.

use crate::core::action::{Action, RenderType};
use crate::core::thought::Thought;

#[derive(Debug, Clone, Default)]
pub struct Argument {
    recall: Vec<Thought>,
    skills: Vec<String>,
}

impl Argument {
    pub fn new() -> Self { Self::default() }

    pub fn think(&mut self, thought: Thought) -> &mut Self { self.recall.push(thought); self }

    /// Number of thoughts in the argument
    pub fn times(&self) -> usize { self.recall.len() }
    pub fn is_empty(&self) -> bool { self.recall.is_empty() }

    pub fn mindstate(&self) -> Option<&Thought> { self.recall.last() }
    pub fn mindstate_mut(&mut self) -> Option<&mut Thought> { self.recall.last_mut() }

    pub fn remember(&self, times_back: usize) -> Option<&Thought> {
        self.recall.len().checked_sub(times_back + 1).map(|i| &self.recall[i])
    }

    /// Pop the mindstate; an empty thought if there is none.
    pub fn rethink(&mut self) -> Thought { self.recall.pop().unwrap_or_default() }

    pub fn amnesia(&mut self) -> &mut Self { self.recall.clear(); self }

    /// Latest thought first
    pub fn iter(&self) -> impl Iterator<Item = &Thought> { self.recall.iter().rev() }

    /// Squash all thoughts into one; `reverse` puts the latest data first.
    pub fn mindmeld(&self, reverse: bool) -> Thought {
        let mut melted = Thought::new();
        if reverse {
            for t in self.recall.iter().rev() { melted.assertz(t.data()); }
        } else {
            for t in &self.recall { melted.assertz(t.data()); }
        }
        melted.set_times(self.recall.len());
        melted
    }

    pub fn add_skill(&mut self, skill: impl Into<String>) -> &mut Self {
        let skill = skill.into();
        if !self.skills.contains(&skill) { self.skills.push(skill); }
        self
    }
    pub fn skills(&self) -> &[String] { &self.skills }

    fn resolve(&self, name: &str) -> Option<String> { self.iter().find_map(|t| t.resolve(name)) }

    /// Replace `$name$` placeholders with the latest defining observation.
    /// Unresolved placeholders stay literal.
    pub fn unify(&self, statement: &str) -> String {
        let mut out = String::with_capacity(statement.len());
        let mut rest = statement;
        while let Some((start, end, name)) = next_variable(rest) {
            match self.resolve(name) {
                Some(value) => {
                    out.push_str(&rest[..start]);
                    out.push_str(&value);
                    rest = &rest[end..];
                }
                None => {
                    out.push_str(&rest[..end]);
                    rest = &rest[end..];
                }
            }
        }
        out.push_str(rest);
        out
    }

    /// Unify, or `None` if a placeholder could not be resolved.
    pub fn unify_strict(&self, statement: &str) -> Option<String> {
        let unified = self.unify(statement);
        if has_variable(&unified) { None } else { Some(unified) }
    }

    /// Action declarations of all thoughts, oldest first
    pub fn actions(&self) -> Vec<Action> { self.recall.iter().flat_map(|t| t.actions().iter().cloned()).collect() }

    /// Render one action against this argument. Assignments in the answer
    /// (`^text^>name`, `word>name`) become observations of the returned thought.
    pub fn apply_action(&self, action: &Action) -> Thought {
        let mut deduced = Thought::new();
        let rendered = match action.render_type() {
            RenderType::Answer => match action.select_template() {
                Some(template) => {
                    let expression = assign_visible(&assign_blind(&self.unify(&template), &mut deduced), &mut deduced);
                    let expression = expression.trim().to_string();
                    if expression.is_empty() { return deduced; }
                    action.rendered(expression)
                }
                None => return deduced,
            },
            _ => action.map_attrs(|s| self.unify(s)),
        };
        deduced.add_action(rendered);
        deduced
    }

    /// Apply all actions and meld the argument into the answer thought.
    pub fn finding(&mut self) -> Thought {
        let mut applied = Vec::new();
        for action in self.actions() {
            let mut t = self.apply_action(&action);
            if t.is_failed() { continue; }
            applied.extend(t.take_actions());
            if t.count() > 0 { self.think(t); }
        }
        let mut answer = self.mindmeld(true);
        answer.set_actions(applied).set_skills(self.skills.clone());
        answer
    }
}

fn is_variable_name(name: &str) -> bool {
    !name.is_empty() && name.chars().all(|c| c.is_alphanumeric() || c == '_' || c == '.' || c == '%')
}

/// Next `$name$` in `s` as (start, end, name), byte offsets.
fn next_variable(s: &str) -> Option<(usize, usize, &str)> {
    let mut from = 0;
    while let Some(open) = s[from..].find('$').map(|p| p + from) {
        let close = s[open + 1..].find('$').map(|p| p + open + 1)?;
        let name = &s[open + 1..close];
        if is_variable_name(name) { return Some((open, close + 1, name)); }
        from = close;
    }
    None
}

pub fn has_variable(s: &str) -> bool { next_variable(s).is_some() }

fn is_ident(c: char) -> bool { c.is_ascii_alphanumeric() || c == '_' }

/// `^text^>name`: observe `name = text`, drop the assignment from the output.
fn assign_blind(expression: &str, deduced: &mut Thought) -> String {
    let mut e = expression.to_string();
    let mut from = 0;
    while let Some(open) = e[from..].find('^').map(|p| p + from) {
        let Some(close) = e[open + 1..].find("^>").map(|p| p + open + 1) else { break };
        let name_start = close + 2;
        let name_len = e[name_start..].find(|c: char| !is_ident(c)).unwrap_or(e.len() - name_start);
        let value = &e[open + 1..close];
        if name_len == 0 || value.contains('$') { from = close + 1; continue; }
        deduced.add_observation(&e[name_start..name_start + name_len], value.to_string());
        e = format!("{}{}", &e[..open], &e[name_start + name_len..]);
        from = open;
    }
    e
}

/// `word>name`: observe `name = word`, keep the word in the output.
fn assign_visible(expression: &str, deduced: &mut Thought) -> String {
    expression
        .split(' ')
        .map(|word| {
            let Some(gt) = word.find('>') else { return word.to_string() };
            let (value, tail) = (&word[..gt], &word[gt + 1..]);
            let name_len = tail.find(|c: char| !is_ident(c)).unwrap_or(tail.len());
            if value.is_empty() || name_len == 0 || value.contains('$') || value.contains('^') {
                return word.to_string();
            }
            deduced.add_observation(&tail[..name_len], value.to_string());
            format!("{}{}", value, &tail[name_len..])
        })
        .collect::<Vec<_>>()
        .join(" ")
}
