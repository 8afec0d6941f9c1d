//! Phrase: one utterance pattern of a skill, compiled to an anchored regex

use regex::{Regex, RegexBuilder};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use crate::core::matcher::{Groups, TimeoutMatcher};
use crate::core::paths::{phrase as consts, skill::MAX_MEATSIZE};
use crate::core::skill::SkillError;

/// Raw phrase definition: either a bare expression or `{type, expression}`
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(untagged)]
pub enum PhraseDef {
    Plain(String),
    Typed {
        #[serde(rename = "type", default, skip_serializing_if = "Option::is_none")]
        kind: Option<String>,
        expression: String,
    },
}

impl PhraseDef {
    pub fn expression(&self) -> &str {
        match self { PhraseDef::Plain(e) => e, PhraseDef::Typed { expression, .. } => expression }
    }
    pub fn kind(&self) -> Option<&str> {
        match self { PhraseDef::Plain(_) => None, PhraseDef::Typed { kind, .. } => kind.as_deref() }
    }
}

impl From<&str> for PhraseDef {
    fn from(s: &str) -> Self { PhraseDef::Plain(s.to_string()) }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PhraseType {
    /// compiles to `(.*)`, accepts anything
    CatchAll,
    Exact,
    Wildcard,
    Regex,
}

impl PhraseType {
    /// Number of distinct specificity tiers, used as score factor cardinality
    pub const TIERS: i64 = 4;

    pub fn as_str(&self) -> &'static str {
        match self {
            PhraseType::CatchAll => "catchall",
            PhraseType::Exact => "exact",
            PhraseType::Wildcard => "wildcard",
            PhraseType::Regex => "regex",
        }
    }

    pub fn from_str(value: &str) -> Option<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "exact" | "minor" | "prior" => Some(PhraseType::Exact),
            "wildcard" | "pattern" => Some(PhraseType::Wildcard),
            "regex" => Some(PhraseType::Regex),
            "catchall" => Some(PhraseType::CatchAll),
            _ => None,
        }
    }

    fn tier(&self) -> i64 {
        match self {
            PhraseType::CatchAll => 0,
            PhraseType::Wildcard | PhraseType::Regex => 1,
            PhraseType::Exact => 3,
        }
    }
}

/// Compiled phrase with cached regex
#[derive(Debug, Clone)]
pub struct Phrase {
    kind: PhraseType,
    expression: String,
    regex: Arc<Regex>,
    has_capture_groups: bool,
    meatsize: usize,
}

impl Phrase {
    pub fn compile(def: &PhraseDef) -> Result<Self, SkillError> {
        let expression = normalize_expression(def.expression());
        let kind = match def.kind() {
            Some(t) => PhraseType::from_str(t).unwrap_or_else(|| {
                tracing::warn!(kind = t, expression = %expression, "unknown phrase type, inferring");
                infer_type(&expression, PhraseType::Exact)
            }),
            None => infer_type(&expression, PhraseType::Exact),
        };
        let kind = match kind {
            PhraseType::Exact | PhraseType::CatchAll => infer_type(&expression, kind),
            other => other,
        };
        let expression = if kind == PhraseType::Wildcard { parse_pattern(&expression) } else { expression };
        if expression.is_empty() {
            return Err(SkillError::Phrase { expression, reason: "empty expression".into() });
        }
        let regex = RegexBuilder::new(&format!("^(?:{})$", expression))
            .size_limit(consts::REGEX_SIZE_LIMIT)
            .build()
            .map_err(|e| SkillError::Phrase { expression: expression.clone(), reason: e.to_string() })?;
        let kind = if expression == consts::CATCHALL_CAPTURE_GROUP { PhraseType::CatchAll } else { kind };
        Ok(Self {
            kind,
            has_capture_groups: expression.replace("(?", "").contains('('),
            meatsize: extract_meat(&expression).chars().count().min(MAX_MEATSIZE),
            expression,
            regex: Arc::new(regex),
        })
    }

    pub fn kind(&self) -> PhraseType { self.kind }
    /// The unanchored regular expression
    pub fn expression(&self) -> &str { &self.expression }
    pub fn regex(&self) -> &Arc<Regex> { &self.regex }
    pub fn meatsize(&self) -> usize { self.meatsize }

    pub fn subscore(&self) -> i64 {
        match self.kind {
            PhraseType::Wildcard | PhraseType::Regex if !self.has_capture_groups => self.kind.tier() + 1,
            _ => self.kind.tier(),
        }
    }

    /// Whole-query match of an already normalized query.
    pub async fn matches(&self, matcher: &TimeoutMatcher, query: &str) -> Option<Groups> {
        matcher.captures(&self.regex, &query.to_lowercase()).await
    }

    pub fn to_def(&self) -> PhraseDef {
        PhraseDef::Typed { kind: Some(self.kind.as_str().into()), expression: self.expression.clone() }
    }
}

fn infer_type(expression: &str, fallback: PhraseType) -> PhraseType {
    let wrapped = |open: char, close: char| expression.starts_with(open) && expression.ends_with(close);
    if expression.contains(".*") || wrapped('^', '$') || wrapped('(', ')') {
        PhraseType::Regex
    } else if expression.contains('*') {
        PhraseType::Wildcard
    } else {
        fallback
    }
}

/// Normalize a phrase source or a user query.
pub fn normalize_expression(s: &str) -> String {
    let mut s = s.trim().to_lowercase().replace('#', "  ").replace(',', " ").replace(";:", " ");
    while s.contains("  ") { s = s.replace("  ", " "); }
    if s.ends_with(['.', '?', '!']) {
        s.pop();
        s = s.trim().to_string();
    }
    s.replace("it's ", "it is ").replace("what's ", "what is ")
}

/// Translate wildcard syntax (`*`, `+`, `|`) into a regular expression.
pub fn parse_pattern(expression: &str) -> String {
    let alternatives: Vec<&str> = expression.split('|').collect();
    if alternatives.len() == 1 {
        return parse_one(alternatives[0]);
    }
    alternatives.iter().map(|a| format!("(?:{})", parse_one(a))).collect::<Vec<_>>().join("|")
}

fn parse_one(expression: &str) -> String {
    let e = parse_meta(expression, '*', consts::CATCHALL_CAPTURE_GROUP);
    parse_meta(&e, '+', consts::CATCHONE_CAPTURE_GROUP)
}

fn parse_meta(expression: &str, meta: char, group: &str) -> String {
    let lone = meta.to_string();
    let mut e = if expression.is_empty() || expression == lone { group.to_string() } else { expression.to_string() };
    if e.ends_with(['?', '!', ':', '.']) { e.pop(); }
    let lead = format!("{} ", meta);
    if let Some(rest) = e.strip_prefix(lead.as_str()) { e = format!("{} {}", group, rest); }
    if let Some(rest) = e.strip_prefix(meta) { e = format!("{} ?{}", group, rest); }
    let trail = format!(" {}", meta);
    if let Some(rest) = e.strip_suffix(trail.as_str()) { e = format!("{} {}", rest, group); }
    if let Some(rest) = e.strip_suffix(meta) { e = format!("{} ?{}", rest, group); }
    let inner = format!(" {} ", meta);
    let inner_optional = format!(" ?{} ", meta);
    let replacement = format!(" {} ", group);
    e.replace(&inner, &replacement).replace(&inner_optional, &replacement)
}

/// A regular expression has no meat; detected by escapes or a paren pair that compiles.
pub fn is_regular_expression(expression: &str) -> bool {
    (expression.contains('\\') || (expression.contains('(') && expression.contains(')')))
        && Regex::new(expression).is_ok()
}

/// Literal characters of an expression: letters, digits, space and underscore.
pub fn extract_meat(expression: &str) -> String {
    if is_regular_expression(expression) { return String::new(); }
    expression.chars().filter(|c| c.is_alphanumeric() || *c == ' ' || *c == '_').collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_expression() {
        assert_eq!(normalize_expression("  Hello,   World! "), "hello world");
        assert_eq!(normalize_expression("what's up?"), "what is up");
        assert_eq!(normalize_expression("good#night"), "good night");
        assert_eq!(normalize_expression("it's late."), "it is late");
        assert_eq!(normalize_expression(""), "");
    }

    #[test]
    fn test_parse_pattern() {
        assert_eq!(parse_pattern("hello *"), "hello (.*)");
        assert_eq!(parse_pattern("* is great"), "(.*) is great");
        assert_eq!(parse_pattern("*ing"), "(.*) ?ing");
        assert_eq!(parse_pattern("tell me * about *"), "tell me (.*) about (.*)");
        assert_eq!(parse_pattern("*"), "(.*)");
        assert_eq!(parse_pattern("call +"), r"call (\S+)");
        assert_eq!(parse_pattern("hi *|hello *"), "(?:hi (.*))|(?:hello (.*))");
    }

    #[test]
    fn test_phrase_types_and_subscores() {
        let exact = Phrase::compile(&"what is the weather".into()).unwrap();
        assert_eq!(exact.kind(), PhraseType::Exact);
        assert_eq!(exact.subscore(), 3);
        assert_eq!(exact.meatsize(), 19);

        let wild = Phrase::compile(&"weather *".into()).unwrap();
        assert_eq!(wild.kind(), PhraseType::Wildcard);
        assert_eq!(wild.expression(), "weather (.*)");
        assert_eq!(wild.subscore(), 1);
        assert_eq!(wild.meatsize(), 0);

        let all = Phrase::compile(&"*".into()).unwrap();
        assert_eq!(all.kind(), PhraseType::CatchAll);
        assert_eq!(all.subscore(), 0);

        let re = Phrase::compile(&PhraseDef::Typed { kind: Some("regex".into()), expression: "^a+b$".into() }).unwrap();
        assert_eq!(re.kind(), PhraseType::Regex);
        assert_eq!(re.subscore(), 2);
    }

    #[test]
    fn test_malformed_phrase_rejected() {
        let err = Phrase::compile(&PhraseDef::Typed { kind: Some("regex".into()), expression: "(unclosed".into() });
        assert!(matches!(err, Err(SkillError::Phrase { .. })));
    }

    #[test]
    fn test_extract_meat() {
        assert_eq!(extract_meat("what's the time?"), "whats the time");
        assert_eq!(extract_meat("hello (.*)"), "");
        assert_eq!(extract_meat("weather"), "weather");
    }

    #[tokio::test]
    async fn test_phrase_matches_whole_query() {
        let m = TimeoutMatcher::default();
        let p = Phrase::compile(&"hello *".into()).unwrap();
        let groups = p.matches(&m, "hello world").await.unwrap();
        assert_eq!(groups[1].as_deref(), Some("world"));
        assert!(p.matches(&m, "say hello world").await.is_none());
    }

    #[tokio::test]
    async fn test_nested_quantifiers_stay_bounded() {
        let m = TimeoutMatcher::new(std::time::Duration::from_millis(500));
        let p = Phrase::compile(&PhraseDef::Typed { kind: Some("regex".into()), expression: "(a+)+$".into() }).unwrap();
        let query = format!("{}!", "a".repeat(50_000));
        let started = std::time::Instant::now();
        assert!(p.matches(&m, &query).await.is_none());
        assert!(started.elapsed() < std::time::Duration::from_secs(2));
    }
}
