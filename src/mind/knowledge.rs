//! Knowledge: one JSON source file of linguistic tables and skills

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::path::Path;
use crate::core::linguistics::LinguisticsDef;
use crate::core::skill::{Skill, SkillDef, SkillError};

#[derive(Debug, Clone, Default, Deserialize)]
pub struct Knowledge {
    #[serde(flatten)]
    pub linguistics: LinguisticsDef,
    /// kept raw so one bad skill does not reject the file
    #[serde(default, alias = "rules", alias = "intents")]
    pub skills: Vec<Value>,
}

impl Knowledge {
    pub fn parse(text: &str) -> Result<Self> {
        Ok(serde_json::from_str(text)?)
    }

    pub async fn read(path: &Path) -> Result<Self> {
        let text = tokio::fs::read_to_string(path).await.with_context(|| format!("reading {}", path.display()))?;
        Self::parse(&text).with_context(|| format!("parsing {}", path.display()))
    }

    /// Build every skill; rejected ones are returned with their position.
    pub fn build(&self, source: &str) -> (Vec<Skill>, Vec<(usize, SkillError)>) {
        let mut skills = Vec::new();
        let mut rejected = Vec::new();
        for (n, value) in self.skills.iter().enumerate() {
            match SkillDef::from_value(value.clone()).and_then(|def| Skill::from_def(def, source)) {
                Ok(skill) => skills.push(skill),
                Err(e) => rejected.push((n, e)),
            }
        }
        (skills, rejected)
    }
}

/// Outcome of learning one source
#[derive(Debug, Clone, Default, Serialize)]
pub struct LoadReport {
    pub source: String,
    pub learned: usize,
    /// skills that disappeared from the source and were removed
    pub retired: usize,
    pub rejected: Vec<String>,
}

impl LoadReport {
    pub fn is_clean(&self) -> bool { self.rejected.is_empty() }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_partial_success() {
        let k = Knowledge::parse(r#"{
            "filler": ["please"],
            "intents": [
                {"phrases": ["hello"], "actions": [{"type": "answer", "phrases": ["hi"]}]},
                {"phrases": ["broken ("], "actions": []},
                {"phrases": ["bye"], "actions": [{"type": "answer", "phrases": ["ciao"]}]}
            ]
        }"#).unwrap();
        assert_eq!(k.linguistics.filler, vec!["please"]);
        let (skills, rejected) = k.build("k.json");
        assert_eq!(skills.len(), 2);
        assert_eq!(rejected.len(), 1);
        assert_eq!(rejected[0].0, 1);
    }

    #[test]
    fn test_empty_and_malformed_files() {
        assert!(Knowledge::parse("{}").unwrap().skills.is_empty());
        assert!(Knowledge::parse("[1, 2").is_err());
    }
}
