//! Linguistics: filler, synonym and category tables plus the tokenizer

use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap, HashSet};

/// One surviving input token in its three granularities
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Token {
    pub original: String,
    pub canonical: String,
    pub categorized: String,
}

/// Tables as they appear in a knowledge file
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct LinguisticsDef {
    /// canonical → surface forms
    #[serde(default)] pub synonyms: BTreeMap<String, Vec<String>>,
    #[serde(default)] pub filler: Vec<String>,
    /// category → members
    #[serde(default)] pub categories: BTreeMap<String, Vec<String>>,
}

impl LinguisticsDef {
    pub fn is_empty(&self) -> bool { self.synonyms.is_empty() && self.filler.is_empty() && self.categories.is_empty() }
}

#[derive(Debug, Clone, Default)]
pub struct Linguistics {
    synonyms: HashMap<String, String>,
    filler: HashSet<String>,
    categories: HashMap<String, String>,
}

impl Linguistics {
    pub fn new() -> Self { Self::default() }

    /// Merge tables additively; later surface forms override earlier mappings.
    pub fn learn(&mut self, def: &LinguisticsDef) {
        for (canonical, forms) in &def.synonyms {
            for form in forms { self.synonyms.insert(form.to_lowercase(), canonical.clone()); }
        }
        self.filler.extend(def.filler.iter().map(|w| w.to_lowercase()));
        for (category, members) in &def.categories {
            for member in members { self.categories.insert(member.to_lowercase(), category.clone()); }
        }
    }

    pub fn is_filler(&self, word: &str) -> bool { self.filler.contains(&word.to_lowercase()) }

    pub fn tokenize_term(&self, term: &str) -> Token {
        let original = term.to_lowercase();
        let canonical = self.synonyms.get(&original).cloned().unwrap_or_else(|| original.clone());
        let categorized = self.categories.get(&canonical).cloned().unwrap_or_else(|| canonical.clone());
        Token { original, canonical, categorized }
    }

    pub fn tokenize(&self, sentence: &str) -> Vec<Token> {
        let mut spaced = String::with_capacity(sentence.len() + 8);
        for c in sentence.chars() {
            if matches!(c, '?' | '!' | '.' | ',' | ';' | ':') { spaced.push(' '); }
            spaced.push(c);
        }
        spaced
            .split(' ')
            .filter(|w| !w.is_empty())
            .filter(|w| !self.is_filler(w))
            .map(|w| self.tokenize_term(w))
            .collect()
    }

    pub fn counts(&self) -> (usize, usize, usize) { (self.synonyms.len(), self.filler.len(), self.categories.len()) }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tables() -> Linguistics {
        let mut l = Linguistics::new();
        l.learn(&LinguisticsDef {
            synonyms: BTreeMap::from([("hello".to_string(), vec!["hi".to_string(), "Hey".to_string()])]),
            filler: vec!["please".into()],
            categories: BTreeMap::from([("greeting".to_string(), vec!["hello".to_string()])]),
        });
        l
    }

    #[test]
    fn test_tokenize_three_forms() {
        let tokens = tables().tokenize("Hey, please tell me!");
        let originals: Vec<&str> = tokens.iter().map(|t| t.original.as_str()).collect();
        assert_eq!(originals, vec!["hey", ",", "tell", "me", "!"]);
        assert_eq!(tokens[0].canonical, "hello");
        assert_eq!(tokens[0].categorized, "greeting");
        assert_eq!(tokens[2].categorized, "tell");
    }

    #[test]
    fn test_learn_is_additive() {
        let mut l = tables();
        l.learn(&LinguisticsDef { filler: vec!["um".into()], ..Default::default() });
        assert!(l.is_filler("please"));
        assert!(l.is_filler("UM"));
        assert_eq!(l.tokenize_term("hi").canonical, "hello");
    }
}
