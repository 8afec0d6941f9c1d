//! Mind configuration - passed from higher layers or read from the environment

use anyhow::{Context, Result};
use std::fmt;
use std::path::{Path, PathBuf};
use std::time::Duration;
use crate::core::paths::{defaults, env, storage};

/// Capacity of the short-term memory tier
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Attention {
    Limited(usize),
    Unbounded,
}

impl Default for Attention {
    fn default() -> Self { Self::Limited(defaults::ATTENTION) }
}

impl Attention {
    pub fn limit(&self) -> Option<usize> {
        match self {
            Attention::Limited(n) => Some(*n),
            Attention::Unbounded => None,
        }
    }

    pub fn from_str(value: &str) -> Option<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "unbounded" | "unlimited" | "none" => Some(Attention::Unbounded),
            n => n.parse().ok().map(Attention::Limited),
        }
    }
}

impl fmt::Display for Attention {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Attention::Limited(n) => write!(f, "{}", n),
            Attention::Unbounded => f.write_str("unbounded"),
        }
    }
}

#[derive(Debug, Clone)]
pub struct MindConfig {
    /// Data root; client memories live below `<root>/clients`
    pub root: PathBuf,
    /// Knowledge directories, scanned in order
    pub skill_dirs: Vec<PathBuf>,
    pub attention: Attention,
    /// Interactions replayed from a client log at first use
    pub recall: usize,
    pub match_timeout: Duration,
    pub inference_timeout: Duration,
    pub observe_interval: Duration,
    pub max_answers: usize,
    pub max_ideas: usize,
}

impl MindConfig {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        let root = root.into();
        Self {
            skill_dirs: vec![root.join(storage::SKILLS_DIR)],
            root,
            attention: Attention::default(),
            recall: defaults::RECALL,
            match_timeout: Duration::from_millis(defaults::MATCH_TIMEOUT_MS),
            inference_timeout: Duration::from_millis(defaults::INFERENCE_TIMEOUT_MS),
            observe_interval: Duration::from_secs(defaults::OBSERVE_SECS),
            max_answers: defaults::MAX_ANSWERS,
            max_ideas: defaults::MAX_IDEAS,
        }
    }

    /// Move the data root; default knowledge directories move along.
    pub fn with_root(mut self, root: impl Into<PathBuf>) -> Self {
        let root = root.into();
        if self.skill_dirs == [self.root.join(storage::SKILLS_DIR)] {
            self.skill_dirs = vec![root.join(storage::SKILLS_DIR)];
        }
        self.root = root;
        self
    }

    /// Replace the knowledge directories with a single one.
    pub fn with_skills_dir(mut self, dir: impl Into<PathBuf>) -> Self { self.skill_dirs = vec![dir.into()]; self }
    pub fn with_skills_dirs(mut self, dirs: Vec<PathBuf>) -> Self { self.skill_dirs = dirs; self }
    pub fn with_attention(mut self, attention: Attention) -> Self { self.attention = attention; self }
    pub fn with_recall(mut self, recall: usize) -> Self { self.recall = recall; self }
    pub fn with_match_timeout(mut self, timeout: Duration) -> Self { self.match_timeout = timeout; self }
    pub fn with_inference_timeout(mut self, timeout: Duration) -> Self { self.inference_timeout = timeout; self }
    pub fn with_observe_interval(mut self, interval: Duration) -> Self { self.observe_interval = interval; self }
    pub fn with_max_answers(mut self, n: usize) -> Self { self.max_answers = n.max(1); self }

    pub fn clients_dir(&self) -> PathBuf { self.root.join(storage::CLIENTS_DIR) }

    /// Build from `BEEMIND_*` variables; unset variables keep their defaults.
    pub fn from_env() -> Result<Self> {
        let root = std::env::var(env::ROOT).map(PathBuf::from).unwrap_or_else(|_| default_root());
        let mut config = Self::new(root);
        if let Ok(dirs) = std::env::var(env::SKILLS) {
            let dirs: Vec<PathBuf> = dirs.split(',').map(str::trim).filter(|d| !d.is_empty()).map(PathBuf::from).collect();
            if !dirs.is_empty() { config.skill_dirs = dirs; }
        }
        if let Ok(value) = std::env::var(env::ATTENTION) {
            config.attention = Attention::from_str(&value).with_context(|| format!("invalid {}: {}", env::ATTENTION, value))?;
        }
        if let Ok(value) = std::env::var(env::RECALL) {
            config.recall = value.trim().parse().with_context(|| format!("invalid {}: {}", env::RECALL, value))?;
        }
        if let Ok(value) = std::env::var(env::MATCH_TIMEOUT_MS) {
            let ms: u64 = value.trim().parse().with_context(|| format!("invalid {}: {}", env::MATCH_TIMEOUT_MS, value))?;
            config.match_timeout = Duration::from_millis(ms);
        }
        if let Ok(value) = std::env::var(env::OBSERVE_SECS) {
            let secs: u64 = value.trim().parse().with_context(|| format!("invalid {}: {}", env::OBSERVE_SECS, value))?;
            config.observe_interval = Duration::from_secs(secs);
        }
        Ok(config)
    }

    pub fn root(&self) -> &Path { &self.root }
}

#[cfg(feature = "native")]
fn default_root() -> PathBuf {
    dirs::data_local_dir().map(|d| d.join("beemind")).unwrap_or_else(|| PathBuf::from(".beemind"))
}

#[cfg(not(feature = "native"))]
fn default_root() -> PathBuf { PathBuf::from(".beemind") }

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_attention_parse() {
        assert_eq!(Attention::from_str("3"), Some(Attention::Limited(3)));
        assert_eq!(Attention::from_str(" Unbounded "), Some(Attention::Unbounded));
        assert_eq!(Attention::from_str("lots"), None);
        assert_eq!(Attention::Limited(7).to_string(), "7");
        assert_eq!(Attention::Unbounded.limit(), None);
    }

    #[test]
    fn test_builder_defaults() {
        let config = MindConfig::new("/tmp/bee").with_attention(Attention::Limited(3));
        assert_eq!(config.skill_dirs, vec![PathBuf::from("/tmp/bee/skills")]);
        assert_eq!(config.clients_dir(), PathBuf::from("/tmp/bee/clients"));
        assert_eq!(config.attention.limit(), Some(3));
        assert_eq!(config.clone().with_max_answers(0).max_answers, 1);
        let moved = config.with_root("/srv/bee");
        assert_eq!(moved.skill_dirs, vec![PathBuf::from("/srv/bee/skills")]);
        let pinned = MindConfig::new("/a").with_skills_dir("/etc/skills").with_root("/b");
        assert_eq!(pinned.skill_dirs, vec![PathBuf::from("/etc/skills")]);
    }
}
