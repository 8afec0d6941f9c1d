//! Identity: the memory of one client

use sha2::{Digest, Sha256};
use std::path::{Path, PathBuf};
use crate::config::Attention;
use crate::core::paths::storage;
use crate::memory::awareness::Awareness;
use crate::memory::interaction::Interaction;
use crate::memory::log::InteractionLog;

/// Directory name for a client key: hex sha256, safe for any key.
pub fn client_dir_name(client: &str) -> String { hex::encode(Sha256::digest(client.as_bytes())) }

#[derive(Debug)]
pub struct Identity {
    client: String,
    dir: PathBuf,
    log: InteractionLog,
    awareness: Awareness,
    loaded: bool,
}

impl Identity {
    pub fn new(client: impl Into<String>, clients_dir: &Path, attention: Attention) -> Self {
        let client = client.into();
        let dir = clients_dir.join(client_dir_name(&client));
        Self { log: InteractionLog::new(dir.join(storage::LOG_FILE)), dir, client, awareness: Awareness::new(attention), loaded: false }
    }

    pub fn client(&self) -> &str { &self.client }
    pub fn dir(&self) -> &Path { &self.dir }
    pub fn awareness(&self) -> &Awareness { &self.awareness }
    pub fn is_loaded(&self) -> bool { self.loaded }

    /// Replay the log once. An unreadable log leaves memory empty.
    pub async fn ensure_loaded(&mut self, recall: usize) {
        if self.loaded { return; }
        self.loaded = true;
        match self.log.load(recall).await {
            Ok(interactions) => {
                tracing::debug!(client = %self.client, count = interactions.len(), "replayed log");
                for i in interactions { self.awareness.add(i); }
            }
            Err(e) => tracing::warn!(client = %self.client, error = %e, "cannot read interaction log"),
        }
    }

    /// Remember a turn. Persistence failures are logged; memory stays authoritative.
    pub async fn add(&mut self, interaction: Interaction) {
        if let Err(e) = self.log.append(&interaction).await {
            tracing::warn!(client = %self.client, path = %self.log.path().display(), error = %e, "cannot append interaction");
        }
        self.awareness.add(interaction);
    }

    /// Short-term interactions, latest first
    pub fn cognitions(&self) -> Vec<Interaction> { self.awareness.cognitions().cloned().collect() }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    #[test]
    fn test_client_dir_name() {
        let name = client_dir_name("alice@example.org");
        assert_eq!(name.len(), 64);
        assert_ne!(name, client_dir_name("bob"));
    }

    #[tokio::test]
    async fn test_cold_start_replays_log() {
        let dir = tempfile::tempdir().unwrap();
        let mut first = Identity::new("alice", dir.path(), Attention::Limited(2));
        first.ensure_loaded(100).await;
        for q in ["a", "b", "c"] { first.add(Interaction::new(q, Utc::now(), Vec::new(), "alice")).await; }

        let mut second = Identity::new("alice", dir.path(), Attention::Limited(2));
        second.ensure_loaded(100).await;
        let latest: Vec<String> = second.cognitions().into_iter().map(|i| i.query).collect();
        assert_eq!(latest, vec!["c", "b"]);
        assert_eq!(second.awareness().long_term().len(), 1);
    }

    #[tokio::test]
    async fn test_unwritable_log_keeps_memory() {
        let dir = tempfile::tempdir().unwrap();
        let blocker = dir.path().join("clients");
        std::fs::write(&blocker, b"not a directory").unwrap();
        let mut id = Identity::new("carol", &blocker, Attention::default());
        id.ensure_loaded(10).await;
        id.add(Interaction::new("still here", Utc::now(), Vec::new(), "carol")).await;
        assert_eq!(id.cognitions()[0].query, "still here");
    }
}
