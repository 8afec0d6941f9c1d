//! Memories: registry of client identities

use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::{Arc, RwLock};
use tokio::sync::Mutex;
use crate::config::{Attention, MindConfig};
use crate::memory::identity::Identity;
use crate::memory::interaction::Interaction;

/// One lock per client; the registry lock is only held to look up or insert.
#[derive(Debug)]
pub struct Memories {
    clients_dir: PathBuf,
    attention: Attention,
    recall: usize,
    identities: RwLock<HashMap<String, Arc<Mutex<Identity>>>>,
}

impl Memories {
    pub fn new(clients_dir: impl Into<PathBuf>, attention: Attention, recall: usize) -> Self {
        Self { clients_dir: clients_dir.into(), attention, recall, identities: RwLock::new(HashMap::new()) }
    }

    pub fn from_config(config: &MindConfig) -> Self { Self::new(config.clients_dir(), config.attention, config.recall) }

    /// The identity of `client`, created on first use (its log is replayed on first lock).
    pub fn identity(&self, client: &str) -> Arc<Mutex<Identity>> {
        if let Some(id) = self.identities.read().unwrap_or_else(|p| p.into_inner()).get(client) {
            return Arc::clone(id);
        }
        let mut identities = self.identities.write().unwrap_or_else(|p| p.into_inner());
        Arc::clone(identities.entry(client.to_string()).or_insert_with(|| {
            Arc::new(Mutex::new(Identity::new(client, &self.clients_dir, self.attention)))
        }))
    }

    async fn loaded(&self, client: &str) -> tokio::sync::OwnedMutexGuard<Identity> {
        let mut identity = self.identity(client).lock_owned().await;
        identity.ensure_loaded(self.recall).await;
        identity
    }

    pub async fn add(&self, client: &str, interaction: Interaction) {
        self.loaded(client).await.add(interaction).await;
    }

    /// Short-term interactions of `client`, latest first
    pub async fn cognitions(&self, client: &str) -> Vec<Interaction> { self.loaded(client).await.cognitions() }

    /// All remembered interactions of `client`, latest first
    pub async fn history(&self, client: &str) -> Vec<Interaction> {
        self.loaded(client).await.awareness().history().cloned().collect()
    }

    pub fn clients(&self) -> Vec<String> {
        self.identities.read().unwrap_or_else(|p| p.into_inner()).keys().cloned().collect()
    }
}
