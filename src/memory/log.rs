//! InteractionLog: append-only JSON lines, one interaction per line

use anyhow::Result;
use std::path::{Path, PathBuf};
use tokio::fs::{self, OpenOptions};
use tokio::io::AsyncWriteExt;
use crate::memory::interaction::Interaction;

#[derive(Debug, Clone)]
pub struct InteractionLog {
    path: PathBuf,
}

impl InteractionLog {
    pub fn new(path: impl Into<PathBuf>) -> Self { Self { path: path.into() } }

    pub fn path(&self) -> &Path { &self.path }

    pub async fn append(&self, interaction: &Interaction) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent).await?;
        }
        let mut line = serde_json::to_string(interaction)?;
        line.push('\n');
        let mut file = OpenOptions::new().create(true).append(true).open(&self.path).await?;
        file.write_all(line.as_bytes()).await?;
        file.flush().await?;
        Ok(())
    }

    /// The `recall` most recent interactions, oldest first. Corrupt lines are skipped.
    pub async fn load(&self, recall: usize) -> Result<Vec<Interaction>> {
        let content = match fs::read_to_string(&self.path).await {
            Ok(c) => c,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(e.into()),
        };
        let lines: Vec<&str> = content.lines().collect();
        let mut recent = Vec::new();
        for (n, line) in lines.iter().enumerate().rev() {
            if recent.len() >= recall { break; }
            if line.trim().is_empty() { continue; }
            match serde_json::from_str::<Interaction>(line) {
                Ok(i) => recent.push(i),
                Err(e) => tracing::warn!(path = %self.path.display(), line = n + 1, error = %e, "skipping corrupt log line"),
            }
        }
        recent.reverse();
        Ok(recent)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    #[tokio::test]
    async fn test_append_and_load_recent() {
        let dir = tempfile::tempdir().unwrap();
        let log = InteractionLog::new(dir.path().join("c").join("log.txt"));
        for q in ["a", "b", "c", "d"] {
            log.append(&Interaction::new(q, Utc::now(), Vec::new(), "c")).await.unwrap();
        }
        let recent: Vec<String> = log.load(2).await.unwrap().into_iter().map(|i| i.query).collect();
        assert_eq!(recent, vec!["c", "d"]);
        assert_eq!(log.load(100).await.unwrap().len(), 4);
    }

    #[tokio::test]
    async fn test_missing_and_corrupt() {
        let dir = tempfile::tempdir().unwrap();
        let log = InteractionLog::new(dir.path().join("log.txt"));
        assert!(log.load(10).await.unwrap().is_empty());
        log.append(&Interaction::new("ok", Utc::now(), Vec::new(), "c")).await.unwrap();
        tokio::fs::write(log.path(), format!("{}{{not json\n\n", tokio::fs::read_to_string(log.path()).await.unwrap())).await.unwrap();
        log.append(&Interaction::new("after", Utc::now(), Vec::new(), "c")).await.unwrap();
        let queries: Vec<String> = log.load(10).await.unwrap().into_iter().map(|i| i.query).collect();
        assert_eq!(queries, vec!["ok", "after"]);
    }

    #[tokio::test]
    async fn test_recall_counts_only_valid_lines_from_the_tail() {
        let dir = tempfile::tempdir().unwrap();
        let log = InteractionLog::new(dir.path().join("log.txt"));
        for q in ["a", "b"] {
            log.append(&Interaction::new(q, Utc::now(), Vec::new(), "c")).await.unwrap();
        }
        let torn = format!("{}{{\"query\": \"to", tokio::fs::read_to_string(log.path()).await.unwrap());
        tokio::fs::write(log.path(), torn).await.unwrap();
        let queries: Vec<String> = log.load(1).await.unwrap().into_iter().map(|i| i.query).collect();
        assert_eq!(queries, vec!["b"]);
    }
}
