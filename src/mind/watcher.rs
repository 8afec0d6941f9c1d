//! Watcher: periodic hot reload of knowledge directories

use std::sync::Arc;
use crate::mind::mind::Mind;
use crate::runtime::Shutdown;

/// Rescan on every observe interval until shutdown.
pub async fn watch(mind: Arc<Mind>, shutdown: Shutdown) {
    let mut rx = shutdown.subscribe();
    let mut tick = tokio::time::interval(mind.config().observe_interval);
    tick.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
    tracing::info!(interval_secs = mind.config().observe_interval.as_secs(), dirs = mind.config().skill_dirs.len(), "watching knowledge");
    loop {
        tokio::select! {
            _ = tick.tick() => {
                if shutdown.is_triggered().await { break; }
                match mind.rescan().await {
                    Ok(reports) => for r in reports.iter().filter(|r| r.learned + r.retired > 0 || !r.is_clean()) {
                        tracing::info!(source = %r.source, learned = r.learned, retired = r.retired, rejected = r.rejected.len(), "reloaded");
                    },
                    Err(e) => tracing::warn!(error = %e, "knowledge rescan failed"),
                }
            }
            _ = rx.recv() => break,
        }
    }
    tracing::info!("watcher stopped");
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::MindConfig;
    use std::time::Duration;

    #[tokio::test]
    async fn test_watch_picks_up_new_file_and_stops() {
        let dir = tempfile::tempdir().unwrap();
        let skills = dir.path().join("skills");
        std::fs::create_dir_all(&skills).unwrap();
        let config = MindConfig::new(dir.path()).with_observe_interval(Duration::from_millis(20));
        let mind = Arc::new(Mind::new(config));
        let shutdown = Shutdown::new();
        let task = tokio::spawn(watch(Arc::clone(&mind), shutdown.clone()));

        std::fs::write(skills.join("bye.json"), r#"{"skills": [{"phrases": ["bye"], "actions": [{"type": "answer", "phrases": ["ciao"]}]}]}"#).unwrap();
        let mut waited = 0;
        while mind.skill_count() == 0 && waited < 100 {
            tokio::time::sleep(Duration::from_millis(20)).await;
            waited += 1;
        }
        assert_eq!(mind.skill_count(), 1);

        shutdown.trigger().await;
        tokio::time::timeout(Duration::from_secs(2), task).await.unwrap().unwrap();
    }
}
