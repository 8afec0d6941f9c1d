//! Mind: retrieval and reasoning over learned skills
//!
//! # Components
//!
//! - **Mind**: owns the linguistic tables, the skill index and client memories
//! - **Knowledge**: one JSON source of tables and skills
//! - **watch**: hot reload loop over the knowledge directories
//!
//! # Reaction
//!
//! ```text
//! query ─► tokenize ─► keys ─► candidates (+ catch-all)
//!                                  │ sort by score, stable
//!                                  ▼
//!                      phrase match (timeout) ─► Idea
//!                                  │
//!                                  ▼
//!            recall ─► Skill.consideration ─► finding ─► answer
//! ```

mod knowledge;
mod mind;
mod watcher;

pub use knowledge::{Knowledge, LoadReport};
pub use mind::{Idea, Mind, Reaction};
pub use watcher::watch;
