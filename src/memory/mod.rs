//! Memory: per-client two-tier awareness backed by an append-only log
//!
//! ```text
//! Memories ── client key ──► Identity (tokio Mutex)
//!                              ├── Awareness: short-term (≤ attention) │ long-term
//!                              └── InteractionLog: <root>/clients/<sha256>/log.txt
//! ```

mod awareness;
mod identity;
mod interaction;
mod log;
mod memories;

pub use awareness::Awareness;
pub use identity::{client_dir_name, Identity};
pub use interaction::{client_id, Interaction};
pub use log::InteractionLog;
pub use memories::Memories;
