//! Beemind: rule-based dialogue node. Skills, Mind, Memory.
//!
//! # Architecture
//!
//! ```text
//! Mind (entry point)
//!   │
//!   ├── Linguistics (synonyms, filler, categories → Token)
//!   │
//!   ├── Skill index (key → skills, hot reloaded from knowledge files)
//!   │     └── Skill: Phrase* │ Inference* │ Action* │ Score
//!   │
//!   ├── InferenceContext
//!   │     ├── TimeoutMatcher (every regex runs under a deadline)
//!   │     └── Collaborator* (console / javascript / prolog steps)
//!   │
//!   └── Memories (client key → Identity)
//!         └── Awareness (short │ long) + InteractionLog (JSON lines)
//! ```
//!
//! # Operations
//!
//! | Operation | Method | Description |
//! |------|--------|-------------|
//! | learn | `mind.learn_file(path)` | Learn tables and skills of one knowledge file |
//! | observe | `mind.observe()` | Throttled rescan, re-learn changed files |
//! | associate | `mind.associate(query)` | Ideas: matching skills, best first |
//! | react | `mind.react(query, client)` | One reasoning pass |
//! | converse | `mind.converse(query, client)` | React and remember the turn |
//!
//! # Features
//!
//! - `native` - CLI binary, platform data directory, log subscriber
//!
//! # Usage
//!
//! ```ignore
//! use beemind::{Mind, MindConfig, Attention};
//!
//! let mind = Mind::open(
//!     MindConfig::new("/var/lib/beemind")
//!         .with_skills_dir("/etc/beemind/skills")
//!         .with_attention(Attention::Limited(10))
//! ).await?;
//!
//! let reaction = mind.converse("hello world", "alice").await;
//! println!("{}", reaction.text().unwrap_or_default());
//! ```

pub mod config;
pub mod core;
pub mod memory;
pub mod mind;
pub mod runtime;

#[cfg(feature = "native")]
pub mod logging;

pub use config::{Attention, MindConfig};
pub use crate::core::{
    Action, Argument, Collaborator, Inference, InferenceContext, InferenceType, Linguistics, Phrase, PhraseType,
    Score, Skill, SkillDef, SkillError, SkillId, Thought, TimeoutMatcher, Token,
};
pub use memory::{Awareness, Identity, Interaction, InteractionLog, Memories};
pub use mind::{watch, Idea, Knowledge, LoadReport, Mind, Reaction};
pub use runtime::{install_signal_handlers, Shutdown};
