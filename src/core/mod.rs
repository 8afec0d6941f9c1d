//! Core: the knowledge representation shared by Mind and Memory
//!
//! # Reasoning pass
//!
//! ```text
//! query ─► Phrase (anchored regex, TimeoutMatcher)
//!            │ groups
//!            ▼
//!          Skill.consideration
//!            │  keynote Thought ─► Argument
//!            │  Inference* (flow | memory | Collaborator)
//!            ▼
//!          Argument.finding ─► Action (unified template) ─► answer Thought
//! ```

pub mod action;
pub mod argument;
pub mod inference;
pub mod linguistics;
pub mod matcher;
pub mod paths;
pub mod phrase;
pub mod skill;
pub mod thought;

pub use action::{Action, ActionDef, DialogType, RenderType, SelectionType};
pub use argument::Argument;
pub use inference::{Collaborator, Inference, InferenceContext, InferenceDef, InferenceType};
pub use linguistics::{Linguistics, LinguisticsDef, Token};
pub use matcher::{Groups, TimeoutMatcher};
pub use phrase::{Phrase, PhraseDef, PhraseType};
pub use skill::{Score, Skill, SkillDef, SkillError, SkillId};
pub use thought::{Record, Thought, ThoughtBuilder};
