//! Key, file and environment constants for the Mind
//!
//! Centralized registry for reserved keys, on-disk names and tuning defaults.

/// Skill index keys and scoring constants
pub mod skill {
    /// Reserved index key for skills without distinctive literal tokens
    pub const CATCHALL_KEY: &str = "*";
    pub const DEFAULT_SCORE: i64 = 10;
    pub const MAX_USER_SUBSCORE: i64 = 1000;
    pub const MAX_MEATSIZE: usize = 99;
}

/// Phrase capture groups
pub mod phrase {
    pub const CATCHALL_CAPTURE_GROUP: &str = "(.*)";
    pub const CATCHONE_CAPTURE_GROUP: &str = r"(\S+)";
    /// Compiled program size limit; larger expressions are rejected at load time
    pub const REGEX_SIZE_LIMIT: usize = 1 << 20;
}

/// Observation names written into thoughts
pub mod observation {
    pub const TOKEN_ORIGINAL: &str = "token_original";
    pub const TOKEN_CANONICAL: &str = "token_canonical";
    pub const TOKEN_CATEGORIZED: &str = "token_categorized";
    pub const QUERY: &str = "query";
    pub const ANSWER: &str = "answer";
    pub const SKILL_SOURCE: &str = "skill_source";
    pub const EXPECTED: &str = "EXPECTED";
    pub const REJECTED: &str = "REJECTED";
    /// variables with this prefix are carried into the next turn's recall
    pub const PERSISTENT_PREFIX: &str = "_";
}

/// On-disk layout below the data root
pub mod storage {
    pub const SKILLS_DIR: &str = "skills";
    pub const CLIENTS_DIR: &str = "clients";
    pub const LOG_FILE: &str = "log.txt";
    pub const KNOWLEDGE_EXTENSION: &str = "json";
}

/// Environment variables
pub mod env {
    pub const ROOT: &str = "BEEMIND_ROOT";
    pub const SKILLS: &str = "BEEMIND_SKILLS";
    pub const ATTENTION: &str = "BEEMIND_ATTENTION";
    pub const RECALL: &str = "BEEMIND_RECALL";
    pub const MATCH_TIMEOUT_MS: &str = "BEEMIND_MATCH_TIMEOUT_MS";
    pub const OBSERVE_SECS: &str = "BEEMIND_OBSERVE_SECS";
    pub const LOG_JSON: &str = "BEEMIND_LOG_JSON";
    pub const CLIENT: &str = "BEEMIND_CLIENT";
}

/// Tuning defaults
pub mod defaults {
    pub const MATCH_TIMEOUT_MS: u64 = 1_000;
    pub const INFERENCE_TIMEOUT_MS: u64 = 10_000;
    pub const OBSERVE_SECS: u64 = 10;
    pub const ATTENTION: usize = 10;
    pub const RECALL: usize = 100;
    pub const MAX_IDEAS: usize = 100;
    pub const MAX_ANSWERS: usize = 1;
}
