//! Mind: skill retrieval, scoring, reasoning and hot reload

use anyhow::Result;
use chrono::Utc;
use serde::Serialize;
use std::collections::{HashMap, HashSet};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, RwLock};
use std::time::{Instant, SystemTime};
use crate::config::MindConfig;
use crate::core::argument::Argument;
use crate::core::inference::{Collaborator, InferenceContext};
use crate::core::linguistics::{Linguistics, Token};
use crate::core::matcher::{Groups, TimeoutMatcher};
use crate::core::paths::{skill::CATCHALL_KEY, storage};
use crate::core::phrase::{extract_meat, normalize_expression};
use crate::core::skill::{Skill, SkillId};
use crate::core::thought::Thought;
use crate::memory::{Interaction, Memories};
use crate::mind::knowledge::{Knowledge, LoadReport};

/// A retrieved skill that matched the query
#[derive(Debug, Clone)]
pub struct Idea {
    pub skill: Arc<Skill>,
    /// the query token whose key found the skill; none for catch-all skills
    pub token: Option<Token>,
    pub matches: Vec<Groups>,
}

/// Outcome of one reasoning pass
#[derive(Debug, Clone, Serialize)]
pub struct Reaction {
    pub query: String,
    pub answers: Vec<Thought>,
    /// plausible ideas considered
    pub ideas: usize,
}

impl Reaction {
    /// Rendered text of the first answer action of the best answer
    pub fn text(&self) -> Option<String> {
        self.answers.first()?.actions().iter().find_map(|a| a.expression().map(str::to_string))
    }
}

#[derive(Debug, Default)]
struct SkillIndex {
    /// active definition per id
    skills: HashMap<SkillId, Arc<Skill>>,
    /// key → skill ids in discovery order
    by_key: HashMap<String, Vec<SkillId>>,
    /// source → skills it defines, as last learned
    sources: HashMap<String, Vec<Arc<Skill>>>,
    /// id → sources defining it, the latest learned last; that one is active
    holders: HashMap<SkillId, Vec<String>>,
}

impl SkillIndex {
    fn unlink(&mut self, id: &SkillId) {
        if let Some(old) = self.skills.remove(id) {
            for key in old.keys() {
                if let Some(ids) = self.by_key.get_mut(key) {
                    ids.retain(|i| i != id);
                    if ids.is_empty() { self.by_key.remove(key); }
                }
            }
        }
    }

    fn activate(&mut self, skill: Arc<Skill>) {
        let id = skill.id().clone();
        self.unlink(&id);
        for key in skill.keys() {
            self.by_key.entry(key.clone()).or_default().push(id.clone());
        }
        self.skills.insert(id, skill);
    }

    /// Definition of `id` held by `source`
    fn defined_by(&self, source: &str, id: &SkillId) -> Option<Arc<Skill>> {
        self.sources.get(source)?.iter().find(|s| s.id() == id).cloned()
    }

    /// Replace everything `owner` defines with `skills`. An id `owner` dropped falls back
    /// to the latest other source still defining it; returns the number retired.
    fn install(&mut self, owner: &str, skills: Vec<Skill>) -> usize {
        let fresh: Vec<Arc<Skill>> = skills.into_iter().map(Arc::new).collect();
        let fresh_ids: HashSet<SkillId> = fresh.iter().map(|s| s.id().clone()).collect();
        let previous = self.sources.remove(owner).unwrap_or_default();

        let mut retired = 0;
        for old in previous.iter().filter(|s| !fresh_ids.contains(s.id())) {
            let id = old.id().clone();
            let holders = self.holders.entry(id.clone()).or_default();
            let was_active = holders.last().map_or(false, |h| h == owner);
            holders.retain(|h| h != owner);
            match holders.last().cloned() {
                Some(fallback) => {
                    if !was_active { continue; }
                    if let Some(skill) = self.defined_by(&fallback, &id) { self.activate(skill); }
                }
                None => {
                    self.holders.remove(&id);
                    self.unlink(&id);
                    retired += 1;
                }
            }
        }

        for skill in &fresh {
            let holders = self.holders.entry(skill.id().clone()).or_default();
            holders.retain(|h| h != owner);
            holders.push(owner.to_string());
            self.activate(Arc::clone(skill));
        }
        if !fresh.is_empty() { self.sources.insert(owner.to_string(), fresh); }
        retired
    }
}

pub struct Mind {
    config: MindConfig,
    ctx: InferenceContext,
    linguistics: RwLock<Linguistics>,
    index: RwLock<SkillIndex>,
    observed: Mutex<HashMap<PathBuf, SystemTime>>,
    latest_observe: Mutex<Option<Instant>>,
    memories: Memories,
}

impl Mind {
    pub fn new(config: MindConfig) -> Self {
        let ctx = InferenceContext {
            matcher: TimeoutMatcher::new(config.match_timeout),
            timeout: config.inference_timeout,
            collaborators: Vec::new(),
        };
        Self {
            memories: Memories::from_config(&config),
            ctx,
            config,
            linguistics: RwLock::new(Linguistics::new()),
            index: RwLock::new(SkillIndex::default()),
            observed: Mutex::new(HashMap::new()),
            latest_observe: Mutex::new(None),
        }
    }

    /// New mind with every knowledge directory scanned once.
    pub async fn open(config: MindConfig) -> Result<Self> {
        let mind = Self::new(config);
        mind.rescan().await?;
        Ok(mind)
    }

    pub fn with_collaborator(mut self, collaborator: Arc<dyn Collaborator>) -> Self {
        self.ctx.collaborators.push(collaborator);
        self
    }

    pub fn config(&self) -> &MindConfig { &self.config }
    pub fn memories(&self) -> &Memories { &self.memories }

    fn read_index(&self) -> std::sync::RwLockReadGuard<'_, SkillIndex> { self.index.read().unwrap_or_else(|p| p.into_inner()) }

    pub fn skill_count(&self) -> usize { self.read_index().skills.len() }

    /// All skills, best score first
    pub fn skills(&self) -> Vec<Arc<Skill>> {
        let mut skills: Vec<Arc<Skill>> = self.read_index().skills.values().cloned().collect();
        skills.sort_by(|a, b| b.score().value.cmp(&a.score().value).then_with(|| a.id().cmp(b.id())));
        skills
    }

    pub fn skill(&self, id: &SkillId) -> Option<Arc<Skill>> { self.read_index().skills.get(id).cloned() }

    /// Learn tables and skills of one source; skills it learned before and no longer has are retired.
    pub fn learn(&self, knowledge: &Knowledge, source: &str) -> LoadReport {
        if !knowledge.linguistics.is_empty() {
            self.linguistics.write().unwrap_or_else(|p| p.into_inner()).learn(&knowledge.linguistics);
        }
        let name = Path::new(source).file_name().map(|n| n.to_string_lossy().into_owned()).unwrap_or_else(|| source.to_string());
        let (skills, rejected) = knowledge.build(&name);
        let mut report = LoadReport { source: source.to_string(), learned: skills.len(), ..Default::default() };
        for (n, e) in rejected {
            tracing::warn!(source, skill = n, error = %e, "rejected skill");
            report.rejected.push(format!("skill {}: {}", n, e));
        }
        report.retired = self.index.write().unwrap_or_else(|p| p.into_inner()).install(source, skills);
        tracing::info!(source, learned = report.learned, rejected = report.rejected.len(), retired = report.retired, "learned");
        report
    }

    pub fn learn_json(&self, text: &str, source: &str) -> Result<LoadReport> {
        Ok(self.learn(&Knowledge::parse(text)?, source))
    }

    pub async fn learn_file(&self, path: &Path) -> Result<LoadReport> {
        let knowledge = Knowledge::read(path).await?;
        Ok(self.learn(&knowledge, &path.to_string_lossy()))
    }

    /// Rescan the knowledge directories unless the last scan is younger than the observe interval.
    pub async fn observe(&self) -> Result<Vec<LoadReport>> {
        {
            let mut latest = self.latest_observe.lock().unwrap_or_else(|p| p.into_inner());
            if latest.map_or(false, |t| t.elapsed() < self.config.observe_interval) { return Ok(Vec::new()); }
            *latest = Some(Instant::now());
        }
        self.rescan().await
    }

    /// Learn every knowledge file changed since it was last observed; retire vanished files.
    pub async fn rescan(&self) -> Result<Vec<LoadReport>> {
        let mut files = Vec::new();
        let mut unreadable = Vec::new();
        for dir in &self.config.skill_dirs {
            collect_knowledge_files(dir, &mut files, &mut unreadable).await;
        }
        files.sort();

        let mut reports = Vec::new();
        for path in &files {
            let modified = match tokio::fs::metadata(path).await.and_then(|m| m.modified()) {
                Ok(t) => t,
                Err(e) => {
                    tracing::warn!(path = %path.display(), error = %e, "cannot stat knowledge file");
                    continue;
                }
            };
            let seen = self.observed.lock().unwrap_or_else(|p| p.into_inner()).get(path).copied();
            if seen.map_or(false, |t| modified <= t) { continue; }
            self.observed.lock().unwrap_or_else(|p| p.into_inner()).insert(path.clone(), modified);
            match self.learn_file(path).await {
                Ok(report) => reports.push(report),
                Err(e) => tracing::warn!(path = %path.display(), error = %e, "cannot learn knowledge file"),
            }
        }

        let vanished: Vec<PathBuf> = {
            let mut observed = self.observed.lock().unwrap_or_else(|p| p.into_inner());
            let gone: Vec<PathBuf> = observed
                .keys()
                .filter(|p| !files.contains(*p) && !unreadable.iter().any(|d| p.starts_with(d)))
                .cloned()
                .collect();
            for p in &gone { observed.remove(p); }
            gone
        };
        for path in vanished {
            let source = path.to_string_lossy().into_owned();
            let retired = self.index.write().unwrap_or_else(|p| p.into_inner()).install(&source, Vec::new());
            tracing::info!(source = %source, retired, "knowledge file removed");
            reports.push(LoadReport { source, retired, ..Default::default() });
        }
        Ok(reports)
    }

    /// Retrieve, score and match candidate skills for a query, best first.
    pub async fn associate(&self, query: &str) -> Vec<Idea> {
        let query = normalize_expression(query);
        let tokens = self.linguistics.read().unwrap_or_else(|p| p.into_inner()).tokenize(&query);

        let mut candidates: Vec<(Arc<Skill>, Option<Token>)> = Vec::new();
        {
            let index = self.read_index();
            let mut seen: HashSet<&SkillId> = HashSet::new();
            for token in &tokens {
                // phrase keys are built from literal characters only
                let mut keys = vec![token.categorized.clone(), token.original.clone()];
                keys.push(extract_meat(&token.categorized));
                keys.push(extract_meat(&token.original));
                let mut tried: HashSet<String> = HashSet::new();
                for key in keys.into_iter().filter(|k| !k.is_empty()) {
                    if !tried.insert(key.clone()) { continue; }
                    for id in index.by_key.get(&key).into_iter().flatten() {
                        if seen.insert(id) {
                            if let Some(skill) = index.skills.get(id) { candidates.push((Arc::clone(skill), Some(token.clone()))); }
                        }
                    }
                }
            }
            for id in index.by_key.get(CATCHALL_KEY).into_iter().flatten() {
                if seen.insert(id) {
                    if let Some(skill) = index.skills.get(id) { candidates.push((Arc::clone(skill), None)); }
                }
            }
        }
        candidates.sort_by(|a, b| b.0.score().value.cmp(&a.0.score().value));

        let mut ideas = Vec::new();
        for (skill, token) in candidates {
            if ideas.len() >= self.config.max_ideas { break; }
            let matches = skill.matches(&self.ctx.matcher, &query).await;
            if !matches.is_empty() { ideas.push(Idea { skill, token, matches }); }
        }
        tracing::debug!(query = %query, tokens = tokens.len(), ideas = ideas.len(), "associated");
        ideas
    }

    /// Recall thought built from the client's short-term memory
    pub async fn recall(&self, client: &str) -> Thought {
        let mut dispute = Argument::new();
        for interaction in self.memories.cognitions(client).await.iter().rev() {
            dispute.think(interaction.recall_dispute());
        }
        dispute.mindmeld(true)
    }

    /// One reasoning pass; nothing is recorded.
    pub async fn react(&self, query: &str, client: &str) -> Reaction {
        if let Err(e) = self.observe().await {
            tracing::warn!(error = %e, "knowledge rescan failed");
        }
        let recall = self.recall(client).await;
        let ideas = self.associate(query).await;
        let normalized = normalize_expression(query);

        let mut answers = Vec::new();
        for idea in &ideas {
            let Some(mut argument) = idea.skill.consideration(&recall, idea.token.as_ref(), &idea.matches, &self.ctx).await else { continue };
            let mut answer = argument.finding();
            if answer.actions().is_empty() { continue; }
            answer.set_query(normalized.as_str());
            tracing::debug!(skill = %idea.skill.id(), score = idea.skill.score().value, "answer");
            answers.push(answer);
            if answers.len() >= self.config.max_answers { break; }
        }
        Reaction { query: normalized, answers, ideas: ideas.len() }
    }

    /// React and remember the turn in the client's memory.
    pub async fn converse(&self, query: &str, client: &str) -> Reaction {
        let started = Utc::now();
        let reaction = self.react(query, client).await;
        self.memories.add(client, Interaction::new(query, started, reaction.answers.clone(), client)).await;
        reaction
    }
}

/// Knowledge files below `dir`, recursively. A missing directory contributes nothing;
/// directories that cannot be listed are warned about and collected in `unreadable`.
async fn collect_knowledge_files(dir: &Path, files: &mut Vec<PathBuf>, unreadable: &mut Vec<PathBuf>) {
    let mut pending = vec![dir.to_path_buf()];
    while let Some(dir) = pending.pop() {
        let mut entries = match tokio::fs::read_dir(&dir).await {
            Ok(e) => e,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => continue,
            Err(e) => {
                tracing::warn!(dir = %dir.display(), error = %e, "cannot list knowledge directory");
                unreadable.push(dir);
                continue;
            }
        };
        loop {
            let entry = match entries.next_entry().await {
                Ok(Some(entry)) => entry,
                Ok(None) => break,
                Err(e) => {
                    tracing::warn!(dir = %dir.display(), error = %e, "cannot list knowledge directory");
                    unreadable.push(dir.clone());
                    break;
                }
            };
            let path = entry.path();
            match entry.file_type().await {
                Ok(t) if t.is_dir() => pending.push(path),
                Ok(_) if path.extension().map_or(false, |e| e == storage::KNOWLEDGE_EXTENSION) => files.push(path),
                Ok(_) => {}
                Err(e) => tracing::warn!(path = %path.display(), error = %e, "cannot stat knowledge entry"),
            }
        }
    }
}
