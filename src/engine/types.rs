use std::collections::{BTreeMap, BTreeSet, VecDeque};

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use crate::engine::pattern::Pattern;

pub const STATE_SCHEMA_VERSION: u8 = 1;

/// Capacity of the recent-command ring buffer.
pub const RECENT_COMMAND_CAPACITY: usize = 20;

/// Dangerous attempts kept in the in-state history (the store keeps the full log).
pub const DANGER_HISTORY_CAPACITY: usize = 50;

pub const XP_PER_LEVEL: u32 = 100;

/// Parallel leveling paths.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[serde(rename_all = "snake_case")]
pub enum SkillTrack {
    Networking,
    Security,
    Systems,
    Devops,
}

impl SkillTrack {
    pub const ALL: [SkillTrack; 4] = [
        SkillTrack::Networking,
        SkillTrack::Security,
        SkillTrack::Systems,
        SkillTrack::Devops,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            SkillTrack::Networking => "networking",
            SkillTrack::Security => "security",
            SkillTrack::Systems => "systems",
            SkillTrack::Devops => "devops",
        }
    }

    pub fn parse(text: &str) -> Option<Self> {
        match text.to_ascii_lowercase().as_str() {
            "networking" | "network" | "net" => Some(SkillTrack::Networking),
            "security" | "sec" => Some(SkillTrack::Security),
            "systems" | "sys" => Some(SkillTrack::Systems),
            "devops" | "ops" => Some(SkillTrack::Devops),
            _ => None,
        }
    }

    /// Player level at which the track opens.
    pub fn unlock_level(&self) -> u32 {
        match self {
            SkillTrack::Networking => 1,
            SkillTrack::Security | SkillTrack::Systems => 2,
            SkillTrack::Devops => 3,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct SkillTrackState {
    pub level: u32,
    pub xp: u32,
    pub unlocked: bool,
}

impl SkillTrackState {
    fn locked() -> Self {
        Self {
            level: 1,
            xp: 0,
            unlocked: false,
        }
    }

    pub fn add_xp(&mut self, amount: u32) {
        self.xp = self.xp.saturating_add(amount);
        self.level = level_for_xp(self.xp);
    }
}

pub fn level_for_xp(xp: u32) -> u32 {
    xp / XP_PER_LEVEL + 1
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Player {
    pub id: String,
    pub display_name: String,
    pub level: u32,
    pub xp: u32,
    pub tier: u8,
    pub title: String,
    pub skill_tracks: BTreeMap<SkillTrack, SkillTrackState>,
    /// Completed quest ids in completion order.
    pub completed_quests: Vec<String>,
    /// Fired discovery ids in firing order.
    pub discoveries: Vec<String>,
    pub achievements: Vec<String>,
    pub specialization: Option<SkillTrack>,
    pub command_mastery: BTreeMap<String, u32>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Player {
    pub fn new(id: &str, display_name: &str, now: DateTime<Utc>) -> Self {
        let mut skill_tracks = BTreeMap::new();
        for track in SkillTrack::ALL {
            let mut state = SkillTrackState::locked();
            state.unlocked = track.unlock_level() <= 1;
            skill_tracks.insert(track, state);
        }
        Self {
            id: id.to_string(),
            display_name: display_name.to_string(),
            level: 1,
            xp: 0,
            tier: 1,
            title: "RECRUIT".to_string(),
            skill_tracks,
            completed_quests: Vec::new(),
            discoveries: Vec::new(),
            achievements: Vec::new(),
            specialization: None,
            command_mastery: BTreeMap::new(),
            created_at: now,
            updated_at: now,
        }
    }

    /// Add XP and raise the level if the new total crosses a threshold.
    /// Returns the new level when it went up. Tracks opened by the new level are unlocked.
    pub fn add_xp(&mut self, amount: u32) -> Option<u32> {
        self.xp = self.xp.saturating_add(amount);
        let computed = level_for_xp(self.xp);
        if computed > self.level {
            self.level = computed;
            self.unlock_tracks_for_level();
            Some(computed)
        } else {
            None
        }
    }

    pub fn unlock_tracks_for_level(&mut self) {
        for (track, state) in self.skill_tracks.iter_mut() {
            if track.unlock_level() <= self.level {
                state.unlocked = true;
            }
        }
    }

    pub fn is_track_unlocked(&self, track: SkillTrack) -> bool {
        self.skill_tracks
            .get(&track)
            .map(|s| s.unlocked)
            .unwrap_or(false)
    }

    pub fn has_completed(&self, quest_id: &str) -> bool {
        self.completed_quests.iter().any(|q| q == quest_id)
    }

    pub fn has_achievement(&self, id: &str) -> bool {
        self.achievements.iter().any(|a| a == id)
    }

    pub fn touch(&mut self, now: DateTime<Utc>) {
        self.updated_at = now;
    }
}

/// Immutable quest definition. Completion lives in [`Player::completed_quests`].
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct QuestDefinition {
    pub id: String,
    pub title: String,
    pub description: String,
    pub objective: String,
    pub triggers: BTreeSet<String>,
    pub xp_reward: u32,
    #[serde(default)]
    pub prerequisites: Vec<String>,
    #[serde(default)]
    pub skill_track: Option<SkillTrack>,
    #[serde(default)]
    pub tier: Option<u8>,
}

impl QuestDefinition {
    pub fn new(id: &str, title: &str, description: &str, objective: &str, xp_reward: u32) -> Self {
        Self {
            id: id.to_string(),
            title: title.to_string(),
            description: description.to_string(),
            objective: objective.to_string(),
            triggers: BTreeSet::new(),
            xp_reward,
            prerequisites: Vec::new(),
            skill_track: None,
            tier: None,
        }
    }

    pub fn with_trigger(mut self, command: &str) -> Self {
        self.triggers.insert(command.to_lowercase());
        self
    }

    pub fn with_prerequisite(mut self, quest_id: &str) -> Self {
        self.prerequisites.push(quest_id.to_string());
        self
    }

    pub fn with_skill_track(mut self, track: SkillTrack) -> Self {
        self.skill_track = Some(track);
        self
    }

    pub fn with_tier(mut self, tier: u8) -> Self {
        self.tier = Some(tier);
        self
    }

    pub fn is_triggered_by(&self, command: &str) -> bool {
        self.triggers.contains(command)
    }
}

/// Flat set-once milestone flags.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct StoryFlags(BTreeMap<String, bool>);

impl StoryFlags {
    /// Set a flag. Returns true only when the flag was not already set.
    pub fn raise(&mut self, name: &str) -> bool {
        let entry = self.0.entry(name.to_string()).or_insert(false);
        if *entry {
            false
        } else {
            *entry = true;
            true
        }
    }

    pub fn is_set(&self, name: &str) -> bool {
        self.0.get(name).copied().unwrap_or(false)
    }

    pub fn raised(&self) -> impl Iterator<Item = &str> {
        self.0.iter().filter(|(_, v)| **v).map(|(k, _)| k.as_str())
    }
}

/// Counted pattern-match rule that fires exactly once.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct DiscoveryTrigger {
    pub id: String,
    pub title: String,
    pub description: String,
    #[serde(default)]
    pub relevant_commands: BTreeSet<String>,
    #[serde(default)]
    pub pattern: Option<Pattern>,
    pub threshold: u32,
    pub story_flag: String,
    #[serde(default)]
    pub xp_reward: u32,
    /// Commands added to the discovered set when the trigger fires.
    #[serde(default)]
    pub unlocks: Vec<String>,
}

impl DiscoveryTrigger {
    pub fn new(id: &str, title: &str, description: &str, story_flag: &str, threshold: u32) -> Self {
        Self {
            id: id.to_string(),
            title: title.to_string(),
            description: description.to_string(),
            relevant_commands: BTreeSet::new(),
            pattern: None,
            threshold: threshold.max(1),
            story_flag: story_flag.to_string(),
            xp_reward: 0,
            unlocks: Vec::new(),
        }
    }

    pub fn with_relevant(mut self, command: &str) -> Self {
        self.relevant_commands.insert(command.to_lowercase());
        self
    }

    pub fn with_pattern(mut self, pattern: Pattern) -> Self {
        self.pattern = Some(pattern);
        self
    }

    pub fn with_xp(mut self, xp: u32) -> Self {
        self.xp_reward = xp;
        self
    }

    pub fn with_unlock(mut self, command: &str) -> Self {
        self.unlocks.push(command.to_lowercase());
        self
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct TriggerProgress {
    pub count: u32,
    pub fired: bool,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct TierRequirements {
    #[serde(default)]
    pub commands: Vec<String>,
    #[serde(default)]
    pub min_discoveries: usize,
    #[serde(default)]
    pub story_flags: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ProgressionTier {
    pub level: u8,
    pub title: String,
    pub requires: TierRequirements,
    /// Commands granted on reaching the tier.
    #[serde(default)]
    pub unlocks: Vec<String>,
    pub next: Option<u8>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct ShiftStatus {
    pub clocked_in: bool,
    pub shift_start: Option<DateTime<Utc>>,
    pub tasks_completed: u32,
    pub daily_xp: u32,
    /// Calendar day the counters belong to.
    pub day: Option<NaiveDate>,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, PartialOrd, Ord)]
#[serde(rename_all = "snake_case")]
pub enum TaskPriority {
    Low,
    Normal,
    High,
    Urgent,
}

impl TaskPriority {
    pub fn label(&self) -> &'static str {
        match self {
            TaskPriority::Low => "LOW",
            TaskPriority::Normal => "NORMAL",
            TaskPriority::High => "HIGH",
            TaskPriority::Urgent => "URGENT",
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct DailyTask {
    pub id: String,
    pub title: String,
    pub command: String,
    pub priority: TaskPriority,
    pub xp_reward: u32,
    #[serde(default)]
    pub completed: bool,
}

impl DailyTask {
    pub fn new(id: &str, title: &str, command: &str, priority: TaskPriority, xp_reward: u32) -> Self {
        Self {
            id: id.to_string(),
            title: title.to_string(),
            command: command.to_string(),
            priority,
            xp_reward,
            completed: false,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ServiceInfo {
    pub port: u16,
    pub name: String,
    pub status: String,
    pub description: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct EvidenceEntry {
    pub id: String,
    pub title: String,
    pub detail: String,
    pub recorded_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[serde(rename_all = "snake_case")]
pub enum Severity {
    Embarrassing,
    Low,
    Medium,
    High,
    Critical,
}

impl Severity {
    pub fn blocks(&self) -> bool {
        matches!(self, Severity::High | Severity::Critical)
    }

    pub fn label(&self) -> &'static str {
        match self {
            Severity::Embarrassing => "EMBARRASSING",
            Severity::Low => "LOW",
            Severity::Medium => "MEDIUM",
            Severity::High => "HIGH",
            Severity::Critical => "CRITICAL",
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct DangerAttempt {
    pub at: DateTime<Utc>,
    pub input: String,
    pub rule_id: String,
    pub severity: Severity,
}

/// Surfaced message for a fired discovery trigger.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct DiscoveryNotice {
    pub trigger_id: String,
    pub title: String,
    pub message: String,
    pub story_flag: String,
    pub xp: u32,
}

/// The whole per-player aggregate. Owned by one session; persisted as one document.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct EngineState {
    pub schema_version: u8,
    pub player: Player,
    pub story_flags: StoryFlags,
    pub trigger_progress: BTreeMap<String, TriggerProgress>,
    pub current_quest_index: usize,
    pub learned_commands: BTreeSet<String>,
    pub discovered_commands: BTreeSet<String>,
    pub recent_commands: VecDeque<String>,
    pub shift: ShiftStatus,
    pub daily_tasks: Vec<DailyTask>,
    pub tasks_refreshed_on: Option<NaiveDate>,
    pub discovered_services: Vec<ServiceInfo>,
    pub evidence: Vec<EvidenceEntry>,
    pub danger_history: VecDeque<DangerAttempt>,
    pub pending_notices: VecDeque<DiscoveryNotice>,
    pub investigated_topics: BTreeSet<String>,
    pub decrypted_files: BTreeSet<u8>,
}

impl EngineState {
    pub fn new(player_id: &str, display_name: &str, now: DateTime<Utc>) -> Self {
        Self {
            schema_version: STATE_SCHEMA_VERSION,
            player: Player::new(player_id, display_name, now),
            story_flags: StoryFlags::default(),
            trigger_progress: BTreeMap::new(),
            current_quest_index: 0,
            learned_commands: BTreeSet::new(),
            discovered_commands: BTreeSet::new(),
            recent_commands: VecDeque::with_capacity(RECENT_COMMAND_CAPACITY),
            shift: ShiftStatus::default(),
            daily_tasks: Vec::new(),
            tasks_refreshed_on: None,
            discovered_services: Vec::new(),
            evidence: Vec::new(),
            danger_history: VecDeque::new(),
            pending_notices: VecDeque::new(),
            investigated_topics: BTreeSet::new(),
            decrypted_files: BTreeSet::new(),
        }
    }

    /// Push onto the recent ring buffer, evicting the oldest entry at capacity.
    pub fn record_recent(&mut self, line: &str) {
        if self.recent_commands.len() >= RECENT_COMMAND_CAPACITY {
            self.recent_commands.pop_front();
        }
        self.recent_commands.push_back(line.to_string());
    }

    pub fn record_danger(&mut self, attempt: DangerAttempt) {
        if self.danger_history.len() >= DANGER_HISTORY_CAPACITY {
            self.danger_history.pop_front();
        }
        self.danger_history.push_back(attempt);
    }

    pub fn add_evidence(&mut self, id: &str, title: &str, detail: &str, now: DateTime<Utc>) -> bool {
        if self.evidence.iter().any(|e| e.id == id) {
            return false;
        }
        self.evidence.push(EvidenceEntry {
            id: id.to_string(),
            title: title.to_string(),
            detail: detail.to_string(),
            recorded_at: now,
        });
        true
    }

    pub fn knows_command(&self, command: &str) -> bool {
        self.learned_commands.contains(command) || self.discovered_commands.contains(command)
    }
}
