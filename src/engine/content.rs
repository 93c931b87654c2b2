//! Built-in game content and JSON content loading.
//!
//! Quests and discovery triggers can be overridden from `quests.json` and
//! `discoveries.json` inside a content directory, so writers can rework the story
//! without recompiling. Tiers, the daily task pool, investigation topics and
//! encrypted files are always the built-in tables. Everything passes through
//! [`Content::validate`] before a session may use it.

use std::collections::HashSet;
use std::fs;
use std::path::Path;

use log::{debug, info};

use crate::engine::errors::EngineError;
use crate::engine::pattern::Pattern;
use crate::engine::types::{
    DailyTask, DiscoveryTrigger, ProgressionTier, QuestDefinition, SkillTrack, TaskPriority,
    TierRequirements,
};

pub const QUESTS_FILE: &str = "quests.json";
pub const DISCOVERIES_FILE: &str = "discoveries.json";

/// A topic accepted by `nc-investigate <topic>`.
#[derive(Debug, Clone, PartialEq)]
pub struct InvestigationTopic {
    pub id: &'static str,
    pub title: &'static str,
    pub findings: &'static str,
}

/// A file accepted by `nc-decrypt <n>`.
#[derive(Debug, Clone, PartialEq)]
pub struct EncryptedFile {
    pub number: u8,
    pub name: &'static str,
    pub plaintext: &'static str,
    /// Story flag raised on first decryption.
    pub story_flag: Option<&'static str>,
}

#[derive(Debug, Clone)]
pub struct Content {
    pub quests: Vec<QuestDefinition>,
    pub triggers: Vec<DiscoveryTrigger>,
    pub tiers: Vec<ProgressionTier>,
    pub task_pool: Vec<DailyTask>,
    pub topics: Vec<InvestigationTopic>,
    pub encrypted_files: Vec<EncryptedFile>,
}

impl Default for Content {
    fn default() -> Self {
        Self::builtin()
    }
}

impl Content {
    pub fn builtin() -> Self {
        Self {
            quests: starter_quests(),
            triggers: starter_discovery_triggers(),
            tiers: progression_tiers(),
            task_pool: daily_task_pool(),
            topics: investigation_topics(),
            encrypted_files: encrypted_files(),
        }
    }

    /// Built-in content with optional JSON overrides from `dir`, validated.
    pub fn load(dir: Option<&Path>) -> Result<Self, EngineError> {
        let mut content = Self::builtin();
        if let Some(dir) = dir {
            let quests_path = dir.join(QUESTS_FILE);
            if quests_path.exists() {
                content.quests = load_quests_from_json(&quests_path)?;
                info!(
                    "Loaded {} quests from {}",
                    content.quests.len(),
                    quests_path.display()
                );
            }
            let triggers_path = dir.join(DISCOVERIES_FILE);
            if triggers_path.exists() {
                content.triggers = load_triggers_from_json(&triggers_path)?;
                info!(
                    "Loaded {} discovery triggers from {}",
                    content.triggers.len(),
                    triggers_path.display()
                );
            }
        }
        content.validate()?;
        Ok(content)
    }

    /// Integrity checks. A failure here is a content bug, not a gameplay condition.
    pub fn validate(&self) -> Result<(), EngineError> {
        let mut quest_ids = HashSet::new();
        for quest in &self.quests {
            if !quest_ids.insert(quest.id.as_str()) {
                return Err(EngineError::Content(format!("duplicate quest id '{}'", quest.id)));
            }
            if quest.triggers.is_empty() {
                return Err(EngineError::Content(format!(
                    "quest '{}' has no trigger commands",
                    quest.id
                )));
            }
            if let Some(tier) = quest.tier {
                if !(1..=5).contains(&tier) {
                    return Err(EngineError::Content(format!(
                        "quest '{}' has tier {} outside 1-5",
                        quest.id, tier
                    )));
                }
            }
        }
        for quest in &self.quests {
            for prereq in &quest.prerequisites {
                if !quest_ids.contains(prereq.as_str()) {
                    return Err(EngineError::Content(format!(
                        "quest '{}' requires unknown quest '{}'",
                        quest.id, prereq
                    )));
                }
            }
        }

        let mut trigger_ids = HashSet::new();
        for trigger in &self.triggers {
            if !trigger_ids.insert(trigger.id.as_str()) {
                return Err(EngineError::Content(format!(
                    "duplicate discovery id '{}'",
                    trigger.id
                )));
            }
            if trigger.threshold == 0 {
                return Err(EngineError::Content(format!(
                    "discovery '{}' has a zero threshold",
                    trigger.id
                )));
            }
            if trigger.relevant_commands.is_empty() && trigger.pattern.is_none() {
                return Err(EngineError::Content(format!(
                    "discovery '{}' can never match",
                    trigger.id
                )));
            }
        }

        for (idx, tier) in self.tiers.iter().enumerate() {
            if tier.level as usize != idx + 1 {
                return Err(EngineError::Content(format!(
                    "tier '{}' is out of order (level {})",
                    tier.title, tier.level
                )));
            }
        }
        if self.task_pool.len() < 6 {
            return Err(EngineError::Content(
                "daily task pool needs at least 6 entries".to_string(),
            ));
        }
        debug!(
            "content validated: {} quests, {} triggers, {} tiers",
            self.quests.len(),
            self.triggers.len(),
            self.tiers.len()
        );
        Ok(())
    }

    pub fn quest(&self, id: &str) -> Option<&QuestDefinition> {
        self.quests.iter().find(|q| q.id == id)
    }

    pub fn tier(&self, level: u8) -> Option<&ProgressionTier> {
        self.tiers.iter().find(|t| t.level == level)
    }

    pub fn topic(&self, id: &str) -> Option<&InvestigationTopic> {
        let id = id.to_ascii_lowercase();
        self.topics.iter().find(|t| t.id == id)
    }

    pub fn encrypted_file(&self, number: u8) -> Option<&EncryptedFile> {
        self.encrypted_files.iter().find(|f| f.number == number)
    }
}

/// Load quest definitions from a JSON array document.
pub fn load_quests_from_json<P: AsRef<Path>>(path: P) -> Result<Vec<QuestDefinition>, EngineError> {
    let contents = fs::read_to_string(path.as_ref())?;
    let quests: Vec<QuestDefinition> = serde_json::from_str(&contents)?;
    Ok(quests
        .into_iter()
        .map(|mut q| {
            q.triggers = q.triggers.into_iter().map(|t| t.to_lowercase()).collect();
            q
        })
        .collect())
}

/// Load discovery triggers from a JSON array document. Command names and
/// pattern literals are lower-cased to match parsed input.
pub fn load_triggers_from_json<P: AsRef<Path>>(
    path: P,
) -> Result<Vec<DiscoveryTrigger>, EngineError> {
    let contents = fs::read_to_string(path.as_ref())?;
    let triggers: Vec<DiscoveryTrigger> = serde_json::from_str(&contents)?;
    Ok(triggers
        .into_iter()
        .map(|mut t| {
            t.relevant_commands = t.relevant_commands.iter().map(|c| c.to_lowercase()).collect();
            t.unlocks = t.unlocks.iter().map(|c| c.to_lowercase()).collect();
            t.pattern = t.pattern.map(Pattern::lowercased);
            t
        })
        .collect())
}

pub fn starter_quests() -> Vec<QuestDefinition> {
    vec![
        QuestDefinition::new(
            "orientation",
            "Orientation",
            "Welcome to NetCorp. First, figure out where the terminal dropped you.",
            "Print your working directory",
            10,
        )
        .with_trigger("pwd")
        .with_tier(1),
        QuestDefinition::new(
            "explore",
            "Look Around",
            "Every investigation starts with knowing what is on disk.",
            "List the files in your directory",
            15,
        )
        .with_trigger("ls")
        .with_prerequisite("orientation")
        .with_tier(1),
        QuestDefinition::new(
            "identity",
            "Know Thyself",
            "HR insists every recruit confirm which account they were issued.",
            "Ask the system who you are",
            15,
        )
        .with_trigger("whoami")
        .with_prerequisite("orientation")
        .with_tier(1),
        QuestDefinition::new(
            "read_handbook",
            "Read the Handbook",
            "The employee handbook sits in your home directory. Nobody reads it. You should.",
            "Read a file with cat",
            20,
        )
        .with_trigger("cat")
        .with_prerequisite("explore")
        .with_tier(1),
        QuestDefinition::new(
            "network_basics",
            "Network Basics",
            "Find out which interfaces and connections this box has.",
            "Inspect interfaces or connections",
            30,
        )
        .with_trigger("ifconfig")
        .with_trigger("netstat")
        .with_prerequisite("explore")
        .with_skill_track(SkillTrack::Networking)
        .with_tier(2),
        QuestDefinition::new(
            "first_shift",
            "First Shift",
            "Analysts are paid by the shift. Clock in before the supervisor notices.",
            "Clock in with nc-clock-in",
            20,
        )
        .with_trigger("nc-clock-in")
        .with_prerequisite("read_handbook")
        .with_tier(2),
        QuestDefinition::new(
            "process_audit",
            "Process Audit",
            "Something is eating CPU at night. Take a look at what is running.",
            "List running processes",
            30,
        )
        .with_trigger("ps")
        .with_trigger("top")
        .with_prerequisite("read_handbook")
        .with_skill_track(SkillTrack::Systems)
        .with_tier(2),
        QuestDefinition::new(
            "service_sweep",
            "Service Sweep",
            "Inventory every service listening on the corporate network.",
            "Run nc-discover-services while on shift",
            40,
        )
        .with_trigger("nc-discover-services")
        .with_prerequisite("first_shift")
        .with_prerequisite("network_basics")
        .with_skill_track(SkillTrack::Networking)
        .with_tier(3),
        QuestDefinition::new(
            "capacity_check",
            "Capacity Check",
            "Storage alarms keep firing. Check disk and memory usage.",
            "Check disk or memory usage",
            30,
        )
        .with_trigger("df")
        .with_trigger("free")
        .with_prerequisite("process_audit")
        .with_skill_track(SkillTrack::Systems)
        .with_tier(3),
        QuestDefinition::new(
            "map_network",
            "Draw the Map",
            "The services you found do not match the official diagram. Map them.",
            "Run nc-map-network",
            50,
        )
        .with_trigger("nc-map-network")
        .with_prerequisite("service_sweep")
        .with_skill_track(SkillTrack::Security)
        .with_tier(4),
        QuestDefinition::new(
            "follow_the_trail",
            "Follow the Trail",
            "The admin note named a project. Dig into it.",
            "Investigate a topic with nc-investigate",
            60,
        )
        .with_trigger("nc-investigate")
        .with_prerequisite("map_network")
        .with_skill_track(SkillTrack::Security)
        .with_tier(4),
        QuestDefinition::new(
            "break_the_cipher",
            "Break the Cipher",
            "The recovered memos are encrypted. Time to read them.",
            "Decrypt a file with nc-decrypt",
            75,
        )
        .with_trigger("nc-decrypt")
        .with_prerequisite("follow_the_trail")
        .with_skill_track(SkillTrack::Devops)
        .with_tier(5),
    ]
}

pub fn starter_discovery_triggers() -> Vec<DiscoveryTrigger> {
    vec![
        DiscoveryTrigger::new(
            "admin_note",
            "The Admin's Note",
            "A note left by the previous sysadmin mentions an unlisted project and a tool called nc-investigate.",
            "found_admin_note",
            1,
        )
        .with_pattern(Pattern::command_with_arg("cat", "admin"))
        .with_xp(25)
        .with_unlock("nc-investigate"),
        DiscoveryTrigger::new(
            "filesystem_explorer",
            "Lay of the Land",
            "You have a feel for how this filesystem is laid out. Some directories are newer than the rest.",
            "explored_filesystem",
            3,
        )
        .with_relevant("ls")
        .with_relevant("cd")
        .with_xp(15),
        DiscoveryTrigger::new(
            "network_anomaly",
            "Network Anomaly",
            "Traffic is leaving for a host that is not on any diagram. nc-map-network is now available.",
            "noticed_network_anomaly",
            3,
        )
        .with_relevant("netstat")
        .with_relevant("ifconfig")
        .with_relevant("ping")
        .with_xp(25)
        .with_unlock("nc-map-network"),
        DiscoveryTrigger::new(
            "hidden_process",
            "Hidden Process",
            "A process named 'aurora-sync' runs under a service account that does not exist in the directory.",
            "spotted_hidden_process",
            2,
        )
        .with_relevant("ps")
        .with_relevant("top")
        .with_xp(20),
        DiscoveryTrigger::new(
            "escalation_attempts",
            "Knocking on Doors",
            "Security logged your privilege escalation attempts. Someone in IT now knows your name.",
            "attempted_escalation",
            2,
        )
        .with_relevant("sudo")
        .with_relevant("su")
        .with_xp(10),
        DiscoveryTrigger::new(
            "system_logs",
            "Reading the Logs",
            "The logs show scheduled transfers at 03:00 every night, signed by an account called 'aurora'.",
            "read_system_logs",
            2,
        )
        .with_pattern(Pattern::contains("/var/log"))
        .with_xp(20),
        DiscoveryTrigger::new(
            "company_conspiracy",
            "Project AURORA",
            "AURORA is not a sync tool. It copies customer records off-site. The memos about it are encrypted; nc-decrypt is now available.",
            "learned_company_conspiracy",
            1,
        )
        .with_pattern(Pattern::command_with_arg("nc-investigate", "aurora"))
        .with_xp(50)
        .with_unlock("nc-decrypt"),
    ]
}

fn tier(
    level: u8,
    title: &str,
    commands: &[&str],
    min_discoveries: usize,
    story_flags: &[&str],
    unlocks: &[&str],
) -> ProgressionTier {
    ProgressionTier {
        level,
        title: title.to_string(),
        requires: TierRequirements {
            commands: commands.iter().map(|c| c.to_string()).collect(),
            min_discoveries,
            story_flags: story_flags.iter().map(|f| f.to_string()).collect(),
        },
        unlocks: unlocks.iter().map(|c| c.to_string()).collect(),
        next: if level < 5 { Some(level + 1) } else { None },
    }
}

pub fn progression_tiers() -> Vec<ProgressionTier> {
    vec![
        tier(1, "RECRUIT", &[], 0, &[], &[]),
        tier(2, "ANALYST", &["pwd", "ls", "cat"], 1, &[], &[]),
        tier(
            3,
            "INVESTIGATOR",
            &["ps", "netstat", "nc-clock-in"],
            2,
            &["found_admin_note"],
            &["nc-map-network"],
        ),
        tier(
            4,
            "SPECIALIST",
            &["nc-discover-services", "nc-map-network"],
            4,
            &["noticed_network_anomaly"],
            &["nc-investigate"],
        ),
        tier(
            5,
            "ARCHITECT",
            &["nc-investigate", "nc-decrypt"],
            6,
            &["learned_company_conspiracy", "decrypted_final_memo"],
            &[],
        ),
    ]
}

pub fn daily_task_pool() -> Vec<DailyTask> {
    vec![
        DailyTask::new("review_logs", "Review overnight logs", "cat", TaskPriority::High, 15),
        DailyTask::new(
            "service_uptime",
            "Verify core services are up",
            "nc-discover-services",
            TaskPriority::High,
            20,
        ),
        DailyTask::new("process_check", "Audit running processes", "ps", TaskPriority::Normal, 10),
        DailyTask::new("disk_check", "Check disk capacity", "df", TaskPriority::Normal, 10),
        DailyTask::new("memory_check", "Check memory pressure", "free", TaskPriority::Low, 5),
        DailyTask::new(
            "interface_check",
            "Confirm network interfaces",
            "ifconfig",
            TaskPriority::Normal,
            10,
        ),
        DailyTask::new(
            "connection_audit",
            "Inspect open connections",
            "netstat",
            TaskPriority::High,
            15,
        ),
        DailyTask::new("gateway_ping", "Ping the gateway", "ping", TaskPriority::Low, 5),
        DailyTask::new("badge_check", "Confirm your account", "whoami", TaskPriority::Low, 5),
        DailyTask::new(
            "map_update",
            "Update the network map",
            "nc-map-network",
            TaskPriority::Urgent,
            25,
        ),
    ]
}

pub fn investigation_topics() -> Vec<InvestigationTopic> {
    vec![
        InvestigationTopic {
            id: "admin",
            title: "The previous sysadmin",
            findings: "M. Okafor left NetCorp abruptly in March. Their badge was revoked the same night their last note was written.",
        },
        InvestigationTopic {
            id: "network",
            title: "Unlisted traffic",
            findings: "Outbound transfers go to 203.0.113.44, registered to a shell company with a NetCorp director on its board.",
        },
        InvestigationTopic {
            id: "logs",
            title: "Nightly transfers",
            findings: "Transfer jobs run at 03:00 and delete their own log lines unless log rotation runs first.",
        },
        InvestigationTopic {
            id: "aurora",
            title: "Project AURORA",
            findings: "Budget lines for AURORA are filed under 'facilities'. Three memos about it are stored encrypted in the archive.",
        },
    ]
}

pub fn encrypted_files() -> Vec<EncryptedFile> {
    vec![
        EncryptedFile {
            number: 1,
            name: "memo_01.enc",
            plaintext: "AURORA phase one approved. Keep it off the change board.",
            story_flag: None,
        },
        EncryptedFile {
            number: 2,
            name: "memo_02.enc",
            plaintext: "Customer exports resume nightly. Okafor is asking questions.",
            story_flag: None,
        },
        EncryptedFile {
            number: 3,
            name: "final_memo.enc",
            plaintext: "Okafor has been let go. Wipe the admin account before the audit.",
            story_flag: Some("decrypted_final_memo"),
        },
    ]
}
