//! Turning a handler's raw answer plus this turn's side effects into the one
//! result the front end renders.

use serde::{Deserialize, Serialize};

use crate::engine::adapter::{AdapterOutput, OutputKind};
use crate::engine::progression::TierAdvancement;
use crate::engine::quest::QuestCompletion;
use crate::engine::shift::TaskCompletion;
use crate::engine::types::DiscoveryNotice;

#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum ResultKind {
    #[default]
    Normal,
    Success,
    Info,
    Warning,
    Error,
    Blocked,
    Discovery,
    Advancement,
}

impl From<OutputKind> for ResultKind {
    fn from(kind: OutputKind) -> Self {
        match kind {
            OutputKind::Normal => ResultKind::Normal,
            OutputKind::Success => ResultKind::Success,
            OutputKind::Error => ResultKind::Error,
            OutputKind::Info => ResultKind::Info,
        }
    }
}

/// What `interpret` hands back for every input.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct CommandResult {
    pub output: String,
    pub kind: ResultKind,
    pub xp_gained: u32,
    /// Player-visible state (XP, tier, flags, unlocked commands) changed.
    pub player_update: bool,
    /// Shift or daily task state changed.
    pub shift_update: bool,
    pub discovery: Option<DiscoveryNotice>,
    pub advancement: Option<TierAdvancement>,
    pub task_completion: Option<TaskCompletion>,
    pub quest_completed: Option<QuestCompletion>,
    pub achievements: Vec<String>,
}

impl CommandResult {
    pub fn new(kind: ResultKind, output: impl Into<String>) -> Self {
        Self {
            output: output.into(),
            kind,
            ..Default::default()
        }
    }

    pub fn normal(output: impl Into<String>) -> Self {
        Self::new(ResultKind::Normal, output)
    }

    pub fn success(output: impl Into<String>) -> Self {
        Self::new(ResultKind::Success, output)
    }

    pub fn info(output: impl Into<String>) -> Self {
        Self::new(ResultKind::Info, output)
    }

    pub fn warning(output: impl Into<String>) -> Self {
        Self::new(ResultKind::Warning, output)
    }

    pub fn error(output: impl Into<String>) -> Self {
        Self::new(ResultKind::Error, output)
    }

    pub fn blocked(output: impl Into<String>) -> Self {
        Self::new(ResultKind::Blocked, output)
    }

    pub fn with_xp(mut self, xp: u32) -> Self {
        self.xp_gained += xp;
        if xp > 0 {
            self.player_update = true;
        }
        self
    }

    pub fn with_player_update(mut self) -> Self {
        self.player_update = true;
        self
    }

    pub fn with_shift_update(mut self) -> Self {
        self.shift_update = true;
        self
    }

    /// Handler results that count as having run successfully.
    pub fn succeeded(&self) -> bool {
        !matches!(self.kind, ResultKind::Error | ResultKind::Blocked)
    }

    fn append(&mut self, text: &str) {
        if text.is_empty() {
            return;
        }
        if !self.output.is_empty() {
            self.output.push_str("\n\n");
        }
        self.output.push_str(text);
    }
}

impl From<AdapterOutput> for CommandResult {
    fn from(out: AdapterOutput) -> Self {
        CommandResult::new(out.kind.into(), out.output)
    }
}

/// Everything that happened on this turn besides the handler's own output.
#[derive(Debug, Clone, Default)]
pub struct SideEffects {
    pub quest: Option<QuestCompletion>,
    pub discovery: Option<DiscoveryNotice>,
    /// Ids of triggers that fired this turn. A surfaced notice missing from
    /// here is a replay from the queue.
    pub discoveries_fired: Vec<String>,
    /// XP from triggers that fired this turn, whether or not their notice is shown yet.
    pub discovery_xp: u32,
    pub task: Option<TaskCompletion>,
    pub advancement: Option<TierAdvancement>,
    /// (title, message) for achievements earned this turn.
    pub achievements: Vec<(String, String)>,
}

/// Merge `base` with `effects`.
///
/// Messages are appended in event order, XP is summed, and the kind is upgraded
/// by the highest-ranked event: advancement, then discovery, then task or quest
/// completion (both `Success`). With no event the base kind stands. Replaying a
/// queued notice shows its text but is not an event of this turn.
pub fn compose(base: CommandResult, effects: SideEffects) -> CommandResult {
    let mut result = base;

    if let Some(quest) = &effects.quest {
        let mut text = format!("[QUEST COMPLETE] {} (+{} XP)", quest.title, quest.xp);
        if let Some(level) = quest.new_level {
            text.push_str(&format!("\nLevel up! You are now level {}.", level));
        }
        match &quest.next_quest {
            Some(next) => text.push_str(&format!("\nNext assignment: {}", next)),
            None => text.push_str("\nNo assignments left. You are on your own now."),
        }
        result.append(&text);
        result.xp_gained += quest.xp;
        result.player_update = true;
    }

    if let Some(task) = &effects.task {
        let mut text = format!("[TASK DONE] #{} {} (+{} XP)", task.number, task.title, task.xp);
        if task.all_done {
            text.push_str("\nAll of today's tasks are complete.");
        }
        result.append(&text);
        result.xp_gained += task.xp;
        result.player_update = true;
        result.shift_update = true;
    }

    if let Some(notice) = &effects.discovery {
        if effects.discoveries_fired.contains(&notice.trigger_id) && notice.xp > 0 {
            result.append(&format!("{}\n+{} XP", notice.message, notice.xp));
        } else {
            result.append(&notice.message);
        }
    }
    if !effects.discoveries_fired.is_empty() {
        result.xp_gained += effects.discovery_xp;
        result.player_update = true;
    }

    for (title, message) in &effects.achievements {
        result.append(&format!("[ACHIEVEMENT] {}\n{}", title, message));
        result.player_update = true;
    }

    if let Some(adv) = &effects.advancement {
        result.append(&adv.message);
        result.player_update = true;
    }

    result.kind = if effects.advancement.is_some() {
        ResultKind::Advancement
    } else if !effects.discoveries_fired.is_empty() {
        ResultKind::Discovery
    } else if effects.task.is_some() || effects.quest.is_some() {
        ResultKind::Success
    } else {
        result.kind
    };

    result.quest_completed = effects.quest;
    result.discovery = effects.discovery;
    result.task_completion = effects.task;
    result.advancement = effects.advancement;
    result
        .achievements
        .extend(effects.achievements.into_iter().map(|(title, _)| title));
    result
}

#[cfg(test)]
mod tests {
    use super::*;

    fn notice() -> DiscoveryNotice {
        DiscoveryNotice {
            trigger_id: "t".into(),
            title: "T".into(),
            message: "[DISCOVERY] T".into(),
            story_flag: "f".into(),
            xp: 15,
        }
    }

    fn quest() -> QuestCompletion {
        QuestCompletion {
            quest_id: "orientation".into(),
            title: "Orientation".into(),
            xp: 10,
            skill_track: None,
            new_level: None,
            next_quest: Some("Look Around".into()),
        }
    }

    #[test]
    fn no_events_preserves_kind_and_output() {
        let base = CommandResult::error("ls: nope");
        let out = compose(base.clone(), SideEffects::default());
        assert_eq!(out, base);
    }

    #[test]
    fn quest_completion_upgrades_to_success() {
        let out = compose(
            CommandResult::normal("/home/recruit"),
            SideEffects {
                quest: Some(quest()),
                ..Default::default()
            },
        );
        assert_eq!(out.kind, ResultKind::Success);
        assert_eq!(out.xp_gained, 10);
        assert!(out.output.starts_with("/home/recruit"));
        assert!(out.output.contains("[QUEST COMPLETE] Orientation"));
        assert!(out.player_update);
    }

    #[test]
    fn discovery_outranks_quest_and_sums_xp() {
        let out = compose(
            CommandResult::normal("x"),
            SideEffects {
                quest: Some(quest()),
                discovery: Some(notice()),
                discoveries_fired: vec!["t".into()],
                discovery_xp: 15,
                ..Default::default()
            },
        );
        assert_eq!(out.kind, ResultKind::Discovery);
        assert_eq!(out.xp_gained, 25);
        assert!(out.output.ends_with("[DISCOVERY] T\n+15 XP"));
    }

    #[test]
    fn replayed_notice_keeps_base_kind_and_shows_no_xp() {
        let out = compose(
            CommandResult::error("frobnicate: command not found"),
            SideEffects {
                discovery: Some(notice()),
                ..Default::default()
            },
        );
        assert_eq!(out.kind, ResultKind::Error);
        assert_eq!(out.xp_gained, 0);
        assert!(out.output.ends_with("[DISCOVERY] T"));
        assert!(!out.output.contains("XP"));
        assert!(!out.player_update);
        assert!(out.discovery.is_some());
    }

    #[test]
    fn advancement_outranks_everything() {
        let adv = TierAdvancement {
            from: 1,
            tier: 2,
            title: "ANALYST".into(),
            unlocked: vec![],
            message: "*** PROMOTION ***".into(),
        };
        let out = compose(
            CommandResult::normal("x"),
            SideEffects {
                discovery: Some(notice()),
                advancement: Some(adv),
                ..Default::default()
            },
        );
        assert_eq!(out.kind, ResultKind::Advancement);
        assert!(out.output.ends_with("*** PROMOTION ***"));
    }

    #[test]
    fn result_serializes_with_lowercase_kind() {
        let json = serde_json::to_string(&CommandResult::blocked("no")).unwrap();
        assert!(json.contains("\"kind\":\"blocked\""));
    }
}
