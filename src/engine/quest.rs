/// Quest progression: completing the active quest and choosing the next one.
///
/// Quests are linear but forgiving: a quest whose prerequisites or skill track
/// are not ready is skipped over rather than blocking the ones after it, and it
/// becomes active again once it is eligible.
use chrono::{DateTime, Utc};
use log::{debug, info};
use serde::{Deserialize, Serialize};

use crate::engine::content::Content;
use crate::engine::types::{EngineState, QuestDefinition, SkillTrack};

/// Outcome of a quest completing on this command.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct QuestCompletion {
    pub quest_id: String,
    pub title: String,
    pub xp: u32,
    pub skill_track: Option<SkillTrack>,
    pub new_level: Option<u32>,
    /// Title of the quest that became active, `None` in open investigation.
    pub next_quest: Option<String>,
}

/// True when every prerequisite is completed and the quest's track (if any) is unlocked.
pub fn is_eligible(state: &EngineState, quest: &QuestDefinition) -> bool {
    let prereqs_met = quest
        .prerequisites
        .iter()
        .all(|p| state.player.has_completed(p));
    let track_ready = quest
        .skill_track
        .map(|t| state.player.is_track_unlocked(t))
        .unwrap_or(true);
    prereqs_met && track_ready
}

/// Point `current_quest_index` at the first incomplete eligible quest, or past the end.
pub fn recompute_quest_index(state: &mut EngineState, content: &Content) -> usize {
    let index = content
        .quests
        .iter()
        .position(|q| !state.player.has_completed(&q.id) && is_eligible(state, q))
        .unwrap_or(content.quests.len());
    if index != state.current_quest_index {
        debug!(
            "quest index {} -> {} for {}",
            state.current_quest_index, index, state.player.id
        );
    }
    state.current_quest_index = index;
    index
}

pub fn active_quest<'a>(state: &EngineState, content: &'a Content) -> Option<&'a QuestDefinition> {
    content.quests.get(state.current_quest_index)
}

/// Complete the active quest when `command` is one of its triggers.
///
/// Only called for commands whose handler succeeded.
pub fn check_quest_progress(
    state: &mut EngineState,
    content: &Content,
    command: &str,
    now: DateTime<Utc>,
) -> Option<QuestCompletion> {
    let quest = active_quest(state, content)?.clone();
    if !quest.is_triggered_by(command) || state.player.has_completed(&quest.id) {
        return None;
    }
    if !is_eligible(state, &quest) {
        return None;
    }

    state.player.completed_quests.push(quest.id.clone());
    let new_level = state.player.add_xp(quest.xp_reward);
    if let Some(track) = quest.skill_track {
        if let Some(track_state) = state.player.skill_tracks.get_mut(&track) {
            track_state.add_xp(quest.xp_reward / 2);
        }
    }
    *state
        .player
        .command_mastery
        .entry(command.to_string())
        .or_insert(0) += 1;
    state.player.touch(now);

    recompute_quest_index(state, content);
    let next_quest = active_quest(state, content).map(|q| q.title.clone());

    info!(
        "quest '{}' completed by {} (+{} xp, level {})",
        quest.id, state.player.id, quest.xp_reward, state.player.level
    );

    Some(QuestCompletion {
        quest_id: quest.id,
        title: quest.title,
        xp: quest.xp_reward,
        skill_track: quest.skill_track,
        new_level,
        next_quest,
    })
}

/// Text for the `quests` command.
pub fn format_quest_log(state: &EngineState, content: &Content) -> String {
    let mut out = String::from("=== QUEST LOG ===\n");
    for (idx, quest) in content.quests.iter().enumerate() {
        let marker = if state.player.has_completed(&quest.id) {
            "[x]"
        } else if idx == state.current_quest_index {
            "[>]"
        } else if is_eligible(state, quest) {
            "[ ]"
        } else {
            "[-]"
        };
        out.push_str(&format!("{} {} ({} xp)\n", marker, quest.title, quest.xp_reward));
    }
    match active_quest(state, content) {
        Some(quest) => {
            out.push_str(&format!(
                "\nACTIVE: {}\n{}\nObjective: {}",
                quest.title, quest.description, quest.objective
            ));
        }
        None => {
            out.push_str(
                "\nOPEN INVESTIGATION: no assignments left. Follow the evidence: \
                 nc-evidence, nc-investigate <topic>, nc-tier.",
            );
        }
    }
    out
}
