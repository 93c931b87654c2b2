/// Achievements: one-time badges checked after every turn.
///
/// Each achievement is a predicate over the state; the first turn on which the
/// predicate holds awards it. Awarded ids are appended to
/// `Player::achievements` and never removed.
use log::info;

use crate::engine::types::EngineState;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AchievementTrigger {
    /// Number of completed quests.
    QuestsCompleted(usize),
    /// Number of fired discoveries.
    Discoveries(usize),
    /// Every task on today's list is done.
    AllDailyTasks,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AchievementDefinition {
    pub id: &'static str,
    pub title: &'static str,
    pub description: &'static str,
    pub trigger: AchievementTrigger,
}

pub fn builtin_achievements() -> Vec<AchievementDefinition> {
    vec![
        AchievementDefinition {
            id: "first_steps",
            title: "First Steps",
            description: "Completed your first assignment.",
            trigger: AchievementTrigger::QuestsCompleted(1),
        },
        AchievementDefinition {
            id: "sleuth",
            title: "Sleuth",
            description: "Made three discoveries nobody asked you to make.",
            trigger: AchievementTrigger::Discoveries(3),
        },
        AchievementDefinition {
            id: "full_shift",
            title: "Full Shift",
            description: "Finished every task on the day's list.",
            trigger: AchievementTrigger::AllDailyTasks,
        },
    ]
}

fn is_met(trigger: AchievementTrigger, state: &EngineState) -> bool {
    match trigger {
        AchievementTrigger::QuestsCompleted(n) => state.player.completed_quests.len() >= n,
        AchievementTrigger::Discoveries(n) => state.player.discoveries.len() >= n,
        AchievementTrigger::AllDailyTasks => {
            !state.daily_tasks.is_empty() && state.daily_tasks.iter().all(|t| t.completed)
        }
    }
}

/// Award every achievement whose trigger now holds. Returns the newly earned ones.
pub fn check_achievements<'a>(
    state: &mut EngineState,
    definitions: &'a [AchievementDefinition],
) -> Vec<&'a AchievementDefinition> {
    let mut awarded = Vec::new();
    for def in definitions {
        if state.player.has_achievement(def.id) || !is_met(def.trigger, state) {
            continue;
        }
        state.player.achievements.push(def.id.to_string());
        info!("{} earned achievement '{}'", state.player.id, def.id);
        awarded.push(def);
    }
    awarded
}
