/// Shifts and daily tasks.
///
/// A shift is the play-session gate for duty commands. Counters belong to a
/// calendar day and are reset the first time the engine sees a new day. The
/// day's task list is a 4–6 task sample of the pool, seeded from the player id
/// and the date so the same player sees the same list all day.
use chrono::{DateTime, Duration, NaiveDate, Utc};
use log::{debug, info};
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::{Rng, SeedableRng};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use crate::engine::types::{DailyTask, EngineState};

pub const MIN_DAILY_TASKS: usize = 4;
pub const MAX_DAILY_TASKS: usize = 6;

#[derive(Debug, Clone, PartialEq)]
pub enum ClockInOutcome {
    Started { at: DateTime<Utc> },
    AlreadyOnDuty { since: Option<DateTime<Utc>> },
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ShiftReport {
    pub elapsed_minutes: i64,
    pub tasks_completed: u32,
    pub tasks_total: u32,
    pub daily_xp: u32,
    pub rating: String,
}

#[derive(Debug, Clone, PartialEq)]
pub enum ClockOutOutcome {
    Ended(ShiftReport),
    NotOnDuty,
}

/// A task that was just completed.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct TaskCompletion {
    pub number: usize,
    pub task_id: String,
    pub title: String,
    pub xp: u32,
    pub all_done: bool,
}

#[derive(Debug, Clone, PartialEq)]
pub enum TaskOutcome {
    Completed(TaskCompletion),
    AlreadyCompleted { number: usize, title: String },
    NoSuchTask { number: usize, available: usize },
}

/// Reset the day's counters when `today` differs from the recorded day.
pub fn roll_over_day(state: &mut EngineState, today: NaiveDate) -> bool {
    if state.shift.day == Some(today) {
        return false;
    }
    debug!("new shift day {} for {}", today, state.player.id);
    state.shift.day = Some(today);
    state.shift.tasks_completed = 0;
    state.shift.daily_xp = 0;
    true
}

pub fn clock_in(state: &mut EngineState, now: DateTime<Utc>) -> ClockInOutcome {
    roll_over_day(state, now.date_naive());
    if state.shift.clocked_in {
        return ClockInOutcome::AlreadyOnDuty {
            since: state.shift.shift_start,
        };
    }
    state.shift.clocked_in = true;
    state.shift.shift_start = Some(now);
    info!("{} clocked in at {}", state.player.id, now.format("%H:%M"));
    ClockInOutcome::Started { at: now }
}

pub fn performance_rating(completed: u32, total: u32) -> &'static str {
    if total == 0 || completed == 0 {
        return "UNPRODUCTIVE";
    }
    let rate = completed as f64 / total as f64;
    if rate >= 0.8 {
        "EXCELLENT"
    } else if rate >= 0.5 {
        "SATISFACTORY"
    } else {
        "NEEDS IMPROVEMENT"
    }
}

pub fn clock_out(state: &mut EngineState, now: DateTime<Utc>) -> ClockOutOutcome {
    if !state.shift.clocked_in {
        return ClockOutOutcome::NotOnDuty;
    }
    let started = state.shift.shift_start.unwrap_or(now);
    let elapsed = now.signed_duration_since(started).max(Duration::zero());
    let total = state.daily_tasks.len() as u32;
    let report = ShiftReport {
        elapsed_minutes: elapsed.num_minutes(),
        tasks_completed: state.shift.tasks_completed,
        tasks_total: total,
        daily_xp: state.shift.daily_xp,
        rating: performance_rating(state.shift.tasks_completed, total).to_string(),
    };
    state.shift.clocked_in = false;
    state.shift.shift_start = None;
    info!(
        "{} clocked out after {} min ({})",
        state.player.id, report.elapsed_minutes, report.rating
    );
    ClockOutOutcome::Ended(report)
}

fn daily_seed(player_id: &str, day: NaiveDate) -> u64 {
    let mut hasher = Sha256::new();
    hasher.update(player_id.as_bytes());
    hasher.update(b":");
    hasher.update(day.to_string().as_bytes());
    let digest = hasher.finalize();
    let mut bytes = [0u8; 8];
    bytes.copy_from_slice(&digest[..8]);
    u64::from_le_bytes(bytes)
}

/// Deterministic 4–6 task sample for `player_id` on `day`.
pub fn sample_daily_tasks(pool: &[DailyTask], player_id: &str, day: NaiveDate) -> Vec<DailyTask> {
    let mut rng = StdRng::seed_from_u64(daily_seed(player_id, day));
    let upper = MAX_DAILY_TASKS.min(pool.len());
    let lower = MIN_DAILY_TASKS.min(upper);
    let count = rng.gen_range(lower..=upper);
    pool.choose_multiple(&mut rng, count)
        .cloned()
        .map(|mut t| {
            t.completed = false;
            t
        })
        .collect()
}

/// Regenerate the task list iff it was last generated on another day.
pub fn refresh_daily_tasks(state: &mut EngineState, pool: &[DailyTask], today: NaiveDate) -> bool {
    roll_over_day(state, today);
    if state.tasks_refreshed_on == Some(today) {
        return false;
    }
    state.daily_tasks = sample_daily_tasks(pool, &state.player.id, today);
    state.tasks_refreshed_on = Some(today);
    debug!(
        "generated {} daily tasks for {} on {}",
        state.daily_tasks.len(),
        state.player.id,
        today
    );
    true
}

fn apply_completion(state: &mut EngineState, idx: usize) -> TaskCompletion {
    let task = &mut state.daily_tasks[idx];
    task.completed = true;
    let xp = task.xp_reward;
    let task_id = task.id.clone();
    let title = task.title.clone();
    state.shift.tasks_completed += 1;
    state.shift.daily_xp += xp;
    state.player.add_xp(xp);
    let all_done = state.daily_tasks.iter().all(|t| t.completed);
    info!("{} completed task '{}' (+{} xp)", state.player.id, task_id, xp);
    TaskCompletion {
        number: idx + 1,
        task_id,
        title,
        xp,
        all_done,
    }
}

/// Complete task `number` (1-based). Completing a finished task changes nothing.
pub fn complete_task(state: &mut EngineState, number: usize) -> TaskOutcome {
    let available = state.daily_tasks.len();
    if number == 0 || number > available {
        return TaskOutcome::NoSuchTask { number, available };
    }
    let idx = number - 1;
    if state.daily_tasks[idx].completed {
        return TaskOutcome::AlreadyCompleted {
            number,
            title: state.daily_tasks[idx].title.clone(),
        };
    }
    TaskOutcome::Completed(apply_completion(state, idx))
}

/// Complete the first open task whose command is `command`, while on duty.
pub fn complete_matching_task(state: &mut EngineState, command: &str) -> Option<TaskCompletion> {
    if !state.shift.clocked_in {
        return None;
    }
    let idx = state
        .daily_tasks
        .iter()
        .position(|t| !t.completed && t.command == command)?;
    Some(apply_completion(state, idx))
}

pub fn format_daily_tasks(state: &EngineState) -> String {
    let mut out = String::from("=== DAILY TASKS ===\n");
    for (idx, task) in state.daily_tasks.iter().enumerate() {
        let mark = if task.completed { "x" } else { " " };
        out.push_str(&format!(
            "{}. [{}] {} ({}) - run '{}' (+{} XP)\n",
            idx + 1,
            mark,
            task.title,
            task.priority.label(),
            task.command,
            task.xp_reward
        ));
    }
    out.push_str(&format!(
        "Completed {}/{} | Shift XP today: {}",
        state.shift.tasks_completed,
        state.daily_tasks.len(),
        state.shift.daily_xp
    ));
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::content::daily_task_pool;

    fn at(ts: &str) -> DateTime<Utc> {
        DateTime::parse_from_rfc3339(ts).unwrap().with_timezone(&Utc)
    }

    fn on_shift() -> EngineState {
        let now = at("2026-03-02T09:00:00Z");
        let mut state = EngineState::new("p1", "Pat", now);
        refresh_daily_tasks(&mut state, &daily_task_pool(), now.date_naive());
        clock_in(&mut state, now);
        state
    }

    #[test]
    fn sample_is_deterministic_and_sized() {
        let pool = daily_task_pool();
        let day = at("2026-03-02T09:00:00Z").date_naive();
        let a = sample_daily_tasks(&pool, "p1", day);
        let b = sample_daily_tasks(&pool, "p1", day);
        assert_eq!(a, b);
        assert!((MIN_DAILY_TASKS..=MAX_DAILY_TASKS).contains(&a.len()));
    }

    #[test]
    fn refresh_only_on_new_day() {
        let mut state = on_shift();
        let day = at("2026-03-02T09:00:00Z").date_naive();
        assert!(!refresh_daily_tasks(&mut state, &daily_task_pool(), day));
        let next = at("2026-03-03T09:00:00Z").date_naive();
        assert!(refresh_daily_tasks(&mut state, &daily_task_pool(), next));
        assert!(state.daily_tasks.iter().all(|t| !t.completed));
    }

    #[test]
    fn completing_twice_is_idempotent() {
        let mut state = on_shift();
        let first = complete_task(&mut state, 1);
        let xp = match first {
            TaskOutcome::Completed(ref c) => c.xp,
            other => panic!("unexpected {:?}", other),
        };
        assert_eq!(state.shift.daily_xp, xp);
        let player_xp = state.player.xp;

        assert!(matches!(
            complete_task(&mut state, 1),
            TaskOutcome::AlreadyCompleted { number: 1, .. }
        ));
        assert_eq!(state.shift.daily_xp, xp);
        assert_eq!(state.shift.tasks_completed, 1);
        assert_eq!(state.player.xp, player_xp);
    }

    #[test]
    fn out_of_range_task_is_reported() {
        let mut state = on_shift();
        assert!(matches!(
            complete_task(&mut state, 0),
            TaskOutcome::NoSuchTask { .. }
        ));
        assert!(matches!(
            complete_task(&mut state, 99),
            TaskOutcome::NoSuchTask { .. }
        ));
    }

    #[test]
    fn clock_in_twice_warns_and_clock_out_requires_duty() {
        let mut state = on_shift();
        assert!(matches!(
            clock_in(&mut state, at("2026-03-02T10:00:00Z")),
            ClockInOutcome::AlreadyOnDuty { .. }
        ));
        let report = match clock_out(&mut state, at("2026-03-02T11:30:00Z")) {
            ClockOutOutcome::Ended(r) => r,
            other => panic!("unexpected {:?}", other),
        };
        assert_eq!(report.elapsed_minutes, 150);
        assert_eq!(report.rating, "UNPRODUCTIVE");
        assert_eq!(
            clock_out(&mut state, at("2026-03-02T12:00:00Z")),
            ClockOutOutcome::NotOnDuty
        );
    }

    #[test]
    fn ratings_follow_completion_rate() {
        assert_eq!(performance_rating(4, 5), "EXCELLENT");
        assert_eq!(performance_rating(3, 6), "SATISFACTORY");
        assert_eq!(performance_rating(1, 5), "NEEDS IMPROVEMENT");
        assert_eq!(performance_rating(0, 5), "UNPRODUCTIVE");
    }

    #[test]
    fn matching_task_completes_only_on_duty() {
        let mut state = on_shift();
        let command = state.daily_tasks[0].command.clone();
        state.shift.clocked_in = false;
        assert!(complete_matching_task(&mut state, &command).is_none());
        state.shift.clocked_in = true;
        let done = complete_matching_task(&mut state, &command).expect("auto");
        assert_eq!(done.number, 1);
    }
}
