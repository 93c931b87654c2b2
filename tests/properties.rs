//! Invariants that must hold over arbitrary input sequences.
mod common;

use chrono::Duration;
use common::{run, session, session_with, start_time, FailingAdapter};
use ncterm::engine::progression::check_progression_advancement;
use ncterm::engine::registry::{DISCOVERY_GATED, SHIFT_GATED};
use ncterm::engine::shift::sample_daily_tasks;
use ncterm::engine::types::{DiscoveryTrigger, StoryFlags};
use ncterm::engine::{Content, ResultKind};

const MIXED_INPUT: &[&str] = &[
    "pwd",
    "ls",
    "rm -rf /",
    "whoami",
    "cat",
    "cat handbook.txt",
    "frobnicate",
    "nc-daily-tasks",
    "nc-clock-in",
    "sudo make me a sandwich",
    "nc-complete-task 9",
    "nc-complete-task 1",
    "ifconfig",
    "netstat",
    "ping 10.0.4.1",
    "reboot",
    "ps",
    "top",
    "nc-discover-services",
    "cat admin_note.txt",
    "nc-map-network",
    "nc-investigate aurora",
    "nc-decrypt 3",
    "nc-clock-out",
    "pwd",
];

#[tokio::test]
async fn xp_never_decreases_and_quests_stay_completed() {
    let (mut s, _clock) = session();
    let mut last_xp = 0;
    let mut completed: Vec<String> = Vec::new();
    for input in MIXED_INPUT {
        run(&mut s, input).await;
        let player = &s.state().player;
        assert!(player.xp >= last_xp, "xp dropped after '{}'", input);
        for id in &completed {
            assert!(player.has_completed(id), "{} reverted after '{}'", id, input);
        }
        last_xp = player.xp;
        completed = player.completed_quests.clone();
    }
    assert!(!completed.is_empty());
}

#[tokio::test]
async fn shift_gated_commands_do_nothing_off_duty() {
    let (mut s, _clock) = session();
    for name in SHIFT_GATED {
        let before = s.state().clone();
        let out = run(&mut s, &format!("{} 1", name)).await;
        assert_eq!(out.kind, ResultKind::Error, "{}", name);
        assert_eq!(out.xp_gained, 0, "{}", name);
        assert_eq!(s.state(), &before, "{} mutated state", name);
    }
}

#[tokio::test]
async fn undiscovered_commands_look_unknown_even_off_shift() {
    let (mut s, _clock) = session();
    for name in DISCOVERY_GATED {
        let before = s.state().clone();
        let out = run(&mut s, &format!("{} 1", name)).await;
        assert_eq!(out.output, format!("{}: command not found", name));
        assert_eq!(s.state(), &before, "{} mutated state", name);
    }
    // Once discovered, the shift requirement shows up.
    run(&mut s, "cat admin_note.txt").await;
    let out = run(&mut s, "nc-investigate aurora").await;
    assert!(out.output.starts_with("SHIFT REQUIRED"));
}

#[tokio::test]
async fn discovery_fires_exactly_at_threshold() {
    let (mut s, _clock) = session();
    // hidden_process: threshold 2 over ps/top
    let first = run(&mut s, "ps").await;
    assert!(first.discovery.is_none());
    assert!(!s.state().player.discoveries.contains(&"hidden_process".to_string()));

    let second = run(&mut s, "top").await;
    assert_eq!(
        second.discovery.map(|d| d.trigger_id),
        Some("hidden_process".to_string())
    );
    let xp = s.state().player.xp;

    let third = run(&mut s, "ps").await;
    assert!(third.discovery.is_none());
    assert_eq!(s.state().player.xp, xp);
    let count = s
        .state()
        .player
        .discoveries
        .iter()
        .filter(|d| d.as_str() == "hidden_process")
        .count();
    assert_eq!(count, 1);
}

fn two_date_triggers() -> Content {
    let mut content = Content::builtin();
    content.triggers.push(
        DiscoveryTrigger::new("calendar", "Calendar", "It is a weekday.", "saw_calendar", 1)
            .with_relevant("date")
            .with_xp(5),
    );
    content.triggers.push(
        DiscoveryTrigger::new("clock_skew", "Clock Skew", "The clock drifts.", "saw_skew", 1)
            .with_relevant("date")
            .with_xp(7),
    );
    content
}

#[tokio::test]
async fn simultaneous_discoveries_queue_their_notices() {
    let (mut s, _clock) = session_with(two_date_triggers());

    let first = run(&mut s, "date").await;
    assert_eq!(first.kind, ResultKind::Discovery);
    assert_eq!(first.discovery.map(|d| d.trigger_id), Some("calendar".to_string()));
    assert_eq!(first.xp_gained, 12);
    assert!(first.output.contains("[DISCOVERY] Calendar\nIt is a weekday.\n+5 XP"));
    assert!(s.state().story_flags.is_set("saw_calendar"));
    assert!(s.state().story_flags.is_set("saw_skew"));
    assert_eq!(s.state().pending_notices.len(), 1);

    let second = run(&mut s, "uname").await;
    assert_ne!(second.kind, ResultKind::Discovery);
    assert_eq!(
        second.discovery.map(|d| d.trigger_id),
        Some("clock_skew".to_string())
    );
    assert!(second.output.contains("[DISCOVERY] Clock Skew"));
    assert_eq!(second.xp_gained, 0);
    assert!(s.state().pending_notices.is_empty());
}

#[tokio::test]
async fn replayed_notice_does_not_dress_up_a_failed_command() {
    let (mut s, _clock) = session_with(two_date_triggers());
    run(&mut s, "date").await;
    let xp = s.state().player.xp;

    let out = run(&mut s, "frobnicate").await;
    assert_eq!(out.kind, ResultKind::Error);
    assert_eq!(out.xp_gained, 0);
    assert!(out.output.starts_with("frobnicate: command not found"));
    assert!(out.output.contains("[DISCOVERY] Clock Skew"));
    assert!(!out.output.contains("+7 XP"));
    assert_eq!(out.discovery.map(|d| d.trigger_id), Some("clock_skew".to_string()));
    assert_eq!(s.state().player.xp, xp);
}

#[tokio::test]
async fn tier_never_drops_when_flags_are_lost() {
    let (mut s, _clock) = session();
    for input in ["pwd", "ls", "whoami", "cat admin_note.txt"] {
        run(&mut s, input).await;
    }
    let content = s.content().clone();
    let mut state = s.into_state();
    assert_eq!(state.player.tier, 2);

    state.story_flags = StoryFlags::default();
    state.player.discoveries.clear();
    assert!(check_progression_advancement(&mut state, &content, start_time()).is_none());
    assert_eq!(state.player.tier, 2);
}

#[tokio::test]
async fn adapter_failure_degrades_to_fallback_and_still_progresses() {
    let (s, _clock) = session();
    let mut s = s.with_adapter(Box::new(FailingAdapter));

    let out = run(&mut s, "pwd").await;
    assert!(out.output.contains("/home/recruit"));
    assert_eq!(out.kind, ResultKind::Success);
    assert!(s.state().player.has_completed("orientation"));

    run(&mut s, "nc-clock-in").await;
    let services = run(&mut s, "nc-discover-services").await;
    assert_ne!(services.kind, ResultKind::Error);
    assert!(s
        .state()
        .discovered_services
        .iter()
        .any(|svc| svc.name == "aurora-sync"));
}

#[test]
fn daily_tasks_are_reproducible_per_player_and_day() {
    let pool = Content::builtin().task_pool;
    let day = start_time().date_naive();
    let first = sample_daily_tasks(&pool, "recruit", day);
    let again = sample_daily_tasks(&pool, "recruit", day);
    assert_eq!(first, again);
    assert!((4..=6).contains(&first.len()));
    assert!(first.iter().all(|t| !t.completed));

    let ids: std::collections::HashSet<_> = first.iter().map(|t| t.id.as_str()).collect();
    assert_eq!(ids.len(), first.len());
}

#[tokio::test]
async fn new_day_resets_shift_counters_and_tasks() {
    let (mut s, clock) = session();
    run(&mut s, "nc-clock-in").await;
    run(&mut s, "nc-complete-task 1").await;
    assert_eq!(s.state().shift.tasks_completed, 1);
    let yesterday = s.state().tasks_refreshed_on;

    clock.advance(Duration::days(1));
    run(&mut s, "nc-daily-tasks").await;
    assert_eq!(s.state().shift.tasks_completed, 0);
    assert_eq!(s.state().shift.daily_xp, 0);
    assert_ne!(s.state().tasks_refreshed_on, yesterday);
    assert!(s.state().daily_tasks.iter().all(|t| !t.completed));
}
