//! End-to-end walkthroughs of the recruit's first commands.
mod common;

use common::{run, run_all, session};
use ncterm::engine::{InterpretOptions, ResultKind};

#[tokio::test]
async fn pwd_completes_orientation_and_advances_to_explore() {
    let (mut s, _clock) = session();
    let out = run(&mut s, "pwd").await;

    assert!(out.output.starts_with("/home/recruit"));
    assert_eq!(out.kind, ResultKind::Success);
    assert_eq!(out.xp_gained, 10);
    assert_eq!(s.state().player.xp, 10);
    assert!(s.state().player.has_completed("orientation"));
    let quest = out.quest_completed.expect("quest completion");
    assert_eq!(quest.quest_id, "orientation");
    assert_eq!(s.content().quests[s.state().current_quest_index].id, "explore");
}

#[tokio::test]
async fn wiping_root_is_blocked_without_reward() {
    let (mut s, _clock) = session();
    let out = run(&mut s, "rm -rf /").await;

    assert_eq!(out.kind, ResultKind::Blocked);
    assert!(out.output.contains("Command not executed"));
    assert_eq!(out.xp_gained, 0);
    assert_eq!(s.state().player.xp, 0);
    assert_eq!(s.state().current_quest_index, 0);
    assert!(s.state().player.completed_quests.is_empty());
    assert!(s.state().recent_commands.is_empty());
    assert_eq!(s.state().danger_history.len(), 1);
    assert_eq!(s.state().danger_history[0].rule_id, "wipe_root");
}

#[tokio::test]
async fn bypass_flag_skips_the_safety_layer() {
    let (mut s, _clock) = session();
    let out = s
        .interpret("rm -rf /", InterpretOptions::forced())
        .await;
    assert_ne!(out.kind, ResultKind::Blocked);
    assert!(s.state().danger_history.is_empty());
}

#[tokio::test]
async fn shift_command_while_clocked_out_is_rejected() {
    let (mut s, _clock) = session();
    let out = run(&mut s, "nc-discover-services").await;

    assert_eq!(out.kind, ResultKind::Error);
    assert!(out.output.starts_with("SHIFT REQUIRED"));
    assert_eq!(out.xp_gained, 0);
    assert!(s.state().discovered_services.is_empty());
    assert!(s.state().recent_commands.is_empty());
}

#[tokio::test]
async fn completing_a_task_twice_pays_once() {
    let (mut s, _clock) = session();
    let clock_in = run(&mut s, "nc-clock-in").await;
    assert_eq!(clock_in.kind, ResultKind::Success);
    assert!(s.state().shift.clocked_in);
    let reward = s.state().daily_tasks[0].xp_reward;

    let first = run(&mut s, "nc-complete-task 1").await;
    assert_eq!(first.xp_gained, reward);
    assert!(s.state().daily_tasks[0].completed);
    let daily_xp = s.state().shift.daily_xp;
    let xp = s.state().player.xp;

    let second = run(&mut s, "nc-complete-task 1").await;
    assert_eq!(second.kind, ResultKind::Info);
    assert!(second.output.contains("already completed"));
    assert_eq!(second.xp_gained, 0);
    assert_eq!(s.state().shift.daily_xp, daily_xp);
    assert_eq!(s.state().player.xp, xp);
}

#[tokio::test]
async fn third_ls_fires_filesystem_discovery_once() {
    let (mut s, _clock) = session();
    let first = run(&mut s, "ls").await;
    assert!(first.discovery.is_none());
    let second = run(&mut s, "ls").await;
    assert!(second.discovery.is_none());
    assert!(!s.state().story_flags.is_set("explored_filesystem"));

    let third = run(&mut s, "ls").await;
    assert_eq!(third.kind, ResultKind::Discovery);
    let notice = third.discovery.expect("discovery notice");
    assert_eq!(notice.trigger_id, "filesystem_explorer");
    assert!(s.state().story_flags.is_set("explored_filesystem"));
    let xp = s.state().player.xp;

    let fourth = run(&mut s, "ls").await;
    assert!(fourth.discovery.is_none());
    assert_eq!(s.state().player.xp, xp);
}

#[tokio::test]
async fn reading_the_admin_note_unlocks_investigation() {
    let (mut s, _clock) = session();
    run_all(&mut s, &["nc-clock-in"]).await;
    let hidden = run(&mut s, "nc-investigate aurora").await;
    assert_eq!(hidden.output, "nc-investigate: command not found");

    let note = run(&mut s, "cat admin_note.txt").await;
    assert_eq!(note.kind, ResultKind::Discovery);
    assert!(s.state().discovered_commands.contains("nc-investigate"));

    let found = run(&mut s, "nc-investigate aurora").await;
    assert_ne!(found.kind, ResultKind::Error);
    assert!(s.state().story_flags.is_set("learned_company_conspiracy"));
    assert!(s.state().discovered_commands.contains("nc-decrypt"));
}

#[tokio::test]
async fn first_steps_reach_analyst() {
    let (mut s, _clock) = session();
    run_all(&mut s, &["pwd", "ls", "whoami"]).await;
    assert_eq!(s.state().player.tier, 1);

    let out = run(&mut s, "cat admin_note.txt").await;
    assert_eq!(out.kind, ResultKind::Advancement);
    let adv = out.advancement.expect("advancement");
    assert_eq!(adv.tier, 2);
    assert_eq!(s.state().player.title, "ANALYST");
}
