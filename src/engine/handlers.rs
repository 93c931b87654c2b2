//! Handlers for the in-engine (`help`, `status`, `nc-*`) commands.
//!
//! Each handler answers with a [`CommandResult`]. Quest, discovery and tier
//! checks happen afterwards in the interpreter; handlers only perform the
//! command's own effect.

use chrono::{DateTime, Utc};
use log::{info, warn};
use sha2::{Digest, Sha256};

use crate::engine::adapter::{default_services, SystemCommandAdapter};
use crate::engine::content::Content;
use crate::engine::discovery::format_discovery_progress;
use crate::engine::pattern::CommandLine;
use crate::engine::progression::format_tier_report;
use crate::engine::quest::{active_quest, format_quest_log};
use crate::engine::output::CommandResult;
use crate::engine::registry::{GameCommand, SystemCommand, DISCOVERY_GATED};
use crate::engine::shift::{
    clock_in, clock_out, complete_task, format_daily_tasks, refresh_daily_tasks, ClockInOutcome,
    ClockOutOutcome, TaskOutcome,
};
use crate::engine::types::{EngineState, ServiceInfo, SkillTrack, XP_PER_LEVEL};

/// Borrowed view of a session for the duration of one handler call.
pub struct HandlerContext<'a> {
    pub state: &'a mut EngineState,
    pub content: &'a Content,
    pub adapter: &'a dyn SystemCommandAdapter,
    pub now: DateTime<Utc>,
}

pub async fn handle_game_command(
    ctx: &mut HandlerContext<'_>,
    command: GameCommand,
    line: &CommandLine,
) -> CommandResult {
    match command {
        GameCommand::Help => handle_help(ctx.state),
        GameCommand::Status => handle_status(ctx.state, ctx.content),
        GameCommand::Quests => CommandResult::info(format_quest_log(ctx.state, ctx.content)),
        GameCommand::History => handle_history(ctx.state),
        GameCommand::NcStatus => handle_nc_status(ctx.state, ctx.content),
        GameCommand::ClockIn => handle_clock_in(ctx.state, ctx.content, ctx.now),
        GameCommand::ClockOut => handle_clock_out(ctx.state, ctx.now),
        GameCommand::DailyTasks => {
            refresh_daily_tasks(ctx.state, &ctx.content.task_pool, ctx.now.date_naive());
            CommandResult::info(format_daily_tasks(ctx.state))
        }
        GameCommand::CompleteTask => handle_complete_task(ctx.state, line.arg(0).unwrap_or_default()),
        GameCommand::DiscoverServices => handle_discover_services(ctx).await,
        GameCommand::MapNetwork => handle_map_network(ctx.state, ctx.now),
        GameCommand::Investigate => {
            handle_investigate(ctx.state, ctx.content, line.arg(0).unwrap_or_default(), ctx.now)
        }
        GameCommand::Decrypt => {
            handle_decrypt(ctx.state, ctx.content, line.arg(0).unwrap_or_default(), ctx.now)
        }
        GameCommand::Evidence => handle_evidence(ctx.state),
        GameCommand::Tier => CommandResult::info(format_tier_report(ctx.state, ctx.content)),
        GameCommand::Specialize => handle_specialize(ctx.state, line.arg(0).unwrap_or_default(), ctx.now),
    }
}

fn handle_help(state: &EngineState) -> CommandResult {
    let mut out = String::from("=== NETCORP TERMINAL ===\nSystem commands:\n  ");
    let system: Vec<&str> = SystemCommand::ALL.iter().map(|c| c.name()).collect();
    out.push_str(&system.join(" "));
    out.push_str("\n\nNetCorp commands:\n");
    for cmd in GameCommand::ALL {
        if DISCOVERY_GATED.contains(&cmd.name()) && !state.discovered_commands.contains(cmd.name()) {
            continue;
        }
        out.push_str(&format!("  {}\n", cmd.usage()));
    }
    out.push_str("\nDuty commands need an active shift (nc-clock-in).");
    CommandResult::info(out)
}

fn handle_status(state: &EngineState, content: &Content) -> CommandResult {
    let player = &state.player;
    let mut out = format!(
        "=== {} ===\n{} (tier {}) | Level {} | XP {}/{}\n",
        player.display_name,
        player.title,
        player.tier,
        player.level,
        player.xp,
        player.level * XP_PER_LEVEL
    );
    match active_quest(state, content) {
        Some(q) => out.push_str(&format!("Assignment: {} - {}\n", q.title, q.objective)),
        None => out.push_str("Assignment: open investigation\n"),
    }
    out.push_str("Skill tracks:\n");
    for (track, ts) in &player.skill_tracks {
        if ts.unlocked {
            out.push_str(&format!("  {:<10} lvl {} ({} xp)\n", track.name(), ts.level, ts.xp));
        } else {
            out.push_str(&format!(
                "  {:<10} locked until level {}\n",
                track.name(),
                track.unlock_level()
            ));
        }
    }
    if let Some(spec) = player.specialization {
        out.push_str(&format!("Specialization: {}\n", spec.name()));
    }
    out.push_str(&format_discovery_progress(state, content));
    CommandResult::info(out)
}

fn handle_history(state: &EngineState) -> CommandResult {
    if state.recent_commands.is_empty() {
        return CommandResult::info("No commands yet.");
    }
    let lines: Vec<String> = state
        .recent_commands
        .iter()
        .enumerate()
        .map(|(i, c)| format!("{:>4}  {}", i + 1, c))
        .collect();
    CommandResult::normal(lines.join("\n"))
}

fn handle_nc_status(state: &EngineState, content: &Content) -> CommandResult {
    let shift = if state.shift.clocked_in {
        match state.shift.shift_start {
            Some(at) => format!("ON DUTY since {}", at.format("%H:%M")),
            None => "ON DUTY".to_string(),
        }
    } else {
        "OFF DUTY".to_string()
    };
    let done = state.daily_tasks.iter().filter(|t| t.completed).count();
    let out = format!(
        "=== NETCORP EMPLOYEE RECORD ===\nEmployee: {} ({})\nPosition: {}\nShift: {}\n\
         Tasks today: {}/{} | Shift XP: {}\nEvidence on file: {}\nQuests completed: {}/{}\n{}",
        state.player.display_name,
        state.player.id,
        state.player.title,
        shift,
        done,
        state.daily_tasks.len(),
        state.shift.daily_xp,
        state.evidence.len(),
        state.player.completed_quests.len(),
        content.quests.len(),
        format_discovery_progress(state, content)
    );
    CommandResult::info(out)
}

fn handle_clock_in(state: &mut EngineState, content: &Content, now: DateTime<Utc>) -> CommandResult {
    refresh_daily_tasks(state, &content.task_pool, now.date_naive());
    match clock_in(state, now) {
        ClockInOutcome::Started { at } => CommandResult::success(format!(
            "Clocked in at {}. {} tasks on today's list. Run nc-daily-tasks to see them.",
            at.format("%H:%M"),
            state.daily_tasks.len()
        ))
        .with_shift_update(),
        ClockInOutcome::AlreadyOnDuty { since } => {
            let since = since
                .map(|s| format!(" since {}", s.format("%H:%M")))
                .unwrap_or_default();
            CommandResult::warning(format!("You are already on duty{}.", since))
        }
    }
}

fn handle_clock_out(state: &mut EngineState, now: DateTime<Utc>) -> CommandResult {
    match clock_out(state, now) {
        ClockOutOutcome::Ended(report) => CommandResult::success(format!(
            "=== SHIFT REPORT ===\nTime on shift: {}h {:02}m\nTasks: {}/{}\nShift XP: {}\nRating: {}",
            report.elapsed_minutes / 60,
            report.elapsed_minutes % 60,
            report.tasks_completed,
            report.tasks_total,
            report.daily_xp,
            report.rating
        ))
        .with_shift_update(),
        ClockOutOutcome::NotOnDuty => CommandResult::error("You are not clocked in."),
    }
}

fn handle_complete_task(state: &mut EngineState, arg: &str) -> CommandResult {
    let Ok(number) = arg.parse::<usize>() else {
        return CommandResult::error(format!("nc-complete-task: '{}' is not a task number", arg));
    };
    match complete_task(state, number) {
        TaskOutcome::Completed(done) => {
            let mut result = CommandResult::success(String::new());
            result.task_completion = Some(done);
            result
        }
        TaskOutcome::AlreadyCompleted { number, title } => {
            CommandResult::info(format!("Task #{} ({}) is already completed.", number, title))
        }
        TaskOutcome::NoSuchTask { number, available } => CommandResult::error(format!(
            "nc-complete-task: no task #{} (today's list has {})",
            number, available
        )),
    }
}

fn merge_services(state: &mut EngineState, found: Vec<ServiceInfo>) {
    for service in found {
        match state
            .discovered_services
            .iter_mut()
            .find(|s| s.port == service.port)
        {
            Some(existing) => *existing = service,
            None => state.discovered_services.push(service),
        }
    }
    state.discovered_services.sort_by_key(|s| s.port);
}

async fn handle_discover_services(ctx: &mut HandlerContext<'_>) -> CommandResult {
    let found = match ctx.adapter.discover_services().await {
        Ok(services) => services,
        Err(e) => {
            warn!("service discovery failed, using cached inventory: {}", e);
            default_services()
        }
    };
    merge_services(ctx.state, found);

    let mut out = String::from("PORT   SERVICE        STATUS    DESCRIPTION\n");
    for s in &ctx.state.discovered_services {
        out.push_str(&format!(
            "{:<6} {:<14} {:<9} {}\n",
            s.port, s.name, s.status, s.description
        ));
    }
    let unlisted: Vec<ServiceInfo> = ctx
        .state
        .discovered_services
        .iter()
        .filter(|s| s.status == "unlisted")
        .cloned()
        .collect();
    for s in &unlisted {
        let id = format!("service:{}", s.name);
        if ctx.state.add_evidence(&id, &format!("Unlisted service {}", s.name), &s.description, ctx.now) {
            out.push_str(&format!("\n! {} on port {} is not in the asset register.", s.name, s.port));
        }
    }
    CommandResult::normal(out.trim_end().to_string())
}

fn handle_map_network(state: &mut EngineState, now: DateTime<Utc>) -> CommandResult {
    if state.discovered_services.is_empty() {
        return CommandResult::error(
            "nc-map-network: no service inventory on file. Run nc-discover-services first.",
        );
    }
    let mut out = String::from("=== NETWORK MAP ===\n[10.0.4.27 netcorp-ops-07]\n");
    for s in &state.discovered_services {
        let marker = if s.status == "unlisted" { "??" } else { "--" };
        out.push_str(&format!("  {}{} :{} {}\n", marker, marker, s.port, s.name));
    }
    let external = state
        .discovered_services
        .iter()
        .any(|s| s.status == "unlisted");
    if external {
        out.push_str("  ====> [203.0.113.44 unknown external host]\n");
        state.add_evidence(
            "map:external_host",
            "External replication target",
            "The ops box streams data to 203.0.113.44, which appears on no NetCorp diagram.",
            now,
        );
    }
    CommandResult::normal(out.trim_end().to_string())
}

fn handle_investigate(
    state: &mut EngineState,
    content: &Content,
    topic: &str,
    now: DateTime<Utc>,
) -> CommandResult {
    let Some(found) = content.topic(topic) else {
        let known: Vec<&str> = content.topics.iter().map(|t| t.id).collect();
        return CommandResult::error(format!(
            "nc-investigate: no leads on '{}'. Open leads: {}",
            topic,
            known.join(", ")
        ));
    };
    let first_time = state.investigated_topics.insert(found.id.to_string());
    if first_time {
        state.add_evidence(&format!("topic:{}", found.id), found.title, found.findings, now);
        info!("{} investigated '{}'", state.player.id, found.id);
    }
    let mut result = CommandResult::normal(format!(
        "=== INVESTIGATION: {} ===\n{}",
        found.title, found.findings
    ));
    if first_time {
        result = result.with_player_update();
    }
    result
}

/// Short key fingerprint shown while "decrypting"; stable per player and file.
pub fn decrypt_fragment(player_id: &str, file_name: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(player_id.as_bytes());
    hasher.update(b":");
    hasher.update(file_name.as_bytes());
    hasher
        .finalize()
        .iter()
        .take(6)
        .map(|b| format!("{:02x}", b))
        .collect()
}

fn handle_decrypt(
    state: &mut EngineState,
    content: &Content,
    arg: &str,
    now: DateTime<Utc>,
) -> CommandResult {
    let Some(file) = arg.parse::<u8>().ok().and_then(|n| content.encrypted_file(n)) else {
        return CommandResult::error(format!(
            "nc-decrypt: no archive file '{}' (files 1-{})",
            arg,
            content.encrypted_files.len()
        ));
    };
    let fragment = decrypt_fragment(&state.player.id, file.name);
    let first_time = state.decrypted_files.insert(file.number);
    if first_time {
        state.add_evidence(
            &format!("decrypt:{}", file.number),
            &format!("Decrypted {}", file.name),
            file.plaintext,
            now,
        );
        if let Some(flag) = file.story_flag {
            if state.story_flags.raise(flag) {
                info!("{} raised story flag '{}'", state.player.id, flag);
            }
        }
    }
    let mut result = CommandResult::normal(format!(
        "Decrypting {} with key fragment {}...\n\n{}",
        file.name, fragment, file.plaintext
    ));
    if first_time {
        result = result.with_player_update();
    }
    result
}

fn handle_evidence(state: &EngineState) -> CommandResult {
    if state.evidence.is_empty() {
        return CommandResult::info("Evidence log is empty. Keep looking.");
    }
    let mut out = String::from("=== EVIDENCE LOG ===\n");
    for (i, e) in state.evidence.iter().enumerate() {
        out.push_str(&format!(
            "{}. [{}] {}\n   {}\n",
            i + 1,
            e.recorded_at.format("%Y-%m-%d %H:%M"),
            e.title,
            e.detail
        ));
    }
    CommandResult::info(out.trim_end().to_string())
}

fn handle_specialize(state: &mut EngineState, arg: &str, now: DateTime<Utc>) -> CommandResult {
    let Some(track) = SkillTrack::parse(arg) else {
        return CommandResult::error(format!(
            "nc-specialize: unknown track '{}' (networking, security, systems, devops)",
            arg
        ));
    };
    if let Some(current) = state.player.specialization {
        return CommandResult::info(format!(
            "You already specialize in {}. NetCorp does not do career changes.",
            current.name()
        ));
    }
    if !state.player.is_track_unlocked(track) {
        return CommandResult::error(format!(
            "The {} track is locked until level {}.",
            track.name(),
            track.unlock_level()
        ));
    }
    state.player.specialization = Some(track);
    state.player.touch(now);
    info!("{} specialized in {}", state.player.id, track.name());
    CommandResult::success(format!("You are now a {} specialist.", track.name())).with_player_update()
}
