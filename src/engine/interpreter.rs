//! The per-player session and its `interpret` pipeline.
//!
//! One input runs start to finish before the next is accepted:
//! parse, safety classification, discovery gate, shift gate, dispatch
//! (awaiting the adapter for system commands), then quest, task, discovery,
//! tier and achievement checks, and finally composition of the result.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use log::{debug, info, warn};

use crate::engine::achievement::{builtin_achievements, check_achievements, AchievementDefinition};
use crate::engine::adapter::{fallback_output, SimulatedAdapter, SystemCommandAdapter};
use crate::engine::clock::{Clock, SystemClock};
use crate::engine::content::Content;
use crate::engine::discovery::check_discovery_patterns;
use crate::engine::handlers::{handle_game_command, HandlerContext};
use crate::engine::output::{compose, CommandResult, SideEffects};
use crate::engine::pattern::CommandLine;
use crate::engine::progression::check_progression_advancement;
use crate::engine::quest::{check_quest_progress, recompute_quest_index};
use crate::engine::registry::{not_found, CommandKind, CommandRegistry};
use crate::engine::safety::{classify, default_rules, SafetyRule, SafetyVerdict};
use crate::engine::shift::{complete_matching_task, refresh_daily_tasks, roll_over_day};
use crate::engine::types::{DangerAttempt, EngineState, Severity};
use crate::logutil::escape_log;

/// Trailing token a front end may accept to request the dangerous-command bypass.
pub const FORCE_DANGEROUS_FLAG: &str = "--force-dangerous";

/// Per-call switches for [`GameSession::interpret`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct InterpretOptions {
    /// Skip dangerous-command classification entirely.
    pub force_dangerous: bool,
}

impl InterpretOptions {
    pub fn forced() -> Self {
        Self {
            force_dangerous: true,
        }
    }

    /// Split a front-end line into the command text and options. Only a
    /// trailing `--force-dangerous` token is recognized.
    pub fn from_cli_line(raw: &str) -> (String, Self) {
        let trimmed = raw.trim();
        match trimmed.rsplit_once(char::is_whitespace) {
            Some((head, last)) if last == FORCE_DANGEROUS_FLAG => {
                (head.trim_end().to_string(), Self::forced())
            }
            _ if trimmed == FORCE_DANGEROUS_FLAG => (String::new(), Self::forced()),
            _ => (trimmed.to_string(), Self::default()),
        }
    }
}

/// Sole owner of one player's [`EngineState`].
pub struct GameSession {
    state: EngineState,
    content: Content,
    adapter: Box<dyn SystemCommandAdapter>,
    /// Still the built-in simulator, which shares the session clock.
    default_adapter: bool,
    clock: Arc<dyn Clock>,
    registry: CommandRegistry,
    rules: Vec<SafetyRule>,
    achievements: Vec<AchievementDefinition>,
    /// Dangerous attempts not yet handed to the store.
    unsaved_danger: Vec<DangerAttempt>,
}

impl GameSession {
    pub fn new(mut state: EngineState, content: Content) -> Self {
        // Content may have changed since the state was saved.
        recompute_quest_index(&mut state, &content);
        Self {
            state,
            content,
            adapter: Box::new(SimulatedAdapter::default()),
            default_adapter: true,
            clock: Arc::new(SystemClock),
            registry: CommandRegistry::new(),
            rules: default_rules(),
            achievements: builtin_achievements(),
            unsaved_danger: Vec::new(),
        }
    }

    pub fn with_adapter(mut self, adapter: Box<dyn SystemCommandAdapter>) -> Self {
        self.adapter = adapter;
        self.default_adapter = false;
        self
    }

    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        if self.default_adapter {
            self.adapter = Box::new(SimulatedAdapter::default().with_clock(clock.clone()));
        }
        self.clock = clock;
        self
    }

    pub fn state(&self) -> &EngineState {
        &self.state
    }

    pub fn content(&self) -> &Content {
        &self.content
    }

    pub fn into_state(self) -> EngineState {
        self.state
    }

    /// Dangerous attempts recorded since the last call.
    pub fn drain_danger_attempts(&mut self) -> Vec<DangerAttempt> {
        std::mem::take(&mut self.unsaved_danger)
    }

    fn log_danger(&mut self, line: &CommandLine, rule_id: &str, severity: Severity) {
        let attempt = DangerAttempt {
            at: self.clock.now(),
            input: line.raw.clone(),
            rule_id: rule_id.to_string(),
            severity,
        };
        warn!(
            target: "security",
            "dangerous command player={} rule={} severity={} input={}",
            self.state.player.id,
            rule_id,
            severity.label(),
            escape_log(&line.raw)
        );
        self.state.record_danger(attempt.clone());
        self.unsaved_danger.push(attempt);
    }

    pub async fn interpret(&mut self, raw: &str, options: InterpretOptions) -> CommandResult {
        let line = CommandLine::parse(raw);
        if line.is_empty() {
            return CommandResult::info("");
        }
        let now = self.clock.now();
        debug!(
            "interpret player={} input={}",
            self.state.player.id,
            escape_log(&line.raw)
        );

        let mut warning = None;
        match classify(&self.rules, &line, options.force_dangerous) {
            SafetyVerdict::Clear => {}
            SafetyVerdict::Bypassed => {
                info!(
                    target: "security",
                    "safety bypass player={} input={}",
                    self.state.player.id,
                    escape_log(&line.raw)
                );
            }
            SafetyVerdict::Block {
                rule_id,
                severity,
                message,
            } => {
                self.log_danger(&line, rule_id, severity);
                return CommandResult::blocked(format!(
                    "[BLOCKED - {}] {}\nCommand not executed.",
                    severity.label(),
                    message
                ));
            }
            SafetyVerdict::Warn {
                rule_id,
                severity,
                message,
            } => {
                self.log_danger(&line, rule_id, severity);
                warning = Some(format!("[WARNING - {}] {}", severity.label(), message));
            }
            SafetyVerdict::Embarrassing {
                rule_id,
                message,
                xp,
            } => {
                self.log_danger(&line, rule_id, Severity::Embarrassing);
                self.begin_turn(&line, now);
                self.state.player.add_xp(xp);
                let base = CommandResult::info(message).with_xp(xp);
                return self.finish_turn(base, &line, false, now);
            }
        }

        let name = line.command.as_str();
        // Ahead of the shift gate: an undiscovered command must look unknown.
        if self.registry.is_discovery_gated(name)
            && !self.state.discovered_commands.contains(name)
        {
            debug!("{} rejected: not yet discovered", name);
            return prefix_warning(CommandResult::error(not_found(name)), warning);
        }
        if self.registry.is_shift_gated(name) && !self.state.shift.clocked_in {
            debug!("{} rejected: not on shift", name);
            return CommandResult::error(format!(
                "SHIFT REQUIRED: clock in with nc-clock-in before running {}.",
                name
            ));
        }

        self.begin_turn(&line, now);

        let Some(kind) = self.registry.lookup(name) else {
            let base = prefix_warning(CommandResult::error(not_found(name)), warning);
            return self.finish_turn(base, &line, false, now);
        };
        if let Some(usage) = self.registry.check_arity(name, &line.args) {
            let base = prefix_warning(CommandResult::error(usage), warning);
            return self.finish_turn(base, &line, false, now);
        }

        self.state.learned_commands.insert(name.to_string());
        let base = match kind {
            CommandKind::PassThrough(system) => {
                match self.adapter.execute(system, &line.args).await {
                    Ok(out) => CommandResult::from(out),
                    Err(e) => {
                        warn!("adapter failed for {}: {}; using fallback", system.name(), e);
                        CommandResult::from(fallback_output(system, &line.args))
                    }
                }
            }
            CommandKind::Game(game) => {
                let mut ctx = HandlerContext {
                    state: &mut self.state,
                    content: &self.content,
                    adapter: self.adapter.as_ref(),
                    now,
                };
                handle_game_command(&mut ctx, game, &line).await
            }
        };

        self.finish_turn(prefix_warning(base, warning), &line, true, now)
    }

    /// Day rollover and the recent-command ring, for every input that gets past the gates.
    fn begin_turn(&mut self, line: &CommandLine, now: DateTime<Utc>) {
        let today = now.date_naive();
        roll_over_day(&mut self.state, today);
        if self.state.shift.clocked_in {
            refresh_daily_tasks(&mut self.state, &self.content.task_pool, today);
        }
        self.state.record_recent(&line.raw);
    }

    fn finish_turn(
        &mut self,
        mut base: CommandResult,
        line: &CommandLine,
        dispatched: bool,
        now: DateTime<Utc>,
    ) -> CommandResult {
        let mut effects = SideEffects {
            task: base.task_completion.take(),
            ..Default::default()
        };

        if dispatched && base.succeeded() {
            effects.quest = check_quest_progress(&mut self.state, &self.content, &line.command, now);
            if effects.task.is_none() {
                effects.task = complete_matching_task(&mut self.state, &line.command);
            }
        }

        let discovery = check_discovery_patterns(&mut self.state, &self.content, line, now);
        effects.discovery = discovery.notice;
        effects.discoveries_fired = discovery.fired;
        effects.discovery_xp = discovery.xp;

        effects.advancement = check_progression_advancement(&mut self.state, &self.content, now);
        // Quest eligibility depends on level, which discoveries and tasks can raise.
        recompute_quest_index(&mut self.state, &self.content);

        effects.achievements = check_achievements(&mut self.state, &self.achievements)
            .into_iter()
            .map(|a| (a.title.to_string(), a.description.to_string()))
            .collect();

        compose(base, effects)
    }
}

fn prefix_warning(mut base: CommandResult, warning: Option<String>) -> CommandResult {
    if let Some(text) = warning {
        base.output = if base.output.is_empty() {
            text
        } else {
            format!("{}\n{}", text, base.output)
        };
    }
    base
}
