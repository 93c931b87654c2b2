//! Test utilities & fixtures shared by the integration tests.
#![allow(dead_code)] // each test binary uses a different subset

use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use ncterm::engine::registry::SystemCommand;
use ncterm::engine::types::ServiceInfo;
use ncterm::engine::{
    AdapterError, AdapterOutput, Content, EngineState, FixedClock, GameSession, InterpretOptions,
    CommandResult, SystemCommandAdapter,
};

/// Monday morning, the recruit's first day.
pub fn start_time() -> DateTime<Utc> {
    DateTime::parse_from_rfc3339("2026-03-02T09:00:00Z")
        .unwrap()
        .with_timezone(&Utc)
}

/// Fresh recruit session on built-in content with a fixed clock.
pub fn session() -> (GameSession, FixedClock) {
    session_with(Content::builtin())
}

pub fn session_with(content: Content) -> (GameSession, FixedClock) {
    let clock = FixedClock::new(start_time());
    let state = EngineState::new("recruit", "New Recruit", start_time());
    let session = GameSession::new(state, content).with_clock(Arc::new(clock.clone()));
    (session, clock)
}

/// Run one input without the bypass flag.
pub async fn run(session: &mut GameSession, input: &str) -> CommandResult {
    session.interpret(input, InterpretOptions::default()).await
}

/// Run several inputs in order, returning the last result.
pub async fn run_all(session: &mut GameSession, inputs: &[&str]) -> CommandResult {
    let mut last = CommandResult::default();
    for input in inputs {
        last = run(session, input).await;
    }
    last
}

/// An adapter whose every call fails, as an unreachable backend would.
pub struct FailingAdapter;

#[async_trait]
impl SystemCommandAdapter for FailingAdapter {
    async fn execute(
        &self,
        command: SystemCommand,
        _args: &[String],
    ) -> Result<AdapterOutput, AdapterError> {
        Err(AdapterError::Unavailable(format!("{} backend down", command.name())))
    }

    async fn discover_services(&self) -> Result<Vec<ServiceInfo>, AdapterError> {
        Err(AdapterError::Unavailable("scanner down".to_string()))
    }
}
