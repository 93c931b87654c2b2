//! # ncterm - NetCorp terminal simulator
//!
//! A narrative game played at a fake Linux prompt. The player is a new recruit
//! at NetCorp; ordinary commands (`pwd`, `ls`, `cat`, `netstat`) and NetCorp's
//! own `nc-*` tooling drive a quest line, hidden discoveries, daily shifts and a
//! five-tier career ladder, while a safety layer intercepts destructive input.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use ncterm::engine::{Content, EngineState, GameSession, InterpretOptions};
//!
//! #[tokio::main]
//! async fn main() {
//!     let state = EngineState::new("recruit", "New Recruit", chrono::Utc::now());
//!     let mut session = GameSession::new(state, Content::builtin());
//!     let result = session.interpret("pwd", InterpretOptions::default()).await;
//!     println!("{}", result.output);
//! }
//! ```
//!
//! ## Module Organization
//!
//! - [`engine`] - interpreter, progression state machine, content, adapter and store
//! - [`config`] - TOML configuration
//! - [`logutil`] - log-safe rendering of player input

pub mod config;
pub mod engine;
pub mod logutil;
