//! NetCorp terminal engine.
//!
//! `interpreter::GameSession` owns one player's [`EngineState`] and turns raw
//! input lines into [`CommandResult`]s. The progression modules (`quest`,
//! `discovery`, `progression`, `shift`, `achievement`) are free transition
//! functions over that state, so they can be unit tested without a session.

pub mod achievement;
pub mod adapter;
pub mod clock;
pub mod content;
pub mod discovery;
pub mod errors;
pub mod handlers;
pub mod interpreter;
pub mod output;
pub mod pattern;
pub mod progression;
pub mod quest;
pub mod registry;
pub mod safety;
pub mod shift;
pub mod storage;
pub mod types;

pub use adapter::{
    fallback_output, AdapterOutput, OutputKind, SimulatedAdapter, SystemCommandAdapter,
    TimeoutAdapter,
};
pub use clock::{Clock, FixedClock, SystemClock};
pub use content::Content;
pub use errors::{AdapterError, EngineError};
pub use interpreter::{GameSession, InterpretOptions};
pub use output::{CommandResult, ResultKind};
pub use storage::{GameStore, GameStoreBuilder};
pub use types::{EngineState, Player, SkillTrack};
