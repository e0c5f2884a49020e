#![warn(clippy::pedantic)]
#![allow(clippy::must_use_candidate)]
#![allow(clippy::missing_errors_doc)]

// Core modules
pub mod audio;
pub mod bus;
pub mod command;
pub mod condition;
pub mod dispatch;
pub mod engine;
pub mod events;
pub mod game_loop;
pub mod interaction;
pub mod movement;
pub mod npc;
pub mod oracle;
pub mod parser;
pub mod progression;
pub mod puzzle;
pub mod render;
pub mod save;
pub mod scheduler;
pub mod state;
pub mod vocab;
pub mod world;

// Re-exports for convenience
pub use bus::{EngineEvent, EventBus};
pub use command::{Command, RefKind, ResolvedRef, Verb};
pub use engine::Engine;
pub use oracle::{OfflineOracle, Oracle};
pub use state::{GameState, ItemLocation};
pub use world::{World, WorldLoadError};

/// The Reverie engine version for the current build.
pub const REVERIE_VERSION: &str = env!("CARGO_PKG_VERSION");

/// Save document schema revision; older saves are rejected.
pub const SAVE_SCHEMA_VERSION: u32 = 1;
