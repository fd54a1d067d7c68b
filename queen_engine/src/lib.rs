//! Rule engine for the table-driven adventure: the command resolver, the
//! cutscene interpreter and the dialogue interpreter, all driving one shared
//! [`world::WorldState`] through the host traits in [`host`].

pub mod command;
pub mod config;
pub mod context;
pub mod cutscene;
pub mod dialogue;
pub mod engine;
pub mod error;
pub mod host;
pub mod persistence;
pub mod pump;
pub mod resources;
pub mod scheduler;
pub mod speech;
pub mod tables;
pub mod world;

pub use command::{Command, CommandOutcome, CommandSession, Resolution, Selection};
pub use config::EngineConfig;
pub use context::ScriptContext;
pub use cutscene::CutsceneOutcome;
pub use dialogue::DialogueOutcome;
pub use engine::Engine;
pub use error::EngineError;
pub use host::{Host, HostEvent, InputState, RecordingHost};
pub use resources::{MemoryResources, ResourceCollection, ResourceSource};
pub use scheduler::ScriptRef;
pub use world::WorldState;
