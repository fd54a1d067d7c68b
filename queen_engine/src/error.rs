use thiserror::Error;

/// Lookups into the world tables that the script data promised would exist.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum EngineError {
    #[error("resource {0} not found")]
    MissingResource(String),
    #[error("object {0} is out of range")]
    UnknownObject(u16),
    #[error("item {0} is out of range")]
    UnknownItem(u16),
    #[error("room {0} is out of range")]
    UnknownRoom(u16),
    #[error("area {area} of room {room} is out of range")]
    UnknownArea { room: u16, area: u16 },
    #[error("gamestate slot {0} is out of range")]
    UnknownSlot(u16),
    #[error("dialogue key {0} has no session slot")]
    UnknownDialogue(i16),
    #[error("complex animation has {0} frames (limit 30)")]
    ComplexAnimationTooLong(usize),
}
