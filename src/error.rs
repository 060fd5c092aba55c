//! Error types.
//!
//! Gameplay failures (bad geometry, counter drift, illegal drops) are
//! recovered where they happen and never surface here. These enums cover
//! misuse of the piece state machine and problems with the level data or the
//! command-line inputs.

use std::path::PathBuf;

use thiserror::Error;

use crate::pieces::{DragState, PieceId};

/// An operation was attempted in a drag state that does not allow it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum DragError {
    #[error("piece {piece} is fixed and cannot move")]
    Fixed { piece: PieceId },

    #[error("piece {piece} is {actual:?}, expected {expected:?}")]
    WrongState {
        piece: PieceId,
        expected: DragState,
        actual: DragState,
    },
}

/// Errors surfaced by the engine entry points and the command-line tool.
#[derive(Debug, Error)]
pub enum EngineError {
    #[error("level source has no stage {stage}")]
    MissingStage { stage: u32 },

    #[error("failed to read '{}': {source}", path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid JSON in '{}': {source}", path.display())]
    Json {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("script line {line}: {reason}")]
    Script { line: usize, reason: String },
}

/// Convenience alias for engine results.
pub type Result<T> = std::result::Result<T, EngineError>;
