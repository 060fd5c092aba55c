//! Color Sort Puzzle Engine
//!
//! Placement, occupancy and completion logic for a grid-based color-sorting
//! puzzle. Players drag multi-cell pieces between boards; a board is solved
//! once every cell holds a part of the same color, and solving enough boards
//! advances the level.
//!
//! [`Game`] is the usual entry point. The lower layers ([`Session`],
//! [`DragController`], [`Director`]) can be driven directly when a host needs
//! finer control.

pub mod config;
pub mod director;
pub mod error;
pub mod events;
pub mod game;
pub mod geometry;
pub mod grid;
pub mod level;
pub mod pieces;
pub mod placement;
pub mod session;
pub mod transition;

pub use config::EngineConfig;
pub use director::{Director, LevelOutcome};
pub use error::{DragError, EngineError};
pub use events::{EventBus, GameEvent, SubscriptionId};
pub use game::Game;
pub use geometry::{Coord, Ray, Vec3};
pub use grid::{Board, BoardId, BoardSet, Cell, CellRef};
pub use level::{BoardSpec, CellSpec, LevelDefinition, LevelSource, PieceSpec};
pub use pieces::{Color, DragState, Piece, PieceId, Shape};
pub use placement::{DragController, PressOutcome, ReleaseOutcome};
pub use session::Session;
