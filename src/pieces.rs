//! Pieces and their drag state machine.
//!
//! A piece is a fixed set of parts laid out on the grid, all of one color and
//! one shape. While it rests on a board its parts claim cells; picking it up
//! releases them and dropping it claims cells again at the new position.
//!
//! ```text
//! Idle -> Dragging -> Committing -> Idle
//!                  \-> Returning  -> Idle
//! ```

use std::fmt;

use log::{debug, warn};
use serde::Deserialize;

use crate::error::DragError;
use crate::geometry::{Coord, Vec3};
use crate::grid::{BoardId, BoardSet, CellRef, Occupant};
use crate::transition::Transition;

/// Handle of a piece within its session.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct PieceId(pub usize);

impl fmt::Display for PieceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A color name as it appears in level data, e.g. `"red"`.
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Deserialize)]
#[serde(transparent)]
pub struct Color(String);

impl Color {
    pub fn new(name: impl Into<String>) -> Self {
        Self(name.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Single-character tag used by text renderings.
    pub fn glyph(&self) -> char {
        self.0
            .chars()
            .next()
            .map_or('?', |c| c.to_ascii_uppercase())
    }
}

impl fmt::Display for Color {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for Color {
    fn from(name: &str) -> Self {
        Self::new(name)
    }
}

/// Outline of a cell or of a piece's parts.
///
/// Level data encodes shapes as integers; unknown codes decode as `Full`.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Deserialize)]
#[serde(from = "i64")]
pub enum Shape {
    #[default]
    Full,
    TopRight,
    TopLeft,
    BottomRight,
    BottomLeft,
}

impl From<i64> for Shape {
    fn from(code: i64) -> Self {
        match code {
            1 => Self::TopRight,
            2 => Self::TopLeft,
            3 => Self::BottomRight,
            4 => Self::BottomLeft,
            _ => Self::Full,
        }
    }
}

impl Shape {
    /// Whether a cell of this shape can hold a piece of shape `piece`.
    ///
    /// Full pieces go anywhere and full cells take anything; otherwise the
    /// corner variants must match exactly.
    pub fn accepts(self, piece: Self) -> bool {
        piece == Self::Full || self == Self::Full || self == piece
    }
}

/// Where a piece is in its drag cycle.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum DragState {
    Idle,
    Dragging,
    Committing,
    Returning,
}

/// A draggable colored piece.
#[derive(Clone, Debug)]
pub struct Piece {
    id: PieceId,
    name: String,
    color: Color,
    shape: Shape,
    /// Grid coordinates of the parts as laid out in the level data.
    parts: Vec<Coord>,
    /// World offsets of the parts from `position`, depth zeroed.
    offsets: Vec<Vec3>,
    fixed: bool,
    state: DragState,
    /// Logical position; during a settle this is already the target.
    position: Vec3,
    /// Last committed position.
    origin: Vec3,
    claimed: Vec<CellRef>,
    motion: Option<Transition>,
    lock_on_settle: bool,
}

impl Piece {
    /// Builds a piece from its parts' grid coordinates and world positions.
    ///
    /// The piece rests at the centroid of its parts, at `resting_depth`.
    pub fn new(
        id: PieceId,
        name: impl Into<String>,
        color: Color,
        shape: Shape,
        parts: Vec<(Coord, Vec3)>,
        fixed: bool,
        resting_depth: f32,
    ) -> Self {
        let position = Vec3::centroid(parts.iter().map(|&(_, world)| world))
            .unwrap_or(Vec3::ZERO)
            .with_z(resting_depth);
        let offsets = parts
            .iter()
            .map(|&(_, world)| (world - position).with_z(0.0))
            .collect();

        Self {
            id,
            name: name.into(),
            color,
            shape,
            parts: parts.into_iter().map(|(coord, _)| coord).collect(),
            offsets,
            fixed,
            state: DragState::Idle,
            position,
            origin: position,
            claimed: Vec::new(),
            motion: None,
            lock_on_settle: false,
        }
    }

    pub const fn id(&self) -> PieceId {
        self.id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub const fn color(&self) -> &Color {
        &self.color
    }

    pub const fn shape(&self) -> Shape {
        self.shape
    }

    pub fn parts(&self) -> &[Coord] {
        &self.parts
    }

    pub fn part_count(&self) -> usize {
        self.parts.len()
    }

    pub const fn is_fixed(&self) -> bool {
        self.fixed
    }

    pub const fn state(&self) -> DragState {
        self.state
    }

    pub fn is_idle(&self) -> bool {
        self.state == DragState::Idle
    }

    pub const fn position(&self) -> Vec3 {
        self.position
    }

    pub const fn origin(&self) -> Vec3 {
        self.origin
    }

    /// Where the piece should be drawn right now.
    pub fn presented_position(&self) -> Vec3 {
        self.motion
            .as_ref()
            .map_or(self.position, Transition::position)
    }

    /// Cells currently held by this piece.
    pub fn claimed_cells(&self) -> &[CellRef] {
        &self.claimed
    }

    /// Board of the first claimed cell, if the piece rests on one.
    pub fn home_board(&self) -> Option<BoardId> {
        self.claimed.first().map(|cell| cell.board)
    }

    /// World positions of the parts at the logical position.
    pub fn part_positions(&self) -> impl Iterator<Item = Vec3> + '_ {
        self.offsets.iter().map(move |&offset| self.position + offset)
    }

    /// Whether `point` falls inside the square footprint of any part.
    pub fn covers(&self, point: Vec3, half_extent: f32) -> bool {
        self.part_positions().any(|part| {
            (part.x - point.x).abs() <= half_extent && (part.y - point.y).abs() <= half_extent
        })
    }

    /// Claims cells at the current position without moving, as when a
    /// stage is first built. Returns how many parts found a cell.
    pub fn place(&mut self, boards: &mut BoardSet, radius: f32) -> usize {
        self.claim_cells(boards, radius)
    }

    /// Gives back every claimed cell without changing state, undoing `place`.
    pub fn unplace(&mut self, boards: &mut BoardSet) {
        self.release_cells(boards);
    }

    /// Picks the piece up, releasing the cells it held.
    ///
    /// # Errors
    ///
    /// Fails if the piece is fixed or not idle.
    pub fn start_drag(&mut self, boards: &mut BoardSet) -> Result<(), DragError> {
        if self.fixed {
            return Err(DragError::Fixed { piece: self.id });
        }
        self.expect_state(DragState::Idle)?;
        self.release_cells(boards);
        self.state = DragState::Dragging;
        debug!("piece {} ({}) picked up", self.id, self.name);
        Ok(())
    }

    /// Moves a dragged piece rigidly; occupancy is untouched.
    ///
    /// # Errors
    ///
    /// Fails unless the piece is being dragged.
    pub fn update_position(&mut self, position: Vec3) -> Result<(), DragError> {
        self.expect_state(DragState::Dragging)?;
        self.position = position;
        Ok(())
    }

    /// Drops the piece at `target` and claims the cells under its parts.
    ///
    /// Returns how many parts found a cell. Parts with no acceptable cell
    /// within `radius` stay untracked.
    ///
    /// # Errors
    ///
    /// Fails unless the piece is being dragged.
    pub fn commit(
        &mut self,
        target: Vec3,
        boards: &mut BoardSet,
        radius: f32,
        duration: f32,
    ) -> Result<usize, DragError> {
        self.expect_state(DragState::Dragging)?;
        self.settle_at(target, DragState::Committing, duration);
        self.origin = target;
        Ok(self.claim_cells(boards, radius))
    }

    /// Sends the piece back to its last committed position and reclaims the
    /// cells it held there.
    ///
    /// # Errors
    ///
    /// Fails unless the piece is being dragged.
    pub fn return_to_origin(
        &mut self,
        boards: &mut BoardSet,
        radius: f32,
        duration: f32,
    ) -> Result<usize, DragError> {
        self.expect_state(DragState::Dragging)?;
        self.settle_at(self.origin, DragState::Returning, duration);
        Ok(self.claim_cells(boards, radius))
    }

    /// Advances an in-flight settle; returns `true` on the tick it finishes.
    pub fn tick(&mut self, dt: f32) -> bool {
        let Some(motion) = self.motion.as_mut() else {
            return false;
        };
        if !motion.advance(dt) {
            return false;
        }
        self.position = motion.target();
        self.motion = None;
        self.state = DragState::Idle;
        if std::mem::take(&mut self.lock_on_settle) {
            self.fixed = true;
        }
        debug!("piece {} settled", self.id);
        true
    }

    /// Locks an idle piece in place for good.
    ///
    /// # Errors
    ///
    /// Fails unless the piece is idle.
    pub fn set_fixed(&mut self) -> Result<(), DragError> {
        self.expect_state(DragState::Idle)?;
        self.fixed = true;
        Ok(())
    }

    /// Locks the piece now if idle, otherwise as soon as it settles.
    ///
    /// Returns `true` when the lock took effect immediately.
    pub fn request_lock(&mut self) -> bool {
        if self.set_fixed().is_ok() {
            true
        } else {
            self.lock_on_settle = true;
            false
        }
    }

    fn settle_at(&mut self, target: Vec3, state: DragState, duration: f32) {
        self.motion = Some(Transition::new(self.position, target, duration));
        self.position = target;
        self.state = state;
    }

    fn claim_cells(&mut self, boards: &mut BoardSet, radius: f32) -> usize {
        let mut claimed: Vec<CellRef> = Vec::with_capacity(self.offsets.len());
        for part in self.part_positions().collect::<Vec<_>>() {
            let found = boards.nearest_cell(part, radius, |cell_ref, cell| {
                cell.shape().accepts(self.shape)
                    && !claimed.contains(&cell_ref)
                    && cell.occupant().map_or(true, |o| o.piece == self.id)
            });
            let Some(cell_ref) = found else {
                warn!(
                    "piece {} part at ({:.2}, {:.2}) found no cell within {radius}",
                    self.id, part.x, part.y
                );
                continue;
            };
            boards.set_cell_occupied(
                cell_ref,
                Some(Occupant {
                    color: self.color.clone(),
                    piece: self.id,
                }),
            );
            claimed.push(cell_ref);
        }
        self.claimed = claimed;
        self.claimed.len()
    }

    fn release_cells(&mut self, boards: &mut BoardSet) {
        for cell_ref in self.claimed.drain(..) {
            boards.set_cell_occupied(cell_ref, None);
        }
    }

    fn expect_state(&self, expected: DragState) -> Result<(), DragError> {
        if self.state == expected {
            Ok(())
        } else {
            Err(DragError::WrongState {
                piece: self.id,
                expected,
                actual: self.state,
            })
        }
    }
}
