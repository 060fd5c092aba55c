//! The session: explicit owner of a stage's boards and pieces.
//!
//! Everything that used to be reachable through global managers lives here
//! and is passed by reference to the drag controller and the director. The
//! session keeps the completed-board counter and queues a completion signal
//! for the director on every completion transition.

use std::collections::VecDeque;

use log::{debug, info, warn};

use crate::config::EngineConfig;
use crate::events::{EventBus, GameEvent};
use crate::geometry::{GridTransform, Vec3};
use crate::grid::{Board, BoardId, BoardSet, Cell, CellRef, CompletionChange, Occupant};
use crate::level::{layout_boards, LevelDefinition};
use crate::pieces::{Color, Piece, PieceId};

/// A completion transition waiting for the director.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct CompletionSignal {
    pub board: BoardId,
    pub change: CompletionChange,
    /// Completed-board counter right after the transition.
    pub completed_boards: usize,
}

/// Boards, pieces and counters of the stage being played.
#[derive(Debug)]
pub struct Session {
    config: EngineConfig,
    boards: BoardSet,
    pieces: Vec<Piece>,
    completed_boards: usize,
    signals: VecDeque<CompletionSignal>,
    highlight: Vec<CellRef>,
    events: EventBus,
}

impl Session {
    pub fn new(config: EngineConfig) -> Self {
        Self {
            config,
            boards: BoardSet::default(),
            pieces: Vec::new(),
            completed_boards: 0,
            signals: VecDeque::new(),
            highlight: Vec::new(),
            events: EventBus::new(),
        }
    }

    /// Throws away the current boards and pieces and builds a stage.
    ///
    /// Pieces claim the cells named by their parts and register their parts
    /// with their board; parts naming a missing cell are dropped, and a piece
    /// that cannot claim a cell for every remaining part is skipped. Boards
    /// that start out solved complete immediately.
    ///
    /// The completed-board counter runs across the stages of a level and is
    /// left alone here; see [`Session::reset_completed_boards`].
    pub fn load_stage(&mut self, level: &LevelDefinition) {
        self.signals.clear();
        self.highlight.clear();

        let origins = layout_boards(level, &self.config);
        let boards = level
            .boards
            .iter()
            .zip(origins)
            .enumerate()
            .map(|(index, (spec, origin))| {
                Board::new(
                    BoardId(index),
                    spec.id.clone(),
                    GridTransform::new(origin, self.config.cell_spacing),
                    &spec.grid_shape(),
                )
            })
            .collect();
        self.boards = BoardSet::new(boards);
        self.pieces.clear();

        for (index, spec) in level.boards.iter().enumerate() {
            let board_id = BoardId(index);
            for piece_spec in &spec.pieces {
                let Some(board) = self.boards.get(board_id) else {
                    continue;
                };
                let parts: Vec<_> = piece_spec
                    .parts
                    .iter()
                    .filter_map(|&coord| {
                        let cell = board.cell(coord);
                        if cell.is_none() {
                            warn!(
                                "piece {} names missing cell {coord:?} on board {}, part dropped",
                                piece_spec.id, spec.id
                            );
                        }
                        cell.map(|_| (coord, board.cell_position(coord)))
                    })
                    .collect();
                if parts.is_empty() {
                    warn!("piece {} has no parts on board {}, skipped", piece_spec.id, spec.id);
                    continue;
                }
                let resting_depth = board.transform().origin.z + self.config.resting_offset;
                let mut piece = Piece::new(
                    PieceId(self.pieces.len()),
                    piece_spec.id.clone(),
                    piece_spec.color.clone(),
                    piece_spec.shape,
                    parts,
                    piece_spec.fixed,
                    resting_depth,
                );
                let claimed = piece.place(&mut self.boards, self.config.occupancy_radius);
                if claimed != piece.part_count() {
                    warn!(
                        "piece {} claimed {claimed} of {} cells on board {}, skipped",
                        piece.name(),
                        piece.part_count(),
                        spec.id
                    );
                    piece.unplace(&mut self.boards);
                    continue;
                }
                if let Some(board) = self.boards.get_mut(board_id) {
                    board.commit(piece.color(), piece.part_count());
                }
                self.pieces.push(piece);
            }
        }

        info!(
            "stage built: {} boards, {} pieces",
            self.boards.len(),
            self.pieces.len()
        );
        for index in 0..self.boards.len() {
            self.check_completion(BoardId(index));
        }
    }

    pub const fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub const fn boards(&self) -> &BoardSet {
        &self.boards
    }

    pub fn board(&self, id: BoardId) -> Option<&Board> {
        self.boards.get(id)
    }

    pub fn pieces(&self) -> &[Piece] {
        &self.pieces
    }

    pub fn piece(&self, id: PieceId) -> Option<&Piece> {
        self.pieces.get(id.0)
    }

    /// Observers registered here see every event of the game.
    pub fn events_mut(&mut self) -> &mut EventBus {
        &mut self.events
    }

    pub fn emit(&mut self, event: GameEvent) {
        self.events.emit(&event);
    }

    /// Boards completed since the level started, over all of its stages.
    pub const fn completed_boards(&self) -> usize {
        self.completed_boards
    }

    /// Zeroes the completed-board counter when a level starts over.
    pub fn reset_completed_boards(&mut self) {
        self.completed_boards = 0;
    }

    /// Committed parts of `color` on a board; 0 for unknown boards.
    pub fn committed_count(&self, board: BoardId, color: &Color) -> usize {
        self.board(board)
            .map_or(0, |board| board.committed_count(color))
    }

    /// Occupied cells of `color` on a board; 0 for unknown boards.
    pub fn occupied_count(&self, board: BoardId, color: &Color) -> usize {
        self.board(board)
            .map_or(0, |board| board.occupied_count(color))
    }

    /// Registers a piece's parts with a board and rechecks completion.
    pub fn commit_piece(&mut self, board: BoardId, color: &Color, parts: usize) {
        let Some(target) = self.boards.get_mut(board) else {
            return;
        };
        target.commit(color, parts);
        debug!("board {board}: +{parts} {color}");
        self.check_completion(board);
    }

    /// Removes a piece's parts from a board and rechecks completion.
    pub fn uncommit_piece(&mut self, board: BoardId, color: &Color, parts: usize) {
        let Some(target) = self.boards.get_mut(board) else {
            return;
        };
        target.uncommit(color, parts);
        debug!("board {board}: -{parts} {color}");
        self.check_completion(board);
    }

    pub fn set_cell_occupied(&mut self, cell: CellRef, occupant: Option<Occupant>) -> bool {
        self.boards.set_cell_occupied(cell, occupant)
    }

    /// Recomputes a board's completed flag and runs the cascade on change.
    ///
    /// Completing a board bumps the counter, locks its pieces and signals the
    /// director; reverting lowers the counter (never below zero) and signals
    /// again. Calling this again without a state change does nothing.
    pub fn check_completion(&mut self, board: BoardId) {
        let Some(change) = self
            .boards
            .get_mut(board)
            .and_then(Board::refresh_completion)
        else {
            return;
        };

        match change {
            CompletionChange::Completed => {
                self.completed_boards += 1;
                info!(
                    "board {board} completed ({} completed)",
                    self.completed_boards
                );
                let locked = self.lock_board_pieces(board);
                self.emit(GameEvent::BoardCompleted { board });
                self.emit(GameEvent::PiecesLocked {
                    board,
                    pieces: locked,
                });
            }
            CompletionChange::Reverted => {
                self.completed_boards = self.completed_boards.saturating_sub(1);
                info!(
                    "board {board} no longer completed ({} completed)",
                    self.completed_boards
                );
                self.emit(GameEvent::BoardReverted { board });
            }
        }

        self.emit(GameEvent::CompletedBoardsChanged {
            completed: self.completed_boards,
        });
        self.signals.push_back(CompletionSignal {
            board,
            change,
            completed_boards: self.completed_boards,
        });
    }

    /// Fixes every piece occupying a board; returns how many there were.
    ///
    /// Pieces still settling are locked when they come to rest.
    pub fn lock_board_pieces(&mut self, board: BoardId) -> usize {
        let Some(target) = self.boards.get(board) else {
            return 0;
        };
        let mut occupants: Vec<PieceId> = target
            .cells()
            .filter_map(Cell::occupant)
            .map(|occupant| occupant.piece)
            .collect();
        occupants.sort();
        occupants.dedup();

        for id in &occupants {
            if let Some(piece) = self.pieces.get_mut(id.0) {
                piece.request_lock();
            }
        }
        debug!("board {board}: locked {} pieces", occupants.len());
        occupants.len()
    }

    /// Next completion transition for the director, oldest first.
    pub fn pop_signal(&mut self) -> Option<CompletionSignal> {
        self.signals.pop_front()
    }

    /// Whether any piece is mid-drag or settling.
    pub fn is_busy(&self) -> bool {
        self.pieces.iter().any(|piece| !piece.is_idle())
    }

    /// Advances settling pieces; returns how many came to rest.
    pub fn tick(&mut self, dt: f32) -> usize {
        self.pieces
            .iter_mut()
            .map(|piece| piece.tick(dt))
            .filter(|&settled| settled)
            .count()
    }

    /// The piece whose part footprint contains `point`, lowest id first.
    pub fn piece_at(&self, point: Vec3) -> Option<PieceId> {
        let half_extent = self.config.cell_spacing / 2.0;
        self.pieces
            .iter()
            .find(|piece| piece.covers(point, half_extent))
            .map(Piece::id)
    }

    /// Nearest cell on any board within `radius` accepted by `accept`.
    pub fn nearest_cell<F>(&self, point: Vec3, radius: f32, accept: F) -> Option<CellRef>
    where
        F: Fn(CellRef, &Cell) -> bool,
    {
        self.boards.nearest_cell(point, radius, accept)
    }

    /// Cells currently highlighted as drop candidates.
    pub fn highlighted(&self) -> &[CellRef] {
        &self.highlight
    }

    /// Replaces the highlight set: every old cell is cleared first.
    pub fn set_highlight(&mut self, cells: Vec<CellRef>) {
        for cell in std::mem::take(&mut self.highlight) {
            self.boards.set_highlighted(cell, false);
        }
        for &cell in &cells {
            self.boards.set_highlighted(cell, true);
        }
        self.highlight = cells;
    }

    pub fn clear_highlight(&mut self) {
        self.set_highlight(Vec::new());
    }

    /// Mutable access to one piece together with the boards it claims cells on.
    pub(crate) fn piece_and_boards(&mut self, id: PieceId) -> Option<(&mut Piece, &mut BoardSet)> {
        let piece = self.pieces.get_mut(id.0)?;
        Some((piece, &mut self.boards))
    }

    /// Renders every board, separated by blank lines.
    pub fn render(&self) -> String {
        self.boards
            .iter()
            .map(Board::render)
            .collect::<Vec<_>>()
            .join("\n")
    }
}
