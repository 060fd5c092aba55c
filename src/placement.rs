//! The drag protocol: press, move, release.
//!
//! A press detaches a piece from its board (its parts are uncommitted and its
//! cells released) before the drag starts. Every move rebuilds the highlight
//! set from scratch. A release either commits the piece onto the highlighted
//! cells of one board or sends it home and restores its source board exactly;
//! nothing in between is ever visible.

use std::collections::BTreeMap;

use log::{debug, warn};

use crate::config::EngineConfig;
use crate::geometry::{Coord, DragPlane, Ray, Vec3};
use crate::grid::{BoardId, CellRef};
use crate::pieces::{Color, PieceId, Shape};
use crate::session::Session;

/// Why a press did not start a drag.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum PressIgnored {
    /// Nothing under the pointer.
    NoPiece,
    /// The piece under the pointer is locked.
    Fixed(PieceId),
    /// Another drag or settle is in progress.
    Busy,
    /// The level has been won or lost.
    LevelOver,
    /// The game is paused.
    Paused,
}

/// Result of a press.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum PressOutcome {
    Started {
        piece: PieceId,
        source: Option<BoardId>,
    },
    /// The piece sat on a completed board; that board's pieces were locked
    /// instead of starting a drag.
    BoardLocked { board: BoardId, pieces: usize },
    Ignored(PressIgnored),
}

/// Why a release was turned into a return.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Rejection {
    NoCandidates,
    WrongCount { expected: usize, found: usize },
    Occupied { cell: CellRef, by: PieceId },
    ShapeMismatch { cell: CellRef },
    /// The candidate cells are not a translated copy of the piece's layout.
    Misaligned,
    Cancelled,
}

/// Result of a release.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ReleaseOutcome {
    Placed { piece: PieceId, board: BoardId },
    Returned { piece: PieceId, reason: Rejection },
    /// No drag was in progress.
    Idle,
}

/// State held only while a drag is in progress.
#[derive(Clone, Debug)]
struct DragSession {
    piece: PieceId,
    /// Offset from the pointer on the drag plane to the piece position.
    anchor: Vec3,
    color: Color,
    parts: usize,
}

/// Coordinates drag sessions against a [`Session`].
#[derive(Clone, Debug)]
pub struct DragController {
    config: EngineConfig,
    plane: DragPlane,
    active: Option<DragSession>,
}

impl DragController {
    pub fn new(config: &EngineConfig) -> Self {
        Self {
            config: config.clone(),
            plane: DragPlane {
                depth: config.drag_plane_depth,
            },
            active: None,
        }
    }

    pub const fn is_dragging(&self) -> bool {
        self.active.is_some()
    }

    pub fn active_piece(&self) -> Option<PieceId> {
        self.active.as_ref().map(|drag| drag.piece)
    }

    /// Forgets any drag without touching the session, for stage rebuilds.
    pub fn reset(&mut self) {
        self.active = None;
    }

    /// Starts dragging the piece under `ray`, if it may move.
    pub fn press(&mut self, session: &mut Session, ray: Ray) -> PressOutcome {
        if self.active.is_some() || session.is_busy() {
            debug!("press ignored: a piece is still moving");
            return PressOutcome::Ignored(PressIgnored::Busy);
        }

        let point = self.plane.project(ray);
        let Some(id) = session.piece_at(point) else {
            return PressOutcome::Ignored(PressIgnored::NoPiece);
        };
        let Some(piece) = session.piece(id) else {
            return PressOutcome::Ignored(PressIgnored::NoPiece);
        };
        if piece.is_fixed() {
            return PressOutcome::Ignored(PressIgnored::Fixed(id));
        }
        let color = piece.color().clone();
        let parts = piece.part_count();
        let registered = piece.claimed_cells().len();
        let position = piece.position();
        let anchor = (position - point).with_z(0.0);

        let source = piece.home_board().or_else(|| {
            session
                .nearest_cell(position, self.config.source_lookup_radius, |_, _| true)
                .map(|cell| cell.board)
        });
        if let Some(board) = source {
            if session.board(board).is_some_and(|b| b.is_completed()) {
                let pieces = session.lock_board_pieces(board);
                debug!("press on completed board {board}: locked {pieces} pieces");
                return PressOutcome::BoardLocked { board, pieces };
            }
        }

        if let Some(board) = source {
            session.uncommit_piece(board, &color, registered);
        }
        let lift = self.config.drag_lift;
        let Some((piece, boards)) = session.piece_and_boards(id) else {
            return PressOutcome::Ignored(PressIgnored::NoPiece);
        };
        let started = piece.start_drag(boards).and_then(|()| {
            let lifted = piece.position();
            piece.update_position(lifted.with_z(lifted.z + lift))
        });
        if let Err(err) = started {
            warn!("could not start drag: {err}");
            if let Some(board) = source {
                session.commit_piece(board, &color, registered);
            }
            return PressOutcome::Ignored(PressIgnored::Busy);
        }

        debug!("drag started on piece {id} from board {source:?}");
        self.active = Some(DragSession {
            piece: id,
            anchor,
            color,
            parts,
        });
        self.refresh_highlight(session);
        PressOutcome::Started { piece: id, source }
    }

    /// Moves the dragged piece under `ray`; returns `false` if no drag is active.
    pub fn drag(&mut self, session: &mut Session, ray: Ray) -> bool {
        let Some(drag) = &self.active else {
            return false;
        };
        let point = self.plane.project(ray);
        let Some((piece, _)) = session.piece_and_boards(drag.piece) else {
            return false;
        };
        let target = (point + drag.anchor).with_z(piece.position().z);
        if let Err(err) = piece.update_position(target) {
            warn!("drag update rejected: {err}");
            return false;
        }
        self.refresh_highlight(session);
        true
    }

    /// Ends the drag: commit onto the highlighted cells or roll back.
    pub fn release(&mut self, session: &mut Session) -> ReleaseOutcome {
        let Some(drag) = self.active.take() else {
            return ReleaseOutcome::Idle;
        };
        let outcome = match self.evaluate(session, &drag) {
            Ok((board, cells)) => self.commit(session, &drag, board, &cells),
            Err(reason) => self.roll_back(session, &drag, reason),
        };
        session.clear_highlight();
        outcome
    }

    /// Abandons the drag through the failed-release path.
    pub fn cancel(&mut self, session: &mut Session) -> ReleaseOutcome {
        let Some(drag) = self.active.take() else {
            return ReleaseOutcome::Idle;
        };
        let outcome = self.roll_back(session, &drag, Rejection::Cancelled);
        session.clear_highlight();
        outcome
    }

    /// Rebuilds the highlight set: for each part, the nearest compatible cell
    /// not already taken by another part.
    fn refresh_highlight(&self, session: &mut Session) {
        let Some(drag) = &self.active else {
            session.clear_highlight();
            return;
        };
        let Some(piece) = session.piece(drag.piece) else {
            session.clear_highlight();
            return;
        };
        let shape = piece.shape();
        let radius = if shape == Shape::Full {
            self.config.highlight_radius
        } else {
            self.config.corner_highlight_radius
        };

        let mut candidates: Vec<CellRef> = Vec::with_capacity(piece.part_count());
        for part in piece.part_positions() {
            let found = session.nearest_cell(part, radius, |cell_ref, cell| {
                cell.shape().accepts(shape) && !candidates.contains(&cell_ref)
            });
            if let Some(cell_ref) = found {
                candidates.push(cell_ref);
            }
        }
        session.set_highlight(candidates);
    }

    /// Picks the candidate cells and checks every placement rule.
    fn evaluate(
        &self,
        session: &Session,
        drag: &DragSession,
    ) -> Result<(BoardId, Vec<CellRef>), Rejection> {
        let piece = session.piece(drag.piece).ok_or(Rejection::NoCandidates)?;
        let (board, cells) = pick_group(session, piece.position()).ok_or(Rejection::NoCandidates)?;

        if cells.len() != drag.parts {
            return Err(Rejection::WrongCount {
                expected: drag.parts,
                found: cells.len(),
            });
        }

        for &cell_ref in &cells {
            let Some(cell) = session.boards().cell(cell_ref) else {
                return Err(Rejection::NoCandidates);
            };
            if let Some(occupant) = cell.occupant() {
                if occupant.piece != drag.piece {
                    return Err(Rejection::Occupied {
                        cell: cell_ref,
                        by: occupant.piece,
                    });
                }
            }
            if !cell.shape().accepts(piece.shape()) {
                return Err(Rejection::ShapeMismatch { cell: cell_ref });
            }
        }

        let coords: Vec<Coord> = cells.iter().map(|cell| cell.coord).collect();
        if normalize_to_origin(coords) != normalize_to_origin(piece.parts().to_vec()) {
            return Err(Rejection::Misaligned);
        }

        Ok((board, cells))
    }

    fn commit(
        &self,
        session: &mut Session,
        drag: &DragSession,
        board: BoardId,
        cells: &[CellRef],
    ) -> ReleaseOutcome {
        let resting_depth = session
            .board(board)
            .map_or(0.0, |b| b.transform().origin.z)
            + self.config.resting_offset;
        let Some(average) =
            Vec3::centroid(cells.iter().filter_map(|&c| session.boards().cell_position(c)))
        else {
            return self.roll_back(session, drag, Rejection::NoCandidates);
        };
        let target = average.with_z(resting_depth);

        let Some((piece, boards)) = session.piece_and_boards(drag.piece) else {
            return ReleaseOutcome::Idle;
        };
        let claimed = match piece.commit(
            target,
            boards,
            self.config.occupancy_radius,
            self.config.snap_duration,
        ) {
            Ok(claimed) => claimed,
            Err(err) => {
                warn!("commit rejected: {err}");
                return ReleaseOutcome::Idle;
            }
        };
        if claimed != drag.parts {
            warn!(
                "piece {} claimed {claimed} of {} cells on commit",
                drag.piece, drag.parts
            );
        }

        // the board registers exactly the cells the piece now holds
        session.commit_piece(board, &drag.color, claimed);
        debug!("piece {} placed on board {board}", drag.piece);
        ReleaseOutcome::Placed {
            piece: drag.piece,
            board,
        }
    }

    fn roll_back(&self, session: &mut Session, drag: &DragSession, reason: Rejection) -> ReleaseOutcome {
        let mut home = None;
        if let Some((piece, boards)) = session.piece_and_boards(drag.piece) {
            match piece.return_to_origin(
                boards,
                self.config.occupancy_radius,
                self.config.return_duration,
            ) {
                Ok(reclaimed) => home = piece.home_board().map(|board| (board, reclaimed)),
                Err(err) => warn!("return rejected: {err}"),
            }
        }
        // re-register what was reclaimed, on the board it was reclaimed from
        if let Some((board, reclaimed)) = home {
            session.commit_piece(board, &drag.color, reclaimed);
        }
        debug!("piece {} returned: {reason:?}", drag.piece);
        ReleaseOutcome::Returned {
            piece: drag.piece,
            reason,
        }
    }
}

/// Groups the highlighted cells by board and picks the group to drop onto.
///
/// The largest group wins. Among equal sizes the group whose centroid is
/// nearest `position` wins, and an exact tie goes to the lower board id.
fn pick_group(session: &Session, position: Vec3) -> Option<(BoardId, Vec<CellRef>)> {
    let mut groups: BTreeMap<BoardId, Vec<CellRef>> = BTreeMap::new();
    for &cell_ref in session.highlighted() {
        groups.entry(cell_ref.board).or_default().push(cell_ref);
    }

    let centroid_distance = |cells: &[CellRef]| {
        Vec3::centroid(cells.iter().filter_map(|&c| session.boards().cell_position(c)))
            .map_or(f32::INFINITY, |centroid| centroid.planar_distance(position))
    };
    let mut best: Option<(BoardId, Vec<CellRef>, f32)> = None;
    // ascending ids, so only a strictly nearer group replaces an equal one
    for (board, cells) in groups {
        let distance = centroid_distance(&cells);
        let better = best.as_ref().map_or(true, |(_, best_cells, best_distance)| {
            cells.len() > best_cells.len()
                || (cells.len() == best_cells.len() && distance < *best_distance)
        });
        if better {
            best = Some((board, cells, distance));
        }
    }
    best.map(|(board, cells, _)| (board, cells))
}

/// Translates coordinates so the minimum x and y are zero, then sorts them.
///
/// Two layouts that differ only by translation normalize to the same list.
fn normalize_to_origin(mut coords: Vec<Coord>) -> Vec<Coord> {
    let min_x = coords.iter().map(|&(x, _)| x).min().unwrap_or(0);
    let min_y = coords.iter().map(|&(_, y)| y).min().unwrap_or(0);
    for (x, y) in &mut coords {
        *x -= min_x;
        *y -= min_y;
    }
    coords.sort_unstable();
    coords
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::grid::CompletionChange;
    use crate::level::{BoardRow, BoardSpec, CellSpec, LevelDefinition, PieceSpec};

    fn config() -> EngineConfig {
        EngineConfig {
            snap_duration: 0.0,
            return_duration: 0.0,
            ..EngineConfig::default()
        }
    }

    fn piece(id: &str, color: &str, shape: Shape, parts: &[Coord]) -> PieceSpec {
        PieceSpec {
            id: id.to_string(),
            color: Color::from(color),
            fixed: false,
            shape,
            parts: parts.to_vec(),
        }
    }

    fn board(id: &str, rows: u32, columns: u32, pieces: Vec<PieceSpec>) -> BoardSpec {
        BoardSpec {
            id: id.to_string(),
            rows,
            columns,
            pieces,
            ..BoardSpec::default()
        }
    }

    fn session_with(boards: Vec<BoardSpec>) -> Session {
        let mut session = Session::new(config());
        session.load_stage(&LevelDefinition {
            boards,
            ..LevelDefinition::default()
        });
        session
    }

    fn cell_ray(session: &Session, board: usize, coord: Coord) -> Ray {
        let at = session.board(BoardId(board)).unwrap().cell_position(coord);
        Ray::vertical(at.x, at.y)
    }

    fn snapshot(session: &Session) -> Vec<(usize, usize, Vec<(Color, usize)>)> {
        session
            .boards()
            .iter()
            .map(|b| (b.committed_total(), b.occupied_total(), b.committed_by_color()))
            .collect()
    }

    fn assert_conserved(session: &Session) {
        for board in session.boards().iter() {
            assert_eq!(
                board.committed_total(),
                board.occupied_total(),
                "board {} out of balance",
                board.name()
            );
        }
    }

    #[test]
    fn test_press_on_empty_space_is_ignored() {
        let mut session = session_with(vec![board("a", 2, 2, Vec::new())]);
        let mut controller = DragController::new(&config());
        let ray = cell_ray(&session, 0, (0, 0));
        assert_eq!(
            controller.press(&mut session, ray),
            PressOutcome::Ignored(PressIgnored::NoPiece)
        );
        assert!(!controller.is_dragging());
    }

    #[test]
    fn test_press_on_completed_board_locks_instead_of_dragging() {
        let mut session = session_with(vec![board(
            "a",
            1,
            2,
            vec![piece("p", "red", Shape::Full, &[(0, 0)])],
        )]);
        // complete the board behind the session's back so its piece escaped the lock
        let (_, boards) = session.piece_and_boards(PieceId(0)).unwrap();
        let target = boards.get_mut(BoardId(0)).unwrap();
        target.commit(&Color::from("red"), 1);
        assert_eq!(target.refresh_completion(), Some(CompletionChange::Completed));

        let mut controller = DragController::new(&config());
        let ray = cell_ray(&session, 0, (0, 0));
        assert_eq!(
            controller.press(&mut session, ray),
            PressOutcome::BoardLocked {
                board: BoardId(0),
                pieces: 1
            }
        );
        assert!(!controller.is_dragging());
        assert!(session.piece(PieceId(0)).unwrap().is_fixed());
        assert_eq!(
            controller.press(&mut session, ray),
            PressOutcome::Ignored(PressIgnored::Fixed(PieceId(0)))
        );
    }

    #[test]
    fn test_press_detaches_piece_from_source() {
        let mut session = session_with(vec![board(
            "a",
            2,
            3,
            vec![piece("p", "red", Shape::Full, &[(0, 0), (1, 0)])],
        )]);
        let mut controller = DragController::new(&config());
        let ray = cell_ray(&session, 0, (0, 0));

        let outcome = controller.press(&mut session, ray);
        assert_eq!(
            outcome,
            PressOutcome::Started {
                piece: PieceId(0),
                source: Some(BoardId(0))
            }
        );
        let board = session.board(BoardId(0)).unwrap();
        assert_eq!(board.committed_total(), 0);
        assert_eq!(board.occupied_total(), 0);
        assert_eq!(session.piece(PieceId(0)).unwrap().position().z, config().resting_offset + config().drag_lift);
        // the piece has not moved, so it highlights its own cells
        assert_eq!(session.highlighted().len(), 2);
    }

    #[test]
    fn test_move_and_release_commits_on_target() {
        let mut session = session_with(vec![board(
            "a",
            2,
            3,
            vec![piece("p", "red", Shape::Full, &[(0, 0), (1, 0)])],
        )]);
        let mut controller = DragController::new(&config());
        let ray = cell_ray(&session, 0, (0, 0));
        controller.press(&mut session, ray);
        let ray = cell_ray(&session, 0, (1, 1));
        assert!(controller.drag(&mut session, ray));

        let highlighted: Vec<Coord> = session.highlighted().iter().map(|c| c.coord).collect();
        assert_eq!(highlighted, vec![(1, 1), (2, 1)]);

        let outcome = controller.release(&mut session);
        assert_eq!(
            outcome,
            ReleaseOutcome::Placed {
                piece: PieceId(0),
                board: BoardId(0)
            }
        );
        assert!(session.highlighted().is_empty());
        let board = session.board(BoardId(0)).unwrap();
        assert_eq!(board.committed_count(&Color::from("red")), 2);
        assert!(board.cell((1, 1)).unwrap().is_occupied());
        assert!(!board.cell((0, 0)).unwrap().is_occupied());
        assert_conserved(&session);

        session.tick(0.0);
        let moved = session.piece(PieceId(0)).unwrap();
        assert!(moved.is_idle());
        assert_eq!(moved.position().z, config().resting_offset);
    }

    #[test]
    fn test_release_onto_another_piece_rolls_back() {
        let mut session = session_with(vec![board(
            "a",
            2,
            2,
            vec![
                piece("p", "red", Shape::Full, &[(0, 0)]),
                piece("q", "blue", Shape::Full, &[(1, 1)]),
            ],
        )]);
        let before = snapshot(&session);
        let mut controller = DragController::new(&config());
        let ray = cell_ray(&session, 0, (0, 0));
        controller.press(&mut session, ray);
        let ray = cell_ray(&session, 0, (1, 1));
        controller.drag(&mut session, ray);

        let outcome = controller.release(&mut session);
        assert_eq!(
            outcome,
            ReleaseOutcome::Returned {
                piece: PieceId(0),
                reason: Rejection::Occupied {
                    cell: CellRef {
                        board: BoardId(0),
                        coord: (1, 1)
                    },
                    by: PieceId(1)
                }
            }
        );
        assert_eq!(snapshot(&session), before);
        let board = session.board(BoardId(0)).unwrap();
        assert_eq!(
            board.cell((0, 0)).unwrap().occupant().map(|o| o.piece),
            Some(PieceId(0))
        );
    }

    #[test]
    fn test_release_away_from_boards_has_no_candidates() {
        let mut session = session_with(vec![board(
            "a",
            1,
            2,
            vec![piece("p", "red", Shape::Full, &[(0, 0)])],
        )]);
        let mut controller = DragController::new(&config());
        let ray = cell_ray(&session, 0, (0, 0));
        controller.press(&mut session, ray);
        controller.drag(&mut session, Ray::vertical(40.0, 40.0));
        assert!(session.highlighted().is_empty());
        assert_eq!(
            controller.release(&mut session),
            ReleaseOutcome::Returned {
                piece: PieceId(0),
                reason: Rejection::NoCandidates
            }
        );
        assert_eq!(session.committed_count(BoardId(0), &Color::from("red")), 1);
    }

    #[test]
    fn test_corner_piece_only_highlights_matching_cells() {
        let corner_board = BoardSpec {
            id: "corners".to_string(),
            rows: 1,
            columns: 3,
            cells: vec![
                CellSpec { x: 0, y: 0, shape: Shape::Full },
                CellSpec { x: 1, y: 0, shape: Shape::TopLeft },
                CellSpec { x: 2, y: 0, shape: Shape::BottomRight },
            ],
            pieces: vec![piece("c", "red", Shape::TopLeft, &[(0, 0)])],
            ..BoardSpec::default()
        };
        let mut session = session_with(vec![corner_board]);
        let mut controller = DragController::new(&config());
        let ray = cell_ray(&session, 0, (0, 0));
        controller.press(&mut session, ray);

        let ray = cell_ray(&session, 0, (1, 0));
        controller.drag(&mut session, ray);
        let coords: Vec<Coord> = session.highlighted().iter().map(|c| c.coord).collect();
        assert_eq!(coords, vec![(1, 0)]);

        // the mismatched corner is skipped for the matching one still in reach
        let ray = cell_ray(&session, 0, (2, 0));
        controller.drag(&mut session, ray);
        let coords: Vec<Coord> = session.highlighted().iter().map(|c| c.coord).collect();
        assert_eq!(coords, vec![(1, 0)]);

        assert!(matches!(
            controller.release(&mut session),
            ReleaseOutcome::Placed { .. }
        ));
    }

    #[test]
    fn test_misaligned_candidates_are_rejected() {
        // (1, 0) is missing, so the right part falls back to (1, 1)
        let gap_board = BoardSpec {
            id: "gap".to_string(),
            rows: 2,
            columns: 2,
            cells: vec![
                CellSpec { x: 0, y: 0, shape: Shape::Full },
                CellSpec { x: 0, y: 1, shape: Shape::Full },
                CellSpec { x: 1, y: 1, shape: Shape::Full },
            ],
            ..BoardSpec::default()
        };
        let home = board("home", 1, 3, vec![piece("p", "red", Shape::Full, &[(0, 0), (1, 0)])]);
        let mut session = session_with(vec![home, gap_board]);
        let mut controller = DragController::new(&config());
        let ray = cell_ray(&session, 0, (0, 0));
        controller.press(&mut session, ray);
        let ray = cell_ray(&session, 1, (0, 0));
        controller.drag(&mut session, ray);

        let coords: Vec<Coord> = session.highlighted().iter().map(|c| c.coord).collect();
        assert_eq!(coords, vec![(0, 0), (1, 1)]);
        assert_eq!(
            controller.release(&mut session),
            ReleaseOutcome::Returned {
                piece: PieceId(0),
                reason: Rejection::Misaligned
            }
        );
        assert_conserved(&session);
    }

    #[test]
    fn test_cancel_restores_pre_drag_state() {
        let mut session = session_with(vec![board(
            "a",
            2,
            2,
            vec![piece("p", "red", Shape::Full, &[(0, 0), (0, 1)])],
        )]);
        let before = snapshot(&session);
        let mut controller = DragController::new(&config());
        let ray = cell_ray(&session, 0, (0, 1));
        controller.press(&mut session, ray);
        let ray = cell_ray(&session, 0, (1, 1));
        controller.drag(&mut session, ray);
        assert!(matches!(
            controller.cancel(&mut session),
            ReleaseOutcome::Returned {
                reason: Rejection::Cancelled,
                ..
            }
        ));
        assert_eq!(snapshot(&session), before);
        assert_eq!(controller.release(&mut session), ReleaseOutcome::Idle);
    }

    #[test]
    fn test_press_while_settling_is_ignored() {
        let mut session = Session::new(EngineConfig::default());
        session.load_stage(&LevelDefinition {
            boards: vec![board(
                "a",
                2,
                2,
                vec![
                    piece("p", "red", Shape::Full, &[(0, 0)]),
                    piece("q", "blue", Shape::Full, &[(1, 1)]),
                ],
            )],
            ..LevelDefinition::default()
        });
        let mut controller = DragController::new(&EngineConfig::default());
        let ray = cell_ray(&session, 0, (0, 0));
        controller.press(&mut session, ray);
        let ray = cell_ray(&session, 0, (1, 0));
        controller.drag(&mut session, ray);
        controller.release(&mut session);

        let other = cell_ray(&session, 0, (1, 1));
        assert_eq!(
            controller.press(&mut session, other),
            PressOutcome::Ignored(PressIgnored::Busy)
        );
        session.tick(1.0);
        assert!(matches!(
            controller.press(&mut session, other),
            PressOutcome::Started { .. }
        ));
    }

    #[test]
    fn test_drop_onto_another_board() {
        let mut session = session_with(vec![
            board("home", 1, 3, vec![piece("p", "red", Shape::Full, &[(0, 0), (1, 0)])]),
            board("target", 1, 2, Vec::new()),
        ]);
        let mut controller = DragController::new(&config());
        let ray = cell_ray(&session, 0, (0, 0));
        controller.press(&mut session, ray);
        let ray = cell_ray(&session, 1, (0, 0));
        controller.drag(&mut session, ray);
        assert_eq!(
            controller.release(&mut session),
            ReleaseOutcome::Placed {
                piece: PieceId(0),
                board: BoardId(1)
            }
        );
        assert_eq!(session.committed_count(BoardId(0), &Color::from("red")), 0);
        assert_eq!(session.committed_count(BoardId(1), &Color::from("red")), 2);
        assert_conserved(&session);
    }

    #[test]
    fn test_split_drop_evaluates_largest_group() {
        // two adjacent 1x2 boards form one row of four cells below the home board
        let home = BoardSpec {
            row: BoardRow::Top,
            ..board(
                "home",
                1,
                4,
                vec![piece("p", "red", Shape::Full, &[(0, 0), (1, 0), (2, 0)])],
            )
        };
        let mut session = Session::new(config());
        session.load_stage(&LevelDefinition {
            horizontal_spacing: 2.0,
            boards: vec![home, board("left", 1, 2, Vec::new()), board("right", 1, 2, Vec::new())],
            ..LevelDefinition::default()
        });
        let before = snapshot(&session);
        let mut controller = DragController::new(&config());
        let ray = cell_ray(&session, 0, (0, 0));
        controller.press(&mut session, ray);
        let ray = cell_ray(&session, 1, (1, 0));
        controller.drag(&mut session, ray);

        let boards: Vec<BoardId> = session.highlighted().iter().map(|c| c.board).collect();
        assert_eq!(boards, vec![BoardId(1), BoardId(2), BoardId(2)]);
        assert_eq!(
            controller.release(&mut session),
            ReleaseOutcome::Returned {
                piece: PieceId(0),
                reason: Rejection::WrongCount {
                    expected: 3,
                    found: 2
                }
            }
        );
        assert_eq!(snapshot(&session), before);
    }

    #[test]
    fn test_equal_groups_go_to_nearest_then_lower_board() {
        // left cells sit at x = -1.5 and -0.5, right cells at 0.5 and 1.5
        let mut session = Session::new(config());
        session.load_stage(&LevelDefinition {
            horizontal_spacing: 2.0,
            boards: vec![board("left", 1, 2, Vec::new()), board("right", 1, 2, Vec::new())],
            ..LevelDefinition::default()
        });
        let left = CellRef {
            board: BoardId(0),
            coord: (1, 0),
        };
        let right = CellRef {
            board: BoardId(1),
            coord: (0, 0),
        };
        session.set_highlight(vec![left, right]);

        let pick = |x: f32| pick_group(&session, Vec3::new(x, 0.0, 0.0)).map(|(board, _)| board);
        assert_eq!(pick(0.3), Some(BoardId(1)));
        assert_eq!(pick(-0.3), Some(BoardId(0)));
        assert_eq!(pick(0.0), Some(BoardId(0)), "exact tie goes to the lower id");

        // a larger group wins even when it is farther away
        let far = CellRef {
            board: BoardId(0),
            coord: (0, 0),
        };
        session.set_highlight(vec![far, left, right]);
        let (board, cells) = pick_group(&session, Vec3::new(1.5, 0.0, 0.0)).unwrap();
        assert_eq!(board, BoardId(0));
        assert_eq!(cells, vec![far, left]);

        session.clear_highlight();
        assert!(pick_group(&session, Vec3::ZERO).is_none());
    }

    #[test]
    fn test_counts_follow_claimed_cells_across_drags() {
        // the corner piece has no matching cell and is left out of the stage
        let odd = BoardSpec {
            id: "odd".to_string(),
            rows: 1,
            columns: 2,
            cells: vec![
                CellSpec { x: 0, y: 0, shape: Shape::BottomRight },
                CellSpec { x: 1, y: 0, shape: Shape::Full },
            ],
            pieces: vec![
                piece("p", "red", Shape::TopLeft, &[(0, 0)]),
                piece("q", "red", Shape::Full, &[(1, 0)]),
            ],
            ..BoardSpec::default()
        };
        let mut session = session_with(vec![odd]);
        assert_eq!(session.pieces().len(), 1);
        assert!(!session.board(BoardId(0)).unwrap().is_completed());
        assert_conserved(&session);

        let mut controller = DragController::new(&config());
        let ray = cell_ray(&session, 0, (1, 0));
        controller.press(&mut session, ray);
        assert_eq!(session.committed_count(BoardId(0), &Color::from("red")), 0);
        let ray = cell_ray(&session, 0, (0, 0));
        controller.drag(&mut session, ray);
        assert_eq!(
            controller.release(&mut session),
            ReleaseOutcome::Placed {
                piece: PieceId(0),
                board: BoardId(0)
            }
        );
        assert_eq!(session.committed_count(BoardId(0), &Color::from("red")), 1);
        assert!(!session.board(BoardId(0)).unwrap().is_completed());
        assert_conserved(&session);

        session.tick(0.0);
        let ray = cell_ray(&session, 0, (0, 0));
        controller.press(&mut session, ray);
        assert!(matches!(
            controller.cancel(&mut session),
            ReleaseOutcome::Returned {
                reason: Rejection::Cancelled,
                ..
            }
        ));
        assert_eq!(session.committed_count(BoardId(0), &Color::from("red")), 1);
        assert_conserved(&session);
    }

    #[test]
    fn test_completing_drop_defers_lock_until_settled() {
        let mut session = session_with(vec![
            board("source", 1, 3, vec![piece("p", "red", Shape::Full, &[(0, 0), (1, 0)])]),
            board("target", 1, 2, Vec::new()),
        ]);
        let mut controller = DragController::new(&config());
        let ray = cell_ray(&session, 0, (0, 0));
        controller.press(&mut session, ray);
        let ray = cell_ray(&session, 1, (0, 0));
        controller.drag(&mut session, ray);
        controller.release(&mut session);

        let signal = session.pop_signal().unwrap();
        assert_eq!(signal.board, BoardId(1));
        assert_eq!(signal.change, CompletionChange::Completed);
        assert_eq!(signal.completed_boards, 1);

        let placed = session.piece(PieceId(0)).unwrap();
        assert!(!placed.is_fixed(), "lock waits for the settle");
        session.tick(0.0);
        assert!(session.piece(PieceId(0)).unwrap().is_fixed());
    }

    #[test]
    fn test_normalize_to_origin_ignores_translation() {
        assert_eq!(
            normalize_to_origin(vec![(5, 3), (6, 3), (5, 4)]),
            normalize_to_origin(vec![(0, 1), (0, 0), (1, 0)])
        );
        assert_ne!(
            normalize_to_origin(vec![(0, 0), (1, 1)]),
            normalize_to_origin(vec![(0, 0), (1, 0)])
        );
    }
}
