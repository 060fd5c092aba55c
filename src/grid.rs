//! Boards, cells and per-color bookkeeping.
//!
//! A board owns its cells in a coordinate-keyed index and keeps two per-color
//! counters: parts committed by pieces (updated by the drag protocol) and
//! cells actually occupied (updated by the cells themselves). Completion is
//! derived from the committed counter.

use std::fmt::{self, Write as _};

use log::{debug, warn};
use rustc_hash::FxHashMap;

use crate::geometry::{Coord, GridTransform, Vec3};
use crate::pieces::{Color, PieceId, Shape};

/// Handle of a board within its session.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct BoardId(pub usize);

impl fmt::Display for BoardId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A cell addressed across boards.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct CellRef {
    pub board: BoardId,
    pub coord: Coord,
}

/// What sits in an occupied cell. Color and piece always travel together.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Occupant {
    pub color: Color,
    pub piece: PieceId,
}

/// One grid unit.
#[derive(Clone, Debug)]
pub struct Cell {
    coord: Coord,
    shape: Shape,
    occupant: Option<Occupant>,
    highlighted: bool,
}

impl Cell {
    pub const fn new(coord: Coord, shape: Shape) -> Self {
        Self {
            coord,
            shape,
            occupant: None,
            highlighted: false,
        }
    }

    pub const fn coord(&self) -> Coord {
        self.coord
    }

    pub const fn shape(&self) -> Shape {
        self.shape
    }

    pub const fn occupant(&self) -> Option<&Occupant> {
        self.occupant.as_ref()
    }

    pub const fn is_occupied(&self) -> bool {
        self.occupant.is_some()
    }

    pub const fn is_highlighted(&self) -> bool {
        self.highlighted
    }

    pub fn set_highlighted(&mut self, highlighted: bool) {
        self.highlighted = highlighted;
    }

    /// Replaces the occupant; returns the previous one if anything changed.
    ///
    /// Vacating a cell also drops its highlight.
    fn set_occupant(&mut self, occupant: Option<Occupant>) -> Option<Option<Occupant>> {
        if self.occupant == occupant {
            return None;
        }
        if occupant.is_none() {
            self.highlighted = false;
        }
        Some(std::mem::replace(&mut self.occupant, occupant))
    }
}

/// How a board's cells are laid out.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum GridShape {
    /// Every cell of a `columns` x `rows` rectangle, all full-shaped.
    Rectangle { rows: u32, columns: u32 },
    /// An explicit list of cells. When both `rows` and `columns` are nonzero,
    /// cells outside that rectangle have no slot and are skipped.
    Custom {
        rows: u32,
        columns: u32,
        cells: Vec<(Coord, Shape)>,
    },
}

/// A change of a board's completed flag.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum CompletionChange {
    Completed,
    Reverted,
}

/// One independent puzzle surface.
#[derive(Clone, Debug)]
pub struct Board {
    id: BoardId,
    name: String,
    transform: GridTransform,
    cells: FxHashMap<Coord, Cell>,
    /// Cell coordinates in build order, for deterministic iteration.
    order: Vec<Coord>,
    committed: FxHashMap<Color, usize>,
    occupied: FxHashMap<Color, usize>,
    completed: bool,
}

impl Board {
    /// Builds a board's cells; coordinates without a slot are skipped.
    pub fn new(
        id: BoardId,
        name: impl Into<String>,
        transform: GridTransform,
        shape: &GridShape,
    ) -> Self {
        let name = name.into();
        let mut board = Self {
            id,
            name,
            transform,
            cells: FxHashMap::default(),
            order: Vec::new(),
            committed: FxHashMap::default(),
            occupied: FxHashMap::default(),
            completed: false,
        };

        match shape {
            GridShape::Rectangle { rows, columns } => {
                for y in 0..*rows as i32 {
                    for x in 0..*columns as i32 {
                        board.insert_cell((x, y), Shape::Full);
                    }
                }
            }
            GridShape::Custom {
                rows,
                columns,
                cells,
            } => {
                let bounded = *rows > 0 && *columns > 0;
                for &((x, y), cell_shape) in cells {
                    let in_bounds =
                        (0..*columns as i32).contains(&x) && (0..*rows as i32).contains(&y);
                    if bounded && !in_bounds {
                        warn!(
                            "board {}: cell ({x}, {y}) lies outside {columns}x{rows}, skipped",
                            board.name
                        );
                        continue;
                    }
                    board.insert_cell((x, y), cell_shape);
                }
            }
        }

        debug!("board {} built with {} cells", board.name, board.order.len());
        board
    }

    fn insert_cell(&mut self, coord: Coord, shape: Shape) {
        if self.cells.contains_key(&coord) {
            warn!("board {}: duplicate cell {coord:?}, skipped", self.name);
            return;
        }
        self.cells.insert(coord, Cell::new(coord, shape));
        self.order.push(coord);
    }

    pub const fn id(&self) -> BoardId {
        self.id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub const fn transform(&self) -> &GridTransform {
        &self.transform
    }

    pub const fn is_completed(&self) -> bool {
        self.completed
    }

    pub fn total_cells(&self) -> usize {
        self.order.len()
    }

    /// Looks a cell up by coordinate; probing outside the board is fine.
    pub fn cell(&self, coord: Coord) -> Option<&Cell> {
        self.cells.get(&coord)
    }

    /// World position of a cell centre.
    pub fn cell_position(&self, coord: Coord) -> Vec3 {
        self.transform.cell_center(coord)
    }

    /// Cells in build order.
    pub fn cells(&self) -> impl Iterator<Item = &Cell> + '_ {
        self.order.iter().filter_map(|coord| self.cells.get(coord))
    }

    pub fn committed_count(&self, color: &Color) -> usize {
        self.committed.get(color).copied().unwrap_or(0)
    }

    pub fn occupied_count(&self, color: &Color) -> usize {
        self.occupied.get(color).copied().unwrap_or(0)
    }

    pub fn committed_total(&self) -> usize {
        self.committed.values().sum()
    }

    pub fn occupied_total(&self) -> usize {
        self.occupied.values().sum()
    }

    /// Number of colors with committed parts on this board.
    pub fn color_count(&self) -> usize {
        self.committed.len()
    }

    /// Committed parts per color, sorted by color name.
    pub fn committed_by_color(&self) -> Vec<(Color, usize)> {
        let mut counts: Vec<(Color, usize)> = self
            .committed
            .iter()
            .map(|(color, &count)| (color.clone(), count))
            .collect();
        counts.sort();
        counts
    }

    /// Share of cells covered by committed parts; zero-cell boards report 0.
    pub fn fill_fraction(&self) -> f32 {
        match self.total_cells() {
            0 => 0.0,
            total => self.committed_total() as f32 / total as f32,
        }
    }

    /// Adds a piece's parts to the committed counter.
    pub fn commit(&mut self, color: &Color, parts: usize) {
        if parts == 0 {
            return;
        }
        *self.committed.entry(color.clone()).or_insert(0) += parts;
    }

    /// Removes a piece's parts from the committed counter, clamping at zero.
    ///
    /// Returns how many parts were missing (bookkeeping drift).
    pub fn uncommit(&mut self, color: &Color, parts: usize) -> usize {
        let current = self.committed_count(color);
        let remaining = current.saturating_sub(parts);
        if remaining == 0 {
            self.committed.remove(color);
        } else {
            self.committed.insert(color.clone(), remaining);
        }
        let drift = parts.saturating_sub(current);
        if drift > 0 {
            warn!(
                "board {}: uncommit of {parts} {color} parts clamped, {drift} missing",
                self.name
            );
        }
        drift
    }

    /// Sets or clears a cell's occupant.
    ///
    /// The occupied-cell counter moves only when the occupancy really
    /// changes, so repeating the same call is harmless. Returns whether the
    /// cell changed; unknown coordinates are ignored.
    pub fn set_cell_occupied(&mut self, coord: Coord, occupant: Option<Occupant>) -> bool {
        let Some(cell) = self.cells.get_mut(&coord) else {
            return false;
        };
        let new_color = occupant.as_ref().map(|o| o.color.clone());
        let Some(previous) = cell.set_occupant(occupant) else {
            return false;
        };
        if let Some(old) = previous {
            Self::decrement(&mut self.occupied, &old.color);
        }
        if let Some(color) = new_color {
            *self.occupied.entry(color).or_insert(0) += 1;
        }
        true
    }

    fn decrement(counts: &mut FxHashMap<Color, usize>, color: &Color) {
        match counts.get_mut(color) {
            Some(count) if *count > 1 => *count -= 1,
            Some(_) => {
                counts.remove(color);
            }
            None => {}
        }
    }

    pub fn set_highlighted(&mut self, coord: Coord, highlighted: bool) {
        if let Some(cell) = self.cells.get_mut(&coord) {
            cell.set_highlighted(highlighted);
        }
    }

    /// Whether the committed counters describe a solved board.
    ///
    /// A board with no cells is never solved.
    pub fn is_solved(&self) -> bool {
        let total = self.total_cells();
        total > 0 && self.committed_total() == total && self.color_count() == 1
    }

    /// Recomputes the completed flag, reporting only actual transitions.
    pub fn refresh_completion(&mut self) -> Option<CompletionChange> {
        let solved = self.is_solved();
        if solved == self.completed {
            return None;
        }
        self.completed = solved;
        Some(if solved {
            CompletionChange::Completed
        } else {
            CompletionChange::Reverted
        })
    }

    /// Renders the board as text, top row first.
    ///
    /// Occupied cells show the occupant color's initial; empty cells show
    /// their shape (`.` full, `p`/`q`/`b`/`d` for the corner variants) and
    /// missing slots are blank.
    pub fn render(&self) -> String {
        let mut output = String::new();
        let status = if self.completed { " [completed]" } else { "" };
        let _ = writeln!(output, "board {}{status}", self.name);

        if let Some((min_x, max_x, min_y, max_y)) = self.bounds() {
            for y in (min_y..=max_y).rev() {
                let mut line = String::new();
                for x in min_x..=max_x {
                    line.push(self.cells.get(&(x, y)).map_or(' ', cell_glyph));
                }
                output.push_str(line.trim_end());
                output.push('\n');
            }
        }

        let counts: Vec<String> = self
            .committed_by_color()
            .into_iter()
            .map(|(color, count)| format!("{color}={count}"))
            .collect();
        let _ = writeln!(
            output,
            "committed {}/{} {}",
            self.committed_total(),
            self.total_cells(),
            counts.join(" ")
        );
        output
    }

    fn bounds(&self) -> Option<(i32, i32, i32, i32)> {
        let first = *self.order.first()?;
        Some(self.order.iter().fold(
            (first.0, first.0, first.1, first.1),
            |(min_x, max_x, min_y, max_y), &(x, y)| {
                (min_x.min(x), max_x.max(x), min_y.min(y), max_y.max(y))
            },
        ))
    }
}

fn cell_glyph(cell: &Cell) -> char {
    if let Some(occupant) = cell.occupant() {
        return occupant.color.glyph();
    }
    match cell.shape() {
        Shape::Full => '.',
        Shape::TopRight => 'q',
        Shape::TopLeft => 'p',
        Shape::BottomRight => 'd',
        Shape::BottomLeft => 'b',
    }
}

/// All boards of a stage, indexed by [`BoardId`].
#[derive(Clone, Debug, Default)]
pub struct BoardSet {
    boards: Vec<Board>,
}

impl BoardSet {
    /// Wraps boards whose ids must equal their positions in `boards`.
    pub fn new(boards: Vec<Board>) -> Self {
        debug_assert!(boards.iter().enumerate().all(|(i, b)| b.id() == BoardId(i)));
        Self { boards }
    }

    pub fn get(&self, id: BoardId) -> Option<&Board> {
        self.boards.get(id.0)
    }

    pub fn get_mut(&mut self, id: BoardId) -> Option<&mut Board> {
        self.boards.get_mut(id.0)
    }

    pub fn iter(&self) -> impl Iterator<Item = &Board> + '_ {
        self.boards.iter()
    }

    pub fn len(&self) -> usize {
        self.boards.len()
    }

    pub fn is_empty(&self) -> bool {
        self.boards.is_empty()
    }

    pub fn cell(&self, cell_ref: CellRef) -> Option<&Cell> {
        self.get(cell_ref.board)?.cell(cell_ref.coord)
    }

    pub fn cell_position(&self, cell_ref: CellRef) -> Option<Vec3> {
        self.get(cell_ref.board)
            .map(|board| board.cell_position(cell_ref.coord))
    }

    pub fn set_cell_occupied(&mut self, cell_ref: CellRef, occupant: Option<Occupant>) -> bool {
        self.get_mut(cell_ref.board)
            .is_some_and(|board| board.set_cell_occupied(cell_ref.coord, occupant))
    }

    pub fn set_highlighted(&mut self, cell_ref: CellRef, highlighted: bool) {
        if let Some(board) = self.get_mut(cell_ref.board) {
            board.set_highlighted(cell_ref.coord, highlighted);
        }
    }

    /// Finds the cell nearest to `point` (in the board plane) within
    /// `radius` that satisfies `accept`.
    ///
    /// Each board is probed through its grid transform, so the cost depends
    /// on the radius, not on the number of cells. Ties go to the lower board
    /// id, then to the lower row and column.
    pub fn nearest_cell<F>(&self, point: Vec3, radius: f32, accept: F) -> Option<CellRef>
    where
        F: Fn(CellRef, &Cell) -> bool,
    {
        let mut best: Option<(f32, CellRef)> = None;
        for board in &self.boards {
            for coord in board.transform.neighbourhood(point, radius) {
                let Some(cell) = board.cell(coord) else {
                    continue;
                };
                let distance = board.cell_position(coord).planar_distance(point);
                if distance > radius {
                    continue;
                }
                let cell_ref = CellRef {
                    board: board.id,
                    coord,
                };
                if best.is_some_and(|(d, _)| d <= distance) || !accept(cell_ref, cell) {
                    continue;
                }
                best = Some((distance, cell_ref));
            }
        }
        best.map(|(_, cell_ref)| cell_ref)
    }
}
