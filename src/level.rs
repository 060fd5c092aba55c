//! In-memory level records.
//!
//! Levels arrive from the host already decoded; these types only derive
//! `Deserialize` so a host (or the command-line tool) can fill them from
//! JSON. A multi-stage level is one [`LevelDefinition`] per stage, handed out
//! by a [`LevelSource`].

use serde::Deserialize;

use crate::config::EngineConfig;
use crate::geometry::{Coord, Vec3};
use crate::grid::GridShape;
use crate::pieces::{Color, Shape};

/// One stage of a level.
#[derive(Clone, Debug, PartialEq, Deserialize)]
#[serde(default)]
pub struct LevelDefinition {
    pub total_stages: u32,
    /// Seconds on the level clock, set when stage 1 loads.
    pub time_limit: f32,
    /// Completed-board count, over every stage so far, that clears this
    /// stage; 0 means every board of this stage on top of earlier stages.
    pub required_completed_boards: u32,
    /// Horizontal distance between boards; 0 uses the configured default.
    pub horizontal_spacing: f32,
    /// Vertical distance between board rows; 0 uses the configured default.
    pub vertical_spacing: f32,
    pub boards: Vec<BoardSpec>,
}

impl Default for LevelDefinition {
    fn default() -> Self {
        Self {
            total_stages: 1,
            time_limit: 0.0,
            required_completed_boards: 0,
            horizontal_spacing: 0.0,
            vertical_spacing: 0.0,
            boards: Vec::new(),
        }
    }
}

impl LevelDefinition {
    /// Running completed-board count that clears the stage, given the count
    /// already reached when it loads.
    pub fn required_boards(&self, completed_before: usize) -> usize {
        match self.required_completed_boards {
            0 => completed_before + self.boards.len(),
            required => required as usize,
        }
    }
}

/// Which row of the layout a board sits in.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BoardRow {
    Top,
    #[default]
    Middle,
    Bottom,
}

/// One board and the pieces that start on it.
#[derive(Clone, Debug, Default, PartialEq, Deserialize)]
#[serde(default)]
pub struct BoardSpec {
    pub id: String,
    pub row: BoardRow,
    pub rows: u32,
    pub columns: u32,
    /// Explicit cells; empty means the full `columns` x `rows` rectangle.
    pub cells: Vec<CellSpec>,
    pub pieces: Vec<PieceSpec>,
}

impl BoardSpec {
    pub fn grid_shape(&self) -> GridShape {
        if self.cells.is_empty() {
            GridShape::Rectangle {
                rows: self.rows,
                columns: self.columns,
            }
        } else {
            GridShape::Custom {
                rows: self.rows,
                columns: self.columns,
                cells: self
                    .cells
                    .iter()
                    .map(|cell| ((cell.x, cell.y), cell.shape))
                    .collect(),
            }
        }
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Deserialize)]
pub struct CellSpec {
    pub x: i32,
    pub y: i32,
    #[serde(default)]
    pub shape: Shape,
}

#[derive(Clone, Debug, PartialEq, Eq, Deserialize)]
pub struct PieceSpec {
    pub id: String,
    pub color: Color,
    #[serde(default)]
    pub fixed: bool,
    #[serde(default)]
    pub shape: Shape,
    /// Grid coordinates of the parts on the owning board.
    pub parts: Vec<Coord>,
}

/// Hands out the definition of each stage, numbered from 1.
pub trait LevelSource {
    fn stage(&self, stage: u32) -> Option<LevelDefinition>;
}

impl LevelSource for Vec<LevelDefinition> {
    fn stage(&self, stage: u32) -> Option<LevelDefinition> {
        let index = usize::try_from(stage.checked_sub(1)?).ok()?;
        self.get(index).cloned()
    }
}

/// Computes the world origin of every board of a stage.
///
/// Boards are grouped into top, middle and bottom rows; rows are spaced
/// vertically around y = 0 and the boards of a row horizontally around
/// x = 0. Each board's grid is then centred on its slot.
pub fn layout_boards(level: &LevelDefinition, config: &EngineConfig) -> Vec<Vec3> {
    let h_spacing = if level.horizontal_spacing > 0.0 {
        level.horizontal_spacing
    } else {
        config.board_spacing_horizontal
    };
    let v_spacing = if level.vertical_spacing > 0.0 {
        level.vertical_spacing
    } else {
        config.board_spacing_vertical
    };

    let mut rows: Vec<BoardRow> = level.boards.iter().map(|board| board.row).collect();
    rows.sort();
    rows.dedup();

    let mut origins = vec![Vec3::ZERO; level.boards.len()];
    let top_y = (rows.len().saturating_sub(1)) as f32 * v_spacing / 2.0;
    for (row_index, row) in rows.iter().enumerate() {
        let members: Vec<usize> = level
            .boards
            .iter()
            .enumerate()
            .filter(|(_, board)| board.row == *row)
            .map(|(i, _)| i)
            .collect();
        let y = top_y - row_index as f32 * v_spacing;
        let left_x = -((members.len().saturating_sub(1)) as f32) * h_spacing / 2.0;
        for (slot, &board_index) in members.iter().enumerate() {
            let centre = Vec3::new(left_x + slot as f32 * h_spacing, y, 0.0);
            origins[board_index] = centre - grid_half_extent(&level.boards[board_index], config);
        }
    }
    origins
}

/// Offset from a board's cell `(0, 0)` to the middle of its grid.
fn grid_half_extent(board: &BoardSpec, config: &EngineConfig) -> Vec3 {
    let (columns, rows) = if board.cells.is_empty() {
        (board.columns as f32, board.rows as f32)
    } else {
        let max_x = board.cells.iter().map(|c| c.x).max().unwrap_or(0);
        let max_y = board.cells.iter().map(|c| c.y).max().unwrap_or(0);
        ((max_x + 1) as f32, (max_y + 1) as f32)
    };
    Vec3::new(
        (columns - 1.0).max(0.0) * config.cell_spacing / 2.0,
        (rows - 1.0).max(0.0) * config.cell_spacing / 2.0,
        0.0,
    )
}
