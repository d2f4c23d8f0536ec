//! Grid-cell coordinate space.
//!
//! Mirrors `calx::space`/`calx::project`'s habit of giving every coordinate
//! system its own zero-sized marker type instead of passing around bare
//! tuples, so a `Cell` can never be silently used where a metre-valued point
//! was expected.

use euclid::{Point2D, Rect, Vector2D};

/// Marker for the discrete cell grid. One unit = one cell of side `cell_size`.
#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash)]
pub struct CellSpace;

/// Marker for real-world metre coordinates.
#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash)]
pub struct MetricSpace;

pub type Cell = Point2D<i32, CellSpace>;
pub type CellVector = Vector2D<i32, CellSpace>;
pub type CellRect = Rect<i32, CellSpace>;

pub type MetricPoint = Point2D<f64, MetricSpace>;
pub type MetricRect = Rect<f64, MetricSpace>;

/// Cardinal direction of a wall, door, or window.
#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Direction {
    North,
    South,
    East,
    West,
}

impl Direction {
    /// Unit cell step in this direction, row-major (`.x` = column, `.y` = row).
    pub fn step(self) -> CellVector {
        match self {
            Direction::North => CellVector::new(0, -1),
            Direction::South => CellVector::new(0, 1),
            Direction::East => CellVector::new(1, 0),
            Direction::West => CellVector::new(-1, 0),
        }
    }

    /// `true` if this direction runs along rows (east/west).
    pub fn is_horizontal(self) -> bool { matches!(self, Direction::East | Direction::West) }
}

/// Ceiling-divide a metric length by the cell size, per `spec.md` §4.C:
/// `cells = max(1, ceil(m / s))`.
pub fn metres_to_cells(metres: f64, cell_size: f64) -> u32 {
    debug_assert!(cell_size > 0.0);
    let cells = (metres / cell_size).ceil() as i64;
    cells.max(1) as u32
}

/// A cell's (row, column) pair, as used at serialization boundaries where the
/// spec's `[i, j]` ordering must be preserved literally.
pub fn row_col(cell: Cell) -> (i32, i32) { (cell.y, cell.x) }

pub fn cell_from_row_col(i: i32, j: i32) -> Cell { Cell::new(j, i) }

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_metres_to_cells_rounds_up_and_floors_at_one() {
        assert_eq!(metres_to_cells(0.0, 0.5), 1);
        assert_eq!(metres_to_cells(0.4, 0.5), 1);
        assert_eq!(metres_to_cells(0.5, 0.5), 1);
        assert_eq!(metres_to_cells(0.6, 0.5), 2);
        assert_eq!(metres_to_cells(2.0, 0.5), 4);
    }

    #[test]
    fn test_row_col_round_trip() {
        let c = Cell::new(7, 3);
        let (i, j) = row_col(c);
        assert_eq!(cell_from_row_col(i, j), c);
    }
}
