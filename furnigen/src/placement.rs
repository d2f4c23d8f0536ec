//! Placement records shared between the optimizer, coordinate converter,
//! and scene assembler (`spec.md` §3).

use serde::{Deserialize, Serialize};

use crate::geom::Cell;

/// One furniture item's placement in grid units, as produced by
/// [`crate::optimizer::optimize_layout`].
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct PlacedItem {
    pub room: String,
    pub item: String,
    pub category: String,
    pub top_left: Cell,
    /// `0` = long axis along rows, `1` = long axis along columns.
    pub sigma: bool,
    /// Which end of the long axis is the item's front.
    pub mu: bool,
    pub size_i: u32,
    pub size_j: u32,
    pub height_m: f64,
}

impl PlacedItem {
    pub fn area_cells(&self) -> u32 { self.size_i * self.size_j }

    pub fn bottom_right(&self) -> Cell {
        Cell::new(self.top_left.x + self.size_j as i32 - 1, self.top_left.y + self.size_i as i32 - 1)
    }

    /// All cells this item occupies.
    pub fn cells(&self) -> impl Iterator<Item = Cell> + '_ {
        let (i0, j0) = (self.top_left.y, self.top_left.x);
        (0..self.size_i as i32)
            .flat_map(move |di| (0..self.size_j as i32).map(move |dj| Cell::new(j0 + dj, i0 + di)))
    }
}

#[derive(Copy, Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Point3 {
    pub x: f64,
    pub y: f64,
    pub z: f64,
}

#[derive(Copy, Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Size3 {
    pub width: f64,
    pub depth: f64,
    pub height: f64,
}

/// One furniture item's placement in 3D scene units, as produced by
/// [`crate::coords::convert_placement`].
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Placement3D {
    pub item_name: String,
    pub room_name: String,
    pub category: String,
    pub position: Point3,
    pub rotation_y_degrees: u16,
    pub size_m: Size3,
}
