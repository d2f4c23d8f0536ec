//! Immutable cell-grid data structure (`spec.md` §3, §4.A).
//!
//! Built via [`GridBuilder`], which accumulates rooms, passages, doors, and
//! windows and is consumed by [`GridBuilder::finish`] into an immutable
//! [`Grid`] once all invariants have been checked — the same shape as the
//! teacher's `calx::prefab` split between a raw collected map and a
//! validated final value, just spelled out as an explicit builder instead of
//! a `TryFrom` impl.

use std::collections::{BTreeMap, BTreeSet};

use serde::{Deserialize, Serialize};

use crate::error::{FurnigenError, Result};
use crate::geom::{cell_from_row_col, row_col, Cell, Direction, MetricRect};

/// A door or window opening in a room's wall.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Opening {
    pub wall: Direction,
    pub room: String,
    /// Distance along the wall from its west/south origin, in metres.
    pub position_m: f64,
    /// Opening width, in metres.
    pub width_m: f64,
}

/// An immutable, validated floor-plan grid.
///
/// Never mutated after construction (`spec.md` §3: "Grid is built once per
/// floor plan and never mutated"), so it may be freely shared between
/// threads without synchronization.
#[derive(Clone, Debug)]
pub struct Grid {
    width: u32,
    height: u32,
    cell_size: f64,
    room_cells: BTreeMap<String, BTreeSet<Cell>>,
    passage_cells: BTreeSet<Cell>,
    outdoor_cells: BTreeSet<Cell>,
    entrance: Option<Cell>,
    doors: Vec<Opening>,
    windows: Vec<Opening>,
}

/// Mutable accumulator for building a [`Grid`].
#[derive(Default)]
pub struct GridBuilder {
    width: u32,
    height: u32,
    cell_size: f64,
    room_cells: BTreeMap<String, BTreeSet<Cell>>,
    passage_cells: BTreeSet<Cell>,
    outdoor_cells: BTreeSet<Cell>,
    entrance: Option<Cell>,
    doors: Vec<Opening>,
    windows: Vec<Opening>,
}

impl GridBuilder {
    pub fn new(width: u32, height: u32, cell_size: f64) -> Self {
        GridBuilder { width, height, cell_size, ..GridBuilder::default() }
    }

    /// Insert a room's cell set. Rooms inserted multiple times under the
    /// same name are merged (the union of both calls' cells).
    pub fn insert_room(&mut self, name: impl Into<String>, cells: impl IntoIterator<Item = Cell>) {
        self.room_cells.entry(name.into()).or_default().extend(cells);
    }

    pub fn insert_passages(&mut self, cells: impl IntoIterator<Item = Cell>) {
        self.passage_cells.extend(cells);
    }

    pub fn insert_outdoor(&mut self, cells: impl IntoIterator<Item = Cell>) {
        self.outdoor_cells.extend(cells);
    }

    pub fn set_entrance(&mut self, cell: Cell) { self.entrance = Some(cell); }

    pub fn insert_door(&mut self, opening: Opening) { self.doors.push(opening); }

    pub fn insert_window(&mut self, opening: Opening) { self.windows.push(opening); }

    /// Validate all invariants from `spec.md` §3 and produce an immutable
    /// [`Grid`], or a [`FurnigenError::GridInvariant`] describing the first
    /// violation found.
    pub fn finish(self) -> Result<Grid> {
        // Every cell belongs to at most one of: a single room, passages, outdoor.
        let mut seen: BTreeMap<Cell, &str> = BTreeMap::new();
        for (name, cells) in &self.room_cells {
            if cells.is_empty() {
                return Err(FurnigenError::GridInvariant(format!(
                    "room '{}' owns no cells",
                    name
                )));
            }
            for &c in cells {
                if let Some(owner) = seen.insert(c, name.as_str()) {
                    return Err(FurnigenError::GridInvariant(format!(
                        "cell ({}, {}) claimed by both room '{}' and room '{}'",
                        c.y, c.x, owner, name
                    )));
                }
            }
        }
        for &c in &self.passage_cells {
            if let Some(owner) = seen.insert(c, "<passage>") {
                return Err(FurnigenError::GridInvariant(format!(
                    "cell ({}, {}) claimed by both room '{}' and passages",
                    c.y, c.x, owner
                )));
            }
        }
        for &c in &self.outdoor_cells {
            if seen.contains_key(&c) {
                return Err(FurnigenError::GridInvariant(format!(
                    "cell ({}, {}) is both outdoor and inside the building",
                    c.y, c.x
                )));
            }
        }

        let grid = Grid {
            width: self.width,
            height: self.height,
            cell_size: self.cell_size,
            room_cells: self.room_cells,
            passage_cells: self.passage_cells,
            outdoor_cells: self.outdoor_cells,
            entrance: self.entrance,
            doors: self.doors,
            windows: self.windows,
        };

        // Every door/window's room exists and its position + width fits
        // inside the room's extent along the named wall.
        for opening in grid.doors.iter().chain(grid.windows.iter()) {
            grid.validate_opening(opening)?;
        }

        Ok(grid)
    }
}

impl Grid {
    pub fn width(&self) -> u32 { self.width }
    pub fn height(&self) -> u32 { self.height }
    pub fn cell_size(&self) -> f64 { self.cell_size }
    pub fn entrance(&self) -> Option<Cell> { self.entrance }
    pub fn doors(&self) -> &[Opening] { &self.doors }
    pub fn windows(&self) -> &[Opening] { &self.windows }
    pub fn passage_cells(&self) -> &BTreeSet<Cell> { &self.passage_cells }
    pub fn outdoor_cells(&self) -> &BTreeSet<Cell> { &self.outdoor_cells }

    pub fn room_names(&self) -> impl Iterator<Item = &str> {
        self.room_cells.keys().map(String::as_str)
    }

    pub fn room_cells(&self, name: &str) -> Option<&BTreeSet<Cell>> { self.room_cells.get(name) }

    pub fn rooms(&self) -> impl Iterator<Item = (&str, &BTreeSet<Cell>)> {
        self.room_cells.iter().map(|(n, c)| (n.as_str(), c))
    }

    /// Room area in square metres.
    pub fn room_area_m2(&self, name: &str) -> f64 {
        self.room_cells
            .get(name)
            .map(|cells| cells.len() as f64 * self.cell_size * self.cell_size)
            .unwrap_or(0.0)
    }

    /// Union of every cell inside the building envelope: all room cells plus
    /// passage cells. Outdoor cells are excluded.
    pub fn envelope_cells(&self) -> BTreeSet<Cell> {
        let mut cells: BTreeSet<Cell> = self.passage_cells.clone();
        for room in self.room_cells.values() {
            cells.extend(room.iter().copied());
        }
        cells
    }

    /// Metric bounding box of a room's cells.
    pub fn room_bbox_m(&self, name: &str) -> Option<MetricRect> {
        let cells = self.room_cells.get(name)?;
        bbox_m(cells, self.cell_size)
    }

    /// Metric bounding box of the whole building envelope (every inside cell).
    pub fn envelope_m(&self) -> Option<MetricRect> {
        let cells = self.envelope_cells();
        bbox_m(&cells, self.cell_size)
    }

    /// Cells within `depth` steps of a door owned by `room_name`, scanning
    /// inward from the wall, that furniture may not occupy (`spec.md` §4.D
    /// door clearance). Shared by the optimizer (to exclude these cells from
    /// placement) and by [`crate::validate`] (to check the solved layout
    /// respects them).
    pub fn door_clearance_cells(&self, room_name: &str, depth: u32) -> BTreeSet<Cell> {
        let mut blocked = BTreeSet::new();
        let Some(room_cells) = self.room_cells(room_name) else { return blocked };
        let (w, h) = (self.width as i32, self.height as i32);

        for door in self.doors.iter().filter(|d| d.room == room_name) {
            let pos_cells = (door.position_m / self.cell_size).floor() as i32;
            let width_cells = ((door.width_m / self.cell_size).round() as i32).max(1);

            for offset in 0..=width_cells {
                let mut count = 0u32;
                let scan: Box<dyn Iterator<Item = Cell>> = match door.wall {
                    Direction::North => {
                        let j = (pos_cells + offset).min(w - 1);
                        Box::new((0..h).map(move |i| Cell::new(j, i)))
                    }
                    Direction::South => {
                        let j = (pos_cells + offset).min(w - 1);
                        Box::new((0..h).rev().map(move |i| Cell::new(j, i)))
                    }
                    Direction::West => {
                        let i = (pos_cells + offset).min(h - 1);
                        Box::new((0..w).map(move |j| Cell::new(j, i)))
                    }
                    Direction::East => {
                        let i = (pos_cells + offset).min(h - 1);
                        Box::new((0..w).rev().map(move |j| Cell::new(j, i)))
                    }
                };
                for c in scan {
                    if room_cells.contains(&c) {
                        blocked.insert(c);
                        count += 1;
                        if count >= depth {
                            break;
                        }
                    }
                }
            }
        }

        blocked
    }

    fn validate_opening(&self, opening: &Opening) -> Result<()> {
        let bbox = self.room_bbox_m(&opening.room).ok_or_else(|| {
            FurnigenError::GridInvariant(format!(
                "opening references unknown room '{}'",
                opening.room
            ))
        })?;

        let wall_length = if opening.wall.is_horizontal() { bbox.size.height } else { bbox.size.width };

        if opening.position_m < 0.0 || opening.position_m + opening.width_m > wall_length + 1e-9 {
            return Err(FurnigenError::GridInvariant(format!(
                "opening on {:?} wall of room '{}' at {}m (width {}m) does not fit the \
                 room's {}m extent along that wall",
                opening.wall, opening.room, opening.position_m, opening.width_m, wall_length
            )));
        }
        Ok(())
    }

    pub fn to_dump(&self) -> GridDump {
        GridDump {
            width: self.width,
            height: self.height,
            cell_size: self.cell_size,
            room_cells: self
                .room_cells
                .iter()
                .map(|(name, cells)| (name.clone(), cells.iter().copied().map(row_col).collect()))
                .collect(),
            passage_cells: self.passage_cells.iter().copied().map(row_col).collect(),
            doors: self.doors.clone(),
            windows: self.windows.clone(),
            entrance: self.entrance.map(row_col),
        }
    }

    pub fn from_dump(dump: GridDump) -> Result<Grid> {
        let mut builder = GridBuilder::new(dump.width, dump.height, dump.cell_size);
        for (name, cells) in dump.room_cells {
            builder.insert_room(name, cells.into_iter().map(|(i, j)| cell_from_row_col(i, j)));
        }
        builder.insert_passages(dump.passage_cells.into_iter().map(|(i, j)| cell_from_row_col(i, j)));
        if let Some((i, j)) = dump.entrance {
            builder.set_entrance(cell_from_row_col(i, j));
        }
        for door in dump.doors {
            builder.insert_door(door);
        }
        for window in dump.windows {
            builder.insert_window(window);
        }
        builder.finish()
    }
}

fn bbox_m(cells: &BTreeSet<Cell>, cell_size: f64) -> Option<MetricRect> {
    let (mut min_i, mut min_j, mut max_i, mut max_j) = (i32::MAX, i32::MAX, i32::MIN, i32::MIN);
    for c in cells {
        min_i = min_i.min(c.y);
        max_i = max_i.max(c.y);
        min_j = min_j.min(c.x);
        max_j = max_j.max(c.x);
    }
    if cells.is_empty() {
        return None;
    }
    let x0 = min_j as f64 * cell_size;
    let z0 = min_i as f64 * cell_size;
    let width = (max_j - min_j + 1) as f64 * cell_size;
    let height = (max_i - min_i + 1) as f64 * cell_size;
    Some(euclid::rect(x0, z0, width, height))
}

/// Canonical serialization form, matching the stable schema of `spec.md` §6.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct GridDump {
    pub width: u32,
    pub height: u32,
    pub cell_size: f64,
    pub room_cells: BTreeMap<String, Vec<(i32, i32)>>,
    pub passage_cells: Vec<(i32, i32)>,
    pub doors: Vec<Opening>,
    pub windows: Vec<Opening>,
    pub entrance: Option<(i32, i32)>,
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::geom::Cell;

    fn rect_cells(i0: i32, j0: i32, h: i32, w: i32) -> Vec<Cell> {
        let mut v = Vec::new();
        for i in i0..i0 + h {
            for j in j0..j0 + w {
                v.push(Cell::new(j, i));
            }
        }
        v
    }

    #[test]
    fn test_two_rooms_no_overlap() {
        let mut b = GridBuilder::new(9, 4, 1.0);
        b.insert_room("Living", rect_cells(0, 0, 4, 5));
        b.insert_room("Bedroom", rect_cells(0, 5, 4, 4));
        let grid = b.finish().expect("valid grid");
        assert_eq!(grid.room_area_m2("Living"), 20.0);
        assert_eq!(grid.room_area_m2("Bedroom"), 16.0);
        assert_eq!(grid.envelope_cells().len(), 36);
    }

    #[test]
    fn test_overlapping_rooms_rejected() {
        let mut b = GridBuilder::new(4, 4, 1.0);
        b.insert_room("A", rect_cells(0, 0, 2, 2));
        b.insert_room("B", rect_cells(1, 1, 2, 2));
        assert!(b.finish().is_err());
    }

    #[test]
    fn test_door_must_fit_room_wall() {
        let mut b = GridBuilder::new(5, 5, 1.0);
        b.insert_room("Room", rect_cells(0, 0, 5, 5));
        b.insert_door(Opening {
            wall: Direction::South,
            room: "Room".into(),
            position_m: 2.0,
            width_m: 1.0,
        });
        assert!(b.finish().is_ok());
    }

    #[test]
    fn test_door_outside_room_extent_rejected() {
        let mut b = GridBuilder::new(5, 5, 1.0);
        b.insert_room("Room", rect_cells(0, 0, 5, 5));
        b.insert_door(Opening {
            wall: Direction::South,
            room: "Room".into(),
            position_m: 4.5,
            width_m: 1.0,
        });
        assert!(b.finish().is_err());
    }

    #[test]
    fn test_grid_dump_round_trip() {
        let mut b = GridBuilder::new(9, 4, 1.0);
        b.insert_room("Living", rect_cells(0, 0, 4, 5));
        b.insert_room("Bedroom", rect_cells(0, 5, 4, 4));
        let grid = b.finish().unwrap();
        let dump = grid.to_dump();
        let json = serde_json::to_string(&dump).unwrap();
        let dump2: GridDump = serde_json::from_str(&json).unwrap();
        let grid2 = Grid::from_dump(dump2).unwrap();

        for name in grid.room_names() {
            assert_eq!(grid.room_cells(name), grid2.room_cells(name));
        }
    }
}
