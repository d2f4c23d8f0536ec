//! Property checks over grid, placement, and scene output (`spec.md` §8).
//!
//! Rust counterpart of `placement_validator.py`, which the Python service
//! this replaces ran after every solve to sanity-check the MIP output before
//! handing it to rendering. Exposed as a public API rather than test-only,
//! so a caller embedding the engine can re-validate a solve the same way;
//! the test suite calls these same functions instead of re-deriving the
//! properties ad hoc per test.

use std::collections::HashSet;
use std::fmt;

use crate::geom::Cell;
use crate::grid::{Grid, GridDump};
use crate::optimizer::RoomProblem;
use crate::placement::{PlacedItem, Placement3D};

/// One property violation. `Display` gives a human-readable message suitable
/// for logging.
#[derive(Clone, Debug, PartialEq)]
pub enum ValidationFailure {
    /// Property 1: a placed item occupies a cell outside its own room.
    OutsideRoom { room: String, item: String, cell: (i32, i32) },
    /// Property 2: two placed items' rectangles overlap.
    Overlap { room: String, item_a: String, item_b: String, cell: (i32, i32) },
    /// Property 3: a placed item occupies a door's clearance cell.
    BlocksDoor { room: String, item: String, cell: (i32, i32) },
    /// Property 4: a boundary-tagged item doesn't touch enough wall cells.
    NotWallAdjacent { room: String, item: String, touching: u32, required: u32 },
    /// Property 5: an alignment pair has different rotation axes.
    MisalignedPair { room: String, item_a: String, item_b: String },
    /// Property 6: a facing pair's directional inequality does not hold.
    NotFacing { room: String, facer: String, target: String },
    /// Property 7: a placement's rotation is not one of {0, 90, 180, 270}.
    BadRotation { room: String, item: String, degrees: u16 },
    /// Property 8: a 3D placement's center lies outside its room's margin
    /// band without having been centered on the violated axis instead.
    OutsideWallMargin { room: String, item: String, axis: char, value: f64, bounds: (f64, f64) },
    /// Property 9: a grid dump round-trip did not reproduce the original
    /// room-cell sets.
    RoundTripMismatch { room: String },
    /// Property 10: room + passage + outdoor cell areas don't sum to W*H.
    AreaMismatch { expected: f64, actual: f64 },
}

impl fmt::Display for ValidationFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ValidationFailure::OutsideRoom { room, item, cell } => {
                write!(f, "{}/{}: cell {:?} is outside the room's cell set", room, item, cell)
            }
            ValidationFailure::Overlap { room, item_a, item_b, cell } => {
                write!(f, "{}: {} and {} both occupy cell {:?}", room, item_a, item_b, cell)
            }
            ValidationFailure::BlocksDoor { room, item, cell } => {
                write!(f, "{}/{}: occupies door-clearance cell {:?}", room, item, cell)
            }
            ValidationFailure::NotWallAdjacent { room, item, touching, required } => {
                write!(
                    f,
                    "{}/{}: only {} of {} required edge cells touch a wall",
                    room, item, touching, required
                )
            }
            ValidationFailure::MisalignedPair { room, item_a, item_b } => {
                write!(f, "{}: {} and {} do not share a rotation axis", room, item_a, item_b)
            }
            ValidationFailure::NotFacing { room, facer, target } => {
                write!(f, "{}: {} does not face {}", room, facer, target)
            }
            ValidationFailure::BadRotation { room, item, degrees } => {
                write!(f, "{}/{}: rotation {}° is not a cardinal direction", room, item, degrees)
            }
            ValidationFailure::OutsideWallMargin { room, item, axis, value, bounds } => {
                write!(
                    f,
                    "{}/{}: {}={:.3} is outside the margin band {:?}",
                    room, item, axis, value, bounds
                )
            }
            ValidationFailure::RoundTripMismatch { room } => {
                write!(f, "{}: grid dump round-trip produced a different cell set", room)
            }
            ValidationFailure::AreaMismatch { expected, actual } => {
                write!(f, "grid area mismatch: expected {:.3}, got {:.3}", expected, actual)
            }
        }
    }
}

/// Property 1: every cell of every placed item belongs to that item's room.
pub fn check_containment(grid: &Grid, placements: &[PlacedItem]) -> Vec<ValidationFailure> {
    let mut failures = Vec::new();
    for p in placements {
        let Some(room_cells) = grid.room_cells(&p.room) else {
            failures.push(ValidationFailure::OutsideRoom {
                room: p.room.clone(),
                item: p.item.clone(),
                cell: (p.top_left.y, p.top_left.x),
            });
            continue;
        };
        for cell in p.cells() {
            if !room_cells.contains(&cell) {
                failures.push(ValidationFailure::OutsideRoom {
                    room: p.room.clone(),
                    item: p.item.clone(),
                    cell: (cell.y, cell.x),
                });
            }
        }
    }
    failures
}

/// Property 2: no two placed items' rectangles share a cell.
pub fn check_no_overlap(placements: &[PlacedItem]) -> Vec<ValidationFailure> {
    let mut failures = Vec::new();
    let mut owner: std::collections::HashMap<Cell, &PlacedItem> = std::collections::HashMap::new();
    for p in placements {
        for cell in p.cells() {
            if let Some(other) = owner.get(&cell) {
                failures.push(ValidationFailure::Overlap {
                    room: p.room.clone(),
                    item_a: other.item.clone(),
                    item_b: p.item.clone(),
                    cell: (cell.y, cell.x),
                });
            } else {
                owner.insert(cell, p);
            }
        }
    }
    failures
}

/// Property 3: no placed item occupies a door's clearance cells.
pub fn check_door_clearance(
    grid: &Grid,
    placements: &[PlacedItem],
    door_clearance_cells: u32,
) -> Vec<ValidationFailure> {
    let mut failures = Vec::new();
    let mut blocked_by_room: std::collections::HashMap<&str, HashSet<Cell>> = std::collections::HashMap::new();
    for p in placements {
        let blocked = blocked_by_room
            .entry(p.room.as_str())
            .or_insert_with(|| grid.door_clearance_cells(&p.room, door_clearance_cells));
        for cell in p.cells() {
            if blocked.contains(&cell) {
                failures.push(ValidationFailure::BlocksDoor {
                    room: p.room.clone(),
                    item: p.item.clone(),
                    cell: (cell.y, cell.x),
                });
            }
        }
    }
    failures
}

/// Property 4: every boundary-tagged item touches enough non-room neighbor
/// cells along its long edge. Mirrors the edge-counting convention of
/// `optimizer::model`'s boundary constraint: the required count is the
/// item's long-axis extent, and which pair of neighbor directions counts
/// (north/south vs. east/west) is selected by `sigma`.
pub fn check_boundary(grid: &Grid, placements: &[PlacedItem], rooms: &[RoomProblem]) -> Vec<ValidationFailure> {
    let mut failures = Vec::new();
    let boundary_items: HashSet<(&str, &str)> = rooms
        .iter()
        .flat_map(|r| r.constraints.boundary.iter().map(move |name| (r.room.as_str(), name.as_str())))
        .collect();

    for p in placements {
        if !boundary_items.contains(&(p.room.as_str(), p.item.as_str())) {
            continue;
        }
        let Some(room_cells) = grid.room_cells(&p.room) else { continue };
        let required = p.size_i.max(p.size_j);

        let mut touching = 0u32;
        for cell in p.cells() {
            let wall_n = !room_cells.contains(&Cell::new(cell.x, cell.y - 1));
            let wall_s = !room_cells.contains(&Cell::new(cell.x, cell.y + 1));
            let wall_w = !room_cells.contains(&Cell::new(cell.x - 1, cell.y));
            let wall_e = !room_cells.contains(&Cell::new(cell.x + 1, cell.y));
            let touches = if p.sigma { wall_n || wall_s } else { wall_w || wall_e };
            if touches {
                touching += 1;
            }
        }

        if touching < required {
            failures.push(ValidationFailure::NotWallAdjacent {
                room: p.room.clone(),
                item: p.item.clone(),
                touching,
                required,
            });
        }
    }
    failures
}

/// Property 5: every alignment pair shares a rotation axis (`sigma` equal).
pub fn check_alignment(placements: &[PlacedItem], rooms: &[RoomProblem]) -> Vec<ValidationFailure> {
    let mut failures = Vec::new();
    for room in rooms {
        for (a, b) in &room.constraints.alignment {
            let Some(pa) = placements.iter().find(|p| p.room == room.room && p.item == *a) else { continue };
            let Some(pb) = placements.iter().find(|p| p.room == room.room && p.item == *b) else { continue };
            if pa.sigma != pb.sigma {
                failures.push(ValidationFailure::MisalignedPair {
                    room: room.room.clone(),
                    item_a: a.clone(),
                    item_b: b.clone(),
                });
            }
        }
    }
    failures
}

/// Property 6: for every facing pair, the facer's front-relative inequality
/// against the target holds strictly. `(sigma, mu)` selects the cardinal
/// direction the facer points in, the same table `optimizer::model` uses to
/// pick which case's inequality applies.
pub fn check_facing(placements: &[PlacedItem], rooms: &[RoomProblem]) -> Vec<ValidationFailure> {
    let mut failures = Vec::new();
    for room in rooms {
        for (a, b) in &room.constraints.facing {
            let Some(pa) = placements.iter().find(|p| p.room == room.room && p.item == *a) else { continue };
            let Some(pb) = placements.iter().find(|p| p.room == room.room && p.item == *b) else { continue };

            let (i0_a, j0_a) = (pa.top_left.y, pa.top_left.x);
            let (i0_b, j0_b) = (pb.top_left.y, pb.top_left.x);
            let holds = match (pa.sigma, pa.mu) {
                (true, true) => i0_a > i0_b,   // facer faces north: target is north of facer
                (true, false) => i0_a < i0_b,  // south
                (false, true) => j0_a > j0_b,  // west
                (false, false) => j0_a < j0_b, // east
            };
            if !holds {
                failures.push(ValidationFailure::NotFacing {
                    room: room.room.clone(),
                    facer: a.clone(),
                    target: b.clone(),
                });
            }
        }
    }
    failures
}

/// Property 7: every 3D placement's rotation is a cardinal direction.
pub fn check_rotation_domain(placements: &[Placement3D]) -> Vec<ValidationFailure> {
    placements
        .iter()
        .filter(|p| !matches!(p.rotation_y_degrees, 0 | 90 | 180 | 270))
        .map(|p| ValidationFailure::BadRotation {
            room: p.room_name.clone(),
            item: p.item_name.clone(),
            degrees: p.rotation_y_degrees,
        })
        .collect()
}

/// Property 8: every 3D placement's center lies within its room's metric
/// bounding box, inset by `margin` on each axis — or, when the room is too
/// narrow to satisfy that inset, centered on the violated axis instead
/// (`spec.md` §4.E's degrade-rather-than-fail clamp).
pub fn check_wall_margin(grid: &Grid, placements: &[Placement3D], margin: f64) -> Vec<ValidationFailure> {
    let mut failures = Vec::new();
    let grid_h_m = grid.height() as f64 * grid.cell_size();

    for p in placements {
        let Some(bbox) = grid.room_bbox_m(&p.room_name) else { continue };
        let (x_min, x_max) = (bbox.min_x(), bbox.max_x());
        let (z_min, z_max) = (grid_h_m - bbox.max_y(), grid_h_m - bbox.min_y());

        let half_w = p.size_m.width / 2.0;
        let half_d = p.size_m.depth / 2.0;
        const EPS: f64 = 1e-6;

        let x_band = (x_min + half_w + margin, x_max - half_w - margin);
        let x_ok = if x_band.0 > x_band.1 {
            (p.position.x - (x_min + x_max) / 2.0).abs() < EPS
        } else {
            p.position.x >= x_band.0 - EPS && p.position.x <= x_band.1 + EPS
        };
        if !x_ok {
            failures.push(ValidationFailure::OutsideWallMargin {
                room: p.room_name.clone(),
                item: p.item_name.clone(),
                axis: 'x',
                value: p.position.x,
                bounds: x_band,
            });
        }

        let z_band = (z_min + half_d + margin, z_max - half_d - margin);
        let z_ok = if z_band.0 > z_band.1 {
            (p.position.z - (z_min + z_max) / 2.0).abs() < EPS
        } else {
            p.position.z >= z_band.0 - EPS && p.position.z <= z_band.1 + EPS
        };
        if !z_ok {
            failures.push(ValidationFailure::OutsideWallMargin {
                room: p.room_name.clone(),
                item: p.item_name.clone(),
                axis: 'z',
                value: p.position.z,
                bounds: z_band,
            });
        }
    }
    failures
}

/// Property 9: dumping a grid and reconstructing it from that dump
/// reproduces the same room-cell sets.
pub fn check_round_trip(grid: &Grid) -> Vec<ValidationFailure> {
    let dump: GridDump = grid.to_dump();
    let Ok(rebuilt) = Grid::from_dump(dump) else {
        return vec![ValidationFailure::RoundTripMismatch { room: "<all>".to_string() }];
    };

    let mut failures = Vec::new();
    for name in grid.room_names() {
        if grid.room_cells(name) != rebuilt.room_cells(name) {
            failures.push(ValidationFailure::RoundTripMismatch { room: name.to_string() });
        }
    }
    failures
}

/// Property 10: room + passage + outdoor cell areas sum to `W*H*s^2`.
pub fn check_area_conservation(grid: &Grid) -> Vec<ValidationFailure> {
    let cell_area = grid.cell_size() * grid.cell_size();
    let room_area: f64 = grid.rooms().map(|(_, cells)| cells.len() as f64 * cell_area).sum();
    let passage_area = grid.passage_cells().len() as f64 * cell_area;
    let outdoor_area = grid.outdoor_cells().len() as f64 * cell_area;
    let actual = room_area + passage_area + outdoor_area;
    let expected = grid.width() as f64 * grid.height() as f64 * cell_area;

    if (actual - expected).abs() > 1e-6 {
        vec![ValidationFailure::AreaMismatch { expected, actual }]
    } else {
        Vec::new()
    }
}

/// Run every 2D-stage property check (1–6) and return all violations found.
pub fn validate_placement(
    grid: &Grid,
    placements: &[PlacedItem],
    rooms: &[RoomProblem],
    door_clearance_cells: u32,
) -> Vec<ValidationFailure> {
    let mut failures = check_containment(grid, placements);
    failures.extend(check_no_overlap(placements));
    failures.extend(check_door_clearance(grid, placements, door_clearance_cells));
    failures.extend(check_boundary(grid, placements, rooms));
    failures.extend(check_alignment(placements, rooms));
    failures.extend(check_facing(placements, rooms));
    failures
}

/// Run every 3D-stage property check (7–8) and return all violations found.
pub fn validate_scene(grid: &Grid, placements: &[Placement3D], wall_margin_m: f64) -> Vec<ValidationFailure> {
    let mut failures = check_rotation_domain(placements);
    failures.extend(check_wall_margin(grid, placements, wall_margin_m));
    failures
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::furniture::CompiledConstraints;
    use crate::grid::GridBuilder;

    fn rect_cells(i0: i32, j0: i32, h: i32, w: i32) -> Vec<Cell> {
        let mut v = Vec::new();
        for i in i0..i0 + h {
            for j in j0..j0 + w {
                v.push(Cell::new(j, i));
            }
        }
        v
    }

    fn item(room: &str, name: &str, top_left: Cell, size_i: u32, size_j: u32, sigma: bool, mu: bool) -> PlacedItem {
        PlacedItem {
            room: room.into(),
            item: name.into(),
            category: "misc".into(),
            top_left,
            sigma,
            mu,
            size_i,
            size_j,
            height_m: 0.5,
        }
    }

    #[test]
    fn test_containment_flags_out_of_room_cell() {
        let mut b = GridBuilder::new(4, 4, 0.5);
        b.insert_room("room", rect_cells(0, 0, 2, 2));
        let grid = b.finish().unwrap();

        let placed = vec![item("room", "sofa", Cell::new(2, 0), 1, 1, false, false)];
        let failures = check_containment(&grid, &placed);
        assert_eq!(failures.len(), 1);
    }

    #[test]
    fn test_no_overlap_flags_shared_cell() {
        let placed = vec![
            item("room", "a", Cell::new(0, 0), 2, 2, false, false),
            item("room", "b", Cell::new(1, 1), 2, 2, false, false),
        ];
        let failures = check_no_overlap(&placed);
        assert!(!failures.is_empty());
    }

    #[test]
    fn test_alignment_pair_mismatch_is_flagged() {
        let placed = vec![
            item("room", "a", Cell::new(0, 0), 1, 2, false, false),
            item("room", "b", Cell::new(2, 0), 2, 1, true, false),
        ];
        let rooms = vec![RoomProblem {
            room: "room".into(),
            items: vec![],
            constraints: CompiledConstraints {
                alignment: vec![("a".to_string(), "b".to_string())],
                ..Default::default()
            },
        }];
        let failures = check_alignment(&placed, &rooms);
        assert_eq!(failures.len(), 1);
    }

    #[test]
    fn test_facing_north_requires_target_smaller_i() {
        // facer at i0=2 facing north (sigma=1,mu=1) needs target's i0 < 2.
        let placed = vec![
            item("room", "facer", Cell::new(0, 2), 1, 1, true, true),
            item("room", "target", Cell::new(0, 0), 1, 1, false, false),
        ];
        let rooms = vec![RoomProblem {
            room: "room".into(),
            items: vec![],
            constraints: CompiledConstraints {
                facing: vec![("facer".to_string(), "target".to_string())],
                ..Default::default()
            },
        }];
        assert!(check_facing(&placed, &rooms).is_empty());
    }

    #[test]
    fn test_rotation_domain_rejects_non_cardinal() {
        let p = Placement3D {
            item_name: "x".into(),
            room_name: "room".into(),
            category: "misc".into(),
            position: crate::placement::Point3 { x: 0.0, y: 0.0, z: 0.0 },
            rotation_y_degrees: 45,
            size_m: crate::placement::Size3 { width: 1.0, depth: 1.0, height: 1.0 },
        };
        assert_eq!(check_rotation_domain(&[p]).len(), 1);
    }

    #[test]
    fn test_area_conservation_holds_for_fresh_grid() {
        let mut b = GridBuilder::new(4, 4, 0.5);
        b.insert_room("room", rect_cells(0, 0, 4, 4));
        let grid = b.finish().unwrap();
        assert!(check_area_conservation(&grid).is_empty());
    }

    #[test]
    fn test_round_trip_holds_for_fresh_grid() {
        let mut b = GridBuilder::new(4, 4, 0.5);
        b.insert_room("room", rect_cells(0, 0, 4, 4));
        let grid = b.finish().unwrap();
        assert!(check_round_trip(&grid).is_empty());
    }
}
