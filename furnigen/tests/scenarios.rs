//! End-to-end pipeline scenarios (`spec.md` §8, S1–S6).
//!
//! Each test assembles a grid, compiles furniture specs/constraints, solves
//! the layout single-threaded with a fixed seed for determinism, and checks
//! the result with [`furnigen::validate`] rather than re-deriving the
//! properties ad hoc.

use std::sync::atomic::AtomicBool;

use pretty_assertions::assert_eq;

use furnigen::config::OptimizerParams;
use furnigen::coords;
use furnigen::error::FurnigenError;
use furnigen::furniture::{compile_room, DistancePair, FurnitureSpec, Priority, RoomConstraints};
use furnigen::geom::Cell;
use furnigen::grid::{Grid, GridBuilder};
use furnigen::optimizer::{optimize_layout, RoomProblem};
use furnigen::validate;

fn rect_cells(i0: i32, j0: i32, h: i32, w: i32) -> Vec<Cell> {
    let mut v = Vec::new();
    for i in i0..i0 + h {
        for j in j0..j0 + w {
            v.push(Cell::new(j, i));
        }
    }
    v
}

fn spec(name: &str, length_m: f64, width_m: f64, priority: Priority) -> FurnitureSpec {
    FurnitureSpec { name: name.into(), category: "misc".into(), length_m, width_m, height_m: 0.8, search_hint: None, priority }
}

fn room_problem(grid: &Grid, room: &str, specs: &[FurnitureSpec], constraints: RoomConstraints, params: &OptimizerParams) -> RoomProblem {
    let (items, compiled) = compile_room(room, specs, &constraints, params);
    assert!(grid.room_cells(room).is_some(), "room '{}' must exist in the grid", room);
    RoomProblem { room: room.to_string(), items, constraints: compiled }
}

/// S1 — a 9x4m envelope split into Living (5x4) and Bedroom (4x4); six items
/// across both rooms, two of them facing each other.
#[test]
fn test_s1_two_room_rectangle() {
    let mut b = GridBuilder::new(9, 4, 1.0);
    b.insert_room("Living", rect_cells(0, 0, 4, 5));
    b.insert_room("Bedroom", rect_cells(0, 5, 4, 4));
    let grid = b.finish().unwrap();

    let params = OptimizerParams::deterministic(1);

    let living_specs = vec![
        spec("sofa", 2.0, 1.0, Priority::Essential),
        spec("coffee-table", 1.0, 1.0, Priority::NiceToHave),
        spec("tv-stand", 2.0, 1.0, Priority::Essential),
    ];
    let living_constraints = RoomConstraints {
        boundary: vec!["sofa".into(), "tv-stand".into()],
        facing: vec![("sofa".to_string(), "tv-stand".to_string())],
        ..Default::default()
    };

    let bedroom_specs = vec![
        spec("bed", 2.0, 2.0, Priority::Essential),
        spec("nightstand", 1.0, 1.0, Priority::NiceToHave),
        spec("wardrobe", 2.0, 1.0, Priority::Essential),
    ];
    let bedroom_constraints =
        RoomConstraints { boundary: vec!["bed".into(), "wardrobe".into()], ..Default::default() };

    let rooms = vec![
        room_problem(&grid, "Living", &living_specs, living_constraints, &params),
        room_problem(&grid, "Bedroom", &bedroom_specs, bedroom_constraints, &params),
    ];

    let abort = AtomicBool::new(false);
    let placed = optimize_layout(&grid, &rooms, &params, &abort).expect("feasible layout");
    assert_eq!(placed.len(), 6);

    assert!(validate::check_containment(&grid, &placed).is_empty());
    assert!(validate::check_no_overlap(&placed).is_empty());
    assert!(validate::check_boundary(&grid, &placed, &rooms).is_empty());
    assert!(validate::check_facing(&placed, &rooms).is_empty());
}

/// S2 — a single 5x5m room with a south-wall door; the bed must not occupy
/// the clearance cell directly north of the door opening.
#[test]
fn test_s2_door_clearance() {
    let mut b = GridBuilder::new(5, 5, 1.0);
    b.insert_room("Room", rect_cells(0, 0, 5, 5));
    b.insert_door(furnigen::grid::Opening {
        wall: furnigen::geom::Direction::South,
        room: "Room".into(),
        position_m: 2.0,
        width_m: 1.0,
    });
    let grid = b.finish().unwrap();

    let params = OptimizerParams::deterministic(2);
    let specs = vec![spec("bed", 3.0, 2.0, Priority::Essential)];
    let constraints = RoomConstraints { boundary: vec!["bed".into()], ..Default::default() };
    let rooms = vec![room_problem(&grid, "Room", &specs, constraints, &params)];

    let abort = AtomicBool::new(false);
    let placed = optimize_layout(&grid, &rooms, &params, &abort).expect("feasible layout");

    assert!(validate::check_door_clearance(&grid, &placed, params.door_clearance_cells).is_empty());

    let blocked = grid.door_clearance_cells("Room", params.door_clearance_cells);
    for item in &placed {
        for cell in item.cells() {
            assert!(!blocked.contains(&cell), "bed occupies door-clearance cell {:?}", cell);
        }
    }
}

/// S3 — a sofa/coffee-table distance preference: the solved along-axis
/// center-to-center distance should land within one cell of the target.
#[test]
fn test_s3_distance_preference() {
    let mut b = GridBuilder::new(5, 5, 1.0);
    b.insert_room("Room", rect_cells(0, 0, 5, 5));
    let grid = b.finish().unwrap();

    let params = OptimizerParams::deterministic(3);
    let specs = vec![spec("sofa", 2.0, 1.0, Priority::Essential), spec("coffee-table", 1.0, 1.0, Priority::NiceToHave)];
    let constraints = RoomConstraints {
        boundary: vec!["sofa".into()],
        distance: vec![DistancePair { item_a: "coffee-table".to_string(), item_b: "sofa".to_string(), along_m: 1.15, perp_m: 0.0 }],
        ..Default::default()
    };
    let rooms = vec![room_problem(&grid, "Room", &specs, constraints, &params)];

    let abort = AtomicBool::new(false);
    let placed = optimize_layout(&grid, &rooms, &params, &abort).expect("feasible layout");

    let sofa = placed.iter().find(|p| p.item == "sofa").unwrap();
    let table = placed.iter().find(|p| p.item == "coffee-table").unwrap();

    let sofa_center_i = sofa.top_left.y as f64 + sofa.size_i as f64 / 2.0;
    let table_center_i = table.top_left.y as f64 + table.size_i as f64 / 2.0;
    let along = (table_center_i - sofa_center_i).abs();

    assert!((along - 1.15).abs() <= 1.0, "along-distance {along} not within 1 cell of target 1.15");
}

/// S4 — three 2x2 items can't fit into a 3x3 room (area alone is infeasible).
#[test]
fn test_s4_infeasible_layout_returns_error() {
    let mut b = GridBuilder::new(3, 3, 1.0);
    b.insert_room("Room", rect_cells(0, 0, 3, 3));
    let grid = b.finish().unwrap();

    let params = OptimizerParams::deterministic(4);
    let specs =
        vec![spec("a", 2.0, 2.0, Priority::Essential), spec("b", 2.0, 2.0, Priority::Essential), spec("c", 2.0, 2.0, Priority::Essential)];
    let rooms = vec![room_problem(&grid, "Room", &specs, RoomConstraints::default(), &params)];

    let abort = AtomicBool::new(false);
    let result = optimize_layout(&grid, &rooms, &params, &abort);
    assert!(matches!(result, Err(FurnigenError::InfeasibleLayout { .. })));
}

/// S5 — an item with (sigma=1, mu=1) converts to rotation 0 degrees, and its
/// 3D footprint is `width = size_j * s`, `depth = size_i * s`.
#[test]
fn test_s5_rotation_correctness() {
    let mut b = GridBuilder::new(10, 10, 0.5);
    b.insert_room("Room", rect_cells(0, 0, 10, 10));
    let grid = b.finish().unwrap();
    let params = OptimizerParams::default();

    let placed = furnigen::placement::PlacedItem {
        room: "Room".into(),
        item: "wardrobe".into(),
        category: "storage".into(),
        top_left: Cell::new(2, 2),
        sigma: true,
        mu: true,
        size_i: 4,
        size_j: 2,
        height_m: 1.8,
    };

    let p3 = coords::convert_placement(&placed, &grid, &params);
    assert_eq!(p3.rotation_y_degrees, 0);
    assert_eq!(p3.size_m.width, 2.0 * 0.5);
    assert_eq!(p3.size_m.depth, 4.0 * 0.5);
}

/// S6 — an item pre-clamp position flush against a wall gets pushed inward
/// by exactly the wall margin.
#[test]
fn test_s6_wall_margin_clamp() {
    let mut b = GridBuilder::new(8, 8, 0.5);
    b.insert_room("Room", rect_cells(0, 0, 8, 8));
    let grid = b.finish().unwrap();
    let params = OptimizerParams { wall_margin_m: 0.25, ..OptimizerParams::default() };

    // 0.5x0.5m item (one cell) flush against the west wall.
    let placed = furnigen::placement::PlacedItem {
        room: "Room".into(),
        item: "stool".into(),
        category: "seating".into(),
        top_left: Cell::new(0, 3),
        sigma: false,
        mu: false,
        size_i: 1,
        size_j: 1,
        height_m: 0.4,
    };

    let p3 = coords::convert_placement(&placed, &grid, &params);
    // half_width (0.25) + margin (0.25) from the west edge (x=0).
    assert_eq!(p3.position.x, 0.5);
}
