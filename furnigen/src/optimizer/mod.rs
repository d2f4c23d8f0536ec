//! MIP-based furniture placement optimizer (`spec.md` §4.D).
//!
//! `spec.md` describes one joint MIP spanning every room. No constraint or
//! objective term actually couples two different rooms — no-overlap is
//! vacuous across rooms since `Grid` already guarantees disjoint room cell
//! sets, and every other family is declared "for room k" — so the joint
//! model is block-separable and solving it one room at a time gives the
//! identical optimum at a fraction of the variable count per solve (see
//! `SPEC_FULL.md` Open Question 4).

mod model;

use std::sync::atomic::{AtomicBool, Ordering};
use std::time::{Duration, Instant};

use log::{info, warn};

use crate::config::OptimizerParams;
use crate::error::{FurnigenError, Result};
use crate::furniture::{CompiledConstraints, CompiledItem};
use crate::grid::Grid;
use crate::placement::PlacedItem;

/// One room's compiled furniture problem, ready for the optimizer.
#[derive(Clone, Debug)]
pub struct RoomProblem {
    pub room: String,
    pub items: Vec<CompiledItem>,
    pub constraints: CompiledConstraints,
}

/// Solve every room's furniture layout and return the combined placement
/// list, or an error if any room could not be placed.
///
/// `abort` is polled between rooms and between a room's two solve stages;
/// `good_lp`'s solve path exposes no per-node callback, so this is the
/// coarsest granularity available without forking the solver — worst-case
/// post-cancellation work is bounded to one room's single solve call.
pub fn optimize_layout(
    grid: &Grid,
    rooms: &[RoomProblem],
    params: &OptimizerParams,
    abort: &AtomicBool,
) -> Result<Vec<PlacedItem>> {
    let deadline = Instant::now() + Duration::from_secs_f64(params.time_limit_s.max(0.0));
    let mut placed = Vec::new();
    let mut infeasible_categories: Vec<String> = Vec::new();

    for room in rooms {
        if room.items.is_empty() {
            continue;
        }
        if abort.load(Ordering::Relaxed) || Instant::now() >= deadline {
            warn!("optimizer: stopping before room '{}' (time limit or cancellation)", room.room);
            return Err(FurnigenError::SolverTimeout);
        }
        let Some(room_cells) = grid.room_cells(&room.room) else {
            warn!("optimizer: room '{}' has no grid cells, skipping", room.room);
            continue;
        };

        info!("optimizer: solving room '{}' ({} items)", room.room, room.items.len());
        match model::solve_room(grid, &room.room, room_cells, &room.items, &room.constraints, params, abort) {
            Ok(items) => placed.extend(items),
            Err(FurnigenError::InfeasibleLayout { tried_categories }) => {
                if room.constraints.distance.is_empty() {
                    infeasible_categories.extend(tried_categories);
                    continue;
                }
                warn!(
                    "optimizer: room '{}' infeasible, retrying with distance constraints dropped",
                    room.room
                );
                let mut retry_constraints = room.constraints.clone();
                retry_constraints.distance.clear();
                match model::solve_room(grid, &room.room, room_cells, &room.items, &retry_constraints, params, abort)
                {
                    Ok(items) => placed.extend(items),
                    Err(FurnigenError::InfeasibleLayout { tried_categories: retried }) => {
                        infeasible_categories.extend(retried);
                    }
                    Err(other) => return Err(other),
                }
            }
            Err(other) => return Err(other),
        }
    }

    if !infeasible_categories.is_empty() {
        infeasible_categories.sort();
        infeasible_categories.dedup();
        return Err(FurnigenError::InfeasibleLayout { tried_categories: infeasible_categories });
    }

    Ok(placed)
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::furniture::{CompiledItem, Priority};
    use crate::geom::Cell;
    use crate::grid::GridBuilder;
    use std::sync::atomic::AtomicBool;

    fn rect_cells(i0: i32, j0: i32, h: i32, w: i32) -> Vec<Cell> {
        let mut v = Vec::new();
        for i in i0..i0 + h {
            for j in j0..j0 + w {
                v.push(Cell::new(j, i));
            }
        }
        v
    }

    fn item(name: &str, length: u32, width: u32) -> CompiledItem {
        CompiledItem {
            name: name.into(),
            category: "misc".into(),
            length_cells: length,
            width_cells: width,
            height_m: 0.5,
            priority: Priority::Essential,
        }
    }

    #[test]
    fn test_single_item_fits_in_room() {
        let mut b = GridBuilder::new(6, 6, 0.5);
        b.insert_room("room", rect_cells(0, 0, 6, 6));
        let grid = b.finish().unwrap();

        let rooms = vec![RoomProblem {
            room: "room".into(),
            items: vec![item("sofa", 3, 2)],
            constraints: CompiledConstraints::default(),
        }];

        let params = OptimizerParams::deterministic(1);
        let abort = AtomicBool::new(false);
        let result = optimize_layout(&grid, &rooms, &params, &abort).expect("feasible layout");
        assert_eq!(result.len(), 1);
        assert_eq!(result[0].area_cells(), 6);
    }

    #[test]
    fn test_item_too_big_for_room_is_infeasible() {
        let mut b = GridBuilder::new(2, 2, 0.5);
        b.insert_room("room", rect_cells(0, 0, 2, 2));
        let grid = b.finish().unwrap();

        let rooms = vec![RoomProblem {
            room: "room".into(),
            items: vec![item("wardrobe", 5, 5)],
            constraints: CompiledConstraints::default(),
        }];

        let params = OptimizerParams::deterministic(1);
        let abort = AtomicBool::new(false);
        assert!(optimize_layout(&grid, &rooms, &params, &abort).is_err());
    }

    #[test]
    fn test_empty_room_items_skipped_without_solving() {
        let mut b = GridBuilder::new(4, 4, 0.5);
        b.insert_room("room", rect_cells(0, 0, 4, 4));
        let grid = b.finish().unwrap();

        let rooms = vec![RoomProblem { room: "room".into(), items: vec![], constraints: CompiledConstraints::default() }];
        let params = OptimizerParams::deterministic(1);
        let abort = AtomicBool::new(false);
        assert_eq!(optimize_layout(&grid, &rooms, &params, &abort).unwrap(), Vec::new());
    }
}
