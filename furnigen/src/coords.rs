//! Grid-to-3D coordinate conversion (`spec.md` §4.E).
//!
//! Grid system: origin north-west, `i` rows southward, `j` columns eastward,
//! units of cells. Scene system: origin south-west at floor level, `x` east,
//! `z` north, `y` up, units of metres.

use crate::config::OptimizerParams;
use crate::grid::Grid;
use crate::placement::{Placement3D, PlacedItem, Point3, Size3};

/// `(sigma, mu) -> rotation_y_degrees`, per `spec.md` §4.E.
fn rotation_degrees(sigma: bool, mu: bool) -> u16 {
    match (sigma, mu) {
        (false, false) => 90,  // East
        (false, true) => 270,  // West
        (true, false) => 180,  // South
        (true, true) => 0,     // North
    }
}

/// Push a center inward so the item's footprint stays `margin` metres clear
/// of the room's bounding box on each axis; centers the item on an axis
/// instead of erroring if the room is narrower than the footprint plus twice
/// the margin (`spec.md` §4.E, §9 Open Question: "degrade rather than fail").
fn clamp_to_room_interior(
    x: f64,
    z: f64,
    half_w: f64,
    half_d: f64,
    room_x: (f64, f64),
    room_z: (f64, f64),
    margin: f64,
) -> (f64, f64) {
    if margin <= 0.0 {
        return (x, z);
    }
    let (x_min, x_max) = room_x;
    let (z_min, z_max) = room_z;

    let x_lo = x_min + half_w + margin;
    let x_hi = x_max - half_w - margin;
    let new_x = if x_lo > x_hi { (x_min + x_max) / 2.0 } else { x.clamp(x_lo, x_hi) };

    let z_lo = z_min + half_d + margin;
    let z_hi = z_max - half_d - margin;
    let new_z = if z_lo > z_hi { (z_min + z_max) / 2.0 } else { z.clamp(z_lo, z_hi) };

    (new_x, new_z)
}

/// Convert one grid placement to 3D scene coordinates.
pub fn convert_placement(placement: &PlacedItem, grid: &Grid, params: &OptimizerParams) -> Placement3D {
    let cell = grid.cell_size();
    let grid_h = grid.height() as f64;

    let center_i = placement.top_left.y as f64 + placement.size_i as f64 / 2.0;
    let center_j = placement.top_left.x as f64 + placement.size_j as f64 / 2.0;
    let center_i_m = center_i * cell;
    let center_j_m = center_j * cell;

    let mut x = center_j_m;
    let mut z = grid_h * cell - center_i_m;
    let y = 0.0;

    let width_m = placement.size_j as f64 * cell;
    let depth_m = placement.size_i as f64 * cell;

    if let Some(bbox) = grid.room_bbox_m(&placement.room) {
        let room_x = (bbox.min_x(), bbox.max_x());
        let room_z = (grid_h * cell - bbox.max_y(), grid_h * cell - bbox.min_y());
        let (cx, cz) = clamp_to_room_interior(x, z, width_m / 2.0, depth_m / 2.0, room_x, room_z, params.wall_margin_m);
        x = cx;
        z = cz;
    }

    Placement3D {
        item_name: placement.item.clone(),
        room_name: placement.room.clone(),
        category: placement.category.clone(),
        position: Point3 { x, y, z },
        rotation_y_degrees: rotation_degrees(placement.sigma, placement.mu),
        size_m: Size3 { width: width_m, depth: depth_m, height: placement.height_m },
    }
}

/// Convert every placement, preserving input order.
pub fn convert_all(placements: &[PlacedItem], grid: &Grid, params: &OptimizerParams) -> Vec<Placement3D> {
    placements.iter().map(|p| convert_placement(p, grid, params)).collect()
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::geom::Cell;
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

    fn placed(top_left: Cell, size_i: u32, size_j: u32, sigma: bool, mu: bool) -> PlacedItem {
        PlacedItem {
            room: "room".into(),
            item: "sofa".into(),
            category: "seating".into(),
            top_left,
            sigma,
            mu,
            size_i,
            size_j,
            height_m: 0.8,
        }
    }

    #[test]
    fn test_rotation_table() {
        assert_eq!(rotation_degrees(false, false), 90);
        assert_eq!(rotation_degrees(false, true), 270);
        assert_eq!(rotation_degrees(true, false), 180);
        assert_eq!(rotation_degrees(true, true), 0);
    }

    #[test]
    fn test_grid_to_3d_north_south_flip() {
        let mut b = GridBuilder::new(10, 10, 0.5);
        b.insert_room("room", rect_cells(0, 0, 10, 10));
        let grid = b.finish().unwrap();
        let params = OptimizerParams { wall_margin_m: 0.0, ..OptimizerParams::default() };

        let item = placed(Cell::new(0, 0), 2, 2, false, false);
        let p3 = convert_placement(&item, &grid, &params);
        // top-left at grid origin => highest z (closest to the north wall).
        assert_eq!(p3.position.x, 0.5);
        assert_eq!(p3.position.z, 10.0 * 0.5 - 0.5);
        assert_eq!(p3.position.y, 0.0);
    }

    #[test]
    fn test_wall_margin_clamps_center_inward() {
        let mut b = GridBuilder::new(10, 10, 0.5);
        b.insert_room("room", rect_cells(0, 0, 10, 10));
        let grid = b.finish().unwrap();
        let params = OptimizerParams { wall_margin_m: 0.25, ..OptimizerParams::default() };

        // Placed flush against the west wall; x should be pushed inward.
        let item = placed(Cell::new(0, 4), 2, 2, false, false);
        let p3 = convert_placement(&item, &grid, &params);
        assert!(p3.position.x > 0.5);
    }

    #[test]
    fn test_narrow_room_centers_instead_of_clamping() {
        let mut b = GridBuilder::new(10, 1, 0.5);
        b.insert_room("room", rect_cells(0, 0, 1, 10));
        let grid = b.finish().unwrap();
        let params = OptimizerParams { wall_margin_m: 1.0, ..OptimizerParams::default() };

        let item = placed(Cell::new(0, 0), 1, 2, false, false);
        let p3 = convert_placement(&item, &grid, &params);
        // Room is only 0.5m tall (1 cell); with a 1m margin on each side the
        // z-axis can't satisfy the clamp, so z centers on the room instead.
        assert_eq!(p3.position.z, 0.25);
    }
}
