//! Builds and solves one room's `good_lp` model.
//!
//! Ported constraint-for-constraint from the Gurobi formulation this crate
//! replaces: containment (by construction — see below), no-overlap, area,
//! the rectangular-shape bounding box, door clearance, boundary, alignment,
//! facing, and the soft distance terms.
//!
//! Containment (`spec.md` §4.D: "every cell outside room k has F = 0") is
//! enforced by construction rather than by an explicit equality per cell:
//! `F` variables are only ever created for cells inside the room (minus any
//! door-clearance cells), so there is nothing for an out-of-room `F` to be.

use std::collections::{BTreeSet, HashMap};
use std::sync::atomic::{AtomicBool, Ordering};

use good_lp::solvers::microlp::microlp;
use good_lp::{variable, Expression, ProblemVariables, Solution, SolverModel, Variable};
use log::{debug, warn};

use crate::config::OptimizerParams;
use crate::error::{FurnigenError, Result};
use crate::furniture::{CompiledConstraints, CompiledItem};
use crate::geom::Cell;
use crate::grid::Grid;
use crate::placement::PlacedItem;

fn v(x: Variable) -> Expression { x.into() }

/// `M * (1 - z)`, built without ever subtracting an `Expression` from a
/// bare constant (not all of `good_lp`'s operator overloads are symmetric).
fn big_m_not(z: Variable, big_m: f64) -> Expression { v(z) * -big_m + big_m }

struct ItemVars {
    /// `F[cell]`, defined only over this room's usable cells.
    f: HashMap<Cell, Variable>,
    i0: Variable,
    j0: Variable,
    sigma: Variable,
    mu: Variable,
    /// `width*sigma + length*(1-sigma)`, the row extent, precomputed once.
    size_i: Expression,
    /// `width*(1-sigma) + length*sigma`, the column extent.
    size_j: Expression,
}

/// Four binary indicators encoding `(sigma, mu)`'s case, via the standard
/// McCormick linearization of a product of two binaries.
fn orientation_case_vars(
    vars: &mut ProblemVariables,
    cons: &mut Vec<good_lp::constraint::Constraint>,
    sigma: Variable,
    mu: Variable,
) -> [Variable; 4] {
    let z: [Variable; 4] = std::array::from_fn(|_| vars.add(variable().binary()));
    cons.push((v(z[0]) + v(z[1]) + v(z[2]) + v(z[3])).eq(1.0));

    // z0 = sigma * mu (North)
    cons.push(v(z[0]).leq(v(sigma)));
    cons.push(v(z[0]).leq(v(mu)));
    cons.push(v(z[0]).geq(v(sigma) + v(mu) - 1.0));
    // z1 = sigma * (1 - mu) (South)
    cons.push(v(z[1]).leq(v(sigma)));
    cons.push((v(z[1]) + v(mu)).leq(1.0));
    cons.push(v(z[1]).geq(v(sigma) - v(mu)));
    // z2 = (1 - sigma) * mu (West)
    cons.push(v(z[2]).leq(v(mu)));
    cons.push((v(z[2]) + v(sigma)).leq(1.0));
    cons.push(v(z[2]).geq(v(mu) - v(sigma)));
    // z3 = (1 - sigma) * (1 - mu) (East)
    cons.push((v(z[3]) + v(sigma)).leq(1.0));
    cons.push((v(z[3]) + v(mu)).leq(1.0));
    cons.push((v(z[3]) + v(sigma) + v(mu)).geq(1.0));

    z
}

/// The constraint-category labels reported on infeasibility (`spec.md` §4.D
/// step 3): a best-effort substitute for true IIS extraction (see
/// `DESIGN.md`, Open Question 3).
fn active_categories(constraints: &CompiledConstraints) -> Vec<String> {
    let mut cats = vec![
        "containment".to_string(),
        "no-overlap".to_string(),
        "area".to_string(),
        "door-clearance".to_string(),
    ];
    if !constraints.boundary.is_empty() { cats.push("boundary".to_string()); }
    if !constraints.alignment.is_empty() { cats.push("alignment".to_string()); }
    if !constraints.facing.is_empty() { cats.push("facing".to_string()); }
    if !constraints.distance.is_empty() { cats.push("distance".to_string()); }
    cats
}

/// Solve one room's furniture placement. `room_cells` is the room's full
/// cell set (used for the balance-objective center and boundary checks);
/// usable placement cells exclude door-clearance cells.
pub fn solve_room(
    grid: &Grid,
    room_name: &str,
    room_cells: &BTreeSet<Cell>,
    items: &[CompiledItem],
    constraints: &CompiledConstraints,
    params: &OptimizerParams,
    abort: &AtomicBool,
) -> Result<Vec<PlacedItem>> {
    let blocked = grid.door_clearance_cells(room_name, params.door_clearance_cells);
    let usable: Vec<Cell> = room_cells.iter().copied().filter(|c| !blocked.contains(c)).collect();
    if !blocked.is_empty() {
        debug!("optimizer: room '{}' excludes {} door-clearance cell(s)", room_name, blocked.len());
    }

    let min_i = room_cells.iter().map(|c| c.y).min().unwrap_or(0);
    let max_i = room_cells.iter().map(|c| c.y).max().unwrap_or(0);
    let min_j = room_cells.iter().map(|c| c.x).min().unwrap_or(0);
    let max_j = room_cells.iter().map(|c| c.x).max().unwrap_or(0);
    let big_m = (grid.width() * grid.height()) as f64;

    let mut vars = ProblemVariables::new();
    let mut item_vars: Vec<ItemVars> = Vec::with_capacity(items.len());
    for item in items {
        let mut f = HashMap::with_capacity(usable.len());
        for &cell in &usable {
            f.insert(cell, vars.add(variable().binary()));
        }
        let i0 = vars.add(variable().integer().min(min_i as f64).max(max_i as f64));
        let j0 = vars.add(variable().integer().min(min_j as f64).max(max_j as f64));
        let sigma = vars.add(variable().binary());
        let mu = vars.add(variable().binary());

        let (length, width) = (item.length_cells as f64, item.width_cells as f64);
        let size_i = v(sigma) * (width - length) + length;
        let size_j = v(sigma) * (length - width) + width;

        item_vars.push(ItemVars { f, i0, j0, sigma, mu, size_i, size_j });
    }

    let mut cons: Vec<good_lp::constraint::Constraint> = Vec::new();

    // Area + rectangular shape via bounding box, per item.
    for (idx, item) in items.iter().enumerate() {
        let iv = &item_vars[idx];

        let area: Expression = usable.iter().map(|c| v(iv.f[c])).fold(Expression::from(0.0), |a, b| a + b);
        cons.push(area.eq(item.area_cells() as f64));

        for &cell in &usable {
            let fij = iv.f[&cell];
            let (i, j) = (cell.y as f64, cell.x as f64);

            cons.push(v(iv.i0).leq(big_m_not(fij, big_m) + i));
            cons.push((v(iv.i0) + iv.size_i.clone() - 1.0).geq(v(fij) * i));
            cons.push(v(iv.j0).leq(big_m_not(fij, big_m) + j));
            cons.push((v(iv.j0) + iv.size_j.clone() - 1.0).geq(v(fij) * j));
        }
    }

    // Cross-item no-overlap: at most one item per usable cell.
    for &cell in &usable {
        let total: Expression = item_vars.iter().map(|iv| v(iv.f[&cell])).fold(Expression::from(0.0), |a, b| a + b);
        cons.push(total.leq(1.0));
    }

    // Boundary: item must have one full long-axis edge against a non-room cell.
    for name in &constraints.boundary {
        let idx = items.iter().position(|it| &it.name == name).expect("validated by compile_room");
        let iv = &item_vars[idx];
        let length = items[idx].length_cells as f64;

        let mut fb_sum = Expression::from(0.0);
        for &cell in &usable {
            let fb = vars.add(variable().binary());
            let wall_n = !room_cells.contains(&Cell::new(cell.x, cell.y - 1)) as u8 as f64;
            let wall_s = !room_cells.contains(&Cell::new(cell.x, cell.y + 1)) as u8 as f64;
            let wall_w = !room_cells.contains(&Cell::new(cell.x - 1, cell.y)) as u8 as f64;
            let wall_e = !room_cells.contains(&Cell::new(cell.x + 1, cell.y)) as u8 as f64;
            let we_sum = wall_w + wall_e;
            let ns_sum = wall_n + wall_s;

            let neighbors = v(iv.sigma) * (ns_sum - we_sum) + we_sum;
            cons.push(neighbors.geq(v(fb)));
            cons.push(v(fb).leq(v(iv.f[&cell])));
            fb_sum = fb_sum + v(fb);
        }
        cons.push(fb_sum.eq(length));
    }

    // Alignment: same rotation axis.
    for (a, b) in &constraints.alignment {
        let ia = items.iter().position(|it| &it.name == a).expect("validated by compile_room");
        let ib = items.iter().position(|it| &it.name == b).expect("validated by compile_room");
        cons.push(v(item_vars[ia].sigma).eq(v(item_vars[ib].sigma)));
    }

    // Facing: `a` faces toward `b`. The 4-case indicator picks `a`'s own
    // orientation (`spec.md` §4.D: "create 4 indicator vars z[0..3] ... that
    // pick a's orientation case"); which case is active then forces `b` to
    // lie on the side of `a` that `a`'s front points toward.
    for (a, b) in &constraints.facing {
        let ia = items.iter().position(|it| &it.name == a).expect("validated by compile_room");
        let ib = items.iter().position(|it| &it.name == b).expect("validated by compile_room");
        let (sigma_a, mu_a) = (item_vars[ia].sigma, item_vars[ia].mu);
        let z = orientation_case_vars(&mut vars, &mut cons, sigma_a, mu_a);
        let (i0_a, j0_a) = (item_vars[ia].i0, item_vars[ia].j0);
        let (i0_b, j0_b) = (item_vars[ib].i0, item_vars[ib].j0);

        cons.push((v(i0_a) - 1.0).geq(v(i0_b) - big_m_not(z[0], big_m)));
        cons.push((v(i0_a) + 1.0).leq(v(i0_b) + big_m_not(z[1], big_m)));
        cons.push((v(j0_a) - 1.0).geq(v(j0_b) - big_m_not(z[2], big_m)));
        cons.push((v(j0_a) + 1.0).leq(v(j0_b) + big_m_not(z[3], big_m)));
    }

    // Distance: soft center-to-center target, linearized across l2's 4 cases.
    let mut distance_terms: Vec<Variable> = Vec::new();
    for d in &constraints.distance {
        let l1 = items.iter().position(|it| it.name == d.item_a).expect("validated by compile_room");
        let l2 = items.iter().position(|it| it.name == d.item_b).expect("validated by compile_room");
        let (sigma2, mu2) = (item_vars[l2].sigma, item_vars[l2].mu);
        let z = orientation_case_vars(&mut vars, &mut cons, sigma2, mu2);

        let de1 = vars.add(variable().min(0.0));
        let de2 = vars.add(variable().min(0.0));

        let (ps2, vs2) = (items[l2].width_cells as f64, items[l2].length_cells as f64);
        // (half_i, half_j) per case: North/South share one pair, West/East the other.
        let halves = [
            (ps2 / 2.0, vs2 / 2.0),
            (ps2 / 2.0, vs2 / 2.0),
            (vs2 / 2.0, ps2 / 2.0),
            (vs2 / 2.0, ps2 / 2.0),
        ];

        let ci1 = v(item_vars[l1].i0) + item_vars[l1].size_i.clone() * 0.5;
        let cj1 = v(item_vars[l1].j0) + item_vars[l1].size_j.clone() * 0.5;

        for (case_idx, &(half_i, half_j)) in halves.iter().enumerate() {
            let ci2 = v(item_vars[l2].i0) + half_i;
            let cj2 = v(item_vars[l2].j0) + half_j;
            let diff_i = ci2.clone() - ci1.clone();
            let diff_j = cj2 - cj1.clone();

            cons.push(v(de1).geq(diff_i.clone() - d.along_cells - big_m_not(z[case_idx], big_m)));
            cons.push(v(de1).geq(diff_i * -1.0 + d.along_cells - big_m_not(z[case_idx], big_m)));
            cons.push(v(de2).geq(diff_j.clone() - d.perp_cells - big_m_not(z[case_idx], big_m)));
            cons.push(v(de2).geq(diff_j * -1.0 + d.perp_cells - big_m_not(z[case_idx], big_m)));
        }

        distance_terms.push(de1);
        distance_terms.push(de2);
    }

    // Balance objective: area-weighted furniture center close to room center.
    let center_i = room_cells.iter().map(|c| c.y as f64).sum::<f64>() / room_cells.len() as f64;
    let center_j = room_cells.iter().map(|c| c.x as f64).sum::<f64>() / room_cells.len() as f64;
    let total_area: f64 = items.iter().map(|it| it.area_cells() as f64).sum();

    let mut objective = Expression::from(0.0);
    if total_area > 0.0 {
        let mut furn_ci = Expression::from(0.0);
        let mut furn_cj = Expression::from(0.0);
        for (idx, item) in items.iter().enumerate() {
            let area = item.area_cells() as f64;
            let iv = &item_vars[idx];
            furn_ci = furn_ci + (v(iv.i0) + iv.size_i.clone() * 0.5) * area;
            furn_cj = furn_cj + (v(iv.j0) + iv.size_j.clone() * 0.5) * area;
        }
        furn_ci = furn_ci * (1.0 / total_area);
        furn_cj = furn_cj * (1.0 / total_area);

        let err_i = vars.add(variable().min(0.0));
        let err_j = vars.add(variable().min(0.0));
        cons.push(v(err_i).geq(furn_ci.clone() - center_i));
        cons.push(v(err_i).geq(furn_ci * -1.0 + center_i));
        cons.push(v(err_j).geq(furn_cj.clone() - center_j));
        cons.push(v(err_j).geq(furn_cj * -1.0 + center_j));

        objective = objective + (v(err_i) + v(err_j)) * params.w_bal;
    }
    for &slack in &distance_terms {
        objective = objective + v(slack) * params.w_dist;
    }

    if abort.load(Ordering::Relaxed) {
        return Err(FurnigenError::SolverTimeout);
    }

    // Stage 1: feasibility probe with a zero objective.
    let mut feasibility = vars.clone().minimise(Expression::from(0.0)).using(microlp);
    for c in cons.iter().cloned() {
        feasibility = feasibility.with(c);
    }
    if feasibility.solve().is_err() {
        warn!("optimizer: room '{}' infeasible at the feasibility stage", room_name);
        return Err(FurnigenError::InfeasibleLayout { tried_categories: active_categories(constraints) });
    }

    if abort.load(Ordering::Relaxed) {
        return Err(FurnigenError::SolverTimeout);
    }

    // Stage 2: re-solve with the real objective.
    let mut model = vars.minimise(objective).using(microlp);
    for c in cons {
        model = model.with(c);
    }
    let solution = model
        .solve()
        .map_err(|_| FurnigenError::InfeasibleLayout { tried_categories: active_categories(constraints) })?;

    let mut placed = Vec::with_capacity(items.len());
    for (idx, item) in items.iter().enumerate() {
        let iv = &item_vars[idx];
        let i0 = solution.value(iv.i0).round() as i32;
        let j0 = solution.value(iv.j0).round() as i32;
        let sigma = solution.value(iv.sigma) > 0.5;
        let (size_i, size_j) = if sigma {
            (item.width_cells, item.length_cells)
        } else {
            (item.length_cells, item.width_cells)
        };

        placed.push(PlacedItem {
            room: room_name.to_string(),
            item: item.name.clone(),
            category: item.category.clone(),
            top_left: Cell::new(j0, i0),
            sigma,
            mu: solution.value(iv.mu) > 0.5,
            size_i,
            size_j,
            height_m: item.height_m,
        });
    }

    Ok(placed)
}
