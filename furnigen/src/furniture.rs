//! Metric furniture specs and constraints, and the compiler that converts
//! them to grid-cell units (`spec.md` §3, §4.C).

use std::collections::HashMap;

use log::warn;
use serde::{Deserialize, Serialize};

use crate::config::OptimizerParams;
use crate::geom::metres_to_cells;

/// How essential an item is to the room, used to decide which items survive
/// the per-room cap (`spec.md` §4.C).
#[derive(Copy, Clone, Debug, Eq, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Priority {
    Essential,
    NiceToHave,
}

/// A furniture item's metric footprint, as provided by the upstream spec
/// generator (`spec.md` §3, §6).
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct FurnitureSpec {
    pub name: String,
    pub category: String,
    pub length_m: f64,
    pub width_m: f64,
    pub height_m: f64,
    #[serde(default)]
    pub search_hint: Option<String>,
    pub priority: Priority,
}

/// A center-to-center distance preference between two named items.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct DistancePair {
    pub item_a: String,
    pub item_b: String,
    /// Target distance along item_a's facing axis, metres (signed).
    pub along_m: f64,
    /// Target distance perpendicular to item_a's facing axis, metres (signed).
    pub perp_m: f64,
}

/// Accepts either a JSON array of strings or a single comma-separated
/// string, per `spec.md` §9's "Dynamic JSON from upstream agents" note: LLM
/// spec/constraint providers sometimes hand back a list as `"a, b, c"`
/// instead of `["a", "b", "c"]`.
fn flexible_string_list<'de, D>(deserializer: D) -> std::result::Result<Vec<String>, D::Error>
where
    D: serde::Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Flexible {
        List(Vec<String>),
        Csv(String),
    }
    Ok(match Flexible::deserialize(deserializer)? {
        Flexible::List(v) => v,
        Flexible::Csv(s) => s.split(',').map(|s| s.trim().to_string()).filter(|s| !s.is_empty()).collect(),
    })
}

/// The four independent constraint families of `spec.md` §3.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct RoomConstraints {
    /// Item names that must be wall-adjacent.
    #[serde(default, deserialize_with = "flexible_string_list")]
    pub boundary: Vec<String>,
    #[serde(default)]
    pub distance: Vec<DistancePair>,
    /// Item-name pairs that must share a rotation axis.
    #[serde(default)]
    pub alignment: Vec<(String, String)>,
    /// `(facer, target)` pairs: facer's front must point toward target.
    #[serde(default)]
    pub facing: Vec<(String, String)>,
}

/// A furniture item compiled to cell units, preserving `length_cells >=
/// width_cells`.
#[derive(Clone, Debug, PartialEq)]
pub struct CompiledItem {
    pub name: String,
    pub category: String,
    pub length_cells: u32,
    pub width_cells: u32,
    pub height_m: f64,
    pub priority: Priority,
}

impl CompiledItem {
    pub fn area_cells(&self) -> u32 { self.length_cells * self.width_cells }
}

/// `RoomConstraints` compiled to cell units: distances are scaled by `1/s`
/// but kept as floats (`spec.md` §4.C).
#[derive(Clone, Debug, Default)]
pub struct CompiledConstraints {
    pub boundary: Vec<String>,
    pub distance: Vec<CompiledDistance>,
    pub alignment: Vec<(String, String)>,
    pub facing: Vec<(String, String)>,
}

#[derive(Clone, Debug)]
pub struct CompiledDistance {
    pub item_a: String,
    pub item_b: String,
    pub along_cells: f64,
    pub perp_cells: f64,
}

/// Per-room item cap, by a coarse room-type classification (`spec.md` §4.C).
fn item_cap(room_type_hint: &str) -> usize {
    let lower = room_type_hint.to_lowercase();
    if lower.contains("living") || lower.contains("lounge") {
        6
    } else if lower.contains("bedroom") || lower.contains("bed") {
        5
    } else if lower.contains("kitchen") {
        4
    } else if lower.contains("hall") {
        3
    } else if lower.contains("study") {
        5
    } else {
        5
    }
}

/// Compile one room's furniture specs and constraints into cell units.
///
/// `room_name` is used as the room-type hint for the item-count cap table
/// (`spec.md` §4.C: "cap derived from the room type"). Constraints that
/// reference a name absent from `specs` are dropped and logged, per
/// `spec.md` §7's `ConstraintReferencesMissingItem`.
pub fn compile_room(
    room_name: &str,
    specs: &[FurnitureSpec],
    constraints: &RoomConstraints,
    params: &OptimizerParams,
) -> (Vec<CompiledItem>, CompiledConstraints) {
    let items = compile_items(specs, room_name, params);
    let known: std::collections::HashSet<&str> = items.iter().map(|i| i.name.as_str()).collect();

    let mut compiled = CompiledConstraints::default();

    for name in &constraints.boundary {
        if known.contains(name.as_str()) {
            compiled.boundary.push(name.clone());
        } else {
            warn!(
                "room '{}': dropping boundary constraint for unknown item '{}'",
                room_name, name
            );
        }
    }

    for d in &constraints.distance {
        if known.contains(d.item_a.as_str()) && known.contains(d.item_b.as_str()) {
            compiled.distance.push(CompiledDistance {
                item_a: d.item_a.clone(),
                item_b: d.item_b.clone(),
                along_cells: d.along_m / params.cell_size_m,
                perp_cells: d.perp_m / params.cell_size_m,
            });
        } else {
            warn!(
                "room '{}': dropping distance constraint ({}, {}) referencing unknown item",
                room_name, d.item_a, d.item_b
            );
        }
    }

    for (a, b) in &constraints.alignment {
        if known.contains(a.as_str()) && known.contains(b.as_str()) {
            compiled.alignment.push((a.clone(), b.clone()));
        } else {
            warn!(
                "room '{}': dropping alignment constraint ({}, {}) referencing unknown item",
                room_name, a, b
            );
        }
    }

    for (a, b) in &constraints.facing {
        if known.contains(a.as_str()) && known.contains(b.as_str()) {
            compiled.facing.push((a.clone(), b.clone()));
        } else {
            warn!(
                "room '{}': dropping facing constraint ({}, {}) referencing unknown item",
                room_name, a, b
            );
        }
    }

    (items, compiled)
}

fn compile_items(specs: &[FurnitureSpec], room_name: &str, params: &OptimizerParams) -> Vec<CompiledItem> {
    let mut compiled: Vec<CompiledItem> = specs
        .iter()
        .map(|spec| {
            let mut length_cells = metres_to_cells(spec.length_m, params.cell_size_m);
            let mut width_cells = metres_to_cells(spec.width_m, params.cell_size_m);
            if width_cells > length_cells {
                std::mem::swap(&mut length_cells, &mut width_cells);
            }
            CompiledItem {
                name: spec.name.clone(),
                category: spec.category.clone(),
                length_cells,
                width_cells,
                height_m: spec.height_m,
                priority: spec.priority,
            }
        })
        .collect();

    let cap = item_cap(room_name);
    if compiled.len() <= cap {
        return compiled;
    }

    // Keep essentials before nice-to-haves; preserve insertion order within
    // each tier (`spec.md` §4.C).
    let mut essentials: Vec<CompiledItem> = Vec::new();
    let mut nice_to_have: Vec<CompiledItem> = Vec::new();
    for item in compiled.drain(..) {
        match item.priority {
            Priority::Essential => essentials.push(item),
            Priority::NiceToHave => nice_to_have.push(item),
        }
    }

    let mut kept: Vec<CompiledItem> = Vec::with_capacity(cap);
    kept.extend(essentials.into_iter().take(cap));
    let remaining = cap.saturating_sub(kept.len());
    let dropped_count = nice_to_have.len().saturating_sub(remaining);
    kept.extend(nice_to_have.into_iter().take(remaining));

    if dropped_count > 0 {
        warn!(
            "room '{}': dropping {} nice-to-have item(s) beyond the cap of {}",
            room_name, dropped_count, cap
        );
    }

    kept
}

/// A room → furniture specs mapping, as received from the upstream spec
/// provider (`spec.md` §6).
pub type SpecsByRoom = HashMap<String, Vec<FurnitureSpec>>;
/// A room → constraint-set mapping.
pub type ConstraintsByRoom = HashMap<String, RoomConstraints>;

#[cfg(test)]
mod test {
    use super::*;

    fn spec(name: &str, length_m: f64, width_m: f64, priority: Priority) -> FurnitureSpec {
        FurnitureSpec {
            name: name.into(),
            category: "misc".into(),
            length_m,
            width_m,
            height_m: 0.8,
            search_hint: None,
            priority,
        }
    }

    #[test]
    fn test_compile_swaps_to_keep_length_ge_width() {
        let params = OptimizerParams::default();
        let specs = vec![spec("weird", 0.4, 1.1, Priority::Essential)];
        let (items, _) = compile_room("room", &specs, &RoomConstraints::default(), &params);
        assert!(items[0].length_cells >= items[0].width_cells);
    }

    #[test]
    fn test_dropped_constraint_reference_is_removed() {
        let params = OptimizerParams::default();
        let specs = vec![spec("sofa", 2.0, 1.0, Priority::Essential)];
        let constraints = RoomConstraints {
            boundary: vec!["sofa".into(), "ghost".into()],
            ..Default::default()
        };
        let (_, compiled) = compile_room("living", &specs, &constraints, &params);
        assert_eq!(compiled.boundary, vec!["sofa".to_string()]);
    }

    #[test]
    fn test_item_cap_prefers_essentials() {
        let params = OptimizerParams::default();
        let mut specs = Vec::new();
        for i in 0..4 {
            specs.push(spec(&format!("nice{}", i), 1.0, 1.0, Priority::NiceToHave));
        }
        specs.push(spec("hall-essential", 1.0, 1.0, Priority::Essential));
        // "hall" room type caps at 3.
        let (items, _) = compile_room("hall", &specs, &RoomConstraints::default(), &params);
        assert_eq!(items.len(), 3);
        assert!(items.iter().any(|i| i.name == "hall-essential"));
    }
}
