//! Scene assembly: joins placement records with externally supplied catalog
//! metadata (`spec.md` §4.F).

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::placement::Placement3D;

/// Catalog/metadata for one item, as returned by the external catalog
/// lookup (`spec.md` §6: "Catalog/metadata provider").
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct ItemMetadata {
    #[serde(default)]
    pub catalog_id: Option<String>,
    #[serde(default)]
    pub image_url: Option<String>,
    #[serde(default)]
    pub mesh_url: Option<String>,
    #[serde(default)]
    pub price: Option<f64>,
    #[serde(default)]
    pub currency: Option<String>,
}

/// One `(room_name, item_name)`-keyed catalog entry — the flat wire form a
/// metadata provider hands back. `furnigen-cli` indexes a list of these into
/// the lookup [`assemble`] needs via [`index_catalog`].
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct CatalogEntry {
    pub room_name: String,
    pub item_name: String,
    #[serde(flatten)]
    pub metadata: ItemMetadata,
}

/// Build the `(room_name, item_name) -> ItemMetadata` lookup from a flat
/// list of catalog entries. Later entries for the same key overwrite earlier
/// ones.
pub fn index_catalog(entries: Vec<CatalogEntry>) -> HashMap<(String, String), ItemMetadata> {
    entries.into_iter().map(|e| ((e.room_name, e.item_name), e.metadata)).collect()
}

/// One item's final payload: geometry plus whatever catalog metadata matched
/// its `(room_name, item_name)` key. Items with no match keep geometry only
/// (`spec.md` §4.F).
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct AssembledItem {
    #[serde(flatten)]
    pub placement: Placement3D,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub metadata: Option<ItemMetadata>,
}

/// Join placements with catalog metadata, preserving placement order
/// (`spec.md` §4.F: "a flat, ordered array").
pub fn assemble(
    placements: Vec<Placement3D>,
    catalog: &HashMap<(String, String), ItemMetadata>,
) -> Vec<AssembledItem> {
    placements
        .into_iter()
        .map(|p| {
            let key = (p.room_name.clone(), p.item_name.clone());
            let metadata = catalog.get(&key).cloned();
            AssembledItem { placement: p, metadata }
        })
        .collect()
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::placement::{Point3, Size3};

    fn placement(room: &str, item: &str) -> Placement3D {
        Placement3D {
            item_name: item.into(),
            room_name: room.into(),
            category: "seating".into(),
            position: Point3 { x: 0.0, y: 0.0, z: 0.0 },
            rotation_y_degrees: 0,
            size_m: Size3 { width: 1.0, depth: 1.0, height: 1.0 },
        }
    }

    #[test]
    fn test_matched_item_carries_metadata() {
        let catalog = index_catalog(vec![CatalogEntry {
            room_name: "living".into(),
            item_name: "sofa".into(),
            metadata: ItemMetadata {
                catalog_id: Some("sofa-1".into()),
                price: Some(499.0),
                currency: Some("USD".into()),
                ..Default::default()
            },
        }]);
        let assembled = assemble(vec![placement("living", "sofa")], &catalog);
        assert_eq!(assembled[0].metadata.as_ref().unwrap().catalog_id.as_deref(), Some("sofa-1"));
    }

    #[test]
    fn test_unmatched_item_keeps_geometry_only() {
        let catalog = HashMap::new();
        let assembled = assemble(vec![placement("living", "sofa")], &catalog);
        assert!(assembled[0].metadata.is_none());
    }

    #[test]
    fn test_assemble_preserves_input_order() {
        let catalog = HashMap::new();
        let assembled =
            assemble(vec![placement("living", "sofa"), placement("living", "table")], &catalog);
        assert_eq!(assembled[0].placement.item_name, "sofa");
        assert_eq!(assembled[1].placement.item_name, "table");
    }
}
