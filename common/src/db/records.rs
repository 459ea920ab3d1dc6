//! Raw per-entity records as produced by the layout readers, before any
//! cross-referencing happens.

use crate::db::error::{DesignError, Result};
use std::collections::{HashMap, HashSet};

/// One `.pl` line.
#[derive(Clone, Debug, PartialEq)]
pub struct PlacementRecord {
    pub name: String,
    pub x: f64,
    pub y: f64,
    pub orientation: Option<String>,
    pub fixed: bool,
}

/// One `.nodes` line.
#[derive(Clone, Debug, PartialEq)]
pub struct NodeRecord {
    pub name: String,
    pub width: f64,
    pub height: f64,
    pub terminal: bool,
}

/// Placement and geometry of a single cell, joined by name.
#[derive(Clone, Debug, PartialEq)]
pub struct CellRecord {
    pub name: String,
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
    pub orientation: Option<String>,
    pub terminal: bool,
    pub fixed: bool,
}

#[derive(Clone, Debug, PartialEq)]
pub struct NetRecord {
    pub name: String,
    pub cells: Vec<String>,
}

/// One `CoreRow` block of a `.scl` file.
#[derive(Clone, Debug, PartialEq)]
pub struct RowRecord {
    pub y: f64,
    pub height: f64,
    pub site_spacing: f64,
    pub origin_x: f64,
    pub site_count: u32,
}

/// Everything read from one benchmark.
#[derive(Clone, Debug, Default)]
pub struct LayoutRecords {
    pub name: String,
    pub declared_nodes: Option<usize>,
    pub placements: Vec<PlacementRecord>,
    pub nodes: Vec<NodeRecord>,
    pub nets: Vec<NetRecord>,
    pub rows: Vec<RowRecord>,
}

/// Joins placements with node geometry, keeping placement order.
///
/// Every placement needs exactly one node and vice versa. When the node file
/// declared a count, it must equal the number of joined records.
pub fn merge_cell_records(
    placements: Vec<PlacementRecord>,
    nodes: Vec<NodeRecord>,
    declared_nodes: Option<usize>,
) -> Result<Vec<CellRecord>> {
    let mut geometry: HashMap<String, NodeRecord> = HashMap::with_capacity(nodes.len());
    for node in nodes {
        if geometry.contains_key(&node.name) {
            return Err(DesignError::DuplicateCell(node.name));
        }
        geometry.insert(node.name.clone(), node);
    }

    let mut seen = HashSet::with_capacity(placements.len());
    let mut merged = Vec::with_capacity(placements.len());
    for pl in placements {
        if !seen.insert(pl.name.clone()) {
            return Err(DesignError::DuplicateCell(pl.name));
        }
        let Some(node) = geometry.remove(&pl.name) else {
            return Err(DesignError::MissingGeometry(pl.name));
        };
        merged.push(CellRecord {
            name: pl.name,
            x: pl.x,
            y: pl.y,
            width: node.width,
            height: node.height,
            orientation: pl.orientation,
            terminal: node.terminal,
            fixed: pl.fixed,
        });
    }

    if let Some(name) = geometry.into_keys().min() {
        return Err(DesignError::MissingPlacement(name));
    }

    if let Some(declared) = declared_nodes
        && declared != merged.len()
    {
        return Err(DesignError::NodeCountMismatch {
            declared,
            actual: merged.len(),
        });
    }

    Ok(merged)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pl(name: &str, x: f64, y: f64) -> PlacementRecord {
        PlacementRecord {
            name: name.to_string(),
            x,
            y,
            orientation: Some("N".to_string()),
            fixed: false,
        }
    }

    fn node(name: &str, w: f64, h: f64, terminal: bool) -> NodeRecord {
        NodeRecord {
            name: name.to_string(),
            width: w,
            height: h,
            terminal,
        }
    }

    #[test]
    fn merge_joins_by_name_in_placement_order() {
        let merged = merge_cell_records(
            vec![pl("b", 1.0, 2.0), pl("a", 3.0, 4.0)],
            vec![node("a", 5.0, 6.0, true), node("b", 7.0, 8.0, false)],
            Some(2),
        )
        .unwrap();
        assert_eq!(merged[0].name, "b");
        assert_eq!(merged[0].width, 7.0);
        assert!(!merged[0].terminal);
        assert_eq!(merged[1].name, "a");
        assert_eq!((merged[1].x, merged[1].height), (3.0, 6.0));
        assert!(merged[1].terminal);
    }

    #[test]
    fn declared_count_must_match() {
        let err = merge_cell_records(
            vec![pl("a", 0.0, 0.0)],
            vec![node("a", 1.0, 1.0, false)],
            Some(3),
        )
        .unwrap_err();
        assert_eq!(
            err,
            DesignError::NodeCountMismatch {
                declared: 3,
                actual: 1
            }
        );
        assert!(err.is_integrity());
    }

    #[test]
    fn unmatched_records_are_rejected() {
        let err = merge_cell_records(vec![pl("a", 0.0, 0.0)], vec![], None).unwrap_err();
        assert_eq!(err, DesignError::MissingGeometry("a".to_string()));

        let err = merge_cell_records(
            vec![pl("a", 0.0, 0.0)],
            vec![node("a", 1.0, 1.0, false), node("z", 1.0, 1.0, false)],
            None,
        )
        .unwrap_err();
        assert_eq!(err, DesignError::MissingPlacement("z".to_string()));
    }

    #[test]
    fn duplicate_placement_is_rejected() {
        let err = merge_cell_records(
            vec![pl("a", 0.0, 0.0), pl("a", 1.0, 0.0)],
            vec![node("a", 1.0, 1.0, false)],
            None,
        )
        .unwrap_err();
        assert_eq!(err, DesignError::DuplicateCell("a".to_string()));
    }
}
