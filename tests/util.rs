#![allow(dead_code)]
use mesh_hp::forest::{AdaptFlag, CellId, QuadCellForest};
use mesh_hp::hp::FeCollection;

/// Linear hierarchy with degrees `1..=n`.
pub fn linear_fe(n: u32) -> FeCollection {
    FeCollection::from_degrees(&(1..=n).collect::<Vec<_>>()).unwrap()
}

/// Forest of independent root cells, one per `(flag, fe_index)` pair.
pub fn roots(cells: &[(AdaptFlag, usize)]) -> (QuadCellForest, Vec<CellId>) {
    let mut forest = QuadCellForest::new();
    let ids = cells
        .iter()
        .map(|(flag, fe_index)| {
            let id = forest.add_root(*fe_index);
            forest.set_flag(id, *flag).unwrap();
            id
        })
        .collect();
    (forest, ids)
}

/// Assigned future fe indices of all active cells (no fallback).
pub fn assigned(forest: &QuadCellForest) -> Vec<Option<usize>> {
    forest
        .active_cells()
        .map(|id| forest.assigned_future_fe_index(id).unwrap())
        .collect()
}

pub fn flags(forest: &QuadCellForest) -> Vec<AdaptFlag> {
    forest
        .active_cells()
        .map(|id| forest.flag(id).unwrap())
        .collect()
}
