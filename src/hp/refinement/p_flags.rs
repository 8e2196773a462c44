//! Flag-driven p adaptivity.

use super::{
    PAdaptivityReport, active_cells_checked, assign_future_fe_indices, check_length,
    flagged_cells_qualifying,
};
use crate::forest::CellForest;
use crate::hp::fe_collection::FeCollection;
use crate::mesh_error::MeshHpError;

/// Flag every h-flagged cell for p adaptation as well.
///
/// Refine-flagged cells receive the superordinate element, coarsen-flagged
/// cells the subordinate one. At the ends of the hierarchy the assigned
/// element is the active one.
pub fn full_p_adaptivity<const D: usize>(
    forest: &mut CellForest<D>,
    fe: &FeCollection,
) -> Result<PAdaptivityReport, MeshHpError> {
    let cells = active_cells_checked(forest, fe)?;
    let qualifying = flagged_cells_qualifying(&cells, |_, _| Ok(true))?;
    let report = assign_future_fe_indices(forest, fe, &cells, &qualifying)?;
    log::debug!(
        "full p adaptivity: {} p-refined, {} p-coarsened",
        report.p_refined,
        report.p_coarsened
    );
    Ok(report)
}

/// p adapt the h-flagged cells whose entry in `p_flags` is set.
///
/// `p_flags` holds one entry per active cell. Cells without an h flag are
/// left alone regardless of their entry.
pub fn p_adaptivity_from_flags<const D: usize>(
    forest: &mut CellForest<D>,
    fe: &FeCollection,
    p_flags: &[bool],
) -> Result<PAdaptivityReport, MeshHpError> {
    let cells = active_cells_checked(forest, fe)?;
    check_length("p_flags", cells.len(), p_flags.len())?;
    let qualifying = flagged_cells_qualifying(&cells, |i, _| Ok(p_flags[i]))?;
    let report = assign_future_fe_indices(forest, fe, &cells, &qualifying)?;
    log::debug!(
        "p adaptivity from flags: {} p-refined, {} p-coarsened",
        report.p_refined,
        report.p_coarsened
    );
    Ok(report)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::forest::{AdaptFlag, QuadCellForest};

    fn forest_with(flags: &[AdaptFlag], fe_indices: &[usize]) -> QuadCellForest {
        let mut forest = QuadCellForest::new();
        for (flag, fe_index) in flags.iter().zip(fe_indices) {
            let id = forest.add_root(*fe_index);
            forest.set_flag(id, *flag).unwrap();
        }
        forest
    }

    fn future(forest: &QuadCellForest) -> Vec<Option<usize>> {
        forest
            .active_cells()
            .map(|id| forest.assigned_future_fe_index(id).unwrap())
            .collect()
    }

    #[test]
    fn full_assigns_neighbours_in_the_hierarchy() {
        let fe = FeCollection::from_degrees(&[1, 2, 3]).unwrap();
        let mut forest = forest_with(
            &[AdaptFlag::Refine, AdaptFlag::Coarsen, AdaptFlag::None],
            &[0, 2, 1],
        );
        let report = full_p_adaptivity(&mut forest, &fe).unwrap();
        assert_eq!(report, PAdaptivityReport { p_refined: 1, p_coarsened: 1 });
        assert_eq!(future(&forest), vec![Some(1), Some(1), None]);
    }

    #[test]
    fn full_saturates_at_the_boundaries() {
        let fe = FeCollection::from_degrees(&[1, 2]).unwrap();
        let mut forest = forest_with(&[AdaptFlag::Refine, AdaptFlag::Coarsen], &[1, 0]);
        full_p_adaptivity(&mut forest, &fe).unwrap();
        assert_eq!(future(&forest), vec![Some(1), Some(0)]);
    }

    #[test]
    fn flags_select_a_subset() {
        let fe = FeCollection::from_degrees(&[1, 2, 3]).unwrap();
        let mut forest = forest_with(
            &[
                AdaptFlag::Refine,
                AdaptFlag::Refine,
                AdaptFlag::Coarsen,
                AdaptFlag::None,
            ],
            &[1, 1, 1, 1],
        );
        let report =
            p_adaptivity_from_flags(&mut forest, &fe, &[true, false, true, true]).unwrap();
        assert_eq!(report.total(), 2);
        assert_eq!(future(&forest), vec![Some(2), None, Some(0), None]);
    }

    #[test]
    fn flags_length_must_match() {
        let fe = FeCollection::from_degrees(&[1, 2]).unwrap();
        let mut forest = forest_with(&[AdaptFlag::Refine, AdaptFlag::Refine], &[0, 0]);
        assert_eq!(
            p_adaptivity_from_flags(&mut forest, &fe, &[true]),
            Err(MeshHpError::IndicatorLengthMismatch {
                name: "p_flags",
                expected: 2,
                found: 1
            })
        );
        assert_eq!(future(&forest), vec![None, None]);
    }

    #[test]
    fn foreign_fe_index_is_rejected_before_mutation() {
        let fe = FeCollection::from_degrees(&[1, 2]).unwrap();
        let mut forest = forest_with(&[AdaptFlag::Refine, AdaptFlag::Refine], &[0, 5]);
        assert_eq!(
            full_p_adaptivity(&mut forest, &fe),
            Err(MeshHpError::InvalidFeIndex { index: 5, len: 2 })
        );
        assert_eq!(future(&forest), vec![None, None]);
    }
}
