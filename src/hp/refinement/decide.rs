//! Resolve cells scheduled for both h and p adaptation in favour of p.
//!
//! Both procedures must run after the last future finite element has been
//! assigned, and before the downstream clean-up of coarsen flags
//! ([`CellForest::clean_sibling_coarsen_flags`]).

use crate::forest::{AdaptFlag, CellForest, CellId};
use crate::mesh_error::MeshHpError;

/// Clear the h flag of every active cell that has a future finite element.
///
/// Returns the number of cleared flags. Applying it twice changes nothing
/// the second time.
pub fn force_p_over_h<const D: usize>(forest: &mut CellForest<D>) -> Result<usize, MeshHpError> {
    let targets: Vec<CellId> = forest
        .active_snapshot()
        .into_iter()
        .filter(|cell| cell.future_fe_index.is_some() && cell.flag != AdaptFlag::None)
        .map(|cell| cell.id)
        .collect();
    for id in &targets {
        forest.clear_flag(*id)?;
    }
    log::debug!("force p over h: cleared {} h flags", targets.len());
    Ok(targets.len())
}

/// How the coarsen flags of one sibling group were resolved.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SiblingResolution {
    /// Not every sibling is flagged for coarsening, so the group cannot be
    /// merged: siblings with a future finite element lose their coarsen flag.
    PartialGroup,
    /// Every sibling is flagged for coarsening but not all of them have a
    /// future finite element: h coarsening wins, all future elements go.
    HCoarsening,
    /// Every sibling is flagged for coarsening and has a future finite
    /// element: p coarsening wins, all coarsen flags go.
    PCoarsening,
}

/// Outcome of [`choose_p_over_h`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ChooseReport {
    /// Refine flags cleared in favour of p refinement.
    pub refine_flags_cleared: usize,
    /// Sibling groups resolved as [`SiblingResolution::PartialGroup`].
    pub partial_groups: usize,
    /// Sibling groups resolved as [`SiblingResolution::HCoarsening`].
    pub h_coarsened_groups: usize,
    /// Sibling groups resolved as [`SiblingResolution::PCoarsening`].
    pub p_coarsened_groups: usize,
    /// Coarsen flags cleared on root cells, which have no siblings to merge with.
    pub root_coarsen_flags_cleared: usize,
    /// Cells whose markers changed.
    pub changed_cells: usize,
}

/// Prefer p adaptation wherever it is requested on all related cells.
///
/// Refine-flagged cells with a future finite element drop their refine flag.
/// Coarsening is decided per sibling group, since cells are only merged if
/// all siblings are flagged; see [`SiblingResolution`] for the three cases.
/// A coarsen-flagged root cell cannot be merged and keeps only its future
/// finite element, if any.
///
/// This anticipates the decision of
/// [`CellForest::clean_sibling_coarsen_flags`] and has to run before it.
pub fn choose_p_over_h<const D: usize>(
    forest: &mut CellForest<D>,
) -> Result<ChooseReport, MeshHpError> {
    let mut report = ChooseReport::default();
    let snapshot = forest.active_snapshot();

    for cell in &snapshot {
        if cell.future_fe_index.is_none() {
            continue;
        }
        match (cell.flag, cell.parent) {
            (AdaptFlag::Refine, _) => {
                forest.clear_flag(cell.id)?;
                report.refine_flags_cleared += 1;
                report.changed_cells += 1;
            }
            (AdaptFlag::Coarsen, None) => {
                forest.clear_flag(cell.id)?;
                report.root_coarsen_flags_cleared += 1;
                report.changed_cells += 1;
            }
            _ => {}
        }
    }

    let mut parents: Vec<CellId> = snapshot
        .iter()
        .filter(|cell| cell.flag == AdaptFlag::Coarsen)
        .filter_map(|cell| cell.parent)
        .collect();
    parents.sort_unstable();
    parents.dedup();

    let groups = resolve_groups(forest, &parents)?;
    for (parent, resolution) in groups {
        let changed = apply_resolution(forest, parent, resolution)?;
        log::trace!("sibling group of {parent}: {resolution:?}, {changed} cells changed");
        report.changed_cells += changed;
        match resolution {
            SiblingResolution::PartialGroup => report.partial_groups += 1,
            SiblingResolution::HCoarsening => report.h_coarsened_groups += 1,
            SiblingResolution::PCoarsening => report.p_coarsened_groups += 1,
        }
    }

    log::debug!(
        "choose p over h: {} refine flags cleared, groups partial/h/p = {}/{}/{}",
        report.refine_flags_cleared,
        report.partial_groups,
        report.h_coarsened_groups,
        report.p_coarsened_groups
    );
    Ok(report)
}

/// Classify the sibling group below `parent` from the current markers.
pub fn sibling_resolution<const D: usize>(
    forest: &CellForest<D>,
    parent: CellId,
) -> Result<SiblingResolution, MeshHpError> {
    let mut all_coarsen = true;
    let mut all_future = true;
    for child in forest.children(parent)? {
        let active = forest.is_active(*child)?;
        all_coarsen &= active && forest.coarsen_flag_set(*child)?;
        all_future &= active && forest.future_fe_index_set(*child)?;
    }
    Ok(match (all_coarsen, all_future) {
        (false, _) => SiblingResolution::PartialGroup,
        (true, false) => SiblingResolution::HCoarsening,
        (true, true) => SiblingResolution::PCoarsening,
    })
}

/// Read phase: every group is classified from a consistent view of the
/// forest before any of them is written.
#[cfg(feature = "rayon")]
fn resolve_groups<const D: usize>(
    forest: &CellForest<D>,
    parents: &[CellId],
) -> Result<Vec<(CellId, SiblingResolution)>, MeshHpError> {
    use rayon::prelude::*;
    parents
        .par_iter()
        .map(|parent| Ok((*parent, sibling_resolution(forest, *parent)?)))
        .collect()
}

#[cfg(not(feature = "rayon"))]
fn resolve_groups<const D: usize>(
    forest: &CellForest<D>,
    parents: &[CellId],
) -> Result<Vec<(CellId, SiblingResolution)>, MeshHpError> {
    parents
        .iter()
        .map(|parent| Ok((*parent, sibling_resolution(forest, *parent)?)))
        .collect()
}

fn apply_resolution<const D: usize>(
    forest: &mut CellForest<D>,
    parent: CellId,
    resolution: SiblingResolution,
) -> Result<usize, MeshHpError> {
    let children = forest.children(parent)?.to_vec();
    let mut changed = 0;
    for child in children {
        if !forest.is_active(child)? {
            continue;
        }
        let coarsen = forest.coarsen_flag_set(child)?;
        let future = forest.future_fe_index_set(child)?;
        match resolution {
            SiblingResolution::PartialGroup | SiblingResolution::PCoarsening
                if coarsen && future =>
            {
                forest.clear_flag(child)?;
                changed += 1;
            }
            SiblingResolution::HCoarsening if future => {
                forest.clear_future_fe_index(child)?;
                changed += 1;
            }
            _ => {}
        }
    }
    Ok(changed)
}
