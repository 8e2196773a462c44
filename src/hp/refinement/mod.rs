//! Decide between h and p adaptivity on every active cell.
//!
//! For irregular solutions, h adaptive methods (splitting and merging cells)
//! reduce the error most efficiently, while smooth solutions profit from p
//! adaptive methods (raising or lowering the polynomial degree). The tools in
//! this module decide which of the two is applied where.
//!
//! # Workflow
//!
//! 1. An upstream error estimator flags cells for refinement or coarsening
//!    ([`AdaptFlag`]). Executing the forest now would perform pure h
//!    adaptation.
//! 2. One of the [`PAdaptivity`] strategies assigns a future finite element
//!    on top of those flags wherever a cell qualifies for p adaptation: the
//!    superordinate element for refinement, the subordinate one for
//!    coarsening.
//! 3. One of the [`HpDecision`] procedures removes the ambiguity on cells
//!    scheduled for both, always in favour of p adaptation.
//! 4. [`CellForest::execute_coarsening_and_refinement`] carries out the
//!    markers.
//!
//! ```
//! use mesh_hp::forest::QuadCellForest;
//! use mesh_hp::hp::FeCollection;
//! use mesh_hp::hp::refinement::{force_p_over_h, full_p_adaptivity};
//!
//! let fe = FeCollection::from_degrees(&[1, 2, 3]).unwrap();
//! let mut forest = QuadCellForest::new();
//! let cell = forest.add_root(0);
//! forest.set_refine_flag(cell).unwrap();
//!
//! full_p_adaptivity(&mut forest, &fe).unwrap();
//! force_p_over_h(&mut forest).unwrap();
//! assert_eq!(forest.future_fe_index(cell).unwrap(), 1);
//! assert!(!forest.refine_flag_set(cell).unwrap());
//! ```

pub mod decide;
pub mod indicators;
pub mod intent;
pub mod p_flags;
pub mod predict;

pub use decide::{ChooseReport, SiblingResolution, choose_p_over_h, force_p_over_h};
pub use indicators::{
    ThresholdOptions, p_adaptivity_from_prediction, p_adaptivity_from_regularity,
    p_adaptivity_from_threshold,
};
pub use intent::{AdaptationIntent, IntentCounts, classify, classify_active};
pub use p_flags::{full_p_adaptivity, p_adaptivity_from_flags};
pub use predict::{PredictionOptions, predict_error};

use crate::forest::{ActiveCell, AdaptFlag, CellForest};
use crate::hp::fe_collection::FeCollection;
use crate::mesh_error::MeshHpError;
use num_traits::Float;
use serde::{Deserialize, Serialize};

/// Number of future finite elements assigned by a [`PAdaptivity`] strategy.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PAdaptivityReport {
    /// Refine-flagged cells that received their superordinate element.
    pub p_refined: usize,
    /// Coarsen-flagged cells that received their subordinate element.
    pub p_coarsened: usize,
}

impl PAdaptivityReport {
    pub fn total(&self) -> usize {
        self.p_refined + self.p_coarsened
    }
}

/// Strategy that assigns future finite elements on flagged cells.
///
/// Indicator slices hold one entry per active cell, in
/// [`CellForest::active_cells`] order.
#[derive(Debug, Clone, Copy)]
pub enum PAdaptivity<'a, N> {
    /// Every flagged cell is p adapted.
    Full,
    /// Flagged cells whose entry is `true` are p adapted.
    Flags(&'a [bool]),
    /// Flagged cells whose smoothness passes an interpolated threshold.
    Threshold {
        smoothness_indicators: &'a [N],
        options: ThresholdOptions,
    },
    /// Flagged cells whose estimated Sobolev regularity supports the change.
    Regularity { sobolev_indices: &'a [N] },
    /// Flagged cells whose error decreased as predicted.
    Prediction {
        error_indicators: &'a [N],
        predicted_errors: &'a [N],
    },
}

impl<N> PAdaptivity<'_, N>
where
    N: Float + Send + Sync,
{
    /// Run the strategy on `forest`.
    pub fn apply<const D: usize>(
        &self,
        forest: &mut CellForest<D>,
        fe: &FeCollection,
    ) -> Result<PAdaptivityReport, MeshHpError> {
        match *self {
            PAdaptivity::Full => full_p_adaptivity(forest, fe),
            PAdaptivity::Flags(p_flags) => p_adaptivity_from_flags(forest, fe, p_flags),
            PAdaptivity::Threshold {
                smoothness_indicators,
                options,
            } => p_adaptivity_from_threshold(forest, fe, smoothness_indicators, options),
            PAdaptivity::Regularity { sobolev_indices } => {
                p_adaptivity_from_regularity(forest, fe, sobolev_indices)
            }
            PAdaptivity::Prediction {
                error_indicators,
                predicted_errors,
            } => p_adaptivity_from_prediction(forest, fe, error_indicators, predicted_errors),
        }
    }
}

/// Procedure resolving cells scheduled for both h and p adaptation.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum HpDecision {
    /// Drop the h flag of every cell with a future finite element.
    #[default]
    ForcePOverH,
    /// Like [`ForcePOverH`](Self::ForcePOverH) for refinement, but decide
    /// coarsening per sibling group.
    ChoosePOverH,
}

impl HpDecision {
    /// Run the procedure; returns the number of cells whose markers changed.
    pub fn apply<const D: usize>(&self, forest: &mut CellForest<D>) -> Result<usize, MeshHpError> {
        match self {
            HpDecision::ForcePOverH => force_p_over_h(forest),
            HpDecision::ChoosePOverH => Ok(choose_p_over_h(forest)?.changed_cells),
        }
    }
}

/// Summary of an [`hp_adapt`] pass.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HpAdaptationSummary {
    /// Future finite elements assigned by the strategy.
    pub assigned: PAdaptivityReport,
    /// Cells whose markers the decision procedure changed.
    pub resolved: usize,
    /// Resulting intents of the active cells.
    pub intents: IntentCounts,
}

/// Assign future finite elements with `strategy`, then resolve conflicts
/// with `decision`.
///
/// Afterwards every active cell is scheduled for at most one of h and p
/// adaptation.
pub fn hp_adapt<const D: usize, N>(
    forest: &mut CellForest<D>,
    fe: &FeCollection,
    strategy: PAdaptivity<'_, N>,
    decision: HpDecision,
) -> Result<HpAdaptationSummary, MeshHpError>
where
    N: Float + Send + Sync,
{
    let assigned = strategy.apply(forest, fe)?;
    let resolved = decision.apply(forest)?;
    let intents = IntentCounts::from_intents(&classify_active(forest));
    log::debug!(
        "hp adaptation: {} p-refined, {} p-coarsened, {} resolved, intents {:?}",
        assigned.p_refined,
        assigned.p_coarsened,
        resolved,
        intents
    );
    Ok(HpAdaptationSummary {
        assigned,
        resolved,
        intents,
    })
}

/// Fail unless a per-active-cell vector has one entry per active cell.
pub(crate) fn check_length(
    name: &'static str,
    expected: usize,
    found: usize,
) -> Result<(), MeshHpError> {
    if expected == found {
        Ok(())
    } else {
        Err(MeshHpError::IndicatorLengthMismatch {
            name,
            expected,
            found,
        })
    }
}

/// Validate the finite elements of `forest` against `fe` and take a snapshot
/// of its active cells.
pub(crate) fn active_cells_checked<const D: usize>(
    forest: &CellForest<D>,
    fe: &FeCollection,
) -> Result<Vec<ActiveCell>, MeshHpError> {
    forest.check_fe_indices(fe)?;
    Ok(forest.active_snapshot())
}

/// Evaluate `qualifies` on every flagged cell; unflagged cells never qualify.
pub(crate) fn flagged_cells_qualifying<F>(
    cells: &[ActiveCell],
    qualifies: F,
) -> Result<Vec<bool>, MeshHpError>
where
    F: Fn(usize, &ActiveCell) -> Result<bool, MeshHpError> + Send + Sync,
{
    let eval = |(i, cell): (usize, &ActiveCell)| match cell.flag {
        AdaptFlag::None => Ok(false),
        AdaptFlag::Refine | AdaptFlag::Coarsen => qualifies(i, cell),
    };
    map_cells(cells, eval)
}

#[cfg(feature = "rayon")]
fn map_cells<F>(cells: &[ActiveCell], eval: F) -> Result<Vec<bool>, MeshHpError>
where
    F: Fn((usize, &ActiveCell)) -> Result<bool, MeshHpError> + Send + Sync,
{
    use rayon::prelude::*;
    cells.par_iter().enumerate().map(eval).collect()
}

#[cfg(not(feature = "rayon"))]
fn map_cells<F>(cells: &[ActiveCell], eval: F) -> Result<Vec<bool>, MeshHpError>
where
    F: Fn((usize, &ActiveCell)) -> Result<bool, MeshHpError>,
{
    cells.iter().enumerate().map(eval).collect()
}

/// Assign the superordinate (refine) or subordinate (coarsen) finite element
/// on every qualifying cell.
pub(crate) fn assign_future_fe_indices<const D: usize>(
    forest: &mut CellForest<D>,
    fe: &FeCollection,
    cells: &[ActiveCell],
    qualifying: &[bool],
) -> Result<PAdaptivityReport, MeshHpError> {
    let mut report = PAdaptivityReport::default();
    for (cell, _) in cells.iter().zip(qualifying).filter(|(_, q)| **q) {
        match cell.flag {
            AdaptFlag::Refine => {
                let target = fe.superordinate(cell.active_fe_index)?;
                forest.set_future_fe_index(cell.id, target)?;
                report.p_refined += 1;
                log::trace!("cell {}: p refinement to fe {target}", cell.id);
            }
            AdaptFlag::Coarsen => {
                let target = fe.subordinate(cell.active_fe_index)?;
                forest.set_future_fe_index(cell.id, target)?;
                report.p_coarsened += 1;
                log::trace!("cell {}: p coarsening to fe {target}", cell.id);
            }
            AdaptFlag::None => {}
        }
    }
    Ok(report)
}
