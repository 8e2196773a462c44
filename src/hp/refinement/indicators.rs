//! Indicator-driven p adaptivity: smoothness thresholds, regularity
//! estimates and error prediction.
//!
//! Each strategy only considers cells that already carry an h flag and
//! expects its indicator vectors to hold one entry per active cell.

use super::{
    PAdaptivityReport, active_cells_checked, assign_future_fe_indices, check_length,
    flagged_cells_qualifying,
};
use crate::forest::{ActiveCell, AdaptFlag, CellForest};
use crate::hp::fe_collection::FeCollection;
use crate::mesh_error::MeshHpError;
use itertools::{Itertools, MinMaxResult};
use num_traits::{Float, NumCast};
use serde::{Deserialize, Serialize};

/// Interpolation factors for [`p_adaptivity_from_threshold`].
///
/// `0` selects the smallest and `1` the largest indicator of a class of
/// flagged cells; the default picks the mean of both.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ThresholdOptions {
    /// Interpolation factor among refine-flagged cells.
    pub p_refine_fraction: f64,
    /// Interpolation factor among coarsen-flagged cells.
    pub p_coarsen_fraction: f64,
}

impl Default for ThresholdOptions {
    fn default() -> Self {
        Self {
            p_refine_fraction: 0.5,
            p_coarsen_fraction: 0.5,
        }
    }
}

impl ThresholdOptions {
    /// Both fractions must lie in `[0, 1]`.
    pub fn validate(&self) -> Result<(), MeshHpError> {
        for (name, value) in [
            ("p_refine_fraction", self.p_refine_fraction),
            ("p_coarsen_fraction", self.p_coarsen_fraction),
        ] {
            if !(0.0..=1.0).contains(&value) {
                return Err(MeshHpError::FractionOutOfRange { name, value });
            }
        }
        Ok(())
    }
}

/// Threshold of one class of flagged cells.
#[derive(Clone, Copy, Debug, PartialEq)]
enum Threshold<N> {
    /// No cell of the class exists.
    Empty,
    /// All indicators of the class coincide; every cell qualifies.
    Degenerate,
    Value(N),
}

fn interpolate<N: Float>(
    range: MinMaxResult<N>,
    name: &'static str,
    fraction: f64,
) -> Result<Threshold<N>, MeshHpError> {
    match range {
        MinMaxResult::NoElements => Ok(Threshold::Empty),
        MinMaxResult::OneElement(_) => Ok(Threshold::Degenerate),
        MinMaxResult::MinMax(min, max) if min == max => Ok(Threshold::Degenerate),
        MinMaxResult::MinMax(min, max) => {
            let fraction = <N as NumCast>::from(fraction)
                .ok_or(MeshHpError::FractionOutOfRange { name, value: fraction })?;
            Ok(Threshold::Value(min + fraction * (max - min)))
        }
    }
}

/// p adapt flagged cells whose smoothness indicator passes a threshold.
///
/// The thresholds are computed separately for refine-flagged and
/// coarsen-flagged cells by interpolating linearly between the smallest and
/// largest indicator of each class with the factors in `options`. A
/// refine-flagged cell qualifies if its indicator is larger than the refine
/// threshold, a coarsen-flagged cell if its indicator is smaller than the
/// coarsen threshold.
///
/// A class without cells assigns nothing. If all indicators of a class are
/// equal, every cell of that class qualifies. Flagged cells must carry finite
/// indicators; NaN or infinite values are rejected before anything is assigned.
pub fn p_adaptivity_from_threshold<const D: usize, N>(
    forest: &mut CellForest<D>,
    fe: &FeCollection,
    smoothness_indicators: &[N],
    options: ThresholdOptions,
) -> Result<PAdaptivityReport, MeshHpError>
where
    N: Float + Send + Sync,
{
    options.validate()?;
    let cells = active_cells_checked(forest, fe)?;
    check_length(
        "smoothness_indicators",
        cells.len(),
        smoothness_indicators.len(),
    )?;
    if let Some((cell, _)) = cells
        .iter()
        .zip(smoothness_indicators)
        .find(|(cell, value)| cell.flag != AdaptFlag::None && !value.is_finite())
    {
        return Err(MeshHpError::NonFiniteIndicator {
            name: "smoothness_indicators",
            cell: cell.id,
        });
    }

    let class_range = |flag: AdaptFlag| {
        cells
            .iter()
            .zip(smoothness_indicators)
            .filter(|(cell, _)| cell.flag == flag)
            .map(|(_, value)| *value)
            .minmax()
    };
    let refine_threshold = interpolate(
        class_range(AdaptFlag::Refine),
        "p_refine_fraction",
        options.p_refine_fraction,
    )?;
    let coarsen_threshold = interpolate(
        class_range(AdaptFlag::Coarsen),
        "p_coarsen_fraction",
        options.p_coarsen_fraction,
    )?;
    for (class, threshold) in [("refine", &refine_threshold), ("coarsen", &coarsen_threshold)] {
        if *threshold == Threshold::Degenerate {
            log::warn!("smoothness indicators of all {class}-flagged cells coincide; all qualify");
        }
    }

    let qualifying = flagged_cells_qualifying(&cells, |i, cell| {
        let value = smoothness_indicators[i];
        let threshold = match cell.flag {
            AdaptFlag::Refine => refine_threshold,
            _ => coarsen_threshold,
        };
        Ok(match threshold {
            Threshold::Empty => false,
            Threshold::Degenerate => true,
            Threshold::Value(t) if cell.flag == AdaptFlag::Refine => value > t,
            Threshold::Value(t) => value < t,
        })
    })?;
    let report = assign_future_fe_indices(forest, fe, &cells, &qualifying)?;
    log::debug!(
        "p adaptivity from threshold: {} p-refined, {} p-coarsened",
        report.p_refined,
        report.p_coarsened
    );
    Ok(report)
}

/// p adapt flagged cells whose estimated Sobolev regularity index supports it.
///
/// A refine-flagged cell qualifies if its regularity exceeds the degree of
/// the superordinate element, a coarsen-flagged cell if its regularity is
/// below the degree of the subordinate element. Both comparisons are strict.
pub fn p_adaptivity_from_regularity<const D: usize, N>(
    forest: &mut CellForest<D>,
    fe: &FeCollection,
    sobolev_indices: &[N],
) -> Result<PAdaptivityReport, MeshHpError>
where
    N: Float + Send + Sync,
{
    let cells = active_cells_checked(forest, fe)?;
    check_length("sobolev_indices", cells.len(), sobolev_indices.len())?;

    let qualifying = flagged_cells_qualifying(&cells, |i, cell: &ActiveCell| {
        let regularity = sobolev_indices[i];
        Ok(match cell.flag {
            AdaptFlag::Refine => {
                let degree = fe.degree(fe.superordinate(cell.active_fe_index)?)?;
                regularity > degree_as::<N>(degree)?
            }
            AdaptFlag::Coarsen => {
                let degree = fe.degree(fe.subordinate(cell.active_fe_index)?)?;
                regularity < degree_as::<N>(degree)?
            }
            AdaptFlag::None => false,
        })
    })?;
    let report = assign_future_fe_indices(forest, fe, &cells, &qualifying)?;
    log::debug!(
        "p adaptivity from regularity: {} p-refined, {} p-coarsened",
        report.p_refined,
        report.p_coarsened
    );
    Ok(report)
}

/// p adapt flagged cells whose error indicator stayed below its prediction.
///
/// Both vectors hold squared error norms, one entry per active cell. A
/// flagged cell qualifies if `error_indicators[i] < predicted_errors[i]`,
/// i.e. the solution behaved as smoothly as predicted. In the first cycle,
/// a prediction of `0` enforces h adaptation and `+inf` p adaptation.
pub fn p_adaptivity_from_prediction<const D: usize, N>(
    forest: &mut CellForest<D>,
    fe: &FeCollection,
    error_indicators: &[N],
    predicted_errors: &[N],
) -> Result<PAdaptivityReport, MeshHpError>
where
    N: Float + Send + Sync,
{
    let cells = active_cells_checked(forest, fe)?;
    check_length("error_indicators", cells.len(), error_indicators.len())?;
    check_length("predicted_errors", cells.len(), predicted_errors.len())?;

    let qualifying = flagged_cells_qualifying(&cells, |i, _| {
        Ok(error_indicators[i] < predicted_errors[i])
    })?;
    let report = assign_future_fe_indices(forest, fe, &cells, &qualifying)?;
    log::debug!(
        "p adaptivity from prediction: {} p-refined, {} p-coarsened",
        report.p_refined,
        report.p_coarsened
    );
    Ok(report)
}

pub(crate) fn degree_as<N: NumCast>(degree: u32) -> Result<N, MeshHpError> {
    <N as NumCast>::from(degree).ok_or(MeshHpError::DegreeConversion(degree))
}
