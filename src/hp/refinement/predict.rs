//! Error prediction feeding [`p_adaptivity_from_prediction`](super::p_adaptivity_from_prediction).
//!
//! Assuming a smooth solution, the error of a cell is expected to decay by
//! a known factor after adaptation. Comparing the next cycle's error
//! estimate with this prediction tells whether the smoothness assumption
//! held, i.e. whether p adaptation was the right call.
//!
//! Predictions use squared error norms, like the error indicators.

use super::{active_cells_checked, check_length};
use crate::forest::{AdaptFlag, CellForest};
use crate::hp::fe_collection::FeCollection;
use crate::mesh_error::MeshHpError;
use num_traits::{Float, NumCast};
use serde::{Deserialize, Serialize};

/// Control parameters of [`predict_error`].
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PredictionOptions {
    /// Reduction per polynomial degree gained by p adaptation.
    pub gamma_p: f64,
    /// Scaling applied on h adaptation.
    pub gamma_h: f64,
    /// Scaling applied on cells that are not adapted.
    pub gamma_n: f64,
}

impl Default for PredictionOptions {
    fn default() -> Self {
        Self {
            gamma_p: 0.4f64.sqrt(),
            gamma_h: 2.0,
            gamma_n: 1.0,
        }
    }
}

impl PredictionOptions {
    /// All factors must be positive and finite.
    pub fn validate(&self) -> Result<(), MeshHpError> {
        for (name, value) in [
            ("gamma_p", self.gamma_p),
            ("gamma_h", self.gamma_h),
            ("gamma_n", self.gamma_n),
        ] {
            if !(value.is_finite() && value > 0.0) {
                return Err(MeshHpError::InvalidPredictionParameter { name, value });
            }
        }
        Ok(())
    }
}

fn factor<N: NumCast>(name: &'static str, value: f64) -> Result<N, MeshHpError> {
    <N as NumCast>::from(value).ok_or(MeshHpError::InvalidPredictionParameter { name, value })
}

/// Predict the error of every active cell after the pending adaptation.
///
/// Must run on the final markers of a cycle, i.e. after the decision
/// procedure and before the forest is executed. With `k` the degree of the
/// future finite element and `p` the degree of the active one:
///
/// - h refinement: `err * gamma_h * 0.5^k`
/// - h coarsening: `err / (gamma_h * 0.5^k)`
/// - p adaptation: `err * gamma_p^(k - p)`
/// - no adaptation: `err * gamma_n`
///
/// The result holds one entry per active cell of the *current* forest.
/// Refined children inherit their parent's prediction and merged parents
/// accumulate the predictions of their children; that transfer belongs to
/// the caller's solution transfer.
pub fn predict_error<const D: usize, N>(
    forest: &CellForest<D>,
    fe: &FeCollection,
    error_indicators: &[N],
    options: PredictionOptions,
) -> Result<Vec<N>, MeshHpError>
where
    N: Float,
{
    options.validate()?;
    let cells = active_cells_checked(forest, fe)?;
    check_length("error_indicators", cells.len(), error_indicators.len())?;

    let gamma_p: N = factor("gamma_p", options.gamma_p)?;
    let gamma_h: N = factor("gamma_h", options.gamma_h)?;
    let gamma_n: N = factor("gamma_n", options.gamma_n)?;
    let half = (N::one() + N::one()).recip();

    cells
        .iter()
        .zip(error_indicators)
        .map(|(cell, &error)| {
            let future = cell.future_fe_index.unwrap_or(cell.active_fe_index);
            let future_degree = fe.degree(future)?;
            let h_factor = gamma_h * half.powi(degree_exponent(future_degree)?);
            Ok(match cell.flag {
                AdaptFlag::Refine => error * h_factor,
                AdaptFlag::Coarsen => error / h_factor,
                AdaptFlag::None if future != cell.active_fe_index => {
                    let degree = fe.degree(cell.active_fe_index)?;
                    let gained = degree_exponent(future_degree)? - degree_exponent(degree)?;
                    error * gamma_p.powi(gained)
                }
                AdaptFlag::None => error * gamma_n,
            })
        })
        .collect::<Result<Vec<N>, MeshHpError>>()
        .inspect(|predicted| {
            log::debug!("predicted errors for {} active cells", predicted.len());
        })
}

fn degree_exponent(degree: u32) -> Result<i32, MeshHpError> {
    i32::try_from(degree).map_err(|_| MeshHpError::DegreeConversion(degree))
}
