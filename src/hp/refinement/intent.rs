//! Adaptation intent of a cell within one cycle.

use crate::forest::{ActiveCell, AdaptFlag, CellForest, CellId};
use crate::mesh_error::MeshHpError;

/// What the next execution of the forest will do to a cell.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AdaptationIntent {
    /// Neither flagged nor scheduled for a new finite element.
    None,
    /// Geometric refinement or coarsening only.
    PureH,
    /// Change of finite element only.
    PureP,
    /// Both; left for a decision procedure to resolve.
    HAndP,
}

impl AdaptationIntent {
    fn of(flag: AdaptFlag, future_fe_index: Option<usize>) -> Self {
        match (flag != AdaptFlag::None, future_fe_index.is_some()) {
            (false, false) => AdaptationIntent::None,
            (true, false) => AdaptationIntent::PureH,
            (false, true) => AdaptationIntent::PureP,
            (true, true) => AdaptationIntent::HAndP,
        }
    }
}

impl From<&ActiveCell> for AdaptationIntent {
    fn from(cell: &ActiveCell) -> Self {
        AdaptationIntent::of(cell.flag, cell.future_fe_index)
    }
}

/// Intent of a single cell.
pub fn classify<const D: usize>(
    forest: &CellForest<D>,
    id: CellId,
) -> Result<AdaptationIntent, MeshHpError> {
    Ok(AdaptationIntent::of(
        forest.flag(id)?,
        forest.assigned_future_fe_index(id)?,
    ))
}

/// Intents of all active cells, in active-cell order.
pub fn classify_active<const D: usize>(forest: &CellForest<D>) -> Vec<AdaptationIntent> {
    forest
        .active_snapshot()
        .iter()
        .map(AdaptationIntent::from)
        .collect()
}

/// Histogram of [`AdaptationIntent`]s.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct IntentCounts {
    pub none: usize,
    pub pure_h: usize,
    pub pure_p: usize,
    pub h_and_p: usize,
}

impl IntentCounts {
    pub fn from_intents(intents: &[AdaptationIntent]) -> Self {
        intents.iter().fold(Self::default(), |mut counts, intent| {
            match intent {
                AdaptationIntent::None => counts.none += 1,
                AdaptationIntent::PureH => counts.pure_h += 1,
                AdaptationIntent::PureP => counts.pure_p += 1,
                AdaptationIntent::HAndP => counts.h_and_p += 1,
            }
            counts
        })
    }
}
