//! Quad/oct-tree cell forest carrying hp-adaptation markers.
//!
//! Cells live in an arena and refer to their parent and children by
//! [`CellId`] instead of references, so the tree can be traversed and
//! annotated without ownership cycles. Active cells (leaves) carry the
//! markers an adaptation cycle works with: an h flag ([`AdaptFlag`]), the
//! active finite element index and an optional future finite element index.
//!
//! The forest also provides the two downstream passes the hp decision
//! procedures are written against: [`CellForest::clean_sibling_coarsen_flags`]
//! and [`CellForest::execute_coarsening_and_refinement`].

use crate::debug_invariants::DebugInvariants;
use crate::hp::fe_collection::{FeCollection, FeIndex};
use crate::mesh_error::MeshHpError;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Handle of a cell in a [`CellForest`] arena.
#[derive(Copy, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[repr(transparent)]
pub struct CellId(u32);

impl CellId {
    /// Creates a `CellId` from its raw arena slot.
    #[inline]
    pub const fn new(raw: u32) -> Self {
        CellId(raw)
    }

    /// Returns the raw arena slot.
    #[inline]
    pub const fn get(self) -> u32 {
        self.0
    }

    #[inline]
    fn slot(self) -> usize {
        self.0 as usize
    }
}

impl fmt::Debug for CellId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("CellId").field(&self.get()).finish()
    }
}

impl fmt::Display for CellId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.get())
    }
}

/// h-adaptation marker of an active cell.
///
/// Refinement and coarsening are mutually exclusive, so a single enum holds
/// both flags.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum AdaptFlag {
    /// No geometric change requested.
    #[default]
    None,
    /// Split the cell into its children.
    Refine,
    /// Merge the cell with its siblings into their parent.
    Coarsen,
}

#[derive(Debug, Clone)]
struct CellRecord {
    level: u8,
    parent: Option<CellId>,
    children: Vec<CellId>,
    active_fe_index: FeIndex,
    flag: AdaptFlag,
    future_fe_index: Option<FeIndex>,
}

impl CellRecord {
    fn is_active(&self) -> bool {
        self.children.is_empty()
    }
}

/// Snapshot of the markers of one active cell.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ActiveCell {
    /// Cell handle.
    pub id: CellId,
    /// Parent cell, `None` for roots.
    pub parent: Option<CellId>,
    /// Current h flag.
    pub flag: AdaptFlag,
    /// Currently active finite element.
    pub active_fe_index: FeIndex,
    /// Future finite element, if one has been assigned.
    pub future_fe_index: Option<FeIndex>,
}

/// Counts of the changes performed by
/// [`CellForest::execute_coarsening_and_refinement`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ExecutionSummary {
    /// Active cells whose finite element changed.
    pub p_adapted: usize,
    /// Cells split into children.
    pub refined: usize,
    /// Sibling groups merged into their parent.
    pub coarsened_groups: usize,
    /// Coarsen flags dropped because the sibling group disagreed.
    pub dropped_coarsen_flags: usize,
}

/// Forest of `2^D`-trees: quadtrees for `D = 2`, octrees for `D = 3`.
#[derive(Debug, Clone, Default)]
pub struct CellForest<const D: usize> {
    cells: Vec<Option<CellRecord>>,
}

/// A quadtree forest (`D = 2`).
pub type QuadCellForest = CellForest<2>;
/// An octree forest (`D = 3`).
pub type OctCellForest = CellForest<3>;

impl<const D: usize> CellForest<D> {
    /// Number of children produced by refining one cell.
    pub const CHILDREN_PER_CELL: usize = 1 << D;

    /// Create an empty forest.
    pub fn new() -> Self {
        Self { cells: Vec::new() }
    }

    /// Add an active root cell using finite element `fe_index`.
    pub fn add_root(&mut self, fe_index: FeIndex) -> CellId {
        self.push_record(CellRecord {
            level: 0,
            parent: None,
            children: Vec::new(),
            active_fe_index: fe_index,
            flag: AdaptFlag::None,
            future_fe_index: None,
        })
    }

    /// Split an active cell into `2^D` active children.
    ///
    /// The children inherit the cell's active finite element; the cell's
    /// markers are dropped since it is no longer active.
    pub fn refine_cell(&mut self, id: CellId) -> Result<Vec<CellId>, MeshHpError> {
        let (level, fe_index) = {
            let record = self.active_record(id)?;
            let level = record.level.checked_add(1).ok_or_else(|| {
                MeshHpError::InconsistentTopology(format!(
                    "cell `{id}` is already at the maximum refinement level"
                ))
            })?;
            (level, record.active_fe_index)
        };
        let children: Vec<CellId> = (0..Self::CHILDREN_PER_CELL)
            .map(|_| {
                self.push_record(CellRecord {
                    level,
                    parent: Some(id),
                    children: Vec::new(),
                    active_fe_index: fe_index,
                    flag: AdaptFlag::None,
                    future_fe_index: None,
                })
            })
            .collect();
        let record = self.record_mut(id)?;
        record.children = children.clone();
        record.flag = AdaptFlag::None;
        record.future_fe_index = None;
        Ok(children)
    }

    /// Number of live cells, active or not.
    pub fn n_cells(&self) -> usize {
        self.cells.iter().flatten().count()
    }

    /// Number of active cells.
    pub fn n_active_cells(&self) -> usize {
        self.cells.iter().flatten().filter(|c| c.is_active()).count()
    }

    /// Active cells in arena order.
    ///
    /// The order is stable between calls as long as the forest is not
    /// modified; per-active-cell vectors are indexed in this order.
    pub fn active_cells(&self) -> impl Iterator<Item = CellId> + '_ {
        self.cells.iter().enumerate().filter_map(|(slot, cell)| {
            cell.as_ref()
                .filter(|c| c.is_active())
                .map(|_| CellId(slot as u32))
        })
    }

    /// Markers of all active cells, in [`active_cells`](Self::active_cells) order.
    pub fn active_snapshot(&self) -> Vec<ActiveCell> {
        self.cells
            .iter()
            .enumerate()
            .filter_map(|(slot, cell)| {
                let cell = cell.as_ref().filter(|c| c.is_active())?;
                Some(ActiveCell {
                    id: CellId(slot as u32),
                    parent: cell.parent,
                    flag: cell.flag,
                    active_fe_index: cell.active_fe_index,
                    future_fe_index: cell.future_fe_index,
                })
            })
            .collect()
    }

    /// Whether `id` refers to a live cell.
    pub fn contains(&self, id: CellId) -> bool {
        self.record(id).is_ok()
    }

    /// Whether the cell is a leaf.
    pub fn is_active(&self, id: CellId) -> Result<bool, MeshHpError> {
        Ok(self.record(id)?.is_active())
    }

    /// Refinement level (0 for roots).
    pub fn level(&self, id: CellId) -> Result<u8, MeshHpError> {
        Ok(self.record(id)?.level)
    }

    /// Parent of the cell, `None` for roots.
    pub fn parent(&self, id: CellId) -> Result<Option<CellId>, MeshHpError> {
        Ok(self.record(id)?.parent)
    }

    /// Children of the cell (empty for active cells).
    pub fn children(&self, id: CellId) -> Result<&[CellId], MeshHpError> {
        Ok(&self.record(id)?.children)
    }

    /// All children of the cell's parent, the cell included.
    ///
    /// A root cell is its own only sibling.
    pub fn siblings(&self, id: CellId) -> Result<Vec<CellId>, MeshHpError> {
        match self.record(id)?.parent {
            Some(parent) => Ok(self.record(parent)?.children.clone()),
            None => Ok(vec![id]),
        }
    }

    /// Parents whose children are all active, together with those children.
    ///
    /// These are the groups that can be merged by coarsening.
    pub fn sibling_groups(&self) -> Vec<(CellId, Vec<CellId>)> {
        self.cells
            .iter()
            .enumerate()
            .filter_map(|(slot, cell)| {
                let cell = cell.as_ref().filter(|c| !c.is_active())?;
                let mergeable = cell
                    .children
                    .iter()
                    .all(|child| self.record(*child).map(|c| c.is_active()).unwrap_or(false));
                mergeable.then(|| (CellId(slot as u32), cell.children.clone()))
            })
            .collect()
    }

    /// h flag of the cell.
    pub fn flag(&self, id: CellId) -> Result<AdaptFlag, MeshHpError> {
        Ok(self.record(id)?.flag)
    }

    /// Set the h flag of an active cell, replacing any previous one.
    pub fn set_flag(&mut self, id: CellId, flag: AdaptFlag) -> Result<(), MeshHpError> {
        self.active_record_mut(id)?.flag = flag;
        Ok(())
    }

    /// Flag an active cell for refinement.
    pub fn set_refine_flag(&mut self, id: CellId) -> Result<(), MeshHpError> {
        self.set_flag(id, AdaptFlag::Refine)
    }

    /// Flag an active cell for coarsening.
    pub fn set_coarsen_flag(&mut self, id: CellId) -> Result<(), MeshHpError> {
        self.set_flag(id, AdaptFlag::Coarsen)
    }

    /// Remove any h flag from the cell.
    pub fn clear_flag(&mut self, id: CellId) -> Result<(), MeshHpError> {
        self.record_mut(id)?.flag = AdaptFlag::None;
        Ok(())
    }

    pub fn refine_flag_set(&self, id: CellId) -> Result<bool, MeshHpError> {
        Ok(self.flag(id)? == AdaptFlag::Refine)
    }

    pub fn coarsen_flag_set(&self, id: CellId) -> Result<bool, MeshHpError> {
        Ok(self.flag(id)? == AdaptFlag::Coarsen)
    }

    /// Finite element currently used on the cell.
    pub fn active_fe_index(&self, id: CellId) -> Result<FeIndex, MeshHpError> {
        Ok(self.record(id)?.active_fe_index)
    }

    /// Replace the active finite element of an active cell.
    pub fn set_active_fe_index(&mut self, id: CellId, index: FeIndex) -> Result<(), MeshHpError> {
        self.active_record_mut(id)?.active_fe_index = index;
        Ok(())
    }

    /// Finite element the cell will use after the next adaptation.
    ///
    /// Falls back to the active finite element when no future one is assigned.
    pub fn future_fe_index(&self, id: CellId) -> Result<FeIndex, MeshHpError> {
        let record = self.record(id)?;
        Ok(record.future_fe_index.unwrap_or(record.active_fe_index))
    }

    /// Whether a future finite element has been assigned.
    pub fn future_fe_index_set(&self, id: CellId) -> Result<bool, MeshHpError> {
        Ok(self.record(id)?.future_fe_index.is_some())
    }

    /// The assigned future finite element, without fallback.
    pub fn assigned_future_fe_index(&self, id: CellId) -> Result<Option<FeIndex>, MeshHpError> {
        Ok(self.record(id)?.future_fe_index)
    }

    /// Schedule a switch to finite element `index` on an active cell.
    pub fn set_future_fe_index(&mut self, id: CellId, index: FeIndex) -> Result<(), MeshHpError> {
        self.active_record_mut(id)?.future_fe_index = Some(index);
        Ok(())
    }

    pub fn clear_future_fe_index(&mut self, id: CellId) -> Result<(), MeshHpError> {
        self.record_mut(id)?.future_fe_index = None;
        Ok(())
    }

    /// Drop coarsen flags that cannot lead to geometric coarsening.
    ///
    /// A sibling group is only merged when every child is active and flagged
    /// for coarsening; flags on roots and on incomplete groups are cleared.
    /// Returns the number of cleared flags.
    pub fn clean_sibling_coarsen_flags(&mut self) -> usize {
        let doomed: Vec<CellId> = self
            .active_snapshot()
            .into_iter()
            .filter(|cell| cell.flag == AdaptFlag::Coarsen)
            .filter(|cell| match cell.parent {
                Some(parent) => !self.group_fully_coarsen_flagged(parent),
                None => true,
            })
            .map(|cell| cell.id)
            .collect();
        for id in &doomed {
            if let Some(Some(record)) = self.cells.get_mut(id.slot()) {
                record.flag = AdaptFlag::None;
            }
        }
        if !doomed.is_empty() {
            log::debug!(
                "dropped {} coarsen flags on incomplete sibling groups",
                doomed.len()
            );
        }
        doomed.len()
    }

    /// Carry out all markers: switch finite elements, refine and coarsen.
    ///
    /// Coarsen flags of incomplete sibling groups are dropped first. Refined
    /// cells hand their future finite element to their children; a merged
    /// parent takes the highest future finite element among its children.
    /// All markers are cleared afterwards.
    pub fn execute_coarsening_and_refinement(
        &mut self,
        fe: &FeCollection,
    ) -> Result<ExecutionSummary, MeshHpError> {
        self.check_fe_indices(fe)?;
        let mut summary = ExecutionSummary {
            dropped_coarsen_flags: self.clean_sibling_coarsen_flags(),
            ..ExecutionSummary::default()
        };

        let snapshot = self.active_snapshot();
        let coarsen_parents: Vec<CellId> = {
            let mut parents: Vec<CellId> = snapshot
                .iter()
                .filter(|cell| cell.flag == AdaptFlag::Coarsen)
                .filter_map(|cell| cell.parent)
                .collect();
            parents.sort_unstable();
            parents.dedup();
            parents
        };

        for cell in &snapshot {
            if let Some(future) = cell.future_fe_index {
                if future != cell.active_fe_index {
                    summary.p_adapted += 1;
                }
                let record = self.record_mut(cell.id)?;
                record.active_fe_index = future;
                record.future_fe_index = None;
            }
        }

        for cell in snapshot.iter().filter(|c| c.flag == AdaptFlag::Refine) {
            self.refine_cell(cell.id)?;
            summary.refined += 1;
        }

        for parent in coarsen_parents {
            self.merge_children(parent)?;
            summary.coarsened_groups += 1;
        }

        log::debug!(
            "executed adaptation: {} p-adapted, {} refined, {} groups coarsened",
            summary.p_adapted,
            summary.refined,
            summary.coarsened_groups
        );
        crate::debug_invariants!(self.validate_invariants(), "forest after execution");
        Ok(summary)
    }

    /// Fail with [`MeshHpError::InvalidFeIndex`] unless every active and
    /// future index of every active cell belongs to `fe`.
    pub(crate) fn check_fe_indices(&self, fe: &FeCollection) -> Result<(), MeshHpError> {
        for cell in self.cells.iter().flatten().filter(|c| c.is_active()) {
            fe.check_index(cell.active_fe_index)?;
            if let Some(future) = cell.future_fe_index {
                fe.check_index(future)?;
            }
        }
        Ok(())
    }

    fn group_fully_coarsen_flagged(&self, parent: CellId) -> bool {
        self.record(parent)
            .map(|p| {
                p.children.iter().all(|child| {
                    self.record(*child)
                        .map(|c| c.is_active() && c.flag == AdaptFlag::Coarsen)
                        .unwrap_or(false)
                })
            })
            .unwrap_or(false)
    }

    fn merge_children(&mut self, parent: CellId) -> Result<(), MeshHpError> {
        let children = std::mem::take(&mut self.record_mut(parent)?.children);
        let mut fe_index = None;
        for child in &children {
            let record = self
                .cells
                .get_mut(child.slot())
                .and_then(Option::take)
                .ok_or(MeshHpError::UnknownCell(*child))?;
            fe_index = fe_index.max(Some(record.active_fe_index));
        }
        let record = self.record_mut(parent)?;
        if let Some(fe_index) = fe_index {
            record.active_fe_index = fe_index;
        }
        record.flag = AdaptFlag::None;
        record.future_fe_index = None;
        Ok(())
    }

    fn push_record(&mut self, record: CellRecord) -> CellId {
        let id = CellId(self.cells.len() as u32);
        self.cells.push(Some(record));
        id
    }

    fn record(&self, id: CellId) -> Result<&CellRecord, MeshHpError> {
        self.cells
            .get(id.slot())
            .and_then(Option::as_ref)
            .ok_or(MeshHpError::UnknownCell(id))
    }

    fn record_mut(&mut self, id: CellId) -> Result<&mut CellRecord, MeshHpError> {
        self.cells
            .get_mut(id.slot())
            .and_then(Option::as_mut)
            .ok_or(MeshHpError::UnknownCell(id))
    }

    fn active_record(&self, id: CellId) -> Result<&CellRecord, MeshHpError> {
        let record = self.record(id)?;
        if record.is_active() {
            Ok(record)
        } else {
            Err(MeshHpError::CellNotActive(id))
        }
    }

    fn active_record_mut(&mut self, id: CellId) -> Result<&mut CellRecord, MeshHpError> {
        let record = self.record_mut(id)?;
        if record.is_active() {
            Ok(record)
        } else {
            Err(MeshHpError::CellNotActive(id))
        }
    }
}

impl<const D: usize> DebugInvariants for CellForest<D> {
    fn debug_assert_invariants(&self) {
        crate::debug_invariants!(self.validate_invariants(), "CellForest");
    }

    fn validate_invariants(&self) -> Result<(), MeshHpError> {
        for (slot, cell) in self.cells.iter().enumerate() {
            let Some(cell) = cell else { continue };
            let id = CellId(slot as u32);
            if let Some(parent) = cell.parent {
                let parent_record = self.record(parent).map_err(|_| {
                    MeshHpError::InconsistentTopology(format!(
                        "cell `{id}` points to missing parent `{parent}`"
                    ))
                })?;
                if !parent_record.children.contains(&id) {
                    return Err(MeshHpError::InconsistentTopology(format!(
                        "parent `{parent}` does not list child `{id}`"
                    )));
                }
            }
            if !cell.children.is_empty() {
                if cell.children.len() != Self::CHILDREN_PER_CELL {
                    return Err(MeshHpError::InconsistentTopology(format!(
                        "cell `{id}` has {} children, expected {}",
                        cell.children.len(),
                        Self::CHILDREN_PER_CELL
                    )));
                }
                for child in &cell.children {
                    let child_record = self.record(*child)?;
                    if child_record.parent != Some(id) || child_record.level != cell.level + 1 {
                        return Err(MeshHpError::InconsistentTopology(format!(
                            "child `{child}` does not point back to `{id}`"
                        )));
                    }
                }
                if cell.flag != AdaptFlag::None || cell.future_fe_index.is_some() {
                    return Err(MeshHpError::CellNotActive(id));
                }
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod layout_tests {
    use super::*;
    use static_assertions::assert_eq_size;

    assert_eq_size!(CellId, u32);
}
