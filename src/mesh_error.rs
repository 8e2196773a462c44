//! MeshHpError: Unified error type for mesh-hp public APIs
//!
//! Every contract violation of the hp decision procedures (mismatched
//! indicator vectors, out-of-range parameters, markers on inactive cells, ...)
//! is reported through this type. Checks run on entry, before any cell is
//! touched.

use crate::forest::CellId;
use thiserror::Error;

/// Unified error type for mesh-hp operations.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum MeshHpError {
    /// A cell id does not refer to a live cell of the forest.
    #[error("unknown cell `{0}`")]
    UnknownCell(CellId),
    /// Markers (flags, future fe indices) can only live on active cells.
    #[error("cell `{0}` is not active")]
    CellNotActive(CellId),
    /// A per-active-cell vector does not have one entry per active cell.
    #[error("`{name}` has {found} entries, expected one per active cell ({expected})")]
    IndicatorLengthMismatch {
        /// Name of the offending input.
        name: &'static str,
        /// Number of active cells.
        expected: usize,
        /// Length of the supplied vector.
        found: usize,
    },
    /// An interpolation fraction left the closed unit interval.
    #[error("`{name}` must lie in [0, 1], got {value}")]
    FractionOutOfRange {
        /// Name of the offending parameter.
        name: &'static str,
        /// Supplied value.
        value: f64,
    },
    /// A parameter of the error prediction is not a positive finite number.
    #[error("prediction parameter `{name}` must be positive and finite, got {value}")]
    InvalidPredictionParameter {
        /// Name of the offending parameter.
        name: &'static str,
        /// Supplied value.
        value: f64,
    },
    /// An indicator of a flagged cell is NaN or infinite.
    #[error("indicator `{name}` of cell `{cell}` is not finite")]
    NonFiniteIndicator {
        /// Name of the indicator vector.
        name: &'static str,
        /// Cell carrying the value.
        cell: CellId,
    },
    /// A finite element index is not part of the collection.
    #[error("fe index {index} out of range for a collection of {len} elements")]
    InvalidFeIndex {
        /// Offending index.
        index: usize,
        /// Size of the collection.
        len: usize,
    },
    /// The finite element collection holds no element.
    #[error("finite element collection is empty")]
    EmptyFeCollection,
    /// Elements must be ordered by non-decreasing polynomial degree.
    #[error("degree {degree} of element {index} is lower than its predecessor's {previous}")]
    NonMonotoneDegree {
        /// Index of the offending element.
        index: usize,
        /// Its degree.
        degree: u32,
        /// Degree of the element before it.
        previous: u32,
    },
    /// A polynomial degree cannot be represented in the indicator number type.
    #[error("degree {0} cannot be represented in the indicator number type")]
    DegreeConversion(u32),
    /// Parent/child back-references disagree.
    #[error("Topology error: {0}")]
    InconsistentTopology(String),
}
