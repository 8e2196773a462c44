//! Structural self-checks of the hp data structures.
//!
//! [`CellForest`](crate::forest::CellForest) verifies its parent/child
//! links and marker exclusivity, [`FeCollection`](crate::hp::FeCollection)
//! its non-empty, degree-ordered hierarchy. The checks run after every
//! forest execution in debug builds, or in release builds with the
//! `strict-invariants` / `check-invariants` features.

use crate::mesh_error::MeshHpError;

/// Self-validation of a data structure.
pub trait DebugInvariants {
    /// Panic on a broken invariant when invariant checking is compiled in.
    fn debug_assert_invariants(&self);
    /// Return the first broken invariant.
    fn validate_invariants(&self) -> Result<(), MeshHpError>;
}

/// Panic with context if `$expr` yields an error, when invariant checking
/// is compiled in. Expands to nothing otherwise.
#[macro_export]
macro_rules! debug_invariants {
    ($expr:expr, $($ctx:tt)*) => {
        #[cfg(any(debug_assertions, feature = "strict-invariants", feature = "check-invariants"))]
        if let Err(e) = $expr {
            panic!(concat!("[hp invariants] ", $($ctx)*, ": {}"), e);
        }
    };
}
