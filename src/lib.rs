#![cfg_attr(docsrs, feature(doc_cfg))]
//! # mesh-hp
//!
//! mesh-hp decides, per mesh cell, whether an adaptation step changes the
//! geometry (h adaptivity: split or merge cells) or the polynomial degree of
//! the finite element (p adaptivity), and resolves cells scheduled for both.
//!
//! ## Features
//! - An arena-backed quad/oct-tree [`CellForest`](forest::CellForest) holding
//!   h flags and future finite element indices on its active cells
//! - Ordered [`FeCollection`](hp::FeCollection)s with saturating
//!   superordinate/subordinate lookup
//! - Five strategies assigning future finite elements: full, explicit flags,
//!   smoothness threshold, Sobolev regularity and error prediction
//! - Two h-versus-p decision procedures: force and per-sibling-group choose
//! - Error prediction for the next adaptation cycle
//! - Optional `rayon` feature evaluating per-cell decisions in parallel
//!
//! ## Usage
//!
//! ```toml
//! [dependencies]
//! mesh-hp = "0.1"
//! # Optional features:
//! # features = ["rayon"]
//! ```
//!
//! A typical cycle: flag cells with an error estimator, pick a
//! [`PAdaptivity`](hp::refinement::PAdaptivity) strategy, resolve with an
//! [`HpDecision`](hp::refinement::HpDecision), then execute the forest.
//!
//! ## Determinism
//!
//! Active cells are always visited in arena order; indicator vectors are
//! indexed in that order. Parallel evaluation produces the same markers as
//! the serial one.
//!
//! ## Logging
//!
//! Decisions are reported through the [`log`] facade; install any logger to
//! see per-strategy summaries (`debug`) and per-cell decisions (`trace`).

pub mod debug_invariants;
pub mod forest;
pub mod hp;
pub mod mesh_error;

pub use debug_invariants::DebugInvariants;

/// A convenient prelude to import the most-used traits & types:
pub mod prelude {
    pub use crate::debug_invariants::DebugInvariants;
    pub use crate::forest::{AdaptFlag, CellForest, CellId, OctCellForest, QuadCellForest};
    pub use crate::hp::fe_collection::{FeCollection, FeIndex, FiniteElement};
    pub use crate::hp::refinement::{
        AdaptationIntent, HpDecision, PAdaptivity, PAdaptivityReport, PredictionOptions,
        ThresholdOptions, choose_p_over_h, force_p_over_h, full_p_adaptivity, hp_adapt,
        p_adaptivity_from_flags, p_adaptivity_from_prediction, p_adaptivity_from_regularity,
        p_adaptivity_from_threshold, predict_error,
    };
    pub use crate::mesh_error::MeshHpError;
}
