//! hp-adaptivity: finite element hierarchies and the h-versus-p decision
//! procedures operating on a [`CellForest`](crate::forest::CellForest).

pub mod fe_collection;
pub mod refinement;

pub use fe_collection::{FeCollection, FeIndex, FiniteElement};
