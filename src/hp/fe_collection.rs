//! Ordered collection of finite elements used by hp-adaptivity.
//!
//! Elements are ordered by polynomial degree: element `i + 1` is the
//! superordinate of `i` (target of p refinement) and `i - 1` its subordinate
//! (target of p coarsening). Index arithmetic saturates at both ends.

use crate::debug_invariants::DebugInvariants;
use crate::mesh_error::MeshHpError;
use serde::{Deserialize, Serialize};

/// Index of an element inside a [`FeCollection`].
pub type FeIndex = usize;

/// Descriptor of one finite element.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FiniteElement {
    /// Human readable name, e.g. `"FE_Q(2)"`.
    pub name: String,
    /// Polynomial degree of the element.
    pub degree: u32,
}

impl FiniteElement {
    pub fn new(name: impl Into<String>, degree: u32) -> Self {
        Self {
            name: name.into(),
            degree,
        }
    }
}

/// Non-empty list of finite elements with non-decreasing degrees.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "Vec<FiniteElement>", into = "Vec<FiniteElement>")]
pub struct FeCollection {
    elements: Vec<FiniteElement>,
}

impl FeCollection {
    /// Build a collection from a list of elements.
    pub fn new(elements: Vec<FiniteElement>) -> Result<Self, MeshHpError> {
        let fe = Self { elements };
        fe.validate_invariants()?;
        Ok(fe)
    }

    /// Build a collection of Lagrange-type elements `FE_Q(k)` from their degrees.
    pub fn from_degrees(degrees: &[u32]) -> Result<Self, MeshHpError> {
        Self::new(
            degrees
                .iter()
                .map(|&degree| FiniteElement::new(format!("FE_Q({degree})"), degree))
                .collect(),
        )
    }

    /// Append an element whose degree is at least the last one's.
    pub fn push(&mut self, element: FiniteElement) -> Result<FeIndex, MeshHpError> {
        let index = self.elements.len();
        if let Some(last) = self.elements.last() {
            if element.degree < last.degree {
                return Err(MeshHpError::NonMonotoneDegree {
                    index,
                    degree: element.degree,
                    previous: last.degree,
                });
            }
        }
        self.elements.push(element);
        Ok(index)
    }

    pub fn len(&self) -> usize {
        self.elements.len()
    }

    pub fn is_empty(&self) -> bool {
        self.elements.is_empty()
    }

    pub fn contains(&self, index: FeIndex) -> bool {
        index < self.elements.len()
    }

    /// Element at `index`.
    pub fn get(&self, index: FeIndex) -> Result<&FiniteElement, MeshHpError> {
        self.elements.get(index).ok_or(MeshHpError::InvalidFeIndex {
            index,
            len: self.elements.len(),
        })
    }

    /// Polynomial degree of the element at `index`.
    pub fn degree(&self, index: FeIndex) -> Result<u32, MeshHpError> {
        Ok(self.get(index)?.degree)
    }

    /// Next element up the hierarchy; the last element is its own superordinate.
    pub fn superordinate(&self, index: FeIndex) -> Result<FeIndex, MeshHpError> {
        self.check_index(index)?;
        Ok((index + 1).min(self.elements.len() - 1))
    }

    /// Next element down the hierarchy; element 0 is its own subordinate.
    pub fn subordinate(&self, index: FeIndex) -> Result<FeIndex, MeshHpError> {
        self.check_index(index)?;
        Ok(index.saturating_sub(1))
    }

    pub fn iter(&self) -> impl Iterator<Item = &FiniteElement> {
        self.elements.iter()
    }

    pub(crate) fn check_index(&self, index: FeIndex) -> Result<(), MeshHpError> {
        if self.contains(index) {
            Ok(())
        } else {
            Err(MeshHpError::InvalidFeIndex {
                index,
                len: self.elements.len(),
            })
        }
    }
}

impl DebugInvariants for FeCollection {
    fn debug_assert_invariants(&self) {
        crate::debug_invariants!(self.validate_invariants(), "FeCollection");
    }

    fn validate_invariants(&self) -> Result<(), MeshHpError> {
        if self.elements.is_empty() {
            return Err(MeshHpError::EmptyFeCollection);
        }
        match self
            .elements
            .windows(2)
            .position(|pair| pair[1].degree < pair[0].degree)
        {
            Some(i) => Err(MeshHpError::NonMonotoneDegree {
                index: i + 1,
                degree: self.elements[i + 1].degree,
                previous: self.elements[i].degree,
            }),
            None => Ok(()),
        }
    }
}

impl TryFrom<Vec<FiniteElement>> for FeCollection {
    type Error = MeshHpError;

    fn try_from(elements: Vec<FiniteElement>) -> Result<Self, Self::Error> {
        Self::new(elements)
    }
}

impl From<FeCollection> for Vec<FiniteElement> {
    fn from(fe: FeCollection) -> Self {
        fe.elements
    }
}
