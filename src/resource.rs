//! Resource vectors and the pluggable dominance rule used to compare them.
//!
//! Mirrors the teacher's preference for small, cheaply-`Clone`able value
//! types (`planner/types.rs`'s `PlannedAllocation`) over reference-heavy
//! structures: a `Resource` is just a vector of `i64` counters that gets
//! copied freely through the measure store and relationship store.

use crate::error::PreemptionError;

/// The canonical dimension layout: memory first, virtual cores second.
/// Every `Resource` constructed through [`Resource::new`] has exactly
/// these two dimensions; [`Resource::from_dims`] exists for callers that
/// need a different (but fixed, cluster-wide) dimension count.
pub const MEMORY: usize = 0;
pub const VCORES: usize = 1;
pub const DEFAULT_DIMENSIONS: usize = 2;

/// A vector of countable resource dimensions (memory, vcores, ...).
///
/// All arithmetic is componentwise and infallible; dimension-count
/// mismatches are rejected only at construction time (see
/// [`Resource::from_dims`]), never inside the hot arithmetic path, so the
/// selection engine and measure store can add/subtract without threading
/// `Result` through every call.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Resource {
    dims: Vec<i64>,
}

impl Resource {
    /// Build a resource with the default `<memory, vcores>` layout.
    pub fn new(memory: i64, vcores: i64) -> Self {
        Self {
            dims: vec![memory, vcores],
        }
    }

    /// Build a resource from an arbitrary dimension vector, validating it
    /// against the calculator's configured dimensionality.
    ///
    /// This is the one place a dimension mismatch is a real error rather
    /// than a silent no-op: padding or truncating a mis-sized vector would
    /// corrupt every downstream conservation invariant (P1 in the spec).
    pub fn from_dims(dims: Vec<i64>, expected_dimensions: usize) -> Result<Self, PreemptionError> {
        if dims.len() != expected_dimensions {
            return Err(PreemptionError::InvalidResourceVector {
                expected: expected_dimensions,
                got: dims.len(),
            });
        }
        Ok(Self { dims })
    }

    /// The all-zero resource with the default two-dimension layout.
    pub fn zero() -> Self {
        Self::new(0, 0)
    }

    pub fn memory(&self) -> i64 {
        self.dims.get(MEMORY).copied().unwrap_or(0)
    }

    pub fn vcores(&self) -> i64 {
        self.dims.get(VCORES).copied().unwrap_or(0)
    }

    pub fn dims(&self) -> &[i64] {
        &self.dims
    }

    pub fn is_zero(&self) -> bool {
        self.dims.iter().all(|&d| d == 0)
    }

    #[must_use]
    pub fn add(&self, other: &Resource) -> Resource {
        Resource {
            dims: zip_dims(self, other, |a, b| a.saturating_add(b)),
        }
    }

    #[must_use]
    pub fn sub(&self, other: &Resource) -> Resource {
        Resource {
            dims: zip_dims(self, other, |a, b| a.saturating_sub(b)),
        }
    }

    #[must_use]
    pub fn negate(&self) -> Resource {
        Resource {
            dims: self.dims.iter().map(|&d| d.saturating_neg()).collect(),
        }
    }
}

/// Combine two resources dimension-by-dimension, extending the shorter one
/// with zeros. Arithmetic never panics on mismatched lengths: the only
/// validated boundary is [`Resource::from_dims`].
fn zip_dims(a: &Resource, b: &Resource, f: impl Fn(i64, i64) -> i64) -> Vec<i64> {
    let len = a.dims.len().max(b.dims.len());
    (0..len)
        .map(|i| {
            let av = a.dims.get(i).copied().unwrap_or(0);
            let bv = b.dims.get(i).copied().unwrap_or(0);
            f(av, bv)
        })
        .collect()
}

/// Dominance rule used by [`fits_in`][ResourceCalculator::fits_in] and, by
/// extension, the selection engine's admission predicate. Kept as a trait
/// (rather than a free function) so alternate dominance rules — e.g.
/// dominant-share comparisons instead of plain componentwise `<=` — can be
/// substituted without touching the engine, the same way the original
/// system treats its resource calculator as an injected policy.
pub trait ResourceCalculator: Send + Sync {
    /// Returns true when `a` does not exceed `b` under this calculator's
    /// dominance rule.
    fn fits_in(&self, a: &Resource, b: &Resource) -> bool;
}

/// Plain componentwise `<=` dominance: `a` fits in `b` iff every dimension
/// of `a` is less than or equal to the corresponding dimension of `b`.
#[derive(Debug, Clone, Copy, Default)]
pub struct DominantResourceCalculator;

impl ResourceCalculator for DominantResourceCalculator {
    fn fits_in(&self, a: &Resource, b: &Resource) -> bool {
        let len = a.dims.len().max(b.dims.len());
        (0..len).all(|i| {
            let av = a.dims.get(i).copied().unwrap_or(0);
            let bv = b.dims.get(i).copied().unwrap_or(0);
            av <= bv
        })
    }
}


#[cfg(test)]
mod proptests {
    use super::*;
    use proptest::prelude::*;

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(1000))]

        /// P2 (symmetric bookkeeping): add then sub the same delta returns
        /// to the starting vector, for any starting vector and any delta.
        #[test]
        fn add_then_sub_is_identity(
            memory in -1_000_000i64..=1_000_000,
            vcores in -1_000_000i64..=1_000_000,
            dmem in -1_000_000i64..=1_000_000,
            dvc in -1_000_000i64..=1_000_000,
        ) {
            let base = Resource::new(memory, vcores);
            let delta = Resource::new(dmem, dvc);
            prop_assert_eq!(base.add(&delta).sub(&delta), base);
        }

        /// negate is its own inverse, and a + (-a) is always zero.
        #[test]
        fn negate_is_involution_and_cancels(
            memory in -1_000_000i64..=1_000_000,
            vcores in -1_000_000i64..=1_000_000,
        ) {
            let a = Resource::new(memory, vcores);
            prop_assert_eq!(a.negate().negate(), a.clone());
            prop_assert!(a.add(&a.negate()).is_zero());
        }

        /// fits_in is reflexive: any vector fits in itself.
        #[test]
        fn fits_in_is_reflexive(
            memory in -1_000_000i64..=1_000_000,
            vcores in -1_000_000i64..=1_000_000,
        ) {
            let calc = DominantResourceCalculator;
            let a = Resource::new(memory, vcores);
            prop_assert!(calc.fits_in(&a, &a));
        }
    }
}
