//! Size Estimation Module
//!
//! Pluggable estimators that compute the budget footprint of a cached value.

use std::fmt::Debug;
use std::marker::PhantomData;

use serde::Serialize;
use tracing::warn;

use crate::error::{CacheError, Result};

/// Size charged to a value whose estimate could not be computed.
pub const DEFAULT_SIZE_ESTIMATE: usize = 1024;

// == Size Estimator Trait ==
/// Computes the estimated size in bytes of a value.
pub trait SizeEstimator<V>: Send + Sync + Debug {
    /// Returns the estimated size of `value`.
    fn estimate(&self, value: &V) -> Result<usize>;
}

/// Estimates `value`, falling back to [`DEFAULT_SIZE_ESTIMATE`] on failure.
///
/// Never blocks an insertion: failures are logged and charged the default size.
pub fn estimate_or_default<V>(estimator: &dyn SizeEstimator<V>, key: &str, value: &V) -> usize {
    match estimator.estimate(value) {
        Ok(size) => size,
        Err(err) => {
            warn!(
                key = key,
                error = %err,
                fallback = DEFAULT_SIZE_ESTIMATE,
                "size estimation failed, using default estimate"
            );
            DEFAULT_SIZE_ESTIMATE
        }
    }
}

// == JSON Estimator ==
/// Estimates size as the length of the value's JSON encoding.
pub struct JsonSizeEstimator<V> {
    _marker: PhantomData<fn(&V)>,
}

impl<V> JsonSizeEstimator<V> {
    pub fn new() -> Self {
        Self {
            _marker: PhantomData,
        }
    }
}

impl<V> Debug for JsonSizeEstimator<V> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("JsonSizeEstimator")
    }
}

impl<V> Default for JsonSizeEstimator<V> {
    fn default() -> Self {
        Self::new()
    }
}

impl<V: Serialize> SizeEstimator<V> for JsonSizeEstimator<V> {
    fn estimate(&self, value: &V) -> Result<usize> {
        serde_json::to_vec(value)
            .map(|encoded| encoded.len())
            .map_err(|e| CacheError::Serialization(e.to_string()))
    }
}

// == Fixed Estimator ==
/// Charges every value the same size. Turns the byte budget into a second
/// count budget; handy for values that cannot be serialized.
#[derive(Debug, Clone, Copy)]
pub struct FixedSizeEstimator(pub usize);

impl<V> SizeEstimator<V> for FixedSizeEstimator {
    fn estimate(&self, _value: &V) -> Result<usize> {
        Ok(self.0)
    }
}
