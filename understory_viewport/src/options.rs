// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Observer configuration: visibility thresholds and root-bounds selection.

use smallvec::SmallVec;
use thiserror::Error;

/// Reasons a threshold configuration is rejected.
#[derive(Copy, Clone, Debug, PartialEq, Error)]
pub enum ThresholdError {
    /// A threshold list must contain at least one value.
    #[error("threshold list is empty")]
    Empty,
    /// Thresholds are visibility ratios and must lie in `[0, 1]`. NaN is out of range too.
    #[error("threshold {0} is outside [0, 1]")]
    OutOfRange(f64),
}

/// Visibility-ratio thresholds at which an observer reports a transition.
///
/// Values are kept in the order they were given. Observers that need a sorted
/// view sort their own copy.
#[derive(Clone, Debug, PartialEq)]
pub struct Threshold(SmallVec<[f64; 4]>);

impl Threshold {
    /// A single threshold.
    pub fn single(value: f64) -> Result<Self, ThresholdError> {
        Self::list(&[value])
    }

    /// A list of thresholds.
    ///
    /// # Examples
    ///
    /// ```
    /// use understory_viewport::{Threshold, ThresholdError};
    ///
    /// let t = Threshold::list(&[0.0, 0.5, 1.0]).unwrap();
    /// assert_eq!(t.values(), &[0.0, 0.5, 1.0]);
    ///
    /// assert_eq!(Threshold::list(&[]), Err(ThresholdError::Empty));
    /// assert_eq!(Threshold::single(1.5), Err(ThresholdError::OutOfRange(1.5)));
    /// ```
    pub fn list(values: &[f64]) -> Result<Self, ThresholdError> {
        if values.is_empty() {
            return Err(ThresholdError::Empty);
        }
        if let Some(bad) = values.iter().find(|v| !(0.0..=1.0).contains(*v)) {
            return Err(ThresholdError::OutOfRange(*bad));
        }
        Ok(Self(SmallVec::from_slice(values)))
    }

    /// The configured values, in the order given.
    pub fn values(&self) -> &[f64] {
        &self.0
    }
}

impl Default for Threshold {
    fn default() -> Self {
        Self(SmallVec::from_slice(&[0.0]))
    }
}

/// Options used when a tracker creates the observer for a window.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct ObserverOptions {
    /// Ratios at which transitions are reported. Passed to the observer unmodified.
    pub threshold: Threshold,
    /// Report root bounds even inside an embedded window.
    ///
    /// When set and the window is iframed, the observer is rooted at the
    /// embedded document instead of the implicit top-level viewport.
    pub needs_root_bounds: bool,
}

impl ObserverOptions {
    /// Default options: a single `0.0` threshold and the implicit viewport root.
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace the thresholds with a single value.
    pub fn with_threshold(mut self, value: f64) -> Result<Self, ThresholdError> {
        self.threshold = Threshold::single(value)?;
        Ok(self)
    }

    /// Replace the thresholds with a list of values.
    pub fn with_thresholds(mut self, values: &[f64]) -> Result<Self, ThresholdError> {
        self.threshold = Threshold::list(values)?;
        Ok(self)
    }

    /// Set [`needs_root_bounds`](Self::needs_root_bounds).
    pub fn with_root_bounds(mut self, needs_root_bounds: bool) -> Self {
        self.needs_root_bounds = needs_root_bounds;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_zero_threshold_and_implicit_root() {
        let opts = ObserverOptions::new();
        assert_eq!(opts.threshold.values(), &[0.0]);
        assert!(!opts.needs_root_bounds);
    }

    #[test]
    fn builder_keeps_order_and_rejects_bad_values() {
        let opts = ObserverOptions::new()
            .with_thresholds(&[1.0, 0.25])
            .unwrap()
            .with_root_bounds(true);
        assert_eq!(opts.threshold.values(), &[1.0, 0.25]);
        assert!(opts.needs_root_bounds);

        assert_eq!(
            ObserverOptions::new().with_threshold(-0.1),
            Err(ThresholdError::OutOfRange(-0.1))
        );
        assert!(matches!(
            ObserverOptions::new().with_threshold(f64::NAN),
            Err(ThresholdError::OutOfRange(_))
        ));
    }
}
