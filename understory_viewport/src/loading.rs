// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Loading priority for viewport-driven content.

use core::convert::Infallible;
use core::fmt;
use core::str::FromStr;

/// How eagerly an element's content should load, lowest priority first.
///
/// Several sources may request a priority for the same element; combine them
/// with [`Loading::reduce`], which keeps the highest.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Loading {
    /// Let the host decide.
    #[default]
    Auto,
    /// Load once the element approaches the viewport.
    Lazy,
    /// Load immediately.
    Eager,
    /// Release loaded content.
    Unload,
}

impl Loading {
    /// Parse an attribute value. Unrecognized values are [`Loading::Auto`].
    pub fn parse(value: &str) -> Self {
        match value {
            "lazy" => Self::Lazy,
            "eager" => Self::Eager,
            "unload" => Self::Unload,
            _ => Self::Auto,
        }
    }

    /// The attribute spelling.
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Auto => "auto",
            Self::Lazy => "lazy",
            Self::Eager => "eager",
            Self::Unload => "unload",
        }
    }

    /// The higher of two priorities.
    ///
    /// ```
    /// use understory_viewport::Loading;
    ///
    /// assert_eq!(Loading::Lazy.reduce(Loading::Eager), Loading::Eager);
    /// assert_eq!(Loading::Unload.reduce(Loading::Auto), Loading::Unload);
    /// assert_eq!(Loading::parse("bogus").reduce(Loading::Lazy), Loading::Lazy);
    /// ```
    #[must_use]
    pub fn reduce(self, other: Self) -> Self {
        self.max(other)
    }
}

impl FromStr for Loading {
    type Err = Infallible;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(Self::parse(s))
    }
}

impl fmt::Display for Loading {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_round_trips_known_values_and_defaults_unknown() {
        for l in [Loading::Auto, Loading::Lazy, Loading::Eager, Loading::Unload] {
            assert_eq!(Loading::parse(l.as_str()), l);
        }
        assert_eq!(Loading::parse(""), Loading::Auto);
        assert_eq!("EAGER".parse::<Loading>(), Ok(Loading::Auto));
    }

    #[test]
    fn reduce_is_commutative_and_picks_the_max() {
        let all = [Loading::Auto, Loading::Lazy, Loading::Eager, Loading::Unload];
        for a in all {
            for b in all {
                assert_eq!(a.reduce(b), b.reduce(a));
                assert!(a.reduce(b) >= a && a.reduce(b) >= b);
            }
        }
        assert_eq!(Loading::default().reduce(Loading::Lazy), Loading::Lazy);
    }
}
