// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

use smallvec::{Array, SmallVec};

/// Remove the first item matching `pred`, preserving the order of the rest.
///
/// Returns whether an item was removed.
pub(crate) fn remove_first<A: Array>(
    list: &mut SmallVec<A>,
    pred: impl FnMut(&A::Item) -> bool,
) -> bool {
    match list.iter().position(pred) {
        Some(i) => {
            list.remove(i);
            true
        }
        None => false,
    }
}
