// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Layout-rectangle helpers over [`kurbo::Rect`].
//!
//! Rects are in screen space: `y0` is the top edge and `y1` the bottom.
//! Inputs are assumed to be normalized (`x0 <= x1`, `y0 <= y1`) and free of NaNs.

use kurbo::Rect;

/// Where one rect sits vertically relative to another.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum RelativePosition {
    /// Neither above nor below.
    Inside,
    /// Starts above the other rect's top edge.
    Top,
    /// Ends below the other rect's bottom edge.
    Bottom,
}

/// A rect from its left/top corner and size.
#[inline]
pub fn rect_ltwh(left: f64, top: f64, width: f64, height: f64) -> Rect {
    Rect::new(left, top, left + width, top + height)
}

/// Whether two rects overlap. Shared edges count as overlap.
#[inline]
pub fn rects_overlap(a: Rect, b: Rect) -> bool {
    a.y0 <= b.y1 && b.y0 <= a.y1 && a.x0 <= b.x1 && b.x0 <= a.x1
}

/// The intersection of all `rects`.
///
/// Returns `None` for an empty input or when the rects do not meet. Rects that
/// only touch produce a zero-area intersection rather than `None`.
///
/// ```
/// use kurbo::Rect;
/// use understory_viewport::layout_rect::rect_intersection;
///
/// let a = Rect::new(0.0, 0.0, 10.0, 10.0);
/// let b = Rect::new(5.0, 5.0, 15.0, 15.0);
/// assert_eq!(rect_intersection([a, b]), Some(Rect::new(5.0, 5.0, 10.0, 10.0)));
///
/// let c = Rect::new(10.0, 0.0, 20.0, 10.0);
/// assert_eq!(rect_intersection([a, c]), Some(Rect::new(10.0, 0.0, 10.0, 10.0)));
///
/// let d = Rect::new(11.0, 0.0, 20.0, 10.0);
/// assert_eq!(rect_intersection([a, d]), None);
/// ```
pub fn rect_intersection(rects: impl IntoIterator<Item = Rect>) -> Option<Rect> {
    let mut it = rects.into_iter();
    let mut acc = it.next()?;
    for r in it {
        acc = Rect::new(
            acc.x0.max(r.x0),
            acc.y0.max(r.y0),
            acc.x1.min(r.x1),
            acc.y1.min(r.y1),
        );
        if acc.x0 > acc.x1 || acc.y0 > acc.y1 {
            return None;
        }
    }
    Some(acc)
}

/// Fraction of `target`'s area that lies inside `root`.
///
/// A zero-area target counts as fully visible while it touches the root.
pub fn intersection_ratio(target: Rect, root: Rect) -> f64 {
    let Some(visible) = rect_intersection([target, root]) else {
        return 0.0;
    };
    let area = target.area();
    if area > 0.0 {
        (visible.area() / area).clamp(0.0, 1.0)
    } else {
        1.0
    }
}

/// Position of `r1` relative to `r2`, checking the top edge first.
pub fn relative_position(r1: Rect, r2: Rect) -> RelativePosition {
    if r1.y0 < r2.y0 {
        RelativePosition::Top
    } else if r1.y1 > r2.y1 {
        RelativePosition::Bottom
    } else {
        RelativePosition::Inside
    }
}

/// Grow `rect` on every side by `dw` widths horizontally and `dh` heights vertically.
pub fn expand_rect(rect: Rect, dw: f64, dh: f64) -> Rect {
    let w = rect.width();
    let h = rect.height();
    rect_ltwh(
        rect.x0 - w * dw,
        rect.y0 - h * dh,
        w * (1.0 + dw * 2.0),
        h * (1.0 + dh * 2.0),
    )
}

/// Translate `rect` by `(dx, dy)`.
#[inline]
pub fn move_rect(rect: Rect, dx: f64, dy: f64) -> Rect {
    if dx == 0.0 && dy == 0.0 {
        return rect;
    }
    Rect::new(rect.x0 + dx, rect.y0 + dy, rect.x1 + dx, rect.y1 + dy)
}

/// Whether two rects have the same width and height.
#[inline]
pub fn rect_size_equals(a: Rect, b: Rect) -> bool {
    a.width() == b.width() && a.height() == b.height()
}
