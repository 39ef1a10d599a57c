// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! A geometric [`IntersectionObserver`] for hosts that lay out their own elements.
//!
//! [`GeometricObserver`] computes visibility from rectangles supplied by the
//! host through [`LayoutWindow`] and [`LayoutElement`]. The host calls
//! [`GeometricObserver::update`] once per frame (or whenever layout or scroll
//! changes); records are produced with the usual threshold-crossing rules:
//!
//! - the threshold index is the number of thresholds `<=` the visible ratio for
//!   an intersecting target, and `0` otherwise;
//! - a record is queued when either the index or `is_intersecting` differs from
//!   the last reported state;
//! - a newly watched target has no reported state, so its first update always
//!   produces a record.

use alloc::rc::{Rc, Weak};
use alloc::vec::Vec;
use core::cell::RefCell;
use core::fmt;
use core::mem;

use kurbo::Rect;
use smallvec::SmallVec;
use tracing::{debug, trace};

use crate::layout_rect::{intersection_ratio, rect_intersection};
use crate::observer::{
    DispatchFn, IntersectionEntry, IntersectionObserver, ObserverFactory, ObserverInit,
    ObserverRoot, ViewportElement, ViewportWindow,
};

/// A window that can report its viewport and document rectangles.
pub trait LayoutWindow: ViewportWindow {
    /// The area visible to the user, as seen from this window.
    fn viewport_bounds(&self) -> Rect;

    /// The bounds of this window's own document.
    fn document_bounds(&self) -> Rect;
}

/// An element that can report its laid-out bounds.
pub trait LayoutElement: ViewportElement<Window: LayoutWindow> {
    /// Bounds in the same coordinate space as the window's rectangles.
    fn layout_bounds(&self) -> Rect;
}

struct Watched<E> {
    target: Weak<E>,
    /// `(threshold index, is_intersecting)` last reported, if any.
    reported: Option<(usize, bool)>,
}

struct Inner<E: LayoutElement> {
    window: Weak<E::Window>,
    root: ObserverRoot,
    thresholds: SmallVec<[f64; 4]>,
    targets: Vec<Watched<E>>,
    queue: Vec<IntersectionEntry<E>>,
    dispatch: DispatchFn<E>,
}

/// Shared handle to a rectangle-based intersection observer.
///
/// Clones refer to the same observer. The observer holds its window and
/// targets weakly; targets that are dropped simply stop being reported.
pub struct GeometricObserver<E: LayoutElement> {
    inner: Rc<RefCell<Inner<E>>>,
}

impl<E: LayoutElement> GeometricObserver<E> {
    /// Create an observer for `window` reporting to `dispatch`.
    pub fn new(window: &Rc<E::Window>, init: ObserverInit, dispatch: DispatchFn<E>) -> Self {
        let mut thresholds: SmallVec<[f64; 4]> = SmallVec::from_slice(init.threshold.values());
        thresholds.sort_unstable_by(f64::total_cmp);
        Self {
            inner: Rc::new(RefCell::new(Inner {
                window: Rc::downgrade(window),
                root: init.root,
                thresholds,
                targets: Vec::new(),
                queue: Vec::new(),
                dispatch,
            })),
        }
    }

    /// The measurement root.
    pub fn root(&self) -> ObserverRoot {
        self.inner.borrow().root
    }

    /// Thresholds in ascending order.
    pub fn thresholds(&self) -> SmallVec<[f64; 4]> {
        self.inner.borrow().thresholds.clone()
    }

    /// Number of targets being watched.
    pub fn watched_count(&self) -> usize {
        self.inner.borrow().targets.len()
    }

    /// Recompute every target's visibility at time `now` and queue changes.
    ///
    /// Returns the number of records queued by this call. Does nothing if the
    /// window is gone.
    pub fn compute(&self, now: f64) -> usize {
        let mut inner = self.inner.borrow_mut();
        let Some(window) = inner.window.upgrade() else {
            return 0;
        };
        let root_rect = match inner.root {
            ObserverRoot::ImplicitViewport => window.viewport_bounds(),
            ObserverRoot::EmbeddedDocument => window.document_bounds(),
        };
        let root_bounds = match inner.root {
            ObserverRoot::ImplicitViewport if window.is_iframed() => None,
            _ => Some(root_rect),
        };

        let Inner {
            thresholds,
            targets,
            queue,
            ..
        } = &mut *inner;
        targets.retain(|w| w.target.strong_count() > 0);
        let before = queue.len();
        for watched in targets.iter_mut() {
            let Some(target) = watched.target.upgrade() else {
                continue;
            };
            let bounds = target.layout_bounds();
            let visible = rect_intersection([bounds, root_rect]);
            let is_intersecting = visible.is_some();
            let ratio = intersection_ratio(bounds, root_rect);
            let index = if is_intersecting {
                thresholds.iter().take_while(|t| **t <= ratio).count()
            } else {
                0
            };
            let state = (index, is_intersecting);
            if watched.reported == Some(state) {
                continue;
            }
            watched.reported = Some(state);
            queue.push(IntersectionEntry {
                target,
                time: now,
                intersection_ratio: ratio,
                is_intersecting,
                bounding_client_rect: bounds,
                intersection_rect: visible.unwrap_or(Rect::ZERO),
                root_bounds,
            });
        }
        let queued = queue.len() - before;
        if queued > 0 {
            trace!(queued, watched = targets.len(), "queued intersection records");
        }
        queued
    }

    /// Deliver queued records to the dispatcher in one batch.
    ///
    /// Returns the batch size. The observer is not borrowed while the
    /// dispatcher runs, so subscribers may observe or unobserve through it.
    pub fn flush(&self) -> usize {
        let (dispatch, batch) = {
            let mut inner = self.inner.borrow_mut();
            if inner.queue.is_empty() {
                return 0;
            }
            (inner.dispatch.clone(), mem::take(&mut inner.queue))
        };
        debug!(records = batch.len(), "delivering intersection batch");
        dispatch(&batch);
        batch.len()
    }

    /// [`compute`](Self::compute) then [`flush`](Self::flush).
    pub fn update(&self, now: f64) -> usize {
        self.compute(now);
        self.flush()
    }

    /// Drain queued records without delivering them.
    pub fn take_records(&self) -> Vec<IntersectionEntry<E>> {
        mem::take(&mut self.inner.borrow_mut().queue)
    }
}

impl<E: LayoutElement> IntersectionObserver<E> for GeometricObserver<E> {
    fn observe(&mut self, target: &Rc<E>) {
        let weak = Rc::downgrade(target);
        let mut inner = self.inner.borrow_mut();
        if inner.targets.iter().any(|w| w.target.ptr_eq(&weak)) {
            return;
        }
        inner.targets.push(Watched {
            target: weak,
            reported: None,
        });
    }

    fn unobserve(&mut self, target: &Rc<E>) {
        let weak = Rc::downgrade(target);
        self.inner
            .borrow_mut()
            .targets
            .retain(|w| !w.target.ptr_eq(&weak));
    }
}

impl<E: LayoutElement> Clone for GeometricObserver<E> {
    fn clone(&self) -> Self {
        Self {
            inner: self.inner.clone(),
        }
    }
}

impl<E: LayoutElement> fmt::Debug for GeometricObserver<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut s = f.debug_struct("GeometricObserver");
        if let Ok(inner) = self.inner.try_borrow() {
            s.field("root", &inner.root)
                .field("thresholds", &inner.thresholds)
                .field("watched", &inner.targets.len())
                .field("queued", &inner.queue.len());
        }
        s.finish_non_exhaustive()
    }
}

/// Builds a [`GeometricObserver`] per window.
#[derive(Copy, Clone, Debug, Default)]
pub struct GeometricFactory;

impl<E: LayoutElement> ObserverFactory<E> for GeometricFactory {
    type Observer = GeometricObserver<E>;

    fn create(
        &self,
        window: &Rc<E::Window>,
        init: ObserverInit,
        dispatch: DispatchFn<E>,
    ) -> Self::Observer {
        GeometricObserver::new(window, init, dispatch)
    }
}
