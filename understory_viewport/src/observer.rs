// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! The platform boundary: windows, elements, intersection records, and observers.

use alloc::rc::Rc;
use core::fmt;

use kurbo::Rect;
use tracing::debug;

use crate::options::{ObserverOptions, Threshold};

/// A window (top-level or embedded) that owns elements.
pub trait ViewportWindow: 'static {
    /// Whether this window is embedded in another document's browsing context.
    fn is_iframed(&self) -> bool;
}

/// An element whose visibility can be observed.
///
/// Identity is the `Rc` allocation the element lives in.
pub trait ViewportElement: 'static {
    /// The window type that owns elements of this type.
    type Window: ViewportWindow;

    /// Resolve the window that owns this element.
    fn owner_window(&self) -> Rc<Self::Window>;
}

/// A single visibility-transition record for one target.
pub struct IntersectionEntry<E> {
    /// The element whose visibility changed.
    pub target: Rc<E>,
    /// Host timestamp of the computation that produced this record.
    pub time: f64,
    /// Fraction of the target's area that is visible in the root, in `[0, 1]`.
    pub intersection_ratio: f64,
    /// Whether the target touches the root at all (edge contact counts).
    pub is_intersecting: bool,
    /// The target's bounds.
    pub bounding_client_rect: Rect,
    /// The visible part of the target; [`Rect::ZERO`] when not intersecting.
    pub intersection_rect: Rect,
    /// The root's bounds, or `None` when they are not exposed to this window.
    pub root_bounds: Option<Rect>,
}

impl<E> Clone for IntersectionEntry<E> {
    fn clone(&self) -> Self {
        Self {
            target: self.target.clone(),
            time: self.time,
            intersection_ratio: self.intersection_ratio,
            is_intersecting: self.is_intersecting,
            bounding_client_rect: self.bounding_client_rect,
            intersection_rect: self.intersection_rect,
            root_bounds: self.root_bounds,
        }
    }
}

impl<E> fmt::Debug for IntersectionEntry<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("IntersectionEntry")
            .field("target", &Rc::as_ptr(&self.target))
            .field("time", &self.time)
            .field("intersection_ratio", &self.intersection_ratio)
            .field("is_intersecting", &self.is_intersecting)
            .field("bounding_client_rect", &self.bounding_client_rect)
            .field("intersection_rect", &self.intersection_rect)
            .field("root_bounds", &self.root_bounds)
            .finish()
    }
}

/// Receives batches of records from an observer.
pub type DispatchFn<E> = Rc<dyn Fn(&[IntersectionEntry<E>])>;

/// The area an observer measures intersection against.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
pub enum ObserverRoot {
    /// The window's default top-level viewport.
    #[default]
    ImplicitViewport,
    /// The embedded document of an iframed window.
    EmbeddedDocument,
}

/// Construction parameters handed to an [`ObserverFactory`].
#[derive(Clone, Debug, PartialEq)]
pub struct ObserverInit {
    /// Thresholds, as configured.
    pub threshold: Threshold,
    /// Measurement root.
    pub root: ObserverRoot,
}

/// A per-window visibility-observation primitive.
///
/// Implementations deliver records asynchronously through the [`DispatchFn`]
/// they were created with. They must not dispatch from inside `observe` or
/// `unobserve`.
pub trait IntersectionObserver<E> {
    /// Start watching `target`. Watching an already watched target is a no-op.
    fn observe(&mut self, target: &Rc<E>);

    /// Stop watching `target`.
    fn unobserve(&mut self, target: &Rc<E>);
}

/// Builds observers for windows.
///
/// [`create`](Self::create) runs while the calling tracker's registry is
/// mutably borrowed. It must not call back into that tracker; doing so panics
/// with a `RefCell` borrow error.
pub trait ObserverFactory<E: ViewportElement> {
    /// The observer type produced.
    type Observer: IntersectionObserver<E> + 'static;

    /// Build an observer scoped to `window`.
    fn create(
        &self,
        window: &Rc<E::Window>,
        init: ObserverInit,
        dispatch: DispatchFn<E>,
    ) -> Self::Observer;
}

/// Create an observer for `window` that reports to `dispatch`.
///
/// The root is the embedded document only when `options.needs_root_bounds` is
/// set and the window is iframed; otherwise the implicit viewport is used.
/// Failures raised by the factory are not handled here.
pub fn create_viewport_observer<E, F>(
    factory: &F,
    dispatch: DispatchFn<E>,
    window: &Rc<E::Window>,
    options: &ObserverOptions,
) -> F::Observer
where
    E: ViewportElement,
    F: ObserverFactory<E>,
{
    let iframed = window.is_iframed();
    let root = if options.needs_root_bounds && iframed {
        ObserverRoot::EmbeddedDocument
    } else {
        ObserverRoot::ImplicitViewport
    };
    debug!(iframed, ?root, threshold = ?options.threshold.values(), "creating viewport observer");
    factory.create(
        window,
        ObserverInit {
            threshold: options.threshold.clone(),
            root,
        },
        dispatch,
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use core::cell::RefCell;

    struct Win(bool);

    impl ViewportWindow for Win {
        fn is_iframed(&self) -> bool {
            self.0
        }
    }

    struct El(Rc<Win>);

    impl ViewportElement for El {
        type Window = Win;

        fn owner_window(&self) -> Rc<Win> {
            self.0.clone()
        }
    }

    struct Noop;

    impl IntersectionObserver<El> for Noop {
        fn observe(&mut self, _: &Rc<El>) {}
        fn unobserve(&mut self, _: &Rc<El>) {}
    }

    #[derive(Default)]
    struct Capture(RefCell<Option<ObserverInit>>);

    impl ObserverFactory<El> for Capture {
        type Observer = Noop;

        fn create(&self, _: &Rc<Win>, init: ObserverInit, _: DispatchFn<El>) -> Noop {
            *self.0.borrow_mut() = Some(init);
            Noop
        }
    }

    fn root_for(iframed: bool, needs_root_bounds: bool) -> ObserverRoot {
        let factory = Capture::default();
        let dispatch: DispatchFn<El> = Rc::new(|_: &[IntersectionEntry<El>]| {});
        let opts = ObserverOptions::new().with_root_bounds(needs_root_bounds);
        let _ = create_viewport_observer(&factory, dispatch, &Rc::new(Win(iframed)), &opts);
        let init = factory.0.borrow_mut().take().unwrap();
        init.root
    }

    #[test]
    fn embedded_document_root_only_when_iframed_and_requested() {
        assert_eq!(root_for(true, true), ObserverRoot::EmbeddedDocument);
        assert_eq!(root_for(true, false), ObserverRoot::ImplicitViewport);
        assert_eq!(root_for(false, true), ObserverRoot::ImplicitViewport);
        assert_eq!(root_for(false, false), ObserverRoot::ImplicitViewport);
    }

    #[test]
    fn threshold_is_passed_through_unmodified() {
        let factory = Capture::default();
        let dispatch: DispatchFn<El> = Rc::new(|_: &[IntersectionEntry<El>]| {});
        let opts = ObserverOptions::new().with_thresholds(&[0.75, 0.1]).unwrap();
        let _ = create_viewport_observer(&factory, dispatch, &Rc::new(Win(false)), &opts);
        let init = factory.0.borrow_mut().take().unwrap();
        assert_eq!(init.threshold.values(), &[0.75, 0.1]);
    }
}
