// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

// After you edit the crate's doc comment, run this command, then check README.md for any missing links
// cargo rdme --workspace-project=understory_viewport --heading-base-level=0

//! Understory Viewport: shared viewport intersection tracking.
//!
//! Many independent parts of a UI want to know when a particular element
//! enters or leaves the viewport. The primitive that reports this is usually
//! one-per-window, relatively expensive to create, and reports targets but not
//! who asked about them. This crate sits in between:
//!
//! - [`ViewportTracker`] lazily creates at most one [`IntersectionObserver`] per
//!   window through an [`ObserverFactory`] and keeps it for the window's lifetime.
//! - Any number of callbacks can subscribe to the same element with
//!   [`ViewportTracker::observe_intersections`]; each call returns a [`Disposer`].
//! - Each batch of [`IntersectionEntry`] records from an observer is reduced to
//!   the last record per target, which is handed to that target's callbacks in
//!   registration order.
//! - When the last callback for an element is disposed, the element is
//!   unobserved and forgotten.
//!
//! Both registries are [`WeakKeyMap`]s keyed by `Rc` identity, so the tracker
//! never keeps a window or an element alive.
//!
//! ## Platform model
//!
//! Hosts describe their world with two small traits, [`ViewportWindow`] and
//! [`ViewportElement`], and supply an [`ObserverFactory`]. A browser host would
//! wrap its native intersection observer. Hosts that do their own layout can
//! use the built-in [`GeometricFactory`], which computes intersections from
//! rectangles provided through [`LayoutWindow`] and [`LayoutElement`].
//!
//! [`ObserverOptions`] choose the thresholds and whether an iframed window is
//! measured against its own document (so that root bounds are reported) or
//! against the implicit top-level viewport.
//!
//! ## Example
//!
//! ```rust
//! use std::cell::{Cell, RefCell};
//! use std::rc::Rc;
//! use kurbo::Rect;
//! use understory_viewport::{
//!     GeometricFactory, IntersectionEntry, LayoutElement, LayoutWindow, ViewportElement,
//!     ViewportTracker, ViewportWindow,
//! };
//!
//! struct Page { scroll_y: Cell<f64> }
//! impl ViewportWindow for Page {
//!     fn is_iframed(&self) -> bool { false }
//! }
//! impl LayoutWindow for Page {
//!     fn viewport_bounds(&self) -> Rect {
//!         let y = self.scroll_y.get();
//!         Rect::new(0.0, y, 800.0, y + 600.0)
//!     }
//!     fn document_bounds(&self) -> Rect { Rect::new(0.0, 0.0, 800.0, 5000.0) }
//! }
//!
//! struct Block { page: Rc<Page>, bounds: Rect }
//! impl ViewportElement for Block {
//!     type Window = Page;
//!     fn owner_window(&self) -> Rc<Page> { self.page.clone() }
//! }
//! impl LayoutElement for Block {
//!     fn layout_bounds(&self) -> Rect { self.bounds }
//! }
//!
//! let page = Rc::new(Page { scroll_y: Cell::new(0.0) });
//! let block = Rc::new(Block { page: page.clone(), bounds: Rect::new(0.0, 1000.0, 800.0, 1200.0) });
//!
//! let tracker = ViewportTracker::new(GeometricFactory);
//! let visible = Rc::new(RefCell::new(Vec::new()));
//! let v = visible.clone();
//! let disposer = tracker.observe_intersections(&block, Rc::new(move |e: &IntersectionEntry<Block>| {
//!     v.borrow_mut().push(e.is_intersecting);
//! }));
//!
//! // The host drives the observer, typically once per frame.
//! let observer = tracker.observer_for(&page).unwrap();
//! observer.update(0.0);
//! page.scroll_y.set(800.0);
//! observer.update(16.0);
//! assert_eq!(*visible.borrow(), [false, true]);
//!
//! disposer.dispose();
//! assert!(!tracker.is_observed(&block));
//! ```
//!
//! ## Also included
//!
//! - [`layout_rect`]: small rectangle helpers (overlap, intersection, relative
//!   position, expansion) used by the geometric observer and by hosts.
//! - [`Loading`]: a loading-priority enum for content driven by visibility.
//!
//! This crate is `no_std` and uses `alloc`. It is single-threaded: callbacks
//! and observers are `Rc`-based and run on the host's event loop.

#![no_std]

extern crate alloc;

mod geometric;
pub mod layout_rect;
mod loading;
mod observer;
mod options;
mod tracker;
pub(crate) mod util;
mod weak_map;

pub use geometric::{GeometricFactory, GeometricObserver, LayoutElement, LayoutWindow};
pub use loading::Loading;
pub use observer::{
    DispatchFn, IntersectionEntry, IntersectionObserver, ObserverFactory, ObserverInit,
    ObserverRoot, ViewportElement, ViewportWindow, create_viewport_observer,
};
pub use options::{ObserverOptions, Threshold, ThresholdError};
pub use tracker::{Callback, Disposer, ViewportTracker};
pub use weak_map::WeakKeyMap;
