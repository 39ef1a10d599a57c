// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! [`ViewportTracker`]: many subscribers per element over one observer per window.
//!
//! ## Registries
//!
//! The tracker owns two weakly keyed side tables (see [`WeakKeyMap`]):
//!
//! - window → observer. An entry is created the first time an element of that
//!   window is observed and is never removed while the window is alive.
//! - element → callbacks, in registration order. An element has an entry
//!   exactly while its window's observer is watching it.
//!
//! ## Dispatch
//!
//! Every observer the tracker creates reports to one shared dispatcher. A batch
//! may carry several records for the same target; only the last one is
//! delivered. Targets are visited from the end of the batch backwards and each
//! target's callbacks run synchronously in registration order.
//!
//! The subscriber lists of every target in a batch are captured before the
//! first callback runs, and no registry borrow is held while a callback runs,
//! so callbacks may register or dispose freely. A registration disposed during
//! a dispatch is not invoked for the rest of that dispatch; a registration made
//! during a dispatch first hears from the next batch.

use alloc::boxed::Box;
use alloc::rc::Rc;
use core::cell::RefCell;
use core::fmt;

use hashbrown::HashSet;
use smallvec::SmallVec;
use tracing::{debug, trace};

use crate::observer::{
    DispatchFn, IntersectionEntry, IntersectionObserver, ObserverFactory, ViewportElement,
    create_viewport_observer,
};
use crate::options::ObserverOptions;
use crate::util::remove_first;
use crate::weak_map::WeakKeyMap;

/// A subscriber callback. Identity is the `Rc` allocation.
pub type Callback<E> = Rc<dyn Fn(&IntersectionEntry<E>)>;

/// One `observe_intersections` call. The id tells duplicate callbacks apart.
struct Registration<E> {
    id: u64,
    callback: Callback<E>,
}

impl<E> Clone for Registration<E> {
    fn clone(&self) -> Self {
        Self {
            id: self.id,
            callback: self.callback.clone(),
        }
    }
}

type CallbackList<E> = SmallVec<[Registration<E>; 2]>;

struct Registry<E: ViewportElement, O> {
    observers: WeakKeyMap<E::Window, O>,
    callbacks: WeakKeyMap<E, CallbackList<E>>,
    next_id: u64,
}

/// Multiplexes intersection subscriptions onto one observer per window.
///
/// ```
/// use std::cell::Cell;
/// use std::rc::Rc;
/// use understory_viewport::{
///     DispatchFn, IntersectionEntry, IntersectionObserver, ObserverFactory, ObserverInit,
///     ViewportElement, ViewportTracker, ViewportWindow,
/// };
///
/// struct Win;
/// impl ViewportWindow for Win {
///     fn is_iframed(&self) -> bool { false }
/// }
///
/// struct El(Rc<Win>);
/// impl ViewportElement for El {
///     type Window = Win;
///     fn owner_window(&self) -> Rc<Win> { self.0.clone() }
/// }
///
/// struct Quiet;
/// impl IntersectionObserver<El> for Quiet {
///     fn observe(&mut self, _: &Rc<El>) {}
///     fn unobserve(&mut self, _: &Rc<El>) {}
/// }
///
/// struct Factory;
/// impl ObserverFactory<El> for Factory {
///     type Observer = Quiet;
///     fn create(&self, _: &Rc<Win>, _: ObserverInit, _: DispatchFn<El>) -> Quiet { Quiet }
/// }
///
/// let tracker = ViewportTracker::new(Factory);
/// let el = Rc::new(El(Rc::new(Win)));
/// let seen = Rc::new(Cell::new(0));
/// let s = seen.clone();
/// let disposer = tracker.observe_intersections(&el, Rc::new(move |_: &IntersectionEntry<El>| {
///     s.set(s.get() + 1);
/// }));
/// assert!(tracker.is_observed(&el));
/// assert_eq!(tracker.observer_count(), 1);
///
/// disposer.dispose();
/// disposer.dispose();
/// assert!(!tracker.is_observed(&el));
/// assert_eq!(seen.get(), 0);
/// ```
pub struct ViewportTracker<E: ViewportElement, F: ObserverFactory<E>> {
    registry: Rc<RefCell<Registry<E, F::Observer>>>,
    dispatch: DispatchFn<E>,
    factory: F,
    options: ObserverOptions,
}

impl<E: ViewportElement, F: ObserverFactory<E>> ViewportTracker<E, F> {
    /// Create a tracker whose observers use default [`ObserverOptions`].
    pub fn new(factory: F) -> Self {
        Self::with_options(factory, ObserverOptions::default())
    }

    /// Create a tracker whose observers are built with `options`.
    pub fn with_options(factory: F, options: ObserverOptions) -> Self {
        let registry = Rc::new(RefCell::new(Registry {
            observers: WeakKeyMap::new(),
            callbacks: WeakKeyMap::new(),
            next_id: 0,
        }));
        let weak = Rc::downgrade(&registry);
        let dispatch: DispatchFn<E> = Rc::new(move |entries: &[IntersectionEntry<E>]| {
            if let Some(registry) = weak.upgrade() {
                dispatch_batch(&registry, entries);
            }
        });
        Self {
            registry,
            dispatch,
            factory,
            options,
        }
    }

    /// The options used for newly created observers.
    pub fn options(&self) -> &ObserverOptions {
        &self.options
    }

    /// Subscribe `callback` to visibility transitions of `element`.
    ///
    /// Creates the window's observer on first use and starts watching the
    /// element. Registering the same callback twice stores it twice; each
    /// returned [`Disposer`] removes only its own registration.
    ///
    /// The factory runs while the tracker is borrowed; see [`ObserverFactory`].
    pub fn observe_intersections(&self, element: &Rc<E>, callback: Callback<E>) -> Disposer {
        let window = element.owner_window();
        let id = {
            let mut registry = self.registry.borrow_mut();
            let Registry {
                observers,
                callbacks,
                next_id,
            } = &mut *registry;
            let id = *next_id;
            *next_id += 1;
            let observer = observers.get_or_insert_with(&window, || {
                create_viewport_observer(&self.factory, self.dispatch.clone(), &window, &self.options)
            });
            let list = callbacks.get_or_insert_with(element, SmallVec::new);
            list.push(Registration { id, callback });
            trace!(id, subscribers = list.len(), "subscribed");
            observer.observe(element);
            id
        };

        let registry = Rc::downgrade(&self.registry);
        let element = Rc::downgrade(element);
        Disposer {
            unobserve: Box::new(move || {
                let (Some(registry), Some(element)) = (registry.upgrade(), element.upgrade())
                else {
                    return;
                };
                unobserve_intersections(&registry, &element, id);
            }),
        }
    }

    /// Whether `element` is currently watched.
    pub fn is_observed(&self, element: &Rc<E>) -> bool {
        self.registry.borrow().callbacks.contains_key(element)
    }

    /// Number of callbacks registered for `element`.
    pub fn callback_count(&self, element: &Rc<E>) -> usize {
        self.registry
            .borrow()
            .callbacks
            .get(element)
            .map_or(0, SmallVec::len)
    }

    /// Number of live windows that have an observer.
    pub fn observer_count(&self) -> usize {
        self.registry.borrow().observers.len()
    }

    /// Drop registry entries whose window or element is gone.
    pub fn prune(&self) -> usize {
        let mut registry = self.registry.borrow_mut();
        registry.observers.prune() + registry.callbacks.prune()
    }
}

impl<E, F> ViewportTracker<E, F>
where
    E: ViewportElement,
    F: ObserverFactory<E>,
    F::Observer: Clone,
{
    /// A handle to the observer created for `window`, if any.
    ///
    /// Hosts driving a native observer (see
    /// [`GeometricObserver`](crate::GeometricObserver)) use this to run its
    /// update step without holding any tracker state.
    pub fn observer_for(&self, window: &Rc<E::Window>) -> Option<F::Observer> {
        self.registry.borrow().observers.get(window).cloned()
    }
}

impl<E: ViewportElement, F: ObserverFactory<E> + fmt::Debug> fmt::Debug for ViewportTracker<E, F> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let registry = self.registry.try_borrow();
        let mut s = f.debug_struct("ViewportTracker");
        s.field("factory", &self.factory).field("options", &self.options);
        if let Ok(registry) = registry {
            s.field("observers", &registry.observers.len())
                .field("elements", &registry.callbacks.len());
        }
        s.finish_non_exhaustive()
    }
}

/// Reverses one [`ViewportTracker::observe_intersections`] call.
///
/// Dropping a disposer does not unsubscribe.
pub struct Disposer {
    unobserve: Box<dyn Fn()>,
}

impl Disposer {
    /// Unsubscribe. Calls after the first are no-ops.
    pub fn dispose(&self) {
        (self.unobserve)();
    }
}

impl fmt::Debug for Disposer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Disposer").finish_non_exhaustive()
    }
}

fn unobserve_intersections<E, O>(
    registry: &RefCell<Registry<E, O>>,
    element: &Rc<E>,
    id: u64,
) where
    E: ViewportElement,
    O: IntersectionObserver<E>,
{
    let mut registry = registry.borrow_mut();
    let Registry {
        observers,
        callbacks,
        ..
    } = &mut *registry;
    let Some(list) = callbacks.get_mut(element) else {
        return;
    };
    if !remove_first(list, |r| r.id == id) {
        return;
    }
    if !list.is_empty() {
        trace!(id, subscribers = list.len(), "unsubscribed");
        return;
    }
    callbacks.remove(element);
    match observers.get_mut(&element.owner_window()) {
        Some(observer) => {
            debug!("last subscriber gone, unobserving element");
            observer.unobserve(element);
        }
        None => debug!("no observer for element's window, skipping unobserve"),
    }
}

fn dispatch_batch<E, O>(registry: &RefCell<Registry<E, O>>, entries: &[IntersectionEntry<E>])
where
    E: ViewportElement,
{
    trace!(records = entries.len(), "dispatching intersection batch");
    let mut seen = HashSet::with_capacity(entries.len());
    let mut pending: SmallVec<[(&IntersectionEntry<E>, CallbackList<E>); 4]> = SmallVec::new();
    {
        let registry = registry.borrow();
        for entry in entries.iter().rev() {
            if !seen.insert(Rc::as_ptr(&entry.target).addr()) {
                continue;
            }
            if let Some(list) = registry.callbacks.get(&entry.target) {
                pending.push((entry, list.clone()));
            }
        }
    }
    for (entry, snapshot) in &pending {
        for registration in snapshot {
            let still_registered = registry
                .borrow()
                .callbacks
                .get(&entry.target)
                .is_some_and(|list| list.iter().any(|r| r.id == registration.id));
            if still_registered {
                (registration.callback)(entry);
            }
        }
    }
}
