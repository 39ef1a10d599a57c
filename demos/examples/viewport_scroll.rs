// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Scroll a page past a column of blocks and print visibility transitions.
//!
//! Run:
//! - `RUST_LOG=understory_viewport=trace cargo run -p understory_demos --example viewport_scroll`

use std::cell::Cell;
use std::rc::Rc;

use kurbo::Rect;
use tracing_subscriber::EnvFilter;
use understory_viewport::layout_rect::{RelativePosition, relative_position};
use understory_viewport::{
    GeometricFactory, IntersectionEntry, LayoutElement, LayoutWindow, Loading, ObserverOptions,
    ViewportElement, ViewportTracker, ViewportWindow,
};

const VIEWPORT_HEIGHT: f64 = 300.0;
const BLOCK_HEIGHT: f64 = 120.0;

struct Page {
    scroll_y: Cell<f64>,
}

impl ViewportWindow for Page {
    fn is_iframed(&self) -> bool {
        false
    }
}

impl LayoutWindow for Page {
    fn viewport_bounds(&self) -> Rect {
        let y = self.scroll_y.get();
        Rect::new(0.0, y, 400.0, y + VIEWPORT_HEIGHT)
    }

    fn document_bounds(&self) -> Rect {
        Rect::new(0.0, 0.0, 400.0, 2000.0)
    }
}

struct Block {
    name: String,
    page: Rc<Page>,
    bounds: Rect,
    loading: Cell<Loading>,
}

impl ViewportElement for Block {
    type Window = Page;

    fn owner_window(&self) -> Rc<Page> {
        self.page.clone()
    }
}

impl LayoutElement for Block {
    fn layout_bounds(&self) -> Rect {
        self.bounds
    }
}

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    let page = Rc::new(Page {
        scroll_y: Cell::new(0.0),
    });
    let blocks: Vec<Rc<Block>> = (0..6)
        .map(|i| {
            let top = 100.0 + f64::from(i) * 250.0;
            Rc::new(Block {
                name: format!("block-{i}"),
                page: page.clone(),
                bounds: Rect::new(20.0, top, 380.0, top + BLOCK_HEIGHT),
                loading: Cell::new(Loading::Lazy),
            })
        })
        .collect();

    let options = ObserverOptions::new()
        .with_thresholds(&[0.0, 0.5, 1.0])
        .expect("thresholds are within [0, 1]");
    let tracker = ViewportTracker::with_options(GeometricFactory, options);

    let mut disposers = Vec::new();
    for block in &blocks {
        // Weak so the callback does not keep its own element alive.
        let weak = Rc::downgrade(block);
        disposers.push(tracker.observe_intersections(
            block,
            Rc::new(move |e: &IntersectionEntry<Block>| {
                let Some(block) = weak.upgrade() else { return };
                if e.is_intersecting {
                    block.loading.set(block.loading.get().reduce(Loading::Eager));
                }
                println!(
                    "t={:>4} {:<8} ratio={:.2} intersecting={} loading={}",
                    e.time,
                    block.name,
                    e.intersection_ratio,
                    e.is_intersecting,
                    block.loading.get(),
                );
            }),
        ));
    }

    tracing::info!(blocks = blocks.len(), "observing blocks");
    let observer = tracker
        .observer_for(&page)
        .expect("observing an element creates its window's observer");

    for frame in 0..12 {
        page.scroll_y.set(f64::from(frame) * 120.0);
        observer.update(f64::from(frame) * 16.0);
    }

    let viewport = page.viewport_bounds();
    for block in &blocks {
        let where_ = match relative_position(block.bounds, viewport) {
            RelativePosition::Top => "above",
            RelativePosition::Bottom => "below",
            RelativePosition::Inside => "inside",
        };
        println!("{} ends {where_} the viewport", block.name);
    }

    for disposer in &disposers {
        disposer.dispose();
    }
    println!("still observed: {}", blocks.iter().filter(|b| tracker.is_observed(b)).count());
}
