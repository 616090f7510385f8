// requestAnimationFrame-backed frame scheduler.

use std::cell::{Cell, RefCell};
use std::rc::{Rc, Weak};

use wasm_bindgen::JsCast;
use wasm_bindgen::prelude::*;
use web_sys::window;

use crate::clock::{FrameControl, FrameFn, FrameScheduler};

type FrameCallback = Rc<RefCell<Option<Closure<dyn FnMut(f64)>>>>;

/// One long-lived rAF closure per scheduler. `request_tick` swaps the frame
/// function it runs, so a new run never races a stale callback from the last.
pub struct AnimationFrameScheduler {
    frame: Rc<RefCell<Option<FrameFn>>>,
    callback: FrameCallback,
    pending: Rc<Cell<bool>>,
}

impl AnimationFrameScheduler {
    pub fn new() -> Self {
        let frame: Rc<RefCell<Option<FrameFn>>> = Rc::new(RefCell::new(None));
        let callback: FrameCallback = Rc::new(RefCell::new(None));
        let pending = Rc::new(Cell::new(false));

        let frame_slot = frame.clone();
        let pending_flag = pending.clone();
        let weak: Weak<RefCell<Option<Closure<dyn FnMut(f64)>>>> = Rc::downgrade(&callback);
        *callback.borrow_mut() = Some(Closure::wrap(Box::new(move |ts: f64| {
            pending_flag.set(false);
            // Taken out so the frame may call request_tick itself.
            let Some(mut run) = frame_slot.borrow_mut().take() else {
                return;
            };
            if run(ts) == FrameControl::Stop {
                return;
            }
            let mut slot = frame_slot.borrow_mut();
            if slot.is_none() {
                *slot = Some(run);
            }
            drop(slot);
            if let Some(cb) = weak.upgrade() {
                if let Some(closure) = cb.borrow().as_ref() {
                    request_frame(closure);
                    pending_flag.set(true);
                }
            }
        }) as Box<dyn FnMut(f64)>));

        Self {
            frame,
            callback,
            pending,
        }
    }
}

impl Default for AnimationFrameScheduler {
    fn default() -> Self {
        Self::new()
    }
}

impl FrameScheduler for AnimationFrameScheduler {
    fn request_tick(&mut self, frame: FrameFn) {
        *self.frame.borrow_mut() = Some(frame);
        if self.pending.get() {
            return;
        }
        if let Some(closure) = self.callback.borrow().as_ref() {
            request_frame(closure);
            self.pending.set(true);
        }
    }
}

fn request_frame(closure: &Closure<dyn FnMut(f64)>) {
    if let Some(w) = window() {
        if let Err(err) = w.request_animation_frame(closure.as_ref().unchecked_ref()) {
            tracing::warn!("requestAnimationFrame failed: {}", crate::error::js_message(&err));
        }
    }
}
