#![forbid(unsafe_code)]

//! Ambient evaluation scope: capture frames and the current-view pointer.
//!
//! While a view's body is evaluated, every read of an observable property is
//! recorded implicitly, without threading a tracking object through the
//! expression. The mechanism is a thread-local stack of *capture frames*:
//! [`start_capture`] pushes an empty frame, reads append to the top frame
//! only, and [`end_capture`] pops the frame and returns its reads in
//! first-read order.
//!
//! A separate thread-local pointer names the view currently under
//! construction ([`current_view`]); value bindings use it to identify the
//! view they were authored inside.
//!
//! # Invariants
//!
//! 1. Frames are strictly nested: a read between an outer and an inner
//!    `start_capture`/`end_capture` pair is attributed to the inner frame
//!    only, and never auto-merged into the outer frame.
//! 2. Reads with no open frame are ignored.
//! 3. `end_capture` with no open frame is a programming error and panics.
//! 4. All state is thread-local; view evaluation is single-threaded and
//!    cooperative. Cross-thread mutation must be marshalled onto the
//!    evaluation thread by the embedder.
//!
//! # Failure Modes
//!
//! | Failure | Cause | Behavior |
//! |---------|-------|----------|
//! | Unbalanced `end_capture` | Engine bug | Panic with diagnostic |
//! | Read outside any frame | Untracked evaluation | Ignored |
//! | Guard dropped out of order | Engine bug | Previous view restored late |

use std::cell::{Cell, RefCell};
use std::rc::Rc;

use crate::source::{ObservableSource, ObservedRead};
use crate::view::ViewHandle;

thread_local! {
    static FRAMES: RefCell<Vec<Vec<ObservedRead>>> = const { RefCell::new(Vec::new()) };
    static CURRENT_VIEW: Cell<Option<ViewHandle>> = const { Cell::new(None) };
}

/// Push a new, empty capture frame.
///
/// Reentrant: a frame opened while another is open shadows it until the
/// matching [`end_capture`].
pub fn start_capture() {
    FRAMES.with(|f| f.borrow_mut().push(Vec::new()));
}

/// Pop the top capture frame and return its reads in first-read order.
///
/// Duplicates are preserved; re-registration downstream is harmless.
///
/// # Panics
///
/// Panics when no frame is open. That indicates unbalanced
/// `start_capture`/`end_capture` calls, a structural bug in the evaluation
/// engine, and is never recovered silently.
#[must_use]
pub fn end_capture() -> Vec<ObservedRead> {
    FRAMES.with(|f| {
        f.borrow_mut()
            .pop()
            .expect("end_capture with no open capture frame (unbalanced start/end)")
    })
}

/// Pop and return the top capture frame if one is open, else an empty set.
///
/// Constant bindings consume their *enclosing* frame rather than opening
/// their own; a constant authored outside any evaluation legitimately has
/// nothing to capture, so the missing-frame case is not an error here.
#[must_use]
pub fn take_open_capture() -> Vec<ObservedRead> {
    FRAMES.with(|f| f.borrow_mut().pop().unwrap_or_default())
}

/// Record a property read into the top capture frame, if any.
///
/// Called by [`ObservableSource`] implementations on every tracked read.
/// Only the top frame records the read; enclosing frames see nothing.
pub fn record_read(source: &Rc<dyn ObservableSource>, property: &'static str) {
    FRAMES.with(|f| {
        if let Some(top) = f.borrow_mut().last_mut() {
            top.push(ObservedRead::new(Rc::clone(source), property));
        }
    });
}

/// Number of currently open capture frames.
#[must_use]
pub fn capture_depth() -> usize {
    FRAMES.with(|f| f.borrow().len())
}

/// The view currently under construction, if any.
#[must_use]
pub fn current_view() -> Option<ViewHandle> {
    CURRENT_VIEW.with(Cell::get)
}

/// Mark `view` as the one under construction for the guard's lifetime.
///
/// The previous pointer is restored when the guard drops, so nested view
/// construction behaves like a stack as long as guards drop in reverse
/// acquisition order (ordinary scoping).
#[must_use]
pub fn enter_view(view: ViewHandle) -> ViewGuard {
    let previous = CURRENT_VIEW.with(|c| c.replace(Some(view)));
    ViewGuard { previous }
}

/// RAII guard restoring the previous current-view pointer on drop.
#[derive(Debug)]
pub struct ViewGuard {
    previous: Option<ViewHandle>,
}

impl Drop for ViewGuard {
    fn drop(&mut self) {
        CURRENT_VIEW.with(|c| c.set(self.previous));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::state::State;
    use crate::view;

    #[test]
    fn reads_attribute_to_top_frame_only() {
        let outer_state = State::new(1);
        let inner_state = State::new(2);

        start_capture();
        let _ = outer_state.get();

        start_capture();
        let _ = inner_state.get();
        let inner = end_capture();

        let _ = outer_state.get();
        let outer = end_capture();

        assert_eq!(inner.len(), 1);
        assert_eq!(inner[0].key(), (inner_state.source_id(), "value"));

        // The outer frame saw both of its own reads and none of the inner's.
        assert_eq!(outer.len(), 2);
        assert!(outer.iter().all(|r| r.key().0 == outer_state.source_id()));
    }

    #[test]
    fn duplicate_reads_preserved_in_order() {
        let state = State::new(0);
        start_capture();
        let _ = state.get();
        let _ = state.get();
        let reads = end_capture();
        assert_eq!(reads.len(), 2);
    }

    #[test]
    fn read_without_frame_is_ignored() {
        let state = State::new(7);
        assert_eq!(capture_depth(), 0);
        let _ = state.get();
        assert_eq!(capture_depth(), 0);
    }

    #[test]
    #[should_panic(expected = "no open capture frame")]
    fn end_without_start_panics() {
        let _ = end_capture();
    }

    #[test]
    fn take_open_capture_is_empty_without_frame() {
        assert!(take_open_capture().is_empty());
    }

    #[test]
    fn current_view_guard_restores_previous() {
        let a = view::register(view::NullAdapter);
        let b = view::register(view::NullAdapter);

        assert_eq!(current_view(), None);
        {
            let _outer = enter_view(a);
            assert_eq!(current_view(), Some(a));
            {
                let _inner = enter_view(b);
                assert_eq!(current_view(), Some(b));
            }
            assert_eq!(current_view(), Some(a));
        }
        assert_eq!(current_view(), None);

        view::release(a);
        view::release(b);
    }
}
