#![forbid(unsafe_code)]

//! View registry: a generational arena of live views.
//!
//! Bindings never hold a view alive. They store a [`ViewHandle`], an index
//! plus generation into a thread-local arena; releasing a view bumps the
//! slot's generation, so every handle minted before the release resolves to
//! "no view" from then on. A stale handle is always a benign no-op, never a
//! fault, which lets an in-flight notification outlive the view it was
//! aimed at.
//!
//! Each arena record carries the platform-side [`NativeViewAdapter`], the
//! lazily created subscription table, the view's [`Environment`], and an
//! optional parent handle used for cascading environment lookups.
//!
//! # Invariants
//!
//! 1. A handle resolves only while its slot's generation matches; slot
//!    reuse after release can never resurrect an old handle.
//! 2. Releasing a view drops its subscription table, severing every
//!    subscription the table holds.
//! 3. Adapter callbacks are invoked without any registry borrow held, so
//!    an adapter may re-enter the registry.

use std::any::Any;
use std::cell::RefCell;
use std::rc::Rc;

use vane_core::Environment;

use crate::subscriptions::ViewState;

/// Platform-side surface the core pushes updates through.
///
/// Implementations apply a property's new value to the actual widget and
/// rebuild a view's subtree when asked to.
pub trait NativeViewAdapter {
    /// A bound property changed; apply `value` to the widget.
    fn view_property_changed(&self, property: &str, value: &dyn Any);

    /// A global dependency changed; rebuild this view's subtree.
    fn invalidate(&self);
}

/// Adapter that ignores every callback. Useful for headless views and tests.
#[derive(Debug, Clone, Copy, Default)]
pub struct NullAdapter;

impl NativeViewAdapter for NullAdapter {
    fn view_property_changed(&self, _property: &str, _value: &dyn Any) {}

    fn invalidate(&self) {}
}

/// Non-owning reference to a registered view.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ViewHandle {
    index: u32,
    generation: u32,
}

struct ViewRecord {
    adapter: Rc<dyn NativeViewAdapter>,
    state: Option<Rc<ViewState>>,
    environment: Environment,
    parent: Option<ViewHandle>,
}

struct Slot {
    generation: u32,
    record: Option<ViewRecord>,
}

#[derive(Default)]
struct Registry {
    slots: Vec<Slot>,
    free: Vec<u32>,
}

thread_local! {
    static REGISTRY: RefCell<Registry> = RefCell::new(Registry::default());
}

impl Registry {
    fn insert(&mut self, record: ViewRecord) -> ViewHandle {
        if let Some(index) = self.free.pop() {
            let slot = &mut self.slots[index as usize];
            slot.record = Some(record);
            ViewHandle {
                index,
                generation: slot.generation,
            }
        } else {
            let index = u32::try_from(self.slots.len()).expect("view arena exhausted");
            self.slots.push(Slot {
                generation: 0,
                record: Some(record),
            });
            ViewHandle {
                index,
                generation: 0,
            }
        }
    }

    fn record(&self, handle: ViewHandle) -> Option<&ViewRecord> {
        self.slots
            .get(handle.index as usize)
            .filter(|slot| slot.generation == handle.generation)
            .and_then(|slot| slot.record.as_ref())
    }

    fn record_mut(&mut self, handle: ViewHandle) -> Option<&mut ViewRecord> {
        self.slots
            .get_mut(handle.index as usize)
            .filter(|slot| slot.generation == handle.generation)
            .and_then(|slot| slot.record.as_mut())
    }
}

/// Register a root view with its platform adapter. Returns its handle.
pub fn register(adapter: impl NativeViewAdapter + 'static) -> ViewHandle {
    register_record(Rc::new(adapter), None)
}

/// Register a view as a child of `parent` (for environment cascading).
pub fn register_child(parent: ViewHandle, adapter: impl NativeViewAdapter + 'static) -> ViewHandle {
    register_record(Rc::new(adapter), Some(parent))
}

fn register_record(adapter: Rc<dyn NativeViewAdapter>, parent: Option<ViewHandle>) -> ViewHandle {
    REGISTRY.with(|r| {
        r.borrow_mut().insert(ViewRecord {
            adapter,
            state: None,
            environment: Environment::new(),
            parent,
        })
    })
}

/// Tear the view down. Its subscription table (and with it, every
/// subscription the table holds) is dropped; the handle goes stale.
///
/// Returns whether the handle was live. Releasing a stale handle is a no-op.
pub fn release(handle: ViewHandle) -> bool {
    let record = REGISTRY.with(|r| {
        let mut registry = r.borrow_mut();
        let Some(slot) = registry.slots.get_mut(handle.index as usize) else {
            return None;
        };
        if slot.generation != handle.generation || slot.record.is_none() {
            return None;
        }
        slot.generation += 1;
        let record = slot.record.take();
        registry.free.push(handle.index);
        record
    });
    // Dropped outside the borrow: tearing down the subscription table may
    // release observers whose drop re-enters the registry.
    record.is_some()
}

/// Whether `handle` currently resolves to a live view.
#[must_use]
pub fn is_live(handle: ViewHandle) -> bool {
    REGISTRY.with(|r| r.borrow().record(handle).is_some())
}

/// Number of live views (diagnostic).
#[must_use]
pub fn live_view_count() -> usize {
    REGISTRY.with(|r| {
        r.borrow()
            .slots
            .iter()
            .filter(|slot| slot.record.is_some())
            .count()
    })
}

/// The view's subscription table, created lazily on first access.
///
/// Returns `None` for a stale handle.
#[must_use]
pub fn view_state(handle: ViewHandle) -> Option<Rc<ViewState>> {
    REGISTRY.with(|r| {
        let mut registry = r.borrow_mut();
        let record = registry.record_mut(handle)?;
        Some(Rc::clone(
            record
                .state
                .get_or_insert_with(|| Rc::new(ViewState::new(handle))),
        ))
    })
}

/// Forward a bound property's new value to the view's adapter.
///
/// A stale handle is a benign no-op.
pub fn notify_property_changed(handle: ViewHandle, property: &str, value: &dyn Any) {
    let adapter = REGISTRY.with(|r| r.borrow().record(handle).map(|rec| Rc::clone(&rec.adapter)));
    if let Some(adapter) = adapter {
        adapter.view_property_changed(property, value);
    }
}

/// Ask the view's adapter to rebuild its subtree.
///
/// A stale handle is a benign no-op.
pub fn invalidate(handle: ViewHandle) {
    let adapter = REGISTRY.with(|r| r.borrow().record(handle).map(|rec| Rc::clone(&rec.adapter)));
    if let Some(adapter) = adapter {
        adapter.invalidate();
    }
}

/// Store `value` in the view's environment under `key`.
///
/// `cascades` makes the entry visible to descendant views.
pub fn set_environment<T: 'static>(handle: ViewHandle, key: &str, value: T, cascades: bool) {
    REGISTRY.with(|r| {
        if let Some(record) = r.borrow_mut().record_mut(handle) {
            record.environment.set(key, value, cascades);
        }
    });
}

/// Resolve `key` for this view: its own environment first, then cascading
/// entries up the parent chain.
#[must_use]
pub fn environment<T: Clone + 'static>(handle: ViewHandle, key: &str) -> Option<T> {
    REGISTRY.with(|r| {
        let registry = r.borrow();
        let record = registry.record(handle)?;
        if let Some(value) = record.environment.get::<T>(key) {
            return Some(value);
        }
        let mut cursor = record.parent;
        while let Some(parent) = cursor {
            let record = registry.record(parent)?;
            if let Some(value) = record.environment.get_if_cascading::<T>(key) {
                return Some(value);
            }
            cursor = record.parent;
        }
        None
    })
}


#[cfg(test)]
mod tests {
    use super::test_support::RecordingAdapter;
    use super::*;

    #[test]
    fn register_release_liveness() {
        let handle = register(NullAdapter);
        assert!(is_live(handle));
        assert!(release(handle));
        assert!(!is_live(handle));
        assert!(!release(handle));
    }

    #[test]
    fn stale_handle_survives_slot_reuse() {
        let first = register(NullAdapter);
        release(first);
        let second = register(NullAdapter);
        // The slot is reused but the generation moved on.
        assert!(!is_live(first));
        assert!(is_live(second));
        assert_ne!(first, second);
        release(second);
    }

    #[test]
    fn notify_on_stale_handle_is_noop() {
        let (adapter, log) = RecordingAdapter::new();
        let handle = register(adapter);
        release(handle);

        notify_property_changed(handle, "text", &String::from("late"));
        invalidate(handle);
        assert!(log.borrow().is_empty());
    }

    #[test]
    fn adapter_receives_property_and_invalidate() {
        let (adapter, log) = RecordingAdapter::new();
        let handle = register(adapter);

        notify_property_changed(handle, "text", &String::from("hi"));
        invalidate(handle);
        assert_eq!(*log.borrow(), vec!["set text=hi", "invalidate"]);
        release(handle);
    }

    #[test]
    fn view_state_is_lazy_and_stable() {
        let handle = register(NullAdapter);
        let a = view_state(handle).expect("live");
        let b = view_state(handle).expect("live");
        assert!(Rc::ptr_eq(&a, &b));

        release(handle);
        assert!(view_state(handle).is_none());
    }

    #[test]
    fn environment_cascades_only_marked_entries() {
        use vane_core::environment::{TextAlignment, keys};

        let root = register(NullAdapter);
        let child = register_child(root, NullAdapter);

        set_environment(root, keys::TEXT_ALIGNMENT, TextAlignment::Trailing, true);
        set_environment(root, "private", 1i32, false);

        assert_eq!(
            environment::<TextAlignment>(child, keys::TEXT_ALIGNMENT),
            Some(TextAlignment::Trailing)
        );
        assert_eq!(environment::<i32>(child, "private"), None);
        // The owning view reads its own entry regardless of the flag.
        assert_eq!(environment::<i32>(root, "private"), Some(1));

        release(child);
        release(root);
    }

    #[test]
    fn child_environment_shadows_parent() {
        use vane_core::environment::{TextAlignment, keys};

        let root = register(NullAdapter);
        let child = register_child(root, NullAdapter);

        set_environment(root, keys::TEXT_ALIGNMENT, TextAlignment::Leading, true);
        set_environment(child, keys::TEXT_ALIGNMENT, TextAlignment::Center, false);

        assert_eq!(
            environment::<TextAlignment>(child, keys::TEXT_ALIGNMENT),
            Some(TextAlignment::Center)
        );

        release(child);
        release(root);
    }
}
