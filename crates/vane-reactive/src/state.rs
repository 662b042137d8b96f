#![forbid(unsafe_code)]

//! Observable state containers.
//!
//! [`State<T>`] is the canonical value holder views derive their content
//! from. It has reference semantics: cloning the handle shares the same
//! container, and identity (the [`SourceId`]) is what subscriptions key on.
//!
//! Reading through [`get`](State::get) performs implicit read registration
//! with the ambient capture frame; writing through [`set`](State::set)
//! funnels through the container's single mutation path and notifies every
//! live observer with the post-mutation value.
//!
//! # Invariants
//!
//! 1. All mutation goes through the single path that notifies observers;
//!    the generic [`ObservableSource`] write funnels into the same path.
//! 2. Observers always see the post-mutation value, in registration order.
//! 3. Setting a value equal to the current one still notifies. There is no
//!    equality dedup; embedders that want it must compare before writing.
//! 4. Re-entrant mutation from within this container's own change
//!    notification is a programming error and panics.

use std::any::Any;
use std::cell::{Cell, RefCell};
use std::rc::Rc;

use crate::scope;
use crate::source::{
    ChangeObserver, ObservableSource, PropertyError, SourceId, SubscriberList, Subscription,
};

/// The synthetic property name a state container's reads are recorded under.
pub const VALUE_PROPERTY: &str = "value";

struct StateInner<T> {
    id: SourceId,
    value: RefCell<T>,
    subscribers: SubscriberList,
    notifying: Cell<bool>,
}

/// A shared, observable holder of one typed value.
///
/// Clones share the same container. Dropping the last handle (and the last
/// binding that captured it) releases the value; containers do not own
/// their observers, and observers do not own the views they patch.
pub struct State<T> {
    inner: Rc<StateInner<T>>,
}

impl<T> Clone for State<T> {
    fn clone(&self) -> Self {
        Self {
            inner: Rc::clone(&self.inner),
        }
    }
}

impl<T: std::fmt::Debug> std::fmt::Debug for State<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("State")
            .field("id", &self.inner.id)
            .field("value", &*self.inner.value.borrow())
            .field("observers", &self.inner.subscribers.len())
            .finish()
    }
}

impl<T: Clone + 'static> State<T> {
    #[must_use]
    pub fn new(value: T) -> Self {
        Self {
            inner: Rc::new(StateInner {
                id: SourceId::next(),
                value: RefCell::new(value),
                subscribers: SubscriberList::new(),
                notifying: Cell::new(false),
            }),
        }
    }

    /// Clone out the current value, registering the read with the ambient
    /// capture frame when one is open.
    #[must_use]
    pub fn get(&self) -> T {
        scope::record_read(&self.as_source(), VALUE_PROPERTY);
        self.inner.value.borrow().clone()
    }

    /// Clone out the current value without registering a read.
    #[must_use]
    pub fn get_untracked(&self) -> T {
        self.inner.value.borrow().clone()
    }

    /// Borrow the current value for the duration of `f`, registering the
    /// read like [`get`](Self::get).
    pub fn with<R>(&self, f: impl FnOnce(&T) -> R) -> R {
        scope::record_read(&self.as_source(), VALUE_PROPERTY);
        let guard = self.inner.value.borrow();
        f(&guard)
    }

    /// Store a new value, then notify every live observer.
    ///
    /// # Panics
    ///
    /// Panics when called from within this container's own change
    /// notification; re-entrant mutation is unsupported.
    pub fn set(&self, value: T) {
        self.inner.store_and_notify(value);
    }

    /// Mutate the value in place, then notify every live observer.
    ///
    /// Notification is unconditional, like [`set`](Self::set).
    ///
    /// # Panics
    ///
    /// Panics on re-entrant mutation, like [`set`](Self::set).
    pub fn update(&self, f: impl FnOnce(&mut T)) {
        self.inner.assert_not_notifying();
        {
            let mut guard = self.inner.value.borrow_mut();
            f(&mut guard);
        }
        self.inner.notify();
    }

    /// Subscribe `observer` to this container's change notifications.
    ///
    /// View subscription tables call this through the generic
    /// [`ObservableSource`] surface; direct use is for embedder-side
    /// observers. Dropping the returned guard unsubscribes.
    pub fn subscribe(&self, observer: Rc<dyn ChangeObserver>) -> Subscription {
        self.inner.subscribers.subscribe(observer)
    }

    /// This container's identity in dependency sets.
    #[must_use]
    pub fn source_id(&self) -> SourceId {
        self.inner.id
    }

    /// This container as a generic observable source.
    #[must_use]
    pub fn as_source(&self) -> Rc<dyn ObservableSource> {
        Rc::clone(&self.inner) as Rc<dyn ObservableSource>
    }

    /// Number of registered observers, including dead ones not yet pruned.
    #[must_use]
    pub fn observer_count(&self) -> usize {
        self.inner.subscribers.len()
    }
}

impl<T: Clone + Default + 'static> Default for State<T> {
    fn default() -> Self {
        Self::new(T::default())
    }
}

impl<T: Clone + 'static> StateInner<T> {
    fn assert_not_notifying(&self) {
        assert!(
            !self.notifying.get(),
            "re-entrant mutation of a state value during its own change notification"
        );
    }

    fn store_and_notify(&self, value: T) {
        self.assert_not_notifying();
        *self.value.borrow_mut() = value;
        self.notify();
    }

    fn notify(&self) {
        let observers = self.subscribers.live();
        if observers.is_empty() {
            return;
        }
        let value = self.value.borrow().clone();
        let _guard = NotifyGuard::engage(&self.notifying);
        for observer in observers {
            observer.source_changed(self, VALUE_PROPERTY, &value);
        }
    }
}

impl<T: Clone + 'static> ObservableSource for StateInner<T> {
    fn source_id(&self) -> SourceId {
        self.id
    }

    fn property_value(&self, property: &str) -> Result<Box<dyn Any>, PropertyError> {
        if property != VALUE_PROPERTY {
            return Err(PropertyError::UnknownProperty {
                property: property.to_owned(),
            });
        }
        Ok(Box::new(self.value.borrow().clone()))
    }

    fn set_property_value(
        &self,
        property: &str,
        value: Box<dyn Any>,
    ) -> Result<(), PropertyError> {
        if property != VALUE_PROPERTY {
            return Err(PropertyError::UnknownProperty {
                property: property.to_owned(),
            });
        }
        let value = value
            .downcast::<T>()
            .map_err(|_| PropertyError::TypeMismatch {
                property: property.to_owned(),
            })?;
        self.store_and_notify(*value);
        Ok(())
    }

    fn subscribe(&self, observer: Rc<dyn ChangeObserver>) -> Subscription {
        self.subscribers.subscribe(observer)
    }
}

/// Clears the notifying flag even when an observer panics.
struct NotifyGuard<'a> {
    flag: &'a Cell<bool>,
}

impl<'a> NotifyGuard<'a> {
    fn engage(flag: &'a Cell<bool>) -> Self {
        flag.set(true);
        Self { flag }
    }
}

impl Drop for NotifyGuard<'_> {
    fn drop(&mut self) {
        self.flag.set(false);
    }
}
