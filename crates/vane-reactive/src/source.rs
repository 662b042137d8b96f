#![forbid(unsafe_code)]

//! Capability surface for observable property sources.
//!
//! Dependency tracking works on (source, property) pairs. Anything that wants
//! to participate implements [`ObservableSource`]: a stable identity, generic
//! type-erased property access, and a subscription point for change
//! observers. [`State`](crate::state::State) is the built-in implementation;
//! the trait exists so the one-to-one binding path can read and write a
//! source without knowing its concrete type.
//!
//! # Failure Modes
//!
//! - Unknown property name: [`PropertyError::UnknownProperty`].
//! - Incompatible value type on read or write: [`PropertyError::TypeMismatch`],
//!   always local to the calling binding.

use std::any::Any;
use std::cell::{Cell, RefCell};
use std::rc::{Rc, Weak};

/// Identity of an observable source, unique per evaluation thread.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SourceId(u64);

impl SourceId {
    pub(crate) fn next() -> Self {
        thread_local! {
            static NEXT: Cell<u64> = const { Cell::new(0) };
        }
        NEXT.with(|n| {
            let id = n.get();
            n.set(id + 1);
            SourceId(id)
        })
    }
}

impl std::fmt::Display for SourceId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Errors from generic property access on an [`ObservableSource`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PropertyError {
    /// The source has no property with this name.
    UnknownProperty { property: String },
    /// The property exists but holds (or was given) an incompatible type.
    TypeMismatch { property: String },
}

impl std::fmt::Display for PropertyError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::UnknownProperty { property } => {
                write!(f, "unknown property '{property}'")
            }
            Self::TypeMismatch { property } => {
                write!(f, "type mismatch on property '{property}'")
            }
        }
    }
}

impl std::error::Error for PropertyError {}

/// Receiver of change notifications from an [`ObservableSource`].
///
/// `value` is the post-mutation value of the changed property.
pub trait ChangeObserver {
    fn source_changed(&self, source: &dyn ObservableSource, property: &str, value: &dyn Any);
}

/// An object whose named properties can be observed, read, and written
/// generically.
pub trait ObservableSource {
    /// Stable identity used to key subscriptions.
    fn source_id(&self) -> SourceId;

    /// Type-erased read of the named property's current value.
    ///
    /// This read is untracked: it does not register with any open capture
    /// frame.
    ///
    /// # Errors
    ///
    /// [`PropertyError::UnknownProperty`] for an unrecognized name.
    fn property_value(&self, property: &str) -> Result<Box<dyn Any>, PropertyError>;

    /// Type-erased write to the named property. Funnels through the source's
    /// single mutation path, so observers are notified.
    ///
    /// # Errors
    ///
    /// [`PropertyError::UnknownProperty`] for an unrecognized name,
    /// [`PropertyError::TypeMismatch`] when `value` is not the property's type.
    fn set_property_value(
        &self,
        property: &str,
        value: Box<dyn Any>,
    ) -> Result<(), PropertyError>;

    /// Subscribe `observer` to change notifications. The observer is held
    /// weakly; the returned [`Subscription`] guard is the strong side, and
    /// dropping it unsubscribes.
    fn subscribe(&self, observer: Rc<dyn ChangeObserver>) -> Subscription;
}

/// One recorded property read: which source, which property, in read order.
#[derive(Clone)]
pub struct ObservedRead {
    pub source: Rc<dyn ObservableSource>,
    pub property: &'static str,
}

impl ObservedRead {
    #[must_use]
    pub fn new(source: Rc<dyn ObservableSource>, property: &'static str) -> Self {
        Self { source, property }
    }

    /// The (source id, property name) pair used to key subscription tables.
    #[must_use]
    pub fn key(&self) -> (SourceId, &'static str) {
        (self.source.source_id(), self.property)
    }
}

impl std::fmt::Debug for ObservedRead {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ObservedRead")
            .field("source", &self.source.source_id())
            .field("property", &self.property)
            .finish()
    }
}

// ---------------------------------------------------------------------------
// Subscription plumbing
// ---------------------------------------------------------------------------

struct ObserverSlot {
    observer: Rc<dyn ChangeObserver>,
}

/// RAII guard for a registered observer.
///
/// The guard owns the only strong reference to the registration slot;
/// dropping it makes the observer unreachable from the source's subscriber
/// list, which prunes the dead entry on its next notification.
pub struct Subscription {
    _slot: Rc<ObserverSlot>,
}

impl std::fmt::Debug for Subscription {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Subscription").finish_non_exhaustive()
    }
}

/// Weak-reference subscriber list, the building block for
/// [`ObservableSource::subscribe`] implementations.
///
/// Observers are stored as `Weak` slots and pruned lazily when
/// [`live`](Self::live) collects them for a notification pass.
#[derive(Default)]
pub struct SubscriberList {
    entries: RefCell<Vec<Weak<ObserverSlot>>>,
}

impl SubscriberList {
    #[must_use]
    pub fn new() -> Self {
        Self {
            entries: RefCell::new(Vec::new()),
        }
    }

    pub fn subscribe(&self, observer: Rc<dyn ChangeObserver>) -> Subscription {
        let slot = Rc::new(ObserverSlot { observer });
        self.entries.borrow_mut().push(Rc::downgrade(&slot));
        Subscription { _slot: slot }
    }

    /// Collect live observers in registration order, pruning dead slots.
    ///
    /// Returns clones so the caller can invoke observers without holding
    /// any borrow of the list.
    #[must_use]
    pub fn live(&self) -> Vec<Rc<dyn ChangeObserver>> {
        let mut entries = self.entries.borrow_mut();
        entries.retain(|w| w.strong_count() > 0);
        entries
            .iter()
            .filter_map(|w| w.upgrade())
            .map(|slot| Rc::clone(&slot.observer))
            .collect()
    }

    /// Number of registered slots, including dead ones not yet pruned.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.borrow().len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.borrow().is_empty()
    }
}

impl std::fmt::Debug for SubscriberList {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SubscriberList")
            .field("len", &self.len())
            .finish()
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    struct CountingObserver {
        hits: Cell<u32>,
    }

    impl ChangeObserver for CountingObserver {
        fn source_changed(&self, _: &dyn ObservableSource, _: &str, _: &dyn Any) {
            self.hits.set(self.hits.get() + 1);
        }
    }

    struct NullSource {
        id: SourceId,
    }

    impl ObservableSource for NullSource {
        fn source_id(&self) -> SourceId {
            self.id
        }

        fn property_value(&self, property: &str) -> Result<Box<dyn Any>, PropertyError> {
            Err(PropertyError::UnknownProperty {
                property: property.to_owned(),
            })
        }

        fn set_property_value(
            &self,
            property: &str,
            _value: Box<dyn Any>,
        ) -> Result<(), PropertyError> {
            Err(PropertyError::UnknownProperty {
                property: property.to_owned(),
            })
        }

        fn subscribe(&self, _observer: Rc<dyn ChangeObserver>) -> Subscription {
            unimplemented!("not used in these tests")
        }
    }

    #[test]
    fn source_ids_are_unique() {
        let a = SourceId::next();
        let b = SourceId::next();
        assert_ne!(a, b);
    }

    #[test]
    fn live_prunes_dropped_subscriptions() {
        let list = SubscriberList::new();
        let obs = Rc::new(CountingObserver { hits: Cell::new(0) });

        let kept = list.subscribe(Rc::clone(&obs) as Rc<dyn ChangeObserver>);
        let dropped = list.subscribe(Rc::clone(&obs) as Rc<dyn ChangeObserver>);
        assert_eq!(list.len(), 2);

        drop(dropped);
        let live = list.live();
        assert_eq!(live.len(), 1);
        assert_eq!(list.len(), 1);
        drop(kept);
        assert!(list.live().is_empty());
    }

    #[test]
    fn live_preserves_registration_order() {
        let list = SubscriberList::new();
        let first = Rc::new(CountingObserver { hits: Cell::new(0) });
        let second = Rc::new(CountingObserver { hits: Cell::new(0) });
        let _s1 = list.subscribe(Rc::clone(&first) as Rc<dyn ChangeObserver>);
        let _s2 = list.subscribe(Rc::clone(&second) as Rc<dyn ChangeObserver>);

        let src = NullSource {
            id: SourceId::next(),
        };
        for obs in list.live() {
            obs.source_changed(&src, "value", &0i32);
        }
        assert_eq!(first.hits.get(), 1);
        assert_eq!(second.hits.get(), 1);
    }

    #[test]
    fn observed_read_key_pairs_id_and_property() {
        let id = SourceId::next();
        let read = ObservedRead::new(Rc::new(NullSource { id }), "value");
        assert_eq!(read.key(), (id, "value"));
    }
}
