#![forbid(unsafe_code)]

//! Per-view subscription table.
//!
//! Every view owns one [`ViewState`], created lazily by
//! [`view::view_state`](crate::view::view_state). It records two kinds of
//! dependencies:
//!
//! - **Targeted**: a (source, property) pair mapped to the binding observers
//!   that recompute and patch one view property when it changes.
//! - **Global**: pairs whose change cannot be reduced to a property patch;
//!   any change rebuilds the owning view's subtree via the adapter.
//!
//! The table is the ownership anchor: it holds the strong references to
//! binding observers and the subscription guards into each source. Dropping
//! the table (view teardown) severs everything it registered.
//!
//! # Invariants
//!
//! 1. Re-registering the same global (source, property) pair is idempotent;
//!    one change produces one rebuild request.
//! 2. Targeted registrations are additive; duplicate pairs in a dependency
//!    set mean the observer is notified once per registration, which is
//!    harmless because recomputation is idempotent.

use std::cell::RefCell;
use std::rc::Rc;

use ahash::AHashMap;

use crate::source::{ChangeObserver, ObservedRead, SourceId, Subscription};
use crate::view::{self, ViewHandle};

struct PropertyEntry {
    view_property: &'static str,
    // Owns the observer: the subscription slot holds the only strong
    // reference chain from the view to the binding.
    _subscription: Subscription,
}

/// Subscription table for one view.
pub struct ViewState {
    owner: ViewHandle,
    properties: RefCell<AHashMap<(SourceId, &'static str), Vec<PropertyEntry>>>,
    globals: RefCell<AHashMap<(SourceId, &'static str), Subscription>>,
}

impl ViewState {
    #[must_use]
    pub(crate) fn new(owner: ViewHandle) -> Self {
        Self {
            owner,
            properties: RefCell::new(AHashMap::new()),
            globals: RefCell::new(AHashMap::new()),
        }
    }

    /// The view this table belongs to.
    #[must_use]
    pub fn owner(&self) -> ViewHandle {
        self.owner
    }

    /// Register a targeted subscription: `observer` fires for any change to
    /// any pair in `reads`, recomputing the value bound to `view_property`.
    ///
    /// The table keeps `observer` alive for as long as it lives.
    pub fn add_view_property(
        &self,
        reads: &[ObservedRead],
        observer: Rc<dyn ChangeObserver>,
        view_property: &'static str,
    ) {
        let mut properties = self.properties.borrow_mut();
        for read in reads {
            let subscription = read.source.subscribe(Rc::clone(&observer));
            properties.entry(read.key()).or_default().push(PropertyEntry {
                view_property,
                _subscription: subscription,
            });
        }
    }

    /// Register `reads` as global triggers: any change rebuilds the owning
    /// view instead of patching a property. Idempotent per pair.
    pub fn add_global_properties(&self, reads: &[ObservedRead]) {
        let mut globals = self.globals.borrow_mut();
        for read in reads {
            let key = read.key();
            if globals.contains_key(&key) {
                continue;
            }
            let trigger = Rc::new(RebuildTrigger { view: self.owner });
            let subscription = read.source.subscribe(trigger as Rc<dyn ChangeObserver>);
            globals.insert(key, subscription);
        }
    }

    /// Number of distinct (source, property) pairs with targeted
    /// subscriptions.
    #[must_use]
    pub fn tracked_property_count(&self) -> usize {
        self.properties.borrow().len()
    }

    /// Number of distinct (source, property) pairs registered as global
    /// triggers.
    #[must_use]
    pub fn global_property_count(&self) -> usize {
        self.globals.borrow().len()
    }

    /// View property names currently bound to the given pair (diagnostic).
    #[must_use]
    pub fn bound_view_properties(&self, key: (SourceId, &'static str)) -> Vec<&'static str> {
        self.properties
            .borrow()
            .get(&key)
            .map(|entries| entries.iter().map(|e| e.view_property).collect())
            .unwrap_or_default()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.properties.borrow().is_empty() && self.globals.borrow().is_empty()
    }
}

impl std::fmt::Debug for ViewState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ViewState")
            .field("owner", &self.owner)
            .field("tracked", &self.tracked_property_count())
            .field("global", &self.global_property_count())
            .finish()
    }
}

/// Observer that turns any dependency change into a rebuild request.
struct RebuildTrigger {
    view: ViewHandle,
}

impl ChangeObserver for RebuildTrigger {
    fn source_changed(
        &self,
        _source: &dyn crate::source::ObservableSource,
        _property: &str,
        _value: &dyn std::any::Any,
    ) {
        // Stale owner: the rebuild request evaporates with the view.
        view::invalidate(self.view);
    }
}
