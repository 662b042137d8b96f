#![forbid(unsafe_code)]

//! Typed bindings between observable state and view properties.
//!
//! A [`Binding<T>`] adapts one value source to one view property. The source
//! is either a constant snapshot ([`Binding::constant`]), a recomputable
//! expression ([`Binding::computed`]), or a two-way link to a state
//! container ([`Binding::from_state`]). Whatever the source, construction
//! captures the set of observable properties read while the value was
//! produced; that dependency set is immutable for the binding's life and
//! drives propagation after [`bind_to_property`](Binding::bind_to_property).
//!
//! # Usage
//!
//! ```ignore
//! use vane_reactive::{Binding, State, scope, view};
//!
//! let count = State::new(0);
//!
//! // Recomputable: any change to `count` re-evaluates the closure and
//! // patches the bound view property.
//! let label = Binding::computed({
//!     let count = count.clone();
//!     move || format!("Count: {}", count.get())
//! });
//! label.bind_to_property(view_handle, "text")?;
//!
//! // Two-way: writes through the binding land in the state.
//! let field = Binding::from_state(&count);
//! field.set(5);
//! assert_eq!(count.get(), 5);
//! ```
//!
//! # Value bindings and escalation
//!
//! A constant binding whose enclosing capture saw exactly one property read,
//! and whose value equals that property's live value, is a verbatim copy of
//! state. [`bind_to_property`](Binding::bind_to_property) then installs the
//! cheapest possible wiring: a pass-through setter into the source plus a
//! targeted subscription, with no recompute layer at all.
//!
//! When the literal was *derived* from state (a formatted string, say), or
//! read several sources, no per-property patch can reproduce it. The binding
//! falls back to registering its whole dependency set as global triggers on
//! the view it was authored in, so a change rebuilds that subtree. The
//! fallback is always correct, merely slower; a `tracing` warning suggests
//! switching to [`Binding::computed`].
//!
//! # Invariants
//!
//! 1. The dependency set is captured at construction and never changes;
//!    only the current value does.
//! 2. A recomputable binding re-invokes its getter on every dependency
//!    change; the raw changed value is ignored because the change may have
//!    come from any of several dependencies.
//! 3. Bindings hold views by arena handle only. An expired handle skips the
//!    view push and never faults.
//! 4. Type troubles stay local to the binding: a source of a different type
//!    can never pass the one-to-one equality probe (it escalates instead),
//!    a failed generic read is a returned error, and a mismatched payload
//!    at notification time is logged and skipped.

use std::any::Any;
use std::cell::{Cell, RefCell};
use std::rc::Rc;

use crate::scope;
use crate::source::{ChangeObserver, ObservableSource, ObservedRead, PropertyError};
use crate::state::State;
use crate::view::{self, ViewHandle};

// ---------------------------------------------------------------------------
// Binding<T>
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum BindingKind {
    /// Immutable snapshot taken at construction.
    Value,
    /// Recomputable getter (expressions and state links).
    Func,
}

struct BindingInner<T> {
    kind: BindingKind,
    value: RefCell<T>,
    get: Option<Rc<dyn Fn() -> T>>,
    set: RefCell<Option<Rc<dyn Fn(T)>>>,
    reads: Vec<ObservedRead>,
    view: Cell<Option<ViewHandle>>,
    bound_from: Cell<Option<ViewHandle>>,
    view_property: Cell<Option<&'static str>>,
}

/// A typed adapter linking a view property to a value source.
///
/// Cloning shares the underlying binding.
pub struct Binding<T> {
    inner: Rc<BindingInner<T>>,
}

impl<T> Clone for Binding<T> {
    fn clone(&self) -> Self {
        Self {
            inner: Rc::clone(&self.inner),
        }
    }
}

impl<T: std::fmt::Debug> std::fmt::Debug for Binding<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Binding")
            .field("kind", &self.inner.kind)
            .field("value", &*self.inner.value.borrow())
            .field("reads", &self.inner.reads.len())
            .finish()
    }
}

impl<T: Clone + PartialEq + 'static> Binding<T> {
    /// Snapshot binding from an already-evaluated value.
    ///
    /// Starts no capture of its own: it consumes the currently open frame
    /// (empty when none is open), because the reads that produced `value`
    /// happened in the enclosing evaluation. When the frame recorded more
    /// than one property, the whole set is registered immediately as global
    /// dependencies of the view under construction; a snapshot of several
    /// sources can never be patched per-property.
    #[must_use]
    pub fn constant(value: T) -> Self {
        let reads = scope::take_open_capture();
        let bound_from = scope::current_view();
        let binding = Self::assemble(BindingKind::Value, value, None, None, reads, bound_from);
        if binding.inner.reads.len() > 1 {
            binding.escalate();
        }
        binding
    }

    /// Recomputable binding from a zero-argument closure.
    ///
    /// Opens a fresh capture frame, evaluates `f` once for the initial
    /// value, and retains `f` for recomputation on dependency changes.
    #[must_use]
    pub fn computed(f: impl Fn() -> T + 'static) -> Self {
        scope::start_capture();
        let value = f();
        let reads = scope::end_capture();
        let bound_from = scope::current_view();
        Self::assemble(
            BindingKind::Func,
            value,
            Some(Rc::new(f)),
            None,
            reads,
            bound_from,
        )
    }

    /// Two-way binding to a state container.
    ///
    /// Reads and writes flow straight through the container. Treated as
    /// recomputable so propagation is uniform with [`computed`](Self::computed).
    #[must_use]
    pub fn from_state(state: &State<T>) -> Self {
        scope::start_capture();
        let value = state.get();
        let reads = scope::end_capture();
        let bound_from = scope::current_view();

        let getter = {
            let state = state.clone();
            move || state.get()
        };
        let setter = {
            let state = state.clone();
            move |v: T| state.set(v)
        };
        Self::assemble(
            BindingKind::Func,
            value,
            Some(Rc::new(getter)),
            Some(Rc::new(setter)),
            reads,
            bound_from,
        )
    }

    fn assemble(
        kind: BindingKind,
        value: T,
        get: Option<Rc<dyn Fn() -> T>>,
        set: Option<Rc<dyn Fn(T)>>,
        reads: Vec<ObservedRead>,
        bound_from: Option<ViewHandle>,
    ) -> Self {
        Self {
            inner: Rc::new(BindingInner {
                kind,
                value: RefCell::new(value),
                get,
                set: RefCell::new(set),
                reads,
                view: Cell::new(None),
                bound_from: Cell::new(bound_from),
                view_property: Cell::new(None),
            }),
        }
    }

    /// The current value.
    #[must_use]
    pub fn get(&self) -> T {
        self.inner.value.borrow().clone()
    }

    /// Write through to the source when the binding has a setter (state
    /// links and one-to-one value bindings); otherwise just replace the
    /// current value.
    pub fn set(&self, value: T) {
        let setter = self.inner.set.borrow().clone();
        match setter {
            Some(set) => set(value),
            None => *self.inner.value.borrow_mut() = value,
        }
    }

    /// Whether this is a snapshot binding.
    #[must_use]
    pub fn is_value(&self) -> bool {
        self.inner.kind == BindingKind::Value
    }

    /// Whether this is a recomputable binding.
    #[must_use]
    pub fn is_func(&self) -> bool {
        self.inner.kind == BindingKind::Func
    }

    /// Number of captured dependency reads (duplicates included).
    #[must_use]
    pub fn read_count(&self) -> usize {
        self.inner.reads.len()
    }

    /// The view this binding currently pushes into, if attached.
    #[must_use]
    pub fn bound_view(&self) -> Option<ViewHandle> {
        self.inner.view.get()
    }

    /// The view that was under construction when this binding was built.
    #[must_use]
    pub fn origin_view(&self) -> Option<ViewHandle> {
        self.inner.bound_from.get()
    }

    /// Attach this binding to `property` on `view`.
    ///
    /// Recomputable bindings with dependencies get a targeted subscription
    /// per captured pair. Snapshot bindings select between a no-op (no
    /// dependencies), the one-to-one pass-through (single verbatim copy of
    /// a source), and global escalation (derived or multi-source values).
    ///
    /// # Errors
    ///
    /// [`PropertyError`] when generic access to the single captured source
    /// fails outright. The error is local to this binding; the rest of the
    /// view tree is unaffected.
    pub fn bind_to_property(
        &self,
        view: ViewHandle,
        property: &'static str,
    ) -> Result<(), PropertyError> {
        self.inner.view.set(Some(view));
        self.inner.view_property.set(Some(property));

        match self.inner.kind {
            BindingKind::Func => {
                if !self.inner.reads.is_empty() {
                    if let Some(table) = view::view_state(view) {
                        table.add_view_property(&self.inner.reads, self.observer(), property);
                    }
                }
                Ok(())
            }
            BindingKind::Value => match self.inner.reads.len() {
                0 => Ok(()),
                1 => self.bind_one_to_one(view, property),
                _ => {
                    tracing::warn!(
                        property,
                        "snapshot binding reads multiple states and falls back to a full view \
                         rebuild; prefer Binding::computed for a targeted update"
                    );
                    self.escalate();
                    Ok(())
                }
            },
        }
    }

    /// Single-dependency snapshot: pass through when the literal is a
    /// verbatim copy of the source, escalate when it was derived.
    ///
    /// A source value of a different type can never equal the literal, so a
    /// failed downcast lands in the derived branch rather than erroring.
    fn bind_one_to_one(
        &self,
        view: ViewHandle,
        property: &'static str,
    ) -> Result<(), PropertyError> {
        let read = &self.inner.reads[0];
        let raw = read.source.property_value(read.property)?;
        let live = raw.downcast::<T>().ok();

        if live.as_deref() == Some(&self.get()) {
            let source = Rc::clone(&read.source);
            let source_property = read.property;
            let weak = Rc::downgrade(&self.inner);
            let setter = move |v: T| {
                if let Err(err) = source.set_property_value(source_property, Box::new(v.clone())) {
                    tracing::error!(%err, "write through one-to-one binding failed");
                    return;
                }
                if let Some(inner) = weak.upgrade() {
                    *inner.value.borrow_mut() = v;
                }
            };
            *self.inner.set.borrow_mut() = Some(Rc::new(setter));

            if let Some(table) = view::view_state(view) {
                table.add_view_property(
                    std::slice::from_ref(read),
                    self.observer(),
                    property,
                );
            }
            tracing::debug!(property, source = %read.source.source_id(), "bound one-to-one");
            Ok(())
        } else {
            tracing::warn!(
                property,
                "snapshot binding was derived from state and falls back to a full view rebuild; \
                 prefer Binding::computed for a targeted update"
            );
            self.escalate();
            Ok(())
        }
    }

    /// Register the whole dependency set as global triggers on the
    /// originating view. An expired or absent originating view makes this
    /// a benign no-op.
    fn escalate(&self) {
        let Some(owner) = self.inner.bound_from.get() else {
            return;
        };
        let Some(table) = view::view_state(owner) else {
            return;
        };
        table.add_global_properties(&self.inner.reads);
    }

    /// Deliver a dependency change to this binding.
    ///
    /// Subscription tables invoke this through [`ChangeObserver`]; it is
    /// public so embedders can drive a binding directly, including after
    /// its view was torn down (the view push is then skipped).
    pub fn binding_value_changed(
        &self,
        source: &dyn ObservableSource,
        property: &str,
        value: &dyn Any,
    ) {
        self.inner.source_changed(source, property, value);
    }

    fn observer(&self) -> Rc<dyn ChangeObserver> {
        Rc::clone(&self.inner) as Rc<dyn ChangeObserver>
    }
}

// ---------------------------------------------------------------------------
// Change propagation
// ---------------------------------------------------------------------------

impl<T: Clone + PartialEq + 'static> ChangeObserver for BindingInner<T> {
    fn source_changed(&self, _source: &dyn ObservableSource, property: &str, value: &dyn Any) {
        match self.kind {
            BindingKind::Func => {
                // Which dependency changed is irrelevant; only a full
                // re-evaluation reproduces the bound value.
                if let Some(get) = &self.get {
                    let recomputed = get();
                    *self.value.borrow_mut() = recomputed;
                }
            }
            BindingKind::Value => match value.downcast_ref::<T>() {
                Some(v) => *self.value.borrow_mut() = v.clone(),
                None => {
                    tracing::error!(
                        property,
                        "type mismatch adopting changed value; keeping previous value"
                    );
                    return;
                }
            },
        }

        let (Some(view), Some(view_property)) = (self.view.get(), self.view_property.get()) else {
            return;
        };
        let value = self.value.borrow().clone();
        view::notify_property_changed(view, view_property, &value);
    }
}

// ---------------------------------------------------------------------------
// Macros
// ---------------------------------------------------------------------------

/// Build a recomputable [`Binding`] from an expression.
///
/// # Examples
///
/// ```ignore
/// let count = State::new(0);
/// let label = computed!(format!("Count: {}", count.get()));
/// ```
#[macro_export]
macro_rules! computed {
    ($e:expr) => {
        $crate::binding::Binding::computed(move || $e)
    };
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
