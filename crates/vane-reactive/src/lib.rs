#![forbid(unsafe_code)]

//! Reactive state tracking and data binding for Vane.
//!
//! This crate is the engine that lets a declarative view body read state
//! naturally while the framework learns, implicitly, what that body depends
//! on:
//!
//! - [`State`]: an observable, shared holder of one typed value.
//! - [`scope`]: the ambient evaluation scope; a thread-local stack of
//!   capture frames recording every observable read, plus the pointer to
//!   the view currently under construction.
//! - [`Binding`]: a typed adapter from a value source (constant snapshot,
//!   recomputable expression, or state link) to one view property, carrying
//!   the dependency set captured at its construction.
//! - [`ViewState`]: the per-view subscription table distinguishing targeted
//!   property patches from global rebuild triggers.
//! - [`view`]: a generational arena of live views; bindings address views
//!   through stable handles that expire safely at teardown.
//!
//! # Architecture
//!
//! Everything is single-threaded and synchronous. Evaluating a view body
//! reads [`State`] values; each read registers with the top capture frame.
//! Constructing a [`Binding`] closes over the captured reads and, once
//! bound to a view property, subscribes to each source. A later mutation
//! notifies the subscribed bindings, which recompute and push the fresh
//! value through the view's [`NativeViewAdapter`](view::NativeViewAdapter).
//! Values the engine cannot patch per-property (formatted or multi-source
//! snapshots) fall back to rebuilding the authoring view's subtree.
//!
//! # Invariants
//!
//! 1. Capture frames are strictly nested; reads attribute to the innermost
//!    open frame only.
//! 2. A binding's dependency set is immutable after construction.
//! 3. State mutation always notifies; observers see the post-mutation
//!    value.
//! 4. Expired view handles are benign everywhere.

pub mod binding;
pub mod scope;
pub mod source;
pub mod state;
pub mod subscriptions;
pub mod text;
pub mod view;

pub use binding::Binding;
pub use source::{
    ChangeObserver, ObservableSource, ObservedRead, PropertyError, SourceId, SubscriberList,
    Subscription,
};
pub use state::{State, VALUE_PROPERTY};
pub use subscriptions::ViewState;
pub use view::{NativeViewAdapter, NullAdapter, ViewHandle};
