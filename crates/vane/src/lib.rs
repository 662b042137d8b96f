#![forbid(unsafe_code)]

//! Public facade for the Vane declarative UI core.
//!
//! Re-exports the workspace crates under stable paths. Most applications
//! want the [`prelude`]:
//!
//! ```ignore
//! use vane::prelude::*;
//!
//! let count = State::new(0);
//! let label = Binding::computed({
//!     let count = count.clone();
//!     move || format!("Count: {}", count.get())
//! });
//! label.bind_to_property(screen, "text")?;
//! ```

pub use vane_core as core;
pub use vane_reactive as reactive;

/// The commonly used surface in one import.
pub mod prelude {
    pub use vane_core::environment::{Environment, TextAlignment};
    pub use vane_core::geometry::{Point, Size};
    pub use vane_reactive::binding::Binding;
    pub use vane_reactive::scope;
    pub use vane_reactive::source::{ObservableSource, ObservedRead, PropertyError, SourceId};
    pub use vane_reactive::state::State;
    pub use vane_reactive::view::{self, NativeViewAdapter, ViewHandle};
}
