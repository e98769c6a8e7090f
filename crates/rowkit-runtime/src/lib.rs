#![forbid(unsafe_code)]

//! Single-threaded runtime for rowkit.
//!
//! This crate wires the pure diff kernel in `rowkit-core` to live data and a
//! live view:
//!
//! - [`reactive`]: observables and model sources the registry pulls from.
//! - [`registry`]: section and row bindings, renderers, handlers.
//! - [`coordinator`]: the refresh cycle and data-source queries.
//! - [`surface`]: the [`ViewSurface`] trait a view implements.
//! - [`events`]: event routing from row views back to handlers.
//! - [`config`]: [`ReconcileConfig`] and its optional file loading.
//!
//! Everything runs on the host UI thread; nothing here is `Send`.
//!
//! # Example
//!
//! ```
//! use rowkit_core::RendererId;
//! use rowkit_runtime::{
//!     Coordinator, ModelSource, NullSurface, Observable, Registry, RowBinding, SectionKey,
//! };
//!
//! const CELL: RendererId = RendererId::new("cell");
//!
//! let todos = Observable::new(vec!["milk".to_string(), "eggs".to_string()]);
//!
//! let mut registry = Registry::new(ModelSource::constant(vec!["todo".to_string()]));
//! registry.bind(
//!     SectionKey::section("todo"),
//!     ModelSource::from_observable(&todos),
//!     RowBinding::<String>::new(CELL),
//! );
//!
//! let mut coordinator = Coordinator::new(registry, NullSurface);
//! coordinator.refresh_on(&todos);
//! coordinator.refresh();
//! coordinator.finish();
//! assert_eq!(coordinator.number_of_rows(0), 2);
//!
//! todos.update(|t| t.push("bread".to_string()));
//! coordinator.pump();
//! assert_eq!(coordinator.number_of_rows(0), 3);
//! ```

pub mod config;
pub mod coordinator;
pub mod events;
pub mod reactive;
pub mod registry;
pub mod surface;
pub mod trigger;

pub use config::{ConfigError, EmptySectionPolicy, ReconcileConfig};
pub use coordinator::{CellRef, Coordinator, CycleStats, PumpReport, RefreshOutcome};
pub use events::{EventSink, QueuedEvent, RowEmitter, RowEvent};
pub use reactive::{ModelSource, Observable, RefreshScope, Subscription};
pub use registry::{Registry, RowBinding, SectionKey};
pub use surface::{ApplyContext, NullSurface, RowAnimation, ViewSurface};
pub use trigger::{Phase, RefreshTrigger};
