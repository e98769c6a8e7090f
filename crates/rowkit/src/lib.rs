#![forbid(unsafe_code)]

//! rowkit: keep a sectioned list view in sync with live data.
//!
//! The facade re-exports the diff kernel from `rowkit-core` and, with the
//! default `runtime` feature, the registry and coordinator from
//! `rowkit-runtime`. Most applications only need the [`prelude`].
//!
//! # Features
//!
//! - `runtime` (default): observables, registry, coordinator.
//! - `policy-config`: load `ReconcileConfig` from TOML or JSON.
//! - `tracing`: diff spans and collision warnings from the kernel.
//!
//! # Example
//!
//! ```
//! use rowkit::prelude::*;
//! use rowkit::runtime::NullSurface;
//!
//! const TASK: RendererId = RendererId::new("task");
//!
//! let open = Observable::new(vec!["write docs".to_string()]);
//! let done = Observable::new(vec!["ship".to_string()]);
//!
//! let mut registry = Registry::new(ModelSource::constant(vec![
//!     "open".to_string(),
//!     "done".to_string(),
//! ]));
//! registry.bind(SectionKey::section("open"), (&open).into(), RowBinding::<String>::new(TASK));
//! registry.bind(SectionKey::section("done"), (&done).into(), RowBinding::new(TASK));
//!
//! let mut coordinator = Coordinator::new(registry, NullSurface);
//! coordinator.refresh_on(&open);
//! coordinator.refresh_on(&done);
//! coordinator.refresh();
//! coordinator.finish();
//!
//! // Moving a task across sections is one cross-section move.
//! let task = open.get().remove(0);
//! open.set(Vec::new());
//! done.update(|d| d.insert(0, task));
//! let report = coordinator.pump();
//! assert!(report.refresh.applied());
//! let summary = coordinator.stats().last_summary.map(|s| s.cross_section_moves);
//! assert_eq!(summary, Some(1));
//! ```

#[cfg(feature = "runtime")]
pub use rowkit_runtime as runtime;

pub use rowkit_core::{
    ChangeSet, ChangeSummary, DiffOptions, Equality, Identifiable, Identity, IndexPath, RendererId,
    Row, RowMove, RowUpdate, Section, SectionMove, SectionUpdate, Snapshot, Supplementary,
    UpdateOp, diff, diff_with,
};

#[cfg(feature = "runtime")]
pub use rowkit_runtime::{
    ApplyContext, Coordinator, EmptySectionPolicy, EventSink, ModelSource, Observable,
    ReconcileConfig, RefreshOutcome, Registry, RowAnimation, RowBinding, RowEvent, SectionKey,
    ViewSurface,
};

/// Types most applications import.
pub mod prelude {
    pub use rowkit_core::{
        ChangeSet, DiffOptions, Equality, Identifiable, Identity, IndexPath, RendererId,
        Snapshot, Supplementary, UpdateOp,
    };

    #[cfg(feature = "runtime")]
    pub use rowkit_runtime::{
        ApplyContext, Coordinator, EmptySectionPolicy, ModelSource, Observable, ReconcileConfig,
        Registry, RowAnimation, RowBinding, SectionKey, ViewSurface,
    };
}
