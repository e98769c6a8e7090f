#![forbid(unsafe_code)]

//! Test harness for rowkit.
//!
//! - [`SurfaceModel`]: an in-memory [`ViewSurface`](rowkit_runtime::ViewSurface)
//!   that replays change-set batches and panics on any inconsistency.
//! - [`fixtures`]: snapshot notation helpers and proptest strategies.
//! - [`apply_diff`]: diff two snapshots and replay the result on a model
//!   initialized from the first.

pub mod fixtures;
pub mod surface_model;

pub use surface_model::{ModelSection, SurfaceModel};

use rowkit_core::{ChangeSet, DiffOptions, Snapshot, diff_with};
use rowkit_runtime::{ApplyContext, RowAnimation, ViewSurface};

/// Diff `old` → `new` and replay the change-set on a [`SurfaceModel`]
/// showing `old`. Returns the model and the change-set.
///
/// # Panics
///
/// Panics if the change-set cannot be replayed consistently.
pub fn apply_diff<S: Clone, R: Clone>(
    old: &Snapshot<S, R>,
    new: &Snapshot<S, R>,
    options: &DiffOptions<S, R>,
) -> (SurfaceModel<S, R>, ChangeSet) {
    let changes = diff_with(old, new, options);
    let mut model = SurfaceModel::from_snapshot(old);
    let ctx = ApplyContext {
        previous: old,
        target: new,
        animation: RowAnimation::None,
    };
    model.begin_updates();
    for op in changes.ops() {
        model.apply(&op, &ctx);
    }
    model.end_updates(&ctx);
    (model, changes)
}
