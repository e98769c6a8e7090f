#![forbid(unsafe_code)]

//! The view-surface seam.
//!
//! A [`ViewSurface`] is whatever actually draws the list: a widget tree, a
//! terminal table, or the in-memory model the test harness uses. The
//! coordinator drives it with batches:
//!
//! ```text
//! begin_updates → apply(op)* → end_updates
//! ```
//!
//! Ops arrive in [`ChangeSet::ops`](rowkit_core::ChangeSet::ops) order, with
//! the two-space index convention: deletes address the previous snapshot,
//! inserts the target snapshot. A surface that needs content for inserted or
//! reloaded rows reads it from [`ApplyContext::target`].

use rowkit_core::{Snapshot, UpdateOp};

/// Animation style for structural changes.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "policy-config", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "policy-config", serde(rename_all = "snake_case"))]
pub enum RowAnimation {
    /// Let the surface pick.
    #[default]
    Automatic,
    Fade,
    Left,
    Right,
    Top,
    Bottom,
    Middle,
    /// Apply changes without animating.
    None,
}

impl RowAnimation {
    /// Whether changes should animate at all.
    #[must_use]
    pub const fn is_animated(self) -> bool {
        !matches!(self, Self::None)
    }
}

/// Everything a surface may need while applying one batch.
#[derive(Debug)]
pub struct ApplyContext<'a, S, R> {
    /// The snapshot currently displayed (old index space).
    pub previous: &'a Snapshot<S, R>,
    /// The snapshot the batch leads to (new index space).
    pub target: &'a Snapshot<S, R>,
    pub animation: RowAnimation,
}

impl<S, R> Clone for ApplyContext<'_, S, R> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<S, R> Copy for ApplyContext<'_, S, R> {}

/// A live list view the coordinator keeps in sync.
pub trait ViewSurface<S, R> {
    /// Discard whatever is displayed and show `snapshot` without animation.
    fn reload_data(&mut self, snapshot: &Snapshot<S, R>);

    /// Open a batch. Every op until [`end_updates`](Self::end_updates) is
    /// interpreted against the same pair of snapshots.
    fn begin_updates(&mut self) {}

    /// Apply one op of the current batch.
    fn apply(&mut self, op: &UpdateOp<'_>, ctx: &ApplyContext<'_, S, R>);

    /// Close the batch; the surface must now display `ctx.target`.
    fn end_updates(&mut self, ctx: &ApplyContext<'_, S, R>) {
        let _ = ctx;
    }
}

impl<S, R, V: ViewSurface<S, R> + ?Sized> ViewSurface<S, R> for Box<V> {
    fn reload_data(&mut self, snapshot: &Snapshot<S, R>) {
        (**self).reload_data(snapshot);
    }

    fn begin_updates(&mut self) {
        (**self).begin_updates();
    }

    fn apply(&mut self, op: &UpdateOp<'_>, ctx: &ApplyContext<'_, S, R>) {
        (**self).apply(op, ctx);
    }

    fn end_updates(&mut self, ctx: &ApplyContext<'_, S, R>) {
        (**self).end_updates(ctx);
    }
}

/// A surface that ignores every call. Useful for headless coordinators.
#[derive(Debug, Clone, Copy, Default)]
pub struct NullSurface;

impl<S, R> ViewSurface<S, R> for NullSurface {
    fn reload_data(&mut self, _snapshot: &Snapshot<S, R>) {}

    fn apply(&mut self, _op: &UpdateOp<'_>, _ctx: &ApplyContext<'_, S, R>) {}
}

#[cfg(test)]
mod tests {
    use super::*;
    use rowkit_core::{RendererId, Row, Section, diff};

    const CELL: RendererId = RendererId::new("cell");

    #[derive(Default)]
    struct Names(Vec<&'static str>);

    impl ViewSurface<(), u8> for Names {
        fn reload_data(&mut self, _snapshot: &Snapshot<(), u8>) {
            self.0.push("reload");
        }

        fn begin_updates(&mut self) {
            self.0.push("begin");
        }

        fn apply(&mut self, op: &UpdateOp<'_>, _ctx: &ApplyContext<'_, (), u8>) {
            self.0.push(op.name());
        }

        fn end_updates(&mut self, _ctx: &ApplyContext<'_, (), u8>) {
            self.0.push("end");
        }
    }

    #[test]
    fn boxed_surface_forwards() {
        let old = Snapshot::from_sections(vec![
            Section::new("s", ()).with_rows(vec![Row::new("a", 0u8, CELL)]),
        ]);
        let new = Snapshot::from_sections(vec![Section::new("s", ()).with_rows(vec![
            Row::new("b", 0u8, CELL),
            Row::new("a", 1u8, CELL),
        ])]);
        let changes = diff(&old, &new);
        let ctx = ApplyContext {
            previous: &old,
            target: &new,
            animation: RowAnimation::Fade,
        };

        let mut surface: Box<Names> = Box::default();
        surface.reload_data(&old);
        surface.begin_updates();
        for op in changes.ops() {
            surface.apply(&op, &ctx);
        }
        surface.end_updates(&ctx);
        assert_eq!(
            surface.0,
            vec!["reload", "begin", "insert_rows", "reload_rows", "end"]
        );
    }

    #[test]
    fn animation_none_is_not_animated() {
        assert!(!RowAnimation::None.is_animated());
        assert!(RowAnimation::default().is_animated());
    }
}
