#![forbid(unsafe_code)]

//! Core kernel for rowkit: identities, snapshots, change-sets, and diffing.
//!
//! This crate is pure and synchronous. It knows nothing about views, event
//! loops, or where models come from:
//!
//! - [`identity`]: [`Identity`], [`Identifiable`], and content [`Equality`].
//! - [`snapshot`]: immutable [`Snapshot`]s of sections and rows.
//! - [`changeset`]: [`ChangeSet`] and its ordered [`UpdateOp`]s.
//! - [`diff`]: the two-pass identity-indexed diff engine.
//!
//! # Example
//!
//! ```
//! use rowkit_core::{diff, RendererId, Row, Section, Snapshot};
//!
//! const CELL: RendererId = RendererId::new("cell");
//!
//! let old: Snapshot<(), u32> = Snapshot::from_sections(vec![
//!     Section::new("inbox", ()).with_rows(vec![Row::new("a", 1, CELL), Row::new("b", 1, CELL)]),
//! ]);
//! let new = Snapshot::from_sections(vec![
//!     Section::new("inbox", ()).with_rows(vec![Row::new("b", 1, CELL), Row::new("a", 1, CELL)]),
//! ]);
//!
//! let changes = diff(&old, &new);
//! assert_eq!(changes.row_moves().len(), 1);
//! assert_eq!(changes.row_moves()[0].id.as_str(), "b");
//! ```

pub mod changeset;
pub mod diff;
pub mod identity;
pub mod snapshot;

pub use changeset::{
    ChangeSet, ChangeSummary, RowMove, RowUpdate, SectionMove, SectionRows, SectionUpdate,
    UpdateOp,
};
pub use diff::{DiffOptions, diff, diff_with};
pub use identity::{Equality, Identifiable, Identity};
pub use snapshot::{IndexPath, RendererId, Row, Section, Snapshot, SnapshotBuilder, Supplementary};
