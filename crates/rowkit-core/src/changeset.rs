#![forbid(unsafe_code)]

//! Structural change-sets produced by the diff engine.
//!
//! A [`ChangeSet`] describes how to animate a list from one [`Snapshot`] to
//! the next. It uses the two-space index convention of batched list updates:
//!
//! - deletions are expressed in the **old** snapshot's index space,
//! - insertions in the **new** snapshot's index space,
//! - moves as `old → new` pairs,
//! - updates carry both positions.
//!
//! [`ChangeSet::ops`] yields the operations in the order a view surface must
//! apply them:
//!
//! ```text
//! section deletes → section inserts → section moves
//!   → row deletes → row inserts → row moves → row updates → section updates
//! ```
//!
//! Deletes are sorted descending and inserts ascending, so a surface that
//! applies them one at a time never invalidates the next index.
//!
//! [`Snapshot`]: crate::snapshot::Snapshot

use std::fmt;

use smallvec::SmallVec;

use crate::identity::Identity;
use crate::snapshot::IndexPath;

/// A section that changed position among surviving sections.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SectionMove {
    pub id: Identity,
    /// Index in the old snapshot.
    pub from: usize,
    /// Index in the new snapshot.
    pub to: usize,
    /// Whether the section's model or header/footer also changed.
    pub changed: bool,
}

/// A section whose content changed without moving.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SectionUpdate {
    pub id: Identity,
    pub from: usize,
    pub to: usize,
}

/// A row that changed position.
///
/// Rows moving between sections are flagged with `cross_section` so the
/// surface animates a move instead of a delete + insert.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RowMove {
    pub id: Identity,
    /// Position in the old snapshot.
    pub from: IndexPath,
    /// Position in the new snapshot.
    pub to: IndexPath,
    /// The row now belongs to a different section identity.
    pub cross_section: bool,
    /// Whether the row's model or renderer also changed.
    pub changed: bool,
}

/// A row whose content changed while keeping its place.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RowUpdate {
    pub id: Identity,
    pub from: IndexPath,
    pub to: IndexPath,
}

/// One step of change-set application, in the order returned by
/// [`ChangeSet::ops`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UpdateOp<'a> {
    /// Old-space section indices, descending.
    DeleteSections(&'a [usize]),
    /// New-space section indices, ascending.
    InsertSections(&'a [usize]),
    MoveSection(&'a SectionMove),
    /// Old-space row paths, descending.
    DeleteRows(&'a [IndexPath]),
    /// New-space row paths, ascending.
    InsertRows(&'a [IndexPath]),
    MoveRow(&'a RowMove),
    ReloadRows(&'a [RowUpdate]),
    ReloadSections(&'a [SectionUpdate]),
}

impl UpdateOp<'_> {
    /// Short operation name for logs.
    #[must_use]
    pub const fn name(&self) -> &'static str {
        match self {
            Self::DeleteSections(_) => "delete_sections",
            Self::InsertSections(_) => "insert_sections",
            Self::MoveSection(_) => "move_section",
            Self::DeleteRows(_) => "delete_rows",
            Self::InsertRows(_) => "insert_rows",
            Self::MoveRow(_) => "move_row",
            Self::ReloadRows(_) => "reload_rows",
            Self::ReloadSections(_) => "reload_sections",
        }
    }
}

/// Minimal set of structural operations between two snapshots.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ChangeSet {
    pub(crate) section_deletes: Vec<usize>,
    pub(crate) section_inserts: Vec<usize>,
    pub(crate) section_moves: Vec<SectionMove>,
    pub(crate) section_updates: Vec<SectionUpdate>,
    pub(crate) row_deletes: Vec<IndexPath>,
    pub(crate) row_inserts: Vec<IndexPath>,
    pub(crate) row_moves: Vec<RowMove>,
    pub(crate) row_updates: Vec<RowUpdate>,
}

impl ChangeSet {
    /// An empty change-set.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Old-space indices of deleted sections, descending.
    #[must_use]
    pub fn section_deletes(&self) -> &[usize] {
        &self.section_deletes
    }

    /// New-space indices of inserted sections, ascending.
    #[must_use]
    pub fn section_inserts(&self) -> &[usize] {
        &self.section_inserts
    }

    /// Section moves, ordered by destination.
    #[must_use]
    pub fn section_moves(&self) -> &[SectionMove] {
        &self.section_moves
    }

    #[must_use]
    pub fn section_updates(&self) -> &[SectionUpdate] {
        &self.section_updates
    }

    /// Old-space paths of deleted rows, descending.
    #[must_use]
    pub fn row_deletes(&self) -> &[IndexPath] {
        &self.row_deletes
    }

    /// New-space paths of inserted rows, ascending.
    #[must_use]
    pub fn row_inserts(&self) -> &[IndexPath] {
        &self.row_inserts
    }

    /// Row moves (within and across sections), ordered by destination.
    #[must_use]
    pub fn row_moves(&self) -> &[RowMove] {
        &self.row_moves
    }

    #[must_use]
    pub fn row_updates(&self) -> &[RowUpdate] {
        &self.row_updates
    }

    /// Moves whose row changed section identity.
    pub fn cross_section_moves(&self) -> impl Iterator<Item = &RowMove> {
        self.row_moves.iter().filter(|m| m.cross_section)
    }

    /// Row changes landing in (or leaving) the section at `section`.
    ///
    /// `old_section` is the section's index in the old snapshot, if it
    /// existed there.
    #[must_use]
    pub fn rows_in_section(&self, old_section: Option<usize>, section: usize) -> SectionRows<'_> {
        SectionRows {
            deletes: old_section.map_or_else(Vec::new, |old| {
                self.row_deletes
                    .iter()
                    .filter(|p| p.section == old)
                    .map(|p| p.row)
                    .collect()
            }),
            inserts: self
                .row_inserts
                .iter()
                .filter(|p| p.section == section)
                .map(|p| p.row)
                .collect(),
            moves: self
                .row_moves
                .iter()
                .filter(|m| m.to.section == section || Some(m.from.section) == old_section)
                .collect(),
            updates: self
                .row_updates
                .iter()
                .filter(|u| u.to.section == section)
                .collect(),
        }
    }

    /// Whether applying this change-set would do nothing.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.section_deletes.is_empty()
            && self.section_inserts.is_empty()
            && self.section_moves.is_empty()
            && self.section_updates.is_empty()
            && self.row_deletes.is_empty()
            && self.row_inserts.is_empty()
            && self.row_moves.is_empty()
            && self.row_updates.is_empty()
    }

    /// Total number of recorded operations.
    #[must_use]
    pub fn len(&self) -> usize {
        self.section_deletes.len()
            + self.section_inserts.len()
            + self.section_moves.len()
            + self.section_updates.len()
            + self.row_deletes.len()
            + self.row_inserts.len()
            + self.row_moves.len()
            + self.row_updates.len()
    }

    /// Whether any operation changes structure (anything but updates).
    #[must_use]
    pub fn is_structural(&self) -> bool {
        !(self.section_deletes.is_empty()
            && self.section_inserts.is_empty()
            && self.section_moves.is_empty()
            && self.row_deletes.is_empty()
            && self.row_inserts.is_empty()
            && self.row_moves.is_empty())
    }

    /// Operation counts.
    #[must_use]
    pub fn summary(&self) -> ChangeSummary {
        ChangeSummary {
            section_deletes: self.section_deletes.len(),
            section_inserts: self.section_inserts.len(),
            section_moves: self.section_moves.len(),
            section_updates: self.section_updates.len()
                + self.section_moves.iter().filter(|m| m.changed).count(),
            row_deletes: self.row_deletes.len(),
            row_inserts: self.row_inserts.len(),
            row_moves: self.row_moves.len(),
            cross_section_moves: self.cross_section_moves().count(),
            row_updates: self.row_updates.len()
                + self.row_moves.iter().filter(|m| m.changed).count(),
        }
    }

    /// Operations in mandatory application order. Empty groups are skipped.
    #[must_use]
    pub fn ops(&self) -> SmallVec<[UpdateOp<'_>; 8]> {
        let mut ops = SmallVec::new();
        if !self.section_deletes.is_empty() {
            ops.push(UpdateOp::DeleteSections(&self.section_deletes));
        }
        if !self.section_inserts.is_empty() {
            ops.push(UpdateOp::InsertSections(&self.section_inserts));
        }
        ops.extend(self.section_moves.iter().map(UpdateOp::MoveSection));
        if !self.row_deletes.is_empty() {
            ops.push(UpdateOp::DeleteRows(&self.row_deletes));
        }
        if !self.row_inserts.is_empty() {
            ops.push(UpdateOp::InsertRows(&self.row_inserts));
        }
        ops.extend(self.row_moves.iter().map(UpdateOp::MoveRow));
        if !self.row_updates.is_empty() {
            ops.push(UpdateOp::ReloadRows(&self.row_updates));
        }
        if !self.section_updates.is_empty() {
            ops.push(UpdateOp::ReloadSections(&self.section_updates));
        }
        ops
    }

    /// Put every list into its canonical order.
    pub(crate) fn normalize(&mut self) {
        self.section_deletes.sort_unstable_by(|a, b| b.cmp(a));
        self.section_inserts.sort_unstable();
        self.section_moves.sort_by_key(|m| m.to);
        self.section_updates.sort_by_key(|u| u.to);
        self.row_deletes.sort_unstable_by(|a, b| b.cmp(a));
        self.row_inserts.sort_unstable();
        self.row_moves.sort_by_key(|m| m.to);
        self.row_updates.sort_by_key(|u| u.to);
    }
}

/// Row-level changes touching a single section.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SectionRows<'a> {
    /// Old-space row indices deleted from the section.
    pub deletes: Vec<usize>,
    /// New-space row indices inserted into the section.
    pub inserts: Vec<usize>,
    /// Moves into, out of, or within the section.
    pub moves: Vec<&'a RowMove>,
    pub updates: Vec<&'a RowUpdate>,
}

/// Operation counts of a [`ChangeSet`].
///
/// `section_updates` and `row_updates` include content changes carried on
/// moves.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ChangeSummary {
    pub section_deletes: usize,
    pub section_inserts: usize,
    pub section_moves: usize,
    pub section_updates: usize,
    pub row_deletes: usize,
    pub row_inserts: usize,
    pub row_moves: usize,
    pub cross_section_moves: usize,
    pub row_updates: usize,
}

impl fmt::Display for ChangeSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "sections -{} +{} ~{} !{}, rows -{} +{} ~{} (cross {}) !{}",
            self.section_deletes,
            self.section_inserts,
            self.section_moves,
            self.section_updates,
            self.row_deletes,
            self.row_inserts,
            self.row_moves,
            self.cross_section_moves,
            self.row_updates,
        )
    }
}
