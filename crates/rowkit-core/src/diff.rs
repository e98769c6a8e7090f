#![forbid(unsafe_code)]

//! Identity-indexed snapshot diffing.
//!
//! [`diff_with`] compares two [`Snapshot`]s and returns the [`ChangeSet`]
//! that animates the first into the second. It runs in two passes:
//!
//! 1. **Sections**: identities missing from the new snapshot are deleted,
//!    identities missing from the old snapshot are inserted, and survivors are
//!    either stable, moved, or updated.
//! 2. **Rows**: for every new section, rows are matched by identity against
//!    the whole old snapshot. A row found in the same section identity is a
//!    survivor; a row found under another section identity is a cross-section
//!    move; a row found nowhere is an insert. Rows of surviving old sections
//!    that vanished are deletes.
//!
//! # Move minimality
//!
//! A survivor only counts as moved when its order relative to the other
//! survivors changed. The stable set is the longest increasing subsequence of
//! old indices taken in new order, so index shifts caused by inserts and
//! deletes are never reported as moves.
//!
//! Ties between equally long subsequences resolve to the one reconstructed
//! from the smallest final tail: when two rows swap, the one that came
//! **first** in the old order stays and the other one moves.
//!
//! # Invariants
//!
//! 1. `diff(s, s)` is empty whenever content equality is known.
//! 2. A row present in both snapshots under different section identities
//!    yields exactly one cross-section move and never a delete + insert.
//! 3. Rows of a deleted section are implied by the section delete; rows of an
//!    inserted section are recorded as row inserts or moves.
//! 4. Content changes on a moved entry ride on the move (`changed`).
//! 5. Output is deterministic for identical inputs.
//!
//! # Complexity
//!
//! O(n log n) in sections + rows: identity lookups are hashed and the stable
//! subsequence uses patience sorting.
//!
//! # Failure Modes
//!
//! None. Diffing never panics or fails; degenerate inputs (empty, disjoint,
//! identical) all produce valid change-sets.

use crate::changeset::{ChangeSet, RowMove, RowUpdate, SectionMove, SectionUpdate};
use crate::identity::Equality;
use crate::snapshot::{IndexPath, Row, Section, Snapshot};

/// Content-equality providers used while diffing.
///
/// The default uses [`Equality::Unknown`] on both levels, so every survivor
/// is reported as updated; prefer [`DiffOptions::structural`] when the models
/// implement `PartialEq`.
#[derive(Debug)]
pub struct DiffOptions<S, R> {
    /// Equality for section models (headers/footers are always compared).
    pub sections: Equality<S>,
    /// Equality for row models (renderers are always compared).
    pub rows: Equality<R>,
}

impl<S, R> Default for DiffOptions<S, R> {
    fn default() -> Self {
        Self {
            sections: Equality::Unknown,
            rows: Equality::Unknown,
        }
    }
}

impl<S, R> Clone for DiffOptions<S, R> {
    fn clone(&self) -> Self {
        Self {
            sections: self.sections.clone(),
            rows: self.rows.clone(),
        }
    }
}

impl<S: PartialEq, R: PartialEq> DiffOptions<S, R> {
    /// Structural equality for both sections and rows.
    #[must_use]
    pub fn structural() -> Self {
        Self {
            sections: Equality::structural(),
            rows: Equality::structural(),
        }
    }
}

impl<S, R> DiffOptions<S, R> {
    #[must_use]
    pub fn new(sections: Equality<S>, rows: Equality<R>) -> Self {
        Self { sections, rows }
    }

    #[must_use]
    pub fn with_sections(mut self, sections: Equality<S>) -> Self {
        self.sections = sections;
        self
    }

    #[must_use]
    pub fn with_rows(mut self, rows: Equality<R>) -> Self {
        self.rows = rows;
        self
    }
}

/// Diff two snapshots using structural (`PartialEq`) content equality.
#[must_use]
pub fn diff<S: PartialEq, R: PartialEq>(old: &Snapshot<S, R>, new: &Snapshot<S, R>) -> ChangeSet {
    diff_with(old, new, &DiffOptions::structural())
}

/// Diff two snapshots with caller-supplied content equality.
#[must_use]
pub fn diff_with<S, R>(
    old: &Snapshot<S, R>,
    new: &Snapshot<S, R>,
    options: &DiffOptions<S, R>,
) -> ChangeSet {
    #[cfg(feature = "tracing")]
    let _span = tracing::debug_span!(
        "rowkit.diff",
        old_sections = old.len(),
        new_sections = new.len(),
        old_rows = old.total_rows(),
        new_rows = new.total_rows(),
    )
    .entered();

    let mut changes = ChangeSet::default();
    diff_sections(old, new, &options.sections, &mut changes);
    diff_rows(old, new, &options.rows, &mut changes);
    changes.normalize();

    #[cfg(feature = "tracing")]
    tracing::trace!(summary = %changes.summary(), "diff complete");

    changes
}

fn section_content_equal<S, R>(a: &Section<S, R>, b: &Section<S, R>, eq: &Equality<S>) -> bool {
    a.header() == b.header() && a.footer() == b.footer() && eq.is_equal(a.model(), b.model())
}

fn row_content_equal<R>(a: &Row<R>, b: &Row<R>, eq: &Equality<R>) -> bool {
    a.renderer() == b.renderer() && eq.is_equal(a.model(), b.model())
}

fn diff_sections<S, R>(
    old: &Snapshot<S, R>,
    new: &Snapshot<S, R>,
    eq: &Equality<S>,
    changes: &mut ChangeSet,
) {
    for (index, section) in old.sections().iter().enumerate() {
        if new.section_position(section.id()).is_none() {
            changes.section_deletes.push(index);
        }
    }

    // (new index, old index) of sections present on both sides, in new order.
    let mut survivors = Vec::with_capacity(new.len());
    for (index, section) in new.sections().iter().enumerate() {
        match old.section_position(section.id()) {
            Some(from) => survivors.push((index, from)),
            None => changes.section_inserts.push(index),
        }
    }

    let stable = stable_marks(survivors.iter().map(|&(_, from)| from));
    for (&(to, from), stable) in survivors.iter().zip(stable) {
        let after = &new.sections()[to];
        let changed = !section_content_equal(&old.sections()[from], after, eq);
        let id = after.id().clone();
        if !stable {
            changes.section_moves.push(SectionMove {
                id,
                from,
                to,
                changed,
            });
        } else if changed {
            changes.section_updates.push(SectionUpdate { id, from, to });
        }
    }
}

fn diff_rows<S, R>(
    old: &Snapshot<S, R>,
    new: &Snapshot<S, R>,
    eq: &Equality<R>,
    changes: &mut ChangeSet,
) {
    for (s, section) in old.sections().iter().enumerate() {
        if new.section_position(section.id()).is_none() {
            continue;
        }
        for (r, row) in section.rows().iter().enumerate() {
            if new.row_path(row.id()).is_none() {
                changes.row_deletes.push(IndexPath::new(s, r));
            }
        }
    }

    // (new row, old row) of rows staying in the same section identity.
    let mut survivors: Vec<(usize, usize)> = Vec::new();
    for (s, section) in new.sections().iter().enumerate() {
        let old_section = old.section_position(section.id());
        survivors.clear();

        for (r, row) in section.rows().iter().enumerate() {
            let to = IndexPath::new(s, r);
            match old.row_path(row.id()) {
                None => changes.row_inserts.push(to),
                Some(from) if Some(from.section) == old_section => survivors.push((r, from.row)),
                Some(from) => changes.row_moves.push(RowMove {
                    id: row.id().clone(),
                    from,
                    to,
                    cross_section: true,
                    changed: !row_content_equal(row_at(old, from), row, eq),
                }),
            }
        }

        let Some(old_section) = old_section else {
            continue;
        };
        let stable = stable_marks(survivors.iter().map(|&(_, from)| from));
        for (&(to_row, from_row), stable) in survivors.iter().zip(stable) {
            let from = IndexPath::new(old_section, from_row);
            let to = IndexPath::new(s, to_row);
            let after = &section.rows()[to_row];
            let changed = !row_content_equal(row_at(old, from), after, eq);
            let id = after.id().clone();
            if !stable {
                changes.row_moves.push(RowMove {
                    id,
                    from,
                    to,
                    cross_section: false,
                    changed,
                });
            } else if changed {
                changes.row_updates.push(RowUpdate { id, from, to });
            }
        }
    }
}

#[inline]
fn row_at<S, R>(snapshot: &Snapshot<S, R>, path: IndexPath) -> &Row<R> {
    &snapshot.sections()[path.section].rows()[path.row]
}

/// Mark the members of a longest strictly increasing subsequence.
///
/// Values must be distinct. Returns one flag per input element.
fn stable_marks(values: impl Iterator<Item = usize>) -> Vec<bool> {
    let values: Vec<usize> = values.collect();
    let n = values.len();
    let mut keep = vec![false; n];
    if n == 0 {
        return keep;
    }

    // tails[k] = index of the smallest tail of an increasing run of length k+1.
    let mut tails: Vec<usize> = Vec::with_capacity(n);
    let mut prev: Vec<Option<usize>> = vec![None; n];
    for (i, &value) in values.iter().enumerate() {
        let slot = tails.partition_point(|&t| values[t] < value);
        if slot > 0 {
            prev[i] = Some(tails[slot - 1]);
        }
        if slot == tails.len() {
            tails.push(i);
        } else {
            tails[slot] = i;
        }
    }

    let mut cursor = tails.last().copied();
    while let Some(i) = cursor {
        keep[i] = true;
        cursor = prev[i];
    }
    keep
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::identity::Identity;
    use crate::snapshot::{RendererId, Supplementary};

    const CELL: RendererId = RendererId::new("cell");
    const BADGE: RendererId = RendererId::new("badge");

    /// Rows are written `"id"` or `"id@version"`; the version is the model.
    fn snap(table: &[(&str, &[&str])]) -> Snapshot<(), u32> {
        Snapshot::from_sections(
            table.iter()
                .map(|(id, rows)| {
                    let rows = rows
                        .iter()
                        .map(|r| match r.split_once('@') {
                            Some((id, v)) => Row::new(id, v.parse().unwrap_or(0), CELL),
                            None => Row::new(*r, 0, CELL),
                        })
                        .collect();
                    Section::new(*id, ()).with_rows(rows)
                })
                .collect(),
        )
    }

    fn path(section: usize, row: usize) -> IndexPath {
        IndexPath::new(section, row)
    }

    #[test]
    fn stable_marks_prefers_earliest_on_swap() {
        assert_eq!(stable_marks([1, 0].into_iter()), vec![false, true]);
        assert_eq!(stable_marks([0, 1, 2].into_iter()), vec![true, true, true]);
        assert_eq!(stable_marks([2, 0, 1].into_iter()), vec![false, true, true]);
        assert_eq!(stable_marks([1, 2, 0].into_iter()), vec![true, true, false]);
        assert!(stable_marks(std::iter::empty()).is_empty());
    }

    #[test]
    fn stable_marks_length_is_longest() {
        let marks = stable_marks([3, 1, 4, 0, 5, 2, 6].into_iter());
        assert_eq!(marks.iter().filter(|m| **m).count(), 4);
    }

    #[test]
    fn identical_snapshots_produce_empty_diff() {
        let s = snap(&[("s1", &["a", "b"]), ("s2", &["c"])]);
        assert!(diff(&s, &s).is_empty());
    }

    #[test]
    fn empty_to_empty_is_empty() {
        let s: Snapshot<(), u32> = Snapshot::empty();
        assert!(diff(&s, &s).is_empty());
    }

    #[test]
    fn swap_records_single_move() {
        let old = snap(&[("s1", &["a", "b"])]);
        let new = snap(&[("s1", &["b", "a"])]);
        let cs = diff(&old, &new);
        assert_eq!(
            cs.row_moves(),
            &[RowMove {
                id: Identity::new("b"),
                from: path(0, 1),
                to: path(0, 0),
                cross_section: false,
                changed: false,
            }]
        );
        assert!(cs.row_inserts().is_empty());
        assert!(cs.row_deletes().is_empty());
        assert!(cs.row_updates().is_empty());
        assert!(cs.section_moves().is_empty());
    }

    #[test]
    fn row_moves_into_surviving_section_when_source_section_deleted() {
        let old = snap(&[("s1", &["a"]), ("s2", &["b"])]);
        let new = snap(&[("s2", &["b", "a"])]);
        let cs = diff(&old, &new);
        assert_eq!(cs.section_deletes(), &[0]);
        assert!(cs.section_moves().is_empty(), "index shift is not a move");
        assert_eq!(
            cs.row_moves(),
            &[RowMove {
                id: Identity::new("a"),
                from: path(0, 0),
                to: path(0, 1),
                cross_section: true,
                changed: false,
            }]
        );
        assert!(cs.row_deletes().is_empty());
        assert!(cs.row_inserts().is_empty());
        assert!(cs.row_updates().is_empty());
    }

    #[test]
    fn content_change_is_single_update() {
        let old = snap(&[("s1", &["a@1"])]);
        let new = snap(&[("s1", &["a@2"])]);
        let cs = diff(&old, &new);
        assert_eq!(
            cs.row_updates(),
            &[RowUpdate {
                id: Identity::new("a"),
                from: path(0, 0),
                to: path(0, 0),
            }]
        );
        assert_eq!(cs.len(), 1);
    }

    #[test]
    fn insert_into_empty_records_section_and_rows() {
        let old: Snapshot<(), u32> = Snapshot::empty();
        let new = snap(&[("s1", &["a", "b"])]);
        let cs = diff(&old, &new);
        assert_eq!(cs.section_inserts(), &[0]);
        assert_eq!(cs.row_inserts(), &[path(0, 0), path(0, 1)]);
        assert_eq!(cs.len(), 3);
    }

    #[test]
    fn duplicate_identity_in_new_snapshot_does_not_fail() {
        let old = snap(&[("s1", &["a@1", "b"])]);
        let new = snap(&[("s1", &["a@1", "b", "a@2"])]);
        assert_eq!(new.collisions(), 1);
        // Later `a` wins: it sits after `b` with the new content.
        assert_eq!(new.section(0).map(Section::len), Some(2));
        assert_eq!(new.row_path("a"), Some(path(0, 1)));

        let cs = diff(&old, &new);
        assert_eq!(cs.row_moves().len(), 1);
        let mv = &cs.row_moves()[0];
        assert_eq!(mv.id.as_str(), "b");
        assert_eq!((mv.from, mv.to), (path(0, 1), path(0, 0)));
        assert_eq!(
            cs.row_updates(),
            &[RowUpdate {
                id: Identity::new("a"),
                from: path(0, 0),
                to: path(0, 1),
            }]
        );
        assert!(cs.row_inserts().is_empty());
        assert!(cs.row_deletes().is_empty());
    }

    #[test]
    fn deleted_section_rows_are_implied() {
        let old = snap(&[("s1", &["a", "b"]), ("s2", &["c"])]);
        let new = snap(&[("s2", &["c"])]);
        let cs = diff(&old, &new);
        assert_eq!(cs.section_deletes(), &[0]);
        assert!(cs.row_deletes().is_empty());
        assert_eq!(cs.len(), 1);
    }

    #[test]
    fn inserts_and_deletes_shift_without_moves() {
        let old = snap(&[("s1", &["a", "b", "c", "d"])]);
        let new = snap(&[("s1", &["x", "a", "c", "d", "y"])]);
        let cs = diff(&old, &new);
        assert_eq!(cs.row_deletes(), &[path(0, 1)]);
        assert_eq!(cs.row_inserts(), &[path(0, 0), path(0, 4)]);
        assert!(cs.row_moves().is_empty());
    }

    #[test]
    fn section_reorder_keeps_rows_quiet() {
        let old = snap(&[("s1", &["a"]), ("s2", &["b"]), ("s3", &["c"])]);
        let new = snap(&[("s3", &["c"]), ("s1", &["a"]), ("s2", &["b"])]);
        let cs = diff(&old, &new);
        assert_eq!(
            cs.section_moves(),
            &[SectionMove {
                id: Identity::new("s3"),
                from: 2,
                to: 0,
                changed: false,
            }]
        );
        assert!(cs.row_moves().is_empty());
        assert!(cs.row_inserts().is_empty());
        assert!(cs.row_deletes().is_empty());
    }

    #[test]
    fn moved_section_with_changed_rows_reports_updates_only() {
        let old = snap(&[("s1", &["a@1"]), ("s2", &["b"])]);
        let new = snap(&[("s2", &["b"]), ("s1", &["a@2"])]);
        let cs = diff(&old, &new);
        assert_eq!(cs.section_moves().len(), 1);
        assert_eq!(
            cs.row_updates(),
            &[RowUpdate {
                id: Identity::new("a"),
                from: path(0, 0),
                to: path(1, 0),
            }]
        );
        assert!(cs.row_moves().is_empty());
    }

    #[test]
    fn cross_section_move_into_inserted_section() {
        let old = snap(&[("s1", &["a", "b"])]);
        let new = snap(&[("s1", &["b"]), ("s2", &["a", "n"])]);
        let cs = diff(&old, &new);
        assert_eq!(cs.section_inserts(), &[1]);
        assert_eq!(cs.row_inserts(), &[path(1, 1)]);
        let cross: Vec<_> = cs.cross_section_moves().collect();
        assert_eq!(cross.len(), 1);
        assert_eq!((cross[0].from, cross[0].to), (path(0, 0), path(1, 0)));
        assert!(cs.row_deletes().is_empty());
    }

    #[test]
    fn cross_section_move_carries_content_change() {
        let old = snap(&[("s1", &["a@1"]), ("s2", &[])]);
        let new = snap(&[("s1", &[]), ("s2", &["a@5"])]);
        let cs = diff(&old, &new);
        assert_eq!(cs.row_moves().len(), 1);
        assert!(cs.row_moves()[0].changed);
        assert!(cs.row_updates().is_empty());
    }

    #[test]
    fn disjoint_snapshots_replace_everything() {
        let old = snap(&[("s1", &["a"]), ("s2", &["b"])]);
        let new = snap(&[("t1", &["c"])]);
        let cs = diff(&old, &new);
        assert_eq!(cs.section_deletes(), &[1, 0]);
        assert_eq!(cs.section_inserts(), &[0]);
        assert_eq!(cs.row_inserts(), &[path(0, 0)]);
        assert!(cs.row_deletes().is_empty());
    }

    #[test]
    fn renderer_change_counts_as_update() {
        let old = snap(&[("s1", &["a"])]);
        let new = Snapshot::from_sections(vec![
            Section::new("s1", ()).with_rows(vec![Row::new("a", 0u32, BADGE)]),
        ]);
        let cs = diff(&old, &new);
        assert_eq!(cs.row_updates().len(), 1);
    }

    #[test]
    fn header_change_counts_as_section_update() {
        let old: Snapshot<(), u32> = Snapshot::from_sections(vec![
            Section::new("s1", ()).with_header(Supplementary::title("Today")),
        ]);
        let new: Snapshot<(), u32> = Snapshot::from_sections(vec![
            Section::new("s1", ()).with_header(Supplementary::title("Yesterday")),
        ]);
        let cs = diff(&old, &new);
        assert_eq!(
            cs.section_updates(),
            &[SectionUpdate {
                id: Identity::new("s1"),
                from: 0,
                to: 0,
            }]
        );
    }

    #[test]
    fn unknown_equality_updates_every_survivor() {
        let s = snap(&[("s1", &["a", "b"])]);
        let options = DiffOptions::<(), u32>::default();
        let cs = diff_with(&s, &s, &options);
        assert_eq!(cs.row_updates().len(), 2);
        assert_eq!(cs.section_updates().len(), 1);
        assert!(!cs.is_structural());
    }

    #[test]
    fn custom_equality_suppresses_updates() {
        let old = snap(&[("s1", &["a@1"])]);
        let new = snap(&[("s1", &["a@2"])]);
        let options = DiffOptions::new(Equality::<()>::structural(), Equality::<u32>::custom(|_, _| true));
        assert!(diff_with(&old, &new, &options).is_empty());
    }

    #[test]
    fn diff_is_deterministic() {
        let old = snap(&[("s1", &["a", "b", "c"]), ("s2", &["d", "e"])]);
        let new = snap(&[("s2", &["e", "a"]), ("s3", &["d"]), ("s1", &["c", "b@1"])]);
        assert_eq!(diff(&old, &new), diff(&old, &new));
    }
}
