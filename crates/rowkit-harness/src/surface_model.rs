#![forbid(unsafe_code)]

//! In-memory view surface that replays batches the way a list view does.
//!
//! [`SurfaceModel`] keeps its own copy of the displayed sections and rows.
//! During a batch it only records ops; at `end_updates` it resolves the whole
//! batch against its previous state using the two-space index convention:
//!
//! 1. Sections: deleted and moved-out sections leave; inserted and moved-in
//!    sections take their new-space slots; remaining sections fill the free
//!    slots in their old order.
//! 2. Rows, per resulting section: deleted and moved-out rows leave; inserted
//!    and moved-in rows take their new-space slots; remaining rows fill the
//!    rest in order.
//! 3. Reloads (and moves flagged `changed`) take fresh content from the
//!    batch's target snapshot.
//!
//! Content of surviving entries is carried over from the previous state, so
//! comparing the model with the target after a batch checks that the
//! change-set alone was enough to get there.
//!
//! # Panics
//!
//! Every inconsistency panics with a description: ops out of the mandatory
//! order, unsorted delete/insert lists, indices out of range, two entries
//! claiming one slot, slot counts that don't add up, or a reload addressing
//! a different identity than expected.

use std::fmt;

use rowkit_core::{
    Identity, IndexPath, Row, RowMove, RowUpdate, Section, SectionMove, SectionUpdate, Snapshot,
    Supplementary, UpdateOp,
};
use rowkit_runtime::{ApplyContext, ViewSurface};

/// One displayed section.
#[derive(Debug, Clone, PartialEq)]
pub struct ModelSection<S, R> {
    pub id: Identity,
    pub model: S,
    pub header: Option<Supplementary>,
    pub footer: Option<Supplementary>,
    pub rows: Vec<Row<R>>,
}

#[derive(Default)]
struct Batch {
    stage: u8,
    section_deletes: Vec<usize>,
    section_inserts: Vec<usize>,
    section_moves: Vec<SectionMove>,
    section_updates: Vec<SectionUpdate>,
    row_deletes: Vec<IndexPath>,
    row_inserts: Vec<IndexPath>,
    row_moves: Vec<RowMove>,
    row_updates: Vec<RowUpdate>,
}

/// A [`ViewSurface`] that tracks displayed state in memory.
pub struct SurfaceModel<S, R> {
    sections: Vec<ModelSection<S, R>>,
    batch: Option<Batch>,
    history: Vec<&'static str>,
    batches: usize,
    reloads: usize,
}

impl<S, R> Default for SurfaceModel<S, R> {
    fn default() -> Self {
        Self {
            sections: Vec::new(),
            batch: None,
            history: Vec::new(),
            batches: 0,
            reloads: 0,
        }
    }
}

impl<S: Clone, R: Clone> SurfaceModel<S, R> {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// A model already displaying `snapshot`.
    #[must_use]
    pub fn from_snapshot(snapshot: &Snapshot<S, R>) -> Self {
        let mut model = Self::new();
        model.show(snapshot);
        model
    }

    /// Displayed sections.
    #[must_use]
    pub fn sections(&self) -> &[ModelSection<S, R>] {
        &self.sections
    }

    /// Identity structure, comparable with [`Snapshot::structure`].
    #[must_use]
    pub fn structure(&self) -> Vec<(Identity, Vec<Identity>)> {
        self.sections
            .iter()
            .map(|s| (s.id.clone(), s.rows.iter().map(|r| r.id().clone()).collect()))
            .collect()
    }

    /// Compact layout string, e.g. `"inbox[a,b] done[c]"`.
    #[must_use]
    pub fn layout(&self) -> String {
        self.sections
            .iter()
            .map(|s| {
                let rows: Vec<&str> = s.rows.iter().map(|r| r.id().as_str()).collect();
                format!("{}[{}]", s.id, rows.join(","))
            })
            .collect::<Vec<_>>()
            .join(" ")
    }

    /// Names of every op applied so far, in order.
    #[must_use]
    pub fn history(&self) -> &[&'static str] {
        &self.history
    }

    pub fn clear_history(&mut self) {
        self.history.clear();
    }

    /// Completed batches.
    #[must_use]
    pub fn batches(&self) -> usize {
        self.batches
    }

    /// `reload_data` calls.
    #[must_use]
    pub fn reloads(&self) -> usize {
        self.reloads
    }

    fn show(&mut self, snapshot: &Snapshot<S, R>) {
        self.sections = snapshot
            .sections()
            .iter()
            .map(|s| ModelSection {
                id: s.id().clone(),
                model: s.model().clone(),
                header: s.header().cloned(),
                footer: s.footer().cloned(),
                rows: s.rows().to_vec(),
            })
            .collect();
    }
}

impl<S: PartialEq, R: PartialEq> SurfaceModel<S, R> {
    /// Whether the displayed state equals `snapshot`, content included.
    #[must_use]
    pub fn matches(&self, snapshot: &Snapshot<S, R>) -> bool {
        self.sections.len() == snapshot.len()
            && self.sections.iter().zip(snapshot.sections()).all(|(ours, theirs)| {
                ours.id == *theirs.id()
                    && ours.model == *theirs.model()
                    && ours.header.as_ref() == theirs.header()
                    && ours.footer.as_ref() == theirs.footer()
                    && ours.rows == theirs.rows()
            })
    }
}

impl<S: Clone, R: Clone> ViewSurface<S, R> for SurfaceModel<S, R> {
    fn reload_data(&mut self, snapshot: &Snapshot<S, R>) {
        assert!(self.batch.is_none(), "reload_data inside a batch");
        self.reloads += 1;
        self.show(snapshot);
    }

    fn begin_updates(&mut self) {
        assert!(self.batch.is_none(), "nested begin_updates");
        self.batch = Some(Batch::default());
    }

    fn apply(&mut self, op: &UpdateOp<'_>, ctx: &ApplyContext<'_, S, R>) {
        assert_eq!(
            self.sections.len(),
            ctx.previous.len(),
            "surface out of sync with previous snapshot"
        );
        let Some(batch) = self.batch.as_mut() else {
            panic!("{} outside begin_updates/end_updates", op.name());
        };
        let stage = op_stage(op);
        assert!(
            stage >= batch.stage,
            "{} applied after a later op group",
            op.name()
        );
        batch.stage = stage;
        self.history.push(op.name());

        match *op {
            UpdateOp::DeleteSections(indices) => {
                assert_strictly_sorted(indices.iter().rev(), "section deletes must be descending");
                batch.section_deletes.extend_from_slice(indices);
            }
            UpdateOp::InsertSections(indices) => {
                assert_strictly_sorted(indices.iter(), "section inserts must be ascending");
                batch.section_inserts.extend_from_slice(indices);
            }
            UpdateOp::MoveSection(m) => batch.section_moves.push(m.clone()),
            UpdateOp::DeleteRows(paths) => {
                assert_strictly_sorted(paths.iter().rev(), "row deletes must be descending");
                batch.row_deletes.extend_from_slice(paths);
            }
            UpdateOp::InsertRows(paths) => {
                assert_strictly_sorted(paths.iter(), "row inserts must be ascending");
                batch.row_inserts.extend_from_slice(paths);
            }
            UpdateOp::MoveRow(m) => batch.row_moves.push(m.clone()),
            UpdateOp::ReloadRows(updates) => batch.row_updates.extend_from_slice(updates),
            UpdateOp::ReloadSections(updates) => batch.section_updates.extend_from_slice(updates),
        }
    }

    fn end_updates(&mut self, ctx: &ApplyContext<'_, S, R>) {
        let Some(batch) = self.batch.take() else {
            panic!("end_updates without begin_updates");
        };
        let previous = std::mem::take(&mut self.sections);
        self.sections = resolve(previous, &batch, ctx.target);
        self.batches += 1;
        tracing::trace!(batch = self.batches, sections = self.sections.len(), "batch resolved");
    }
}

impl<S, R> fmt::Debug for SurfaceModel<S, R> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SurfaceModel")
            .field("sections", &self.sections.len())
            .field("in_batch", &self.batch.is_some())
            .field("batches", &self.batches)
            .finish()
    }
}

fn op_stage(op: &UpdateOp<'_>) -> u8 {
    match op {
        UpdateOp::DeleteSections(_) => 0,
        UpdateOp::InsertSections(_) => 1,
        UpdateOp::MoveSection(_) => 2,
        UpdateOp::DeleteRows(_) => 3,
        UpdateOp::InsertRows(_) => 4,
        UpdateOp::MoveRow(_) => 5,
        UpdateOp::ReloadRows(_) => 6,
        UpdateOp::ReloadSections(_) => 7,
    }
}

fn assert_strictly_sorted<'a, T: Ord + fmt::Debug + 'a>(
    mut items: impl Iterator<Item = &'a T>,
    message: &str,
) {
    let Some(mut prev) = items.next() else {
        return;
    };
    for item in items {
        assert!(prev < item, "{message}: {prev:?} then {item:?}");
        prev = item;
    }
}

/// Place `claimed` entries at their slots and fill the rest with `stable`.
fn place<T>(len: usize, claimed: Vec<(usize, T)>, stable: Vec<T>, what: &str) -> Vec<T> {
    let mut slots: Vec<Option<T>> = (0..len).map(|_| None).collect();
    for (index, item) in claimed {
        assert!(index < len, "{what}: index {index} out of range (len {len})");
        assert!(slots[index].is_none(), "{what}: two entries claim index {index}");
        slots[index] = Some(item);
    }
    let mut stable = stable.into_iter();
    let resolved: Vec<T> = slots
        .into_iter()
        .map(|slot| match slot {
            Some(item) => item,
            None => match stable.next() {
                Some(item) => item,
                None => panic!("{what}: not enough surviving entries to fill {len} slots"),
            },
        })
        .collect();
    let extra = stable.count();
    assert!(extra == 0, "{what}: {extra} surviving entries have no slot");
    resolved
}

fn target_section<'a, S, R>(target: &'a Snapshot<S, R>, index: usize) -> &'a Section<S, R> {
    match target.section(index) {
        Some(section) => section,
        None => panic!("target snapshot has no section {index}"),
    }
}

fn target_row<S, R>(target: &Snapshot<S, R>, path: IndexPath) -> &Row<R> {
    match target.row(path) {
        Some(row) => row,
        None => panic!("target snapshot has no row at {path}"),
    }
}

fn resolve<S: Clone, R: Clone>(
    previous: Vec<ModelSection<S, R>>,
    batch: &Batch,
    target: &Snapshot<S, R>,
) -> Vec<ModelSection<S, R>> {
    let old_len = previous.len();
    for &index in &batch.section_deletes {
        assert!(index < old_len, "section delete {index} out of range (len {old_len})");
    }
    for m in &batch.section_moves {
        assert!(m.from < old_len, "section move from {} out of range", m.from);
        assert!(
            !batch.section_deletes.contains(&m.from),
            "section {} both moved and deleted",
            m.from
        );
    }

    // Pass 1: where each new section comes from (old index or insert).
    let new_len = old_len - batch.section_deletes.len() + batch.section_inserts.len();
    let mut claimed: Vec<(usize, Option<usize>)> = Vec::new();
    claimed.extend(batch.section_inserts.iter().map(|&to| (to, None)));
    claimed.extend(batch.section_moves.iter().map(|m| (m.to, Some(m.from))));
    let stable: Vec<Option<usize>> = (0..old_len)
        .filter(|i| !batch.section_deletes.contains(i))
        .filter(|i| !batch.section_moves.iter().any(|m| m.from == *i))
        .map(Some)
        .collect();
    let origins = place(new_len, claimed, stable, "sections");

    // Pass 2: rows per resulting section.
    let mut old_rows: Vec<Vec<Option<Row<R>>>> = previous
        .iter()
        .map(|s| s.rows.iter().cloned().map(Some).collect())
        .collect();
    let mut take_old = |path: IndexPath, why: &str| -> Row<R> {
        let slot = old_rows
            .get_mut(path.section)
            .and_then(|rows| rows.get_mut(path.row));
        match slot.and_then(Option::take) {
            Some(row) => row,
            None => panic!("{why}: no row at old {path} (or used twice)"),
        }
    };

    // Rows leaving their place: deletes vanish, moves are re-placed below.
    for &path in &batch.row_deletes {
        let _ = take_old(path, "row delete");
    }
    let moved: Vec<(IndexPath, Row<R>)> = batch
        .row_moves
        .iter()
        .map(|m| {
            let row = take_old(m.from, "row move");
            assert_eq!(row.id(), &m.id, "row move source identity mismatch at {}", m.from);
            let row = if m.changed { target_row(target, m.to).clone() } else { row };
            (m.to, row)
        })
        .collect();

    let mut resolved: Vec<ModelSection<S, R>> = Vec::with_capacity(new_len);
    for (index, origin) in origins.into_iter().enumerate() {
        let (mut section, stable_rows) = match origin {
            Some(from) => {
                let old = &previous[from];
                let rows: Vec<Row<R>> = old_rows[from].iter_mut().filter_map(Option::take).collect();
                (
                    ModelSection {
                        id: old.id.clone(),
                        model: old.model.clone(),
                        header: old.header.clone(),
                        footer: old.footer.clone(),
                        rows: Vec::new(),
                    },
                    rows,
                )
            }
            None => {
                let fresh = target_section(target, index);
                (
                    ModelSection {
                        id: fresh.id().clone(),
                        model: fresh.model().clone(),
                        header: fresh.header().cloned(),
                        footer: fresh.footer().cloned(),
                        rows: Vec::new(),
                    },
                    Vec::new(),
                )
            }
        };

        let mut claimed: Vec<(usize, Row<R>)> = batch
            .row_inserts
            .iter()
            .filter(|p| p.section == index)
            .map(|&p| (p.row, target_row(target, p).clone()))
            .collect();
        claimed.extend(
            moved
                .iter()
                .filter(|(to, _)| to.section == index)
                .map(|(to, row)| (to.row, row.clone())),
        );
        let len = stable_rows.len() + claimed.len();
        section.rows = place(len, claimed, stable_rows, "rows");
        resolved.push(section);
    }

    // Rows of deleted sections vanish with them; anything else left over was
    // never accounted for.
    for (from, rows) in old_rows.iter().enumerate() {
        if batch.section_deletes.contains(&from) {
            continue;
        }
        if let Some(row) = rows.iter().flatten().next() {
            panic!("row {:?} of surviving section {from} was dropped", row.id());
        }
    }

    // Pass 3: content reloads.
    for u in &batch.row_updates {
        let fresh = target_row(target, u.to);
        let Some(slot) = resolved
            .get_mut(u.to.section)
            .and_then(|s| s.rows.get_mut(u.to.row))
        else {
            panic!("row reload at {} out of range", u.to);
        };
        assert_eq!(slot.id(), &u.id, "row reload identity mismatch at {}", u.to);
        *slot = fresh.clone();
    }
    let section_reloads = batch
        .section_updates
        .iter()
        .map(|u| (u.to, &u.id))
        .chain(batch.section_moves.iter().filter(|m| m.changed).map(|m| (m.to, &m.id)));
    for (to, id) in section_reloads {
        let fresh = target_section(target, to);
        let slot = &mut resolved[to];
        assert_eq!(&slot.id, id, "section reload identity mismatch at {to}");
        slot.model = fresh.model().clone();
        slot.header = fresh.header().cloned();
        slot.footer = fresh.footer().cloned();
    }

    resolved
}
