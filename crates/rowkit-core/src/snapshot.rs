#![forbid(unsafe_code)]

//! Immutable point-in-time display state.
//!
//! A [`Snapshot`] is an ordered list of [`Section`]s, each owning an ordered
//! list of [`Row`]s. Every entry carries its [`Identity`] plus an opaque model
//! and, for rows, the [`RendererId`] responsible for drawing it. Two snapshots
//! are the only inputs the diff engine needs.
//!
//! # Invariants
//!
//! 1. Section identities are unique within a snapshot.
//! 2. Row identities are unique across all sections of a snapshot.
//! 3. Identity lookups (`section_position`, `row_path`) are O(1) and always
//!    agree with the stored order.
//! 4. A snapshot is never mutated after construction.
//!
//! # Failure Modes
//!
//! | Condition | Behavior |
//! |-----------|----------|
//! | Two sections share an identity | The later section wins, the earlier is dropped |
//! | Two rows share an identity (any sections) | The later row (section-then-row order) wins |
//! | Lookup of an unknown identity / path | `None` |
//!
//! Dropped entries are counted in [`Snapshot::collisions`] and, with the
//! `tracing` feature, reported through `tracing::warn!`.

use std::borrow::Borrow;
use std::fmt;
use std::hash::Hash;

use ahash::AHashMap;

use crate::identity::{Identifiable, Identity};

/// Token naming the renderer (row view / header view type) for an entry.
///
/// Applications define a closed set of these, one per view kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct RendererId(&'static str);

impl RendererId {
    /// Create a renderer token.
    #[must_use]
    pub const fn new(name: &'static str) -> Self {
        Self(name)
    }

    /// The renderer's name.
    #[inline]
    #[must_use]
    pub const fn name(self) -> &'static str {
        self.0
    }
}

impl fmt::Display for RendererId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.0)
    }
}

/// Header or footer descriptor for a section.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Supplementary {
    /// Plain title text drawn by the surface's default header view.
    Title(String),
    /// A custom header/footer view, optionally with a title.
    Renderer {
        renderer: RendererId,
        title: Option<String>,
    },
}

impl Supplementary {
    /// Plain title header/footer.
    #[must_use]
    pub fn title(text: impl Into<String>) -> Self {
        Self::Title(text.into())
    }

    /// Title text, if any.
    #[must_use]
    pub fn text(&self) -> Option<&str> {
        match self {
            Self::Title(text) => Some(text),
            Self::Renderer { title, .. } => title.as_deref(),
        }
    }
}

/// Position of a row: section index plus row index within that section.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default)]
pub struct IndexPath {
    pub section: usize,
    pub row: usize,
}

impl IndexPath {
    #[inline]
    #[must_use]
    pub const fn new(section: usize, row: usize) -> Self {
        Self { section, row }
    }
}

impl fmt::Display for IndexPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}, {}]", self.section, self.row)
    }
}

/// One displayable row.
#[derive(Debug, Clone, PartialEq)]
pub struct Row<R> {
    id: Identity,
    model: R,
    renderer: RendererId,
}

impl<R> Row<R> {
    /// Create a row with an explicit identity.
    #[must_use]
    pub fn new(id: impl Into<Identity>, model: R, renderer: RendererId) -> Self {
        Self {
            id: id.into(),
            model,
            renderer,
        }
    }

    #[must_use]
    pub fn id(&self) -> &Identity {
        &self.id
    }

    #[must_use]
    pub fn model(&self) -> &R {
        &self.model
    }

    #[must_use]
    pub fn renderer(&self) -> RendererId {
        self.renderer
    }

    #[must_use]
    pub fn into_model(self) -> R {
        self.model
    }
}

impl<R: Identifiable> Row<R> {
    /// Create a row whose identity comes from the model.
    #[must_use]
    pub fn from_model(model: R, renderer: RendererId) -> Self {
        Self {
            id: model.identity(),
            model,
            renderer,
        }
    }
}

/// An ordered, identified group of rows.
#[derive(Debug, Clone, PartialEq)]
pub struct Section<S, R> {
    id: Identity,
    model: S,
    header: Option<Supplementary>,
    footer: Option<Supplementary>,
    rows: Vec<Row<R>>,
}

impl<S, R> Section<S, R> {
    /// Create an empty section with an explicit identity.
    #[must_use]
    pub fn new(id: impl Into<Identity>, model: S) -> Self {
        Self {
            id: id.into(),
            model,
            header: None,
            footer: None,
            rows: Vec::new(),
        }
    }

    #[must_use]
    pub fn with_header(mut self, header: Supplementary) -> Self {
        self.header = Some(header);
        self
    }

    #[must_use]
    pub fn with_footer(mut self, footer: Supplementary) -> Self {
        self.footer = Some(footer);
        self
    }

    /// Replace the section's rows.
    #[must_use]
    pub fn with_rows(mut self, rows: Vec<Row<R>>) -> Self {
        self.rows = rows;
        self
    }

    /// Append a row.
    pub fn push_row(&mut self, row: Row<R>) {
        self.rows.push(row);
    }

    #[must_use]
    pub fn id(&self) -> &Identity {
        &self.id
    }

    #[must_use]
    pub fn model(&self) -> &S {
        &self.model
    }

    #[must_use]
    pub fn header(&self) -> Option<&Supplementary> {
        self.header.as_ref()
    }

    #[must_use]
    pub fn footer(&self) -> Option<&Supplementary> {
        self.footer.as_ref()
    }

    #[must_use]
    pub fn rows(&self) -> &[Row<R>] {
        &self.rows
    }

    #[must_use]
    pub fn row(&self, index: usize) -> Option<&Row<R>> {
        self.rows.get(index)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}

impl<S: Identifiable, R> Section<S, R> {
    /// Create an empty section whose identity comes from the model.
    #[must_use]
    pub fn from_model(model: S) -> Self {
        Self::new(model.identity(), model)
    }
}

/// Immutable ordered sequence of sections and their rows.
#[derive(Clone)]
pub struct Snapshot<S, R> {
    sections: Vec<Section<S, R>>,
    section_index: AHashMap<Identity, usize>,
    row_index: AHashMap<Identity, IndexPath>,
    collisions: usize,
}

impl<S, R> Default for Snapshot<S, R> {
    fn default() -> Self {
        Self::empty()
    }
}

impl<S, R> Snapshot<S, R> {
    /// A snapshot with no sections.
    #[must_use]
    pub fn empty() -> Self {
        Self {
            sections: Vec::new(),
            section_index: AHashMap::new(),
            row_index: AHashMap::new(),
            collisions: 0,
        }
    }

    /// Start building a snapshot section by section.
    #[must_use]
    pub fn builder() -> SnapshotBuilder<S, R> {
        SnapshotBuilder::new()
    }

    /// Build a snapshot, resolving identity collisions with last-write-wins.
    #[must_use]
    pub fn from_sections(sections: Vec<Section<S, R>>) -> Self {
        let mut collisions = 0usize;

        let mut last_section: AHashMap<Identity, usize> = AHashMap::with_capacity(sections.len());
        for (index, section) in sections.iter().enumerate() {
            if last_section.insert(section.id.clone(), index).is_some() {
                collisions += 1;
                #[cfg(feature = "tracing")]
                tracing::warn!(section = %section.id, "duplicate section identity; later section wins");
            }
        }
        let mut sections: Vec<Section<S, R>> = sections
            .into_iter()
            .enumerate()
            .filter(|(index, section)| last_section.get(&section.id) == Some(index))
            .map(|(_, section)| section)
            .collect();

        let total: usize = sections.iter().map(Section::len).sum();
        let mut last_row: AHashMap<Identity, IndexPath> = AHashMap::with_capacity(total);
        let mut row_collisions = 0usize;
        for (s, section) in sections.iter().enumerate() {
            for (r, row) in section.rows.iter().enumerate() {
                if last_row.insert(row.id.clone(), IndexPath::new(s, r)).is_some() {
                    row_collisions += 1;
                    #[cfg(feature = "tracing")]
                    tracing::warn!(row = %row.id, section = %section.id, "duplicate row identity; later row wins");
                }
            }
        }

        if row_collisions > 0 {
            collisions += row_collisions;
            for (s, section) in sections.iter_mut().enumerate() {
                let rows = std::mem::take(&mut section.rows);
                section.rows = rows
                    .into_iter()
                    .enumerate()
                    .filter(|(r, row)| last_row.get(&row.id) == Some(&IndexPath::new(s, *r)))
                    .map(|(_, row)| row)
                    .collect();
            }
            // Positions shifted inside sections that lost rows.
            last_row.clear();
            for (s, section) in sections.iter().enumerate() {
                for (r, row) in section.rows.iter().enumerate() {
                    last_row.insert(row.id.clone(), IndexPath::new(s, r));
                }
            }
        }

        let section_index = sections
            .iter()
            .enumerate()
            .map(|(index, section)| (section.id.clone(), index))
            .collect();

        Self {
            sections,
            section_index,
            row_index: last_row,
            collisions,
        }
    }

    /// Number of sections.
    #[must_use]
    pub fn len(&self) -> usize {
        self.sections.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.sections.is_empty()
    }

    /// Total number of rows across all sections.
    #[must_use]
    pub fn total_rows(&self) -> usize {
        self.row_index.len()
    }

    /// Number of rows in the section at `section`, or 0 if out of range.
    #[must_use]
    pub fn row_count(&self, section: usize) -> usize {
        self.sections.get(section).map_or(0, Section::len)
    }

    #[must_use]
    pub fn sections(&self) -> &[Section<S, R>] {
        &self.sections
    }

    #[must_use]
    pub fn section(&self, index: usize) -> Option<&Section<S, R>> {
        self.sections.get(index)
    }

    #[must_use]
    pub fn row(&self, path: IndexPath) -> Option<&Row<R>> {
        self.sections.get(path.section)?.rows.get(path.row)
    }

    /// Index of the section with identity `id`.
    #[must_use]
    pub fn section_position<Q>(&self, id: &Q) -> Option<usize>
    where
        Identity: Borrow<Q>,
        Q: Hash + Eq + ?Sized,
    {
        self.section_index.get(id).copied()
    }

    /// Position of the row with identity `id`.
    #[must_use]
    pub fn row_path<Q>(&self, id: &Q) -> Option<IndexPath>
    where
        Identity: Borrow<Q>,
        Q: Hash + Eq + ?Sized,
    {
        self.row_index.get(id).copied()
    }

    /// Number of entries dropped while resolving identity collisions.
    #[must_use]
    pub fn collisions(&self) -> usize {
        self.collisions
    }

    /// Iterate every row with its position, in display order.
    pub fn rows(&self) -> impl Iterator<Item = (IndexPath, &Row<R>)> {
        self.sections.iter().enumerate().flat_map(|(s, section)| {
            section
                .rows
                .iter()
                .enumerate()
                .map(move |(r, row)| (IndexPath::new(s, r), row))
        })
    }

    /// Section identities in display order.
    #[must_use]
    pub fn section_ids(&self) -> Vec<Identity> {
        self.sections.iter().map(|s| s.id.clone()).collect()
    }

    /// The identity structure: each section identity with its row identities.
    #[must_use]
    pub fn structure(&self) -> Vec<(Identity, Vec<Identity>)> {
        self.sections
            .iter()
            .map(|s| (s.id.clone(), s.rows.iter().map(|r| r.id.clone()).collect()))
            .collect()
    }
}

impl<S: fmt::Debug, R: fmt::Debug> fmt::Debug for Snapshot<S, R> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Snapshot")
            .field("sections", &self.sections)
            .field("collisions", &self.collisions)
            .finish()
    }
}

/// Incremental [`Snapshot`] construction.
#[derive(Debug)]
pub struct SnapshotBuilder<S, R> {
    sections: Vec<Section<S, R>>,
}

impl<S, R> Default for SnapshotBuilder<S, R> {
    fn default() -> Self {
        Self::new()
    }
}

impl<S, R> SnapshotBuilder<S, R> {
    #[must_use]
    pub fn new() -> Self {
        Self {
            sections: Vec::new(),
        }
    }

    /// Append a section (chaining form).
    #[must_use]
    pub fn section(mut self, section: Section<S, R>) -> Self {
        self.sections.push(section);
        self
    }

    /// Append a section.
    pub fn push_section(&mut self, section: Section<S, R>) -> &mut Self {
        self.sections.push(section);
        self
    }

    /// Number of sections pushed so far (before collision resolution).
    #[must_use]
    pub fn len(&self) -> usize {
        self.sections.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.sections.is_empty()
    }

    #[must_use]
    pub fn build(self) -> Snapshot<S, R> {
        Snapshot::from_sections(self.sections)
    }
}
