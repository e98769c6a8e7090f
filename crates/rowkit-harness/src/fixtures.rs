#![forbid(unsafe_code)]

//! Snapshot fixtures and proptest strategies.
//!
//! Two notations are used across the test suites:
//!
//! - [`snap`] builds a `Snapshot<(), u32>` from `(section, [row])` pairs,
//!   where a row is written `"id"` or `"id@version"` and the version is the
//!   row model.
//! - [`arb_snapshot`] generates `Snapshot<u8, u8>` values over a small
//!   identity pool, so two independently generated snapshots share most
//!   identities and diffs between them exercise moves, cross-section moves,
//!   and updates.

use proptest::collection::vec;
use proptest::option;
use proptest::prelude::*;
use rowkit_core::{RendererId, Row, Section, Snapshot, Supplementary};

/// Default row renderer.
pub const CELL: RendererId = RendererId::new("cell");
/// Alternate renderer, so renderer changes show up as content changes.
pub const BADGE: RendererId = RendererId::new("badge");

/// Build a snapshot from `(section, rows)` pairs.
///
/// Rows are `"id"` (version 0) or `"id@version"`.
#[must_use]
pub fn snap(table: &[(&str, &[&str])]) -> Snapshot<(), u32> {
    Snapshot::from_sections(
        table.iter()
            .map(|(id, rows)| Section::new(*id, ()).with_rows(rows.iter().map(|r| row(r)).collect()))
            .collect(),
    )
}

fn row(notation: &str) -> Row<u32> {
    match notation.split_once('@') {
        Some((id, version)) => Row::new(id, version.parse().unwrap_or(0), CELL),
        None => Row::new(notation, 0, CELL),
    }
}

/// Compact layout of a snapshot, e.g. `"s1[a,b] s2[c]"`.
#[must_use]
pub fn layout<S, R>(snapshot: &Snapshot<S, R>) -> String {
    snapshot
        .structure()
        .iter()
        .map(|(section, rows)| {
            let rows: Vec<&str> = rows.iter().map(|r| r.as_str()).collect();
            format!("{section}[{}]", rows.join(","))
        })
        .collect::<Vec<_>>()
        .join(" ")
}

/// Section identity pool size used by [`arb_snapshot`].
pub const SECTION_POOL: usize = 6;
/// Row identity pool size used by [`arb_snapshot`].
pub const ROW_POOL: usize = 24;

/// Random well-formed snapshot over the shared identity pools.
///
/// Section models and row models are small versions (0..3). A section with
/// version 2 gets a header; a row with version 2 uses [`BADGE`].
pub fn arb_snapshot() -> impl Strategy<Value = Snapshot<u8, u8>> {
    (
        vec((any::<bool>(), any::<u16>(), 0u8..3), SECTION_POOL),
        vec((option::of(0..SECTION_POOL), any::<u16>(), 0u8..3), ROW_POOL),
    )
        .prop_map(|(sections, rows)| build(&sections, &rows))
}

fn build(sections: &[(bool, u16, u8)], rows: &[(Option<usize>, u16, u8)]) -> Snapshot<u8, u8> {
    let mut order: Vec<usize> = (0..sections.len()).filter(|&i| sections[i].0).collect();
    order.sort_by_key(|&i| (sections[i].1, i));

    let built = order
        .into_iter()
        .map(|s| {
            let version = sections[s].2;
            let mut members: Vec<usize> = (0..rows.len()).filter(|&r| rows[r].0 == Some(s)).collect();
            members.sort_by_key(|&r| (rows[r].1, r));
            let section_rows = members
                .into_iter()
                .map(|r| {
                    let version = rows[r].2;
                    let renderer = if version == 2 { BADGE } else { CELL };
                    Row::new(format!("r{r}"), version, renderer)
                })
                .collect();
            let section = Section::new(format!("s{s}"), version).with_rows(section_rows);
            if version == 2 {
                section.with_header(Supplementary::title(format!("Section {s}")))
            } else {
                section
            }
        })
        .collect();
    Snapshot::from_sections(built)
}

/// Raw section lists that may repeat section and row identities.
pub fn arb_colliding_sections() -> impl Strategy<Value = Vec<Section<u8, u8>>> {
    vec((0usize..3, vec((0usize..6, 0u8..3), 0..6)), 0..6).prop_map(|sections| {
        sections
            .into_iter()
            .map(|(s, rows)| {
                Section::new(format!("s{s}"), 0).with_rows(
                    rows.into_iter()
                        .map(|(r, version)| Row::new(format!("r{r}"), version, CELL))
                        .collect(),
                )
            })
            .collect()
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn snap_notation() {
        let s = snap(&[("s1", &["a", "b@3"]), ("s2", &[])]);
        assert_eq!(layout(&s), "s1[a,b] s2[]");
        assert_eq!(s.sections()[0].rows()[1].model(), &3);
    }

    #[test]
    fn build_orders_by_key_and_skips_excluded() {
        let sections = [(true, 5, 0), (false, 0, 0), (true, 1, 2)];
        let rows = [(Some(0), 2, 0), (Some(2), 0, 2), (Some(1), 0, 0), (Some(0), 1, 1)];
        let s = build(&sections, &rows);
        assert_eq!(layout(&s), "s2[r1] s0[r3,r0]");
        assert!(s.sections()[0].header().is_some());
        assert_eq!(s.sections()[0].rows()[0].renderer(), BADGE);
    }
}
