#![no_main]

use arbitrary::Arbitrary;
use libfuzzer_sys::fuzz_target;
use rowkit_core::{DiffOptions, RendererId, Row, Section, Snapshot, diff, diff_with};

const CELL: RendererId = RendererId::new("cell");

#[derive(Arbitrary, Debug)]
struct FuzzSection {
    id: u8,
    version: u8,
    rows: Vec<(u8, u8)>,
}

#[derive(Arbitrary, Debug)]
struct FuzzInput {
    old: Vec<FuzzSection>,
    new: Vec<FuzzSection>,
    unknown_equality: bool,
}

fn build(sections: &[FuzzSection]) -> Snapshot<u8, u8> {
    Snapshot::from_sections(
        sections
            .iter()
            .take(16)
            .map(|s| {
                let rows = s
                    .rows
                    .iter()
                    .take(64)
                    .map(|&(id, version)| Row::new(format!("r{}", id % 48), version, CELL))
                    .collect();
                Section::new(format!("s{}", s.id % 12), s.version).with_rows(rows)
            })
            .collect(),
    )
}

fuzz_target!(|input: FuzzInput| {
    let old = build(&input.old);
    let new = build(&input.new);

    let options = if input.unknown_equality {
        DiffOptions::default()
    } else {
        DiffOptions::structural()
    };
    let changes = diff_with(&old, &new, &options);

    // Delete lists are in old space, descending; insert lists in new space, ascending.
    assert!(changes.section_deletes().windows(2).all(|w| w[0] > w[1]));
    assert!(changes.section_inserts().windows(2).all(|w| w[0] < w[1]));
    assert!(changes.row_deletes().windows(2).all(|w| w[0] > w[1]));
    assert!(changes.row_inserts().windows(2).all(|w| w[0] < w[1]));
    assert!(changes.section_deletes().iter().all(|&i| i < old.len()));
    assert!(changes.section_inserts().iter().all(|&i| i < new.len()));
    for m in changes.row_moves() {
        assert_eq!(old.row(m.from).map(Row::id), Some(&m.id));
        assert_eq!(new.row(m.to).map(Row::id), Some(&m.id));
    }

    assert!(diff(&new, &new).is_empty());
    assert_eq!(diff(&old, &new), diff(&old, &new));
});
