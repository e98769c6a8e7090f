#![no_main]

use libfuzzer_sys::fuzz_target;
use rowkit_core::{RendererId, Row, Section, Snapshot};

const CELL: RendererId = RendererId::new("cell");

// Arbitrary bytes as a flat section/row table: a byte with the high bit set
// opens a section, any other byte appends a row to the current one.
fuzz_target!(|data: &[u8]| {
    if data.len() > 4096 {
        return;
    }
    let mut sections: Vec<Section<(), u8>> = Vec::new();
    for &b in data {
        if b & 0x80 != 0 || sections.is_empty() {
            sections.push(Section::new(format!("s{}", b & 0x0f), ()));
        }
        let Some(section) = sections.last_mut() else {
            continue;
        };
        if b & 0x80 == 0 {
            section.push_row(Row::new(format!("r{}", b & 0x3f), b, CELL));
        }
    }

    let snapshot = Snapshot::from_sections(sections);

    // Every surviving identity is unique and indexed at its position.
    for (index, section) in snapshot.sections().iter().enumerate() {
        assert_eq!(snapshot.section_position(section.id()), Some(index));
    }
    for (path, row) in snapshot.rows() {
        assert_eq!(snapshot.row_path(row.id()), Some(path));
    }
    let structure = snapshot.structure();
    assert_eq!(structure.len(), snapshot.len());
    assert_eq!(
        structure.iter().map(|(_, rows)| rows.len()).sum::<usize>(),
        snapshot.total_rows()
    );
});
