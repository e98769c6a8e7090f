#![forbid(unsafe_code)]

//! Scenario tests: concrete before/after tables replayed on a `SurfaceModel`.

use rowkit_core::{DiffOptions, Equality, Identity, IndexPath, RowMove, Snapshot, diff};
use rowkit_harness::apply_diff;
use rowkit_harness::fixtures::{layout, snap};

fn structural() -> DiffOptions<(), u32> {
    DiffOptions::structural()
}

fn path(section: usize, row: usize) -> IndexPath {
    IndexPath::new(section, row)
}

// ============================================================================
// Core scenarios
// ============================================================================

#[test]
fn swap_within_section_is_one_move() {
    let old = snap(&[("s1", &["a", "b"])]);
    let new = snap(&[("s1", &["b", "a"])]);
    let (model, changes) = apply_diff(&old, &new, &structural());

    assert_eq!(
        changes.row_moves(),
        &[RowMove {
            id: Identity::new("b"),
            from: path(0, 1),
            to: path(0, 0),
            cross_section: false,
            changed: false,
        }]
    );
    assert_eq!(changes.len(), 1);
    assert_eq!(model.layout(), "s1[b,a]");
    assert_eq!(model.history(), &["move_row"]);
}

#[test]
fn row_survives_deletion_of_its_section() {
    let old = snap(&[("S1", &["a"]), ("S2", &["b"])]);
    let new = snap(&[("S2", &["b", "a"])]);
    let (model, changes) = apply_diff(&old, &new, &structural());

    assert_eq!(changes.section_deletes(), &[0]);
    let moves: Vec<&RowMove> = changes.cross_section_moves().collect();
    assert_eq!(moves.len(), 1);
    assert_eq!(moves[0].id.as_str(), "a");
    assert_eq!(moves[0].to, path(0, 1));
    assert!(changes.row_deletes().is_empty());
    assert!(changes.row_inserts().is_empty());
    assert!(changes.row_updates().is_empty());
    assert_eq!(model.layout(), "S2[b,a]");
    assert_eq!(model.history(), &["delete_sections", "move_row"]);
}

#[test]
fn content_change_is_one_update() {
    let old = snap(&[("S1", &["a@1"])]);
    let new = snap(&[("S1", &["a@2"])]);
    let (model, changes) = apply_diff(&old, &new, &structural());

    assert_eq!(changes.len(), 1);
    assert_eq!(changes.row_updates().len(), 1);
    assert_eq!(changes.row_updates()[0].id.as_str(), "a");
    assert!(model.matches(&new));
    assert_eq!(model.sections()[0].rows[0].model(), &2);
}

#[test]
fn first_snapshot_inserts_section_and_rows() {
    let old: Snapshot<(), u32> = Snapshot::empty();
    let new = snap(&[("S1", &["a", "b"])]);
    let (model, changes) = apply_diff(&old, &new, &structural());

    assert_eq!(changes.section_inserts(), &[0]);
    assert_eq!(changes.row_inserts(), &[path(0, 0), path(0, 1)]);
    assert_eq!(changes.len(), 3);
    assert_eq!(model.history(), &["insert_sections", "insert_rows"]);
    assert!(model.matches(&new));
}

#[test]
fn duplicate_identity_last_write_wins() {
    let old = snap(&[("S1", &["a@1", "b"])]);
    let new = snap(&[("S1", &["a@1", "b", "a@2"])]);
    assert_eq!(new.collisions(), 1);
    assert_eq!(layout(&new), "S1[b,a]");

    let (model, changes) = apply_diff(&old, &new, &structural());
    assert!(model.matches(&new));
    assert_eq!(model.sections()[0].rows[1].model(), &2);
    assert_eq!(changes.row_moves().len(), 1);
    assert_eq!(changes.row_moves()[0].id.as_str(), "b");
    assert_eq!(changes.row_updates().len(), 1);
    assert!(changes.row_inserts().is_empty());
}

// ============================================================================
// Edge cases
// ============================================================================

#[test]
fn identical_tables_produce_nothing() {
    let s = snap(&[("S1", &["a", "b"]), ("S2", &["c"])]);
    let (model, changes) = apply_diff(&s, &s, &structural());
    assert!(changes.is_empty());
    assert!(model.history().is_empty());
}

#[test]
fn disjoint_tables_replace_everything() {
    let old = snap(&[("S1", &["a"]), ("S2", &["b", "c"])]);
    let new = snap(&[("T1", &["x", "y"])]);
    let (model, changes) = apply_diff(&old, &new, &structural());

    assert_eq!(changes.section_deletes(), &[1, 0]);
    assert_eq!(changes.section_inserts(), &[0]);
    assert!(changes.row_deletes().is_empty(), "implied by section deletes");
    assert_eq!(changes.row_inserts().len(), 2);
    assert_eq!(model.layout(), "T1[x,y]");
}

#[test]
fn clearing_the_table() {
    let old = snap(&[("S1", &["a"]), ("S2", &[])]);
    let new: Snapshot<(), u32> = Snapshot::empty();
    let (model, changes) = apply_diff(&old, &new, &structural());
    assert_eq!(changes.section_deletes(), &[1, 0]);
    assert_eq!(changes.len(), 2);
    assert!(model.sections().is_empty());
}

#[test]
fn rows_follow_moved_section() {
    let old = snap(&[("S1", &["a", "b"]), ("S2", &["c"]), ("S3", &["d"])]);
    let new = snap(&[("S3", &["d"]), ("S1", &["a", "b"]), ("S2", &["c"])]);
    let (model, changes) = apply_diff(&old, &new, &structural());

    assert_eq!(changes.section_moves().len(), 1);
    assert_eq!(changes.section_moves()[0].id.as_str(), "S3");
    assert_eq!(changes.section_moves()[0].from, 2);
    assert_eq!(changes.section_moves()[0].to, 0);
    assert_eq!(changes.len(), 1);
    assert_eq!(model.layout(), "S3[d] S1[a,b] S2[c]");
}

#[test]
fn row_moves_into_new_section() {
    let old = snap(&[("S1", &["a", "b"])]);
    let new = snap(&[("S0", &["b"]), ("S1", &["a"])]);
    let (model, changes) = apply_diff(&old, &new, &structural());

    assert_eq!(changes.section_inserts(), &[0]);
    assert!(changes.section_moves().is_empty());
    let moves: Vec<&RowMove> = changes.cross_section_moves().collect();
    assert_eq!(moves.len(), 1);
    assert_eq!(moves[0].from, path(0, 1));
    assert_eq!(moves[0].to, path(0, 0));
    assert!(changes.row_inserts().is_empty());
    assert_eq!(model.layout(), "S0[b] S1[a]");
}

#[test]
fn changed_row_moving_sections_carries_content() {
    let old = snap(&[("S1", &["a@1"]), ("S2", &[])]);
    let new = snap(&[("S1", &[]), ("S2", &["a@5"])]);
    let (model, changes) = apply_diff(&old, &new, &structural());

    assert_eq!(changes.row_moves().len(), 1);
    assert!(changes.row_moves()[0].cross_section);
    assert!(changes.row_moves()[0].changed);
    assert!(changes.row_updates().is_empty());
    assert_eq!(changes.summary().row_updates, 1);
    assert!(model.matches(&new));
}

#[test]
fn mixed_churn_replays() {
    let old = snap(&[("S1", &["a", "b", "c", "d"]), ("S2", &["e", "f"]), ("S3", &["g"])]);
    let new = snap(&[
        ("S2", &["f", "a@1", "e"]),
        ("S4", &["h", "g"]),
        ("S1", &["d", "b@2", "i"]),
    ]);
    let (model, changes) = apply_diff(&old, &new, &structural());
    assert!(model.matches(&new), "{}", changes.summary());
    assert_eq!(changes.section_deletes(), &[2]);
    assert_eq!(changes.section_inserts(), &[1]);
    assert_eq!(changes.cross_section_moves().count(), 2);
    assert_eq!(changes.row_deletes(), &[path(0, 2)]);
}

#[test]
fn custom_equality_ignores_versions() {
    let old = snap(&[("S1", &["a@1", "b@1"])]);
    let new = snap(&[("S1", &["a@2", "b@3"])]);
    let options = DiffOptions::new(Equality::structural(), Equality::custom(|_: &u32, _: &u32| true));
    let changes = diff(&old, &new);
    assert_eq!(changes.row_updates().len(), 2);

    let (model, changes) = apply_diff(&old, &new, &options);
    assert!(changes.is_empty());
    // Content stays as displayed when equality says nothing changed.
    assert_eq!(model.sections()[0].rows[0].model(), &1);
}
