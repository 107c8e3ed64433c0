use serde_json::json;

use form_review::config::{ReviewOptions, SuffixFallback};
use form_review::engine::ReviewEngine;
use form_review::matcher::{self, InvalidFieldSet};
use form_review::tree::FieldTree;

fn tree_for(schema: serde_json::Value, data: serde_json::Value) -> FieldTree {
    FieldTree::from_schema(&schema, &data).expect("fixture should load")
}

fn set_of(paths: &[&str]) -> InvalidFieldSet {
    paths.iter().map(|p| p.to_string()).collect()
}

#[test]
fn grid_cells_are_row_addressed() {
    let tree = tree_for(
        json!({"components": [
            {"type": "datagrid", "key": "grid", "label": "Grid",
             "components": [
                {"type": "textfield", "key": "name", "label": "Name"}
             ]}
        ]}),
        json!({"data": {"grid": [{"name": "a"}, {"name": "b"}]}}),
    );
    let grid = tree.by_path("grid").unwrap();
    let rows = &tree.node(grid).rows;
    assert_eq!(rows.len(), 2);
    assert_eq!(tree.node(rows[0][0]).path, "grid[0].name");
    assert_eq!(tree.node(rows[1][0]).path, "grid[1].name");
    assert_eq!(tree.node(rows[1][0]).value, json!("b"));
}

#[test]
fn grid_row_values_do_not_leak_across_rows() {
    let tree = tree_for(
        json!({"components": [
            {"type": "datagrid", "key": "grid", "label": "Grid",
             "components": [
                {"type": "textfield", "key": "notes", "label": "Notes"}
             ]},
            {"type": "textfield", "key": "notes", "label": "Top Notes"}
        ]}),
        json!({"data": {"grid": [{"notes": "row0"}], "notes": "toplevel"}}),
    );
    let grid = tree.by_path("grid").unwrap();
    let cell = tree.node(grid).rows[0][0];
    assert_eq!(tree.node(cell).value, json!("row0"));
    // The template child carries no value at all.
    let template = tree.children(grid)[0];
    assert!(tree.node(template).is_template);
    assert_eq!(tree.node(template).value, serde_json::Value::Null);
}

#[test]
fn literal_and_prefix_variants_always_match() {
    let set = set_of(&["applicant.email"]);
    for policy in [
        SuffixFallback::Off,
        SuffixFallback::AnchoredOnly,
        SuffixFallback::Loose,
    ] {
        assert!(matcher::is_invalid("applicant.email", &set, policy));
        assert!(matcher::is_invalid("form.applicant.email", &set, policy));
        assert!(matcher::is_invalid("data.applicant.email", &set, policy));
    }
    let set = set_of(&["form.data.applicant.email"]);
    assert!(matcher::is_invalid(
        "applicant.email",
        &set,
        SuffixFallback::Off
    ));
}

#[test]
fn bracket_anchor_tolerates_stray_wrapper_segments() {
    let set = set_of(&["grid[0].notes"]);
    // The review walk spelled the path with a panel wrapper in between.
    assert!(matcher::is_invalid(
        "grid[0].panel1.notes",
        &set,
        SuffixFallback::AnchoredOnly
    ));
    // A different row never matches.
    assert!(!matcher::is_invalid(
        "grid[1].notes",
        &set,
        SuffixFallback::AnchoredOnly
    ));
}

#[test]
fn loose_fallback_cross_matches_shared_terminal_keys() {
    // Known risk of the historical behavior: a sub-form's invalid "notes"
    // also flags an unrelated top-level "notes".
    let set = set_of(&["applicant.notes"]);
    assert!(matcher::is_invalid("notes", &set, SuffixFallback::Loose));
    assert!(!matcher::is_invalid(
        "notes",
        &set,
        SuffixFallback::AnchoredOnly
    ));
    assert!(!matcher::is_invalid("notes", &set, SuffixFallback::Off));
}

#[test]
fn loose_fallback_ignores_row_addressed_members() {
    // A row-addressed invalid cell must not flag the bare sibling key.
    let set = set_of(&["grid[0].notes"]);
    assert!(!matcher::is_invalid("notes", &set, SuffixFallback::Loose));
}

#[test]
fn invalid_grid_cell_pulls_the_grid_into_the_review() {
    let mut tree = tree_for(
        json!({"components": [
            {"type": "datagrid", "key": "grid", "label": "Grid",
             "components": [
                {"type": "textfield", "key": "name", "label": "Name"},
                {"type": "textfield", "key": "notes", "label": "Notes",
                 "validate": {"required": true}}
             ]}
        ]}),
        json!({"data": {"grid": [{"name": "a"}, {"name": "b", "notes": "ok"}]}}),
    );
    let mut engine = ReviewEngine::new(ReviewOptions::default());
    let report = engine.run_review(&mut tree).expect("review should run");

    assert!(report.invalid_paths.contains("grid[0].notes"));
    let paths: Vec<&str> = report.outline.leaves.iter().map(|l| l.path.as_str()).collect();
    assert!(paths.contains(&"grid[0].name"));
    assert!(paths.contains(&"grid[0].notes"));
    assert!(paths.contains(&"grid[1].notes"));
}

#[test]
fn empty_grid_gets_a_placeholder_leaf() {
    let mut tree = tree_for(
        json!({"components": [
            {"type": "datagrid", "key": "grid", "label": "Grid",
             "reviewVisible": true,
             "components": [
                {"type": "textfield", "key": "name", "label": "Name"}
             ]}
        ]}),
        json!({"data": {"grid": []}}),
    );
    let mut engine = ReviewEngine::new(ReviewOptions::default());
    let report = engine.run_review(&mut tree).expect("review should run");

    let leaf = report
        .outline
        .leaves
        .iter()
        .find(|l| l.path == "grid")
        .expect("grid placeholder leaf");
    assert_eq!(leaf.value, json!("No data entered"));
}

#[test]
fn editgrid_always_carries_a_summary_entry() {
    let mut tree = tree_for(
        json!({"components": [
            {"type": "editgrid", "key": "items", "label": "Items",
             "components": [
                {"type": "textfield", "key": "sku", "label": "SKU"}
             ]}
        ]}),
        json!({"data": {"items": [{"sku": "A-1"}, {"sku": "A-2"}]}}),
    );
    let mut engine = ReviewEngine::new(ReviewOptions::default());
    let report = engine.run_review(&mut tree).expect("review should run");

    let summary = report
        .outline
        .leaves
        .iter()
        .find(|l| l.path == "items")
        .expect("editgrid summary leaf");
    assert_eq!(summary.value, json!("2 row(s)"));
    assert!(report.outline.leaves.iter().any(|l| l.path == "items[0].sku"));
}

#[test]
fn datamap_expands_into_key_value_leaves() {
    let mut tree = tree_for(
        json!({"components": [
            {"type": "datamap", "key": "meta", "label": "Metadata",
             "reviewVisible": true}
        ]}),
        json!({"data": {"meta": {"env": "prod", "region": "eu"}}}),
    );
    let mut engine = ReviewEngine::new(ReviewOptions::default());
    let report = engine.run_review(&mut tree).expect("review should run");

    let env = report
        .outline
        .leaves
        .iter()
        .find(|l| l.path == "meta.env")
        .expect("datamap entry leaf");
    assert_eq!(env.label, "env");
    assert_eq!(env.value, json!("prod"));
    assert!(report.outline.leaves.iter().any(|l| l.path == "meta.region"));
}

#[test]
fn row_panel_wrappers_flatten_into_cells() {
    let mut tree = tree_for(
        json!({"components": [
            {"type": "datagrid", "key": "grid", "label": "Grid",
             "reviewVisible": true,
             "components": [
                {"type": "panel", "key": "wrap", "label": "Wrap",
                 "components": [
                    {"type": "textfield", "key": "inner", "label": "Inner"}
                 ]}
             ]}
        ]}),
        json!({"data": {"grid": [{"inner": "x"}]}}),
    );
    let mut engine = ReviewEngine::new(ReviewOptions::default());
    let report = engine.run_review(&mut tree).expect("review should run");

    let paths: Vec<&str> = report.outline.leaves.iter().map(|l| l.path.as_str()).collect();
    // The wrapper itself contributes no leaf, its cell does.
    assert!(paths.contains(&"grid[0].wrap.inner"));
    assert!(!paths.contains(&"grid[0].wrap"));
}
