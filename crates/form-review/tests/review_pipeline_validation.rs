use serde_json::json;

use form_review::config::ReviewOptions;
use form_review::engine::ReviewEngine;
use form_review::tree::FieldTree;

fn tree_for(schema: serde_json::Value, data: serde_json::Value) -> FieldTree {
    FieldTree::from_schema(&schema, &data).expect("fixture should load")
}

#[test]
fn required_blank_field_fails_validation() {
    let mut tree = tree_for(
        json!({"components": [
            {"type": "textfield", "key": "email", "label": "Email",
             "validate": {"required": true}}
        ]}),
        json!({"data": {}}),
    );
    let engine = ReviewEngine::new(ReviewOptions::default());
    let result = engine.validate(&mut tree);

    assert!(!result.is_valid);
    let err = result.errors.get("email").expect("email should be flagged");
    assert_eq!(err.messages, vec!["Email is required".to_string()]);
    // show_errors writes the messages back onto the node.
    let id = tree.by_path("email").unwrap();
    assert_eq!(tree.node(id).errors, vec!["Email is required".to_string()]);
}

#[test]
fn is_valid_does_not_write_errors_back() {
    let mut tree = tree_for(
        json!({"components": [
            {"type": "textfield", "key": "email", "label": "Email",
             "validate": {"required": true}}
        ]}),
        json!({"data": {}}),
    );
    let engine = ReviewEngine::new(ReviewOptions::default());
    assert!(!engine.is_valid(&mut tree));
    let id = tree.by_path("email").unwrap();
    assert!(tree.node(id).errors.is_empty());
}

#[test]
fn hidden_and_disabled_fields_are_skipped() {
    let mut tree = tree_for(
        json!({"components": [
            {"type": "textfield", "key": "a", "label": "A", "hidden": true,
             "validate": {"required": true}},
            {"type": "textfield", "key": "b", "label": "B", "disabled": true,
             "validate": {"required": true}},
            {"type": "textfield", "key": "c", "label": "C", "visible": false,
             "validate": {"required": true}}
        ]}),
        json!({"data": {}}),
    );
    let engine = ReviewEngine::new(ReviewOptions::default());
    assert!(engine.validate(&mut tree).is_valid);
}

#[test]
fn fields_inside_a_hidden_panel_never_invalidate_the_form() {
    // The hidden flag sits on the container, not the field. Validation
    // must skip the subtree exactly as the review walk drops it, or the
    // form stays invalid on a field the user cannot see.
    let mut tree = tree_for(
        json!({"components": [
            {"type": "panel", "key": "extras", "label": "Extras", "hidden": true,
             "components": [
                {"type": "textfield", "key": "vin", "label": "VIN",
                 "validate": {"required": true}}
             ]},
            {"type": "textfield", "key": "name", "label": "Name",
             "reviewVisible": true}
        ]}),
        json!({"data": {"name": "Ada"}}),
    );
    let mut engine = ReviewEngine::new(ReviewOptions::default());
    let report = engine.run_review(&mut tree).expect("review should run");

    assert!(report.validation.is_valid);
    assert!(report.invalid_paths.is_empty());
    assert!(!report.outline.leaves.iter().any(|l| l.path.contains("vin")));
}

#[test]
fn fields_inside_a_hidden_grid_never_invalidate_the_form() {
    let mut tree = tree_for(
        json!({"components": [
            {"type": "datagrid", "key": "grid", "label": "Grid", "hidden": true,
             "components": [
                {"type": "textfield", "key": "notes", "label": "Notes",
                 "validate": {"required": true}}
             ]}
        ]}),
        json!({"data": {"grid": [{}]}}),
    );
    let engine = ReviewEngine::new(ReviewOptions::default());
    assert!(engine.validate(&mut tree).is_valid);
}

#[test]
fn disabled_but_review_visible_is_still_validated() {
    let mut tree = tree_for(
        json!({"components": [
            {"type": "textfield", "key": "b", "label": "B", "disabled": true,
             "reviewVisible": true, "validate": {"required": true}}
        ]}),
        json!({"data": {}}),
    );
    let engine = ReviewEngine::new(ReviewOptions::default());
    assert!(!engine.validate(&mut tree).is_valid);
}

#[test]
fn required_checkbox_must_be_true() {
    let mut tree = tree_for(
        json!({"components": [
            {"type": "checkbox", "key": "terms", "label": "Terms",
             "validate": {"required": true}}
        ]}),
        json!({"data": {"terms": false}}),
    );
    let engine = ReviewEngine::new(ReviewOptions::default());
    assert!(!engine.validate(&mut tree).is_valid);

    let mut tree = tree_for(
        json!({"components": [
            {"type": "checkbox", "key": "terms", "label": "Terms",
             "validate": {"required": true}}
        ]}),
        json!({"data": {"terms": true}}),
    );
    assert!(engine.validate(&mut tree).is_valid);
}

#[test]
fn address_requires_formatted_place() {
    let schema = json!({"components": [
        {"type": "address", "key": "home", "label": "Home Address",
         "validate": {"required": true}}
    ]});
    let engine = ReviewEngine::new(ReviewOptions::default());

    // A half-typed address object is non-blank but still incomplete.
    let mut tree = tree_for(
        schema.clone(),
        json!({"data": {"home": {"street": "123 Main"}}}),
    );
    let result = engine.validate(&mut tree);
    assert!(!result.is_valid);
    assert!(result.errors.contains_key("home"));

    let mut tree = tree_for(
        schema,
        json!({"data": {"home": {"formattedPlace": "123 Main St, Springfield"}}}),
    );
    assert!(engine.validate(&mut tree).is_valid);
}

#[test]
fn file_presence_accepts_any_storage_signal() {
    let engine = ReviewEngine::new(ReviewOptions::default());

    let mut tree = tree_for(
        json!({"components": [
            {"type": "file", "key": "resume", "label": "Resume",
             "validate": {"required": true}}
        ]}),
        json!({"data": {}}),
    );
    let result = engine.validate(&mut tree);
    assert!(!result.is_valid);
    assert_eq!(
        result.errors.get("resume").unwrap().messages,
        vec!["Invalid".to_string()]
    );

    // An upload still sitting in the native input counts as present.
    let mut tree = tree_for(
        json!({"components": [
            {"type": "file", "key": "resume", "label": "Resume",
             "pendingNativeFiles": 1, "validate": {"required": true}}
        ]}),
        json!({"data": {}}),
    );
    assert!(engine.validate(&mut tree).is_valid);

    // So does a record in the file service.
    let mut tree = tree_for(
        json!({"components": [
            {"type": "file", "key": "resume", "label": "Resume",
             "validate": {"required": true}}
        ]}),
        json!({"data": {}}),
    );
    tree.service_uploads.insert(
        "resume".to_string(),
        vec![form_review::tree::FileRef {
            name: Some("resume.pdf".to_string()),
            ..Default::default()
        }],
    );
    assert!(engine.validate(&mut tree).is_valid);
}

#[test]
fn validate_fields_restricts_the_result() {
    let mut tree = tree_for(
        json!({"components": [
            {"type": "textfield", "key": "a", "label": "A",
             "validate": {"required": true}},
            {"type": "textfield", "key": "b", "label": "B",
             "validate": {"required": true}}
        ]}),
        json!({"data": {}}),
    );
    let engine = ReviewEngine::new(ReviewOptions::default());
    let result = engine.validate_fields(&mut tree, &["form.data.a".to_string()]);

    assert!(!result.is_valid);
    assert!(result.errors.contains_key("a"));
    assert!(!result.errors.contains_key("b"));
}

#[test]
fn template_children_never_validate() {
    // The grid's column template is required, but only instantiated row
    // cells carry values; an empty grid with a required template column
    // must not fail on the template itself.
    let mut tree = tree_for(
        json!({"components": [
            {"type": "datagrid", "key": "grid", "label": "Grid",
             "components": [
                {"type": "textfield", "key": "name", "label": "Name",
                 "validate": {"required": true}}
             ]}
        ]}),
        json!({"data": {"grid": []}}),
    );
    let engine = ReviewEngine::new(ReviewOptions::default());
    assert!(engine.validate(&mut tree).is_valid);
}

#[test]
fn run_review_reports_invalid_paths_and_outline() {
    let mut tree = tree_for(
        json!({"components": [
            {"type": "textfield", "key": "email", "label": "Email",
             "reviewVisible": true, "validate": {"required": true}},
            {"type": "textfield", "key": "name", "label": "Name",
             "reviewVisible": true}
        ]}),
        json!({"data": {"name": "Ada"}}),
    );
    let mut engine = ReviewEngine::new(ReviewOptions::default());
    let report = engine.run_review(&mut tree).expect("review should run");

    assert!(!report.validation.is_valid);
    assert!(report.invalid_paths.contains("email"));
    let paths: Vec<&str> = report.outline.leaves.iter().map(|l| l.path.as_str()).collect();
    assert!(paths.contains(&"email"));
    assert!(paths.contains(&"name"));
}

#[test]
fn invalid_field_surfaces_despite_not_being_review_visible() {
    let mut tree = tree_for(
        json!({"components": [
            {"type": "textfield", "key": "email", "label": "Email",
             "validate": {"required": true}},
            {"type": "textfield", "key": "name", "label": "Name"}
        ]}),
        json!({"data": {"name": "Ada"}}),
    );
    let mut engine = ReviewEngine::new(ReviewOptions::default());
    let report = engine.run_review(&mut tree).expect("review should run");

    let paths: Vec<&str> = report.outline.leaves.iter().map(|l| l.path.as_str()).collect();
    // The invalid field shows, the valid non-flagged one does not.
    assert!(paths.contains(&"email"));
    assert!(!paths.contains(&"name"));
}

#[test]
fn unready_subform_yields_a_value_leaf() {
    let mut tree = tree_for(
        json!({"components": [
            {"type": "form", "key": "child", "label": "Child Form",
             "ready": false, "reviewVisible": true,
             "components": [
                {"type": "textfield", "key": "inner", "label": "Inner",
                 "reviewVisible": true}
             ]}
        ]}),
        json!({"data": {"child": {"data": {"inner": "x"}}}}),
    );
    let mut engine = ReviewEngine::new(ReviewOptions::default());
    let report = engine.run_review(&mut tree).expect("review should run");

    let paths: Vec<&str> = report.outline.leaves.iter().map(|l| l.path.as_str()).collect();
    assert!(paths.contains(&"child"));
    assert!(!paths.contains(&"child.inner"));
}

#[test]
fn duplicate_normalized_paths_keep_the_first_leaf() {
    // Both spellings normalize to "email"; the first writer wins.
    let mut tree = tree_for(
        json!({"components": [
            {"type": "textfield", "key": "email", "label": "Email",
             "reviewVisible": true},
            {"type": "container", "key": "data", "label": "Data",
             "components": [
                {"type": "textfield", "key": "email", "label": "Shadow Email",
                 "reviewVisible": true}
             ]}
        ]}),
        json!({"data": {"email": "ada@example.com", "data": {"email": "other"}}}),
    );
    let mut engine = ReviewEngine::new(ReviewOptions::default());
    let report = engine.run_review(&mut tree).expect("review should run");

    let email_leaves: Vec<_> = report
        .outline
        .leaves
        .iter()
        .filter(|l| l.label.contains("Email"))
        .collect();
    assert_eq!(email_leaves.len(), 1);
    assert_eq!(email_leaves[0].label, "Email");
}

#[test]
fn host_contract_operations_on_the_tree() {
    let mut tree = tree_for(
        json!({"components": [
            {"type": "panel", "key": "p", "label": "P",
             "components": [
                {"type": "textfield", "key": "email", "label": "Email",
                 "validate": {"required": true}}
             ]}
        ]}),
        json!({"data": {"email": "a@b.c"}}),
    );

    let email = tree.by_path("p.email").unwrap();
    assert_eq!(tree.data_value(email), &json!("a@b.c"));
    assert!(tree.check_validity(email));

    tree.node_mut(email).value = serde_json::Value::Null;
    assert!(!tree.check_validity(email));
    assert_eq!(tree.node(email).errors, vec!["Email is required".to_string()]);

    // The visitor short-circuits a branch when it returns false.
    let mut visited = Vec::new();
    tree.every_component(tree.root(), &mut |id| {
        visited.push(id);
        false
    });
    assert_eq!(visited.len(), 1);
}

#[test]
fn disabled_top_level_panel_gets_a_placeholder_entry() {
    let mut tree = tree_for(
        json!({"components": [
            {"type": "panel", "key": "contact", "label": "Contact", "disabled": true,
             "components": [
                {"type": "textfield", "key": "email", "label": "Email"}
             ]}
        ]}),
        json!({"data": {"email": "a@b.c"}}),
    );
    let mut engine = ReviewEngine::new(ReviewOptions::default());
    let report = engine.run_review(&mut tree).expect("review should run");

    let panel = report
        .outline
        .leaves
        .iter()
        .find(|l| l.path == "contact")
        .expect("panel placeholder entry");
    assert_eq!(panel.value, json!("(Panel contents)"));
    assert!(report.outline.leaves.iter().any(|l| l.path == "contact.email"));
}
