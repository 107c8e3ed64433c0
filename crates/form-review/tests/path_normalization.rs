use form_review::paths::{self, PathCache};

#[test]
fn strips_host_prefixes() {
    assert_eq!(paths::normalize("form.data.email"), "email");
    assert_eq!(paths::normalize("data.email"), "email");
    assert_eq!(paths::normalize("submission.data.email"), "email");
}

#[test]
fn keeps_final_data_segment() {
    // A field literally keyed "data" must survive.
    assert_eq!(paths::normalize("applicant.data"), "applicant.data");
    assert_eq!(paths::normalize("applicant.data.email"), "applicant.email");
}

#[test]
fn drops_intermediate_numeric_segments() {
    assert_eq!(paths::normalize("grid.0.name"), "grid.name");
    // Bracket addressing is not a numeric segment and stays put.
    assert_eq!(paths::normalize("grid[0].name"), "grid[0].name");
}

#[test]
fn drops_panel_wrappers_except_leading() {
    assert_eq!(paths::normalize("section.panel2.email"), "section.email");
    assert_eq!(paths::normalize("panel2.email"), "panel2.email");
    assert_eq!(paths::normalize("a.panel.b.panel3.c"), "a.b.c");
}

#[test]
fn collapses_duplicated_subform_prefixes() {
    assert_eq!(paths::normalize("applicant.applicant.email"), "applicant.email");
    assert_eq!(
        paths::normalize("applicant.contact.applicant.contact.email"),
        "applicant.contact.email"
    );
    assert_eq!(
        paths::normalize("form.data.applicant.data.applicant.email"),
        "applicant.email"
    );
}

#[test]
fn is_idempotent() {
    for raw in [
        "form.data.applicant.data.applicant.email",
        "grid[0].panel1.notes",
        "a.0.b.b.c",
        "  .x.y.  ",
    ] {
        let once = paths::normalize(raw);
        assert_eq!(paths::normalize(&once), once, "not idempotent for {raw}");
    }
}

#[test]
fn trims_whitespace_and_dots() {
    assert_eq!(paths::normalize(" .a.b. "), "a.b");
    assert_eq!(paths::normalize(""), "");
    assert_eq!(paths::normalize("..."), "");
}

#[test]
fn bracket_anchor_finds_last_row_address() {
    assert_eq!(paths::bracket_anchor("form.grid[2].x"), Some("grid[2]"));
    assert_eq!(
        paths::bracket_anchor("outer[1].inner[3].x"),
        Some("inner[3]")
    );
    assert_eq!(paths::bracket_anchor("plain.path"), None);
}

#[test]
fn splits_row_index() {
    assert_eq!(paths::split_row_index("grid[3]"), ("grid", Some(3)));
    assert_eq!(paths::split_row_index("grid"), ("grid", None));
    assert_eq!(paths::split_row_index("grid[x]"), ("grid[x]", None));
}

#[test]
fn cache_memoizes_and_clears() {
    let mut cache = PathCache::new();
    assert!(cache.is_empty());
    assert_eq!(cache.normalize("form.data.email"), "email");
    assert_eq!(cache.normalize("form.data.email"), "email");
    assert_eq!(cache.len(), 1);
    cache.clear();
    assert!(cache.is_empty());
}
