use std::io::Write;

use form_review::config::{ReviewOptions, SuffixFallback};

#[test]
fn defaults_match_the_historical_behavior() {
    let opts = ReviewOptions::default();
    assert_eq!(opts.matcher.suffix_fallback, SuffixFallback::Loose);
    assert!(opts.validation.show_errors);
    assert!(!opts.validation.include_warnings);
    assert_eq!(opts.render.empty_grid_text, "No data to display");
    assert_eq!(opts.render.currency_symbol, "$");
}

#[test]
fn loads_partial_toml_over_defaults() {
    let mut file = tempfile::NamedTempFile::new().expect("temp file");
    write!(
        file,
        r#"
[matcher]
suffix_fallback = "anchored_only"

[render]
currency_symbol = "EUR "
"#
    )
    .expect("write config");

    let opts = ReviewOptions::load(file.path()).expect("config should load");
    assert_eq!(opts.matcher.suffix_fallback, SuffixFallback::AnchoredOnly);
    assert_eq!(opts.render.currency_symbol, "EUR ");
    // Untouched sections keep their defaults.
    assert!(opts.validation.show_errors);
    assert_eq!(opts.render.date_format, "%m/%d/%Y");
}

#[test]
fn bad_toml_reports_the_file_name() {
    let mut file = tempfile::NamedTempFile::new().expect("temp file");
    write!(file, "[matcher\nbroken").expect("write config");

    let err = ReviewOptions::load(file.path()).unwrap_err().to_string();
    assert!(err.contains("TOML parse error"), "unexpected err: {err}");
}

#[test]
fn missing_file_reports_the_path() {
    let err = ReviewOptions::load(std::path::Path::new("/nonexistent/review.toml"))
        .unwrap_err()
        .to_string();
    assert!(err.contains("/nonexistent/review.toml"), "unexpected err: {err}");
}
