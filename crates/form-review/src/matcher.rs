//! Validity correlation between independently-computed paths.
//!
//! The validation pass and the review walk compute field paths on their own
//! and can disagree about intermediate segments (sub-form prefixes, panel
//! wrappers). Exact membership in the invalid set therefore under-detects;
//! this module probes literal prefix variants first and falls back to
//! anchor/suffix matching, gated by the configured `SuffixFallback` policy.

use std::collections::BTreeSet;

use crate::config::SuffixFallback;
use crate::paths;

/// Normalized paths that failed the most recent validation pass.
pub type InvalidFieldSet = BTreeSet<String>;

const PREFIXES: &[&str] = &["form.data.", "data.", "form."];

/// Decide whether `candidate` refers to a field in `set`, tolerating path
/// representation drift between the two passes.
pub fn is_invalid(candidate: &str, set: &InvalidFieldSet, policy: SuffixFallback) -> bool {
    if candidate.is_empty() || set.is_empty() {
        return false;
    }

    if set.contains(candidate) {
        return true;
    }
    for pre in PREFIXES {
        if set.contains(&format!("{pre}{candidate}")) {
            return true;
        }
        if let Some(stripped) = candidate.strip_prefix(pre) {
            if set.contains(stripped) {
                return true;
            }
        }
    }

    if policy == SuffixFallback::Off {
        return false;
    }

    let key = paths::terminal_key(candidate);
    if key.is_empty() {
        return false;
    }
    let suffix = format!(".{key}");

    if let Some(anchor) = paths::bracket_anchor(candidate) {
        // Row-addressed field: require the same row anchor, tolerate extra
        // intermediate segments (stray panel wrappers).
        return set
            .iter()
            .any(|m| m.contains(anchor) && m.ends_with(&suffix));
    }

    if policy == SuffixFallback::Loose {
        // Bare suffix match, restricted to members without row addressing.
        // Known risk: two distinct fields sharing a terminal key outside
        // array contexts can cross-match.
        return set
            .iter()
            .any(|m| !paths::has_bracket(m) && (m.ends_with(&suffix) || m == key));
    }

    false
}

/// Variant of `is_invalid` that also accepts candidates already normalized
/// differently by the caller; probes each candidate in turn.
pub fn any_invalid<'a>(
    candidates: impl IntoIterator<Item = &'a str>,
    set: &InvalidFieldSet,
    policy: SuffixFallback,
) -> bool {
    candidates.into_iter().any(|c| is_invalid(c, set, policy))
}
