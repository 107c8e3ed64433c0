//! Canonical path normalization.
//!
//! Validation and review walk the tree independently and the host framework
//! is not consistent about how it spells a field's storage path: sub-form
//! prefixing can duplicate segments, stray array indices appear between
//! segments, and panel wrappers inside grid rows inject structural segments.
//! `normalize` collapses all of that into one comparable key so the two
//! passes can agree on field identity.

use std::collections::HashMap;
use std::sync::OnceLock;

use regex::Regex;

/// Per-cycle memo for normalized paths. Forms run to hundreds of fields and
/// every field is normalized several times per pass; the cache is created
/// for one review cycle and dropped with it.
#[derive(Debug, Default)]
pub struct PathCache {
    memo: HashMap<String, String>,
}

impl PathCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn normalize(&mut self, raw: &str) -> String {
        if let Some(hit) = self.memo.get(raw) {
            return hit.clone();
        }
        let out = normalize(raw);
        self.memo.insert(raw.to_string(), out.clone());
        out
    }

    pub fn clear(&mut self) {
        self.memo.clear();
    }

    pub fn len(&self) -> usize {
        self.memo.len()
    }

    pub fn is_empty(&self) -> bool {
        self.memo.is_empty()
    }
}

/// Canonicalize a raw storage path. Idempotent:
/// `normalize(&normalize(p)) == normalize(p)`.
pub fn normalize(raw: &str) -> String {
    let trimmed = raw.trim().trim_matches('.');
    if trimmed.is_empty() {
        return String::new();
    }

    let mut segs: Vec<&str> = trimmed.split('.').filter(|s| !s.is_empty()).collect();

    // Leading host prefixes.
    while matches!(segs.first(), Some(&"form") | Some(&"submission")) {
        segs.remove(0);
    }

    let last = segs.len().saturating_sub(1);
    let mut kept: Vec<&str> = Vec::with_capacity(segs.len());
    for (i, seg) in segs.iter().enumerate() {
        let is_final = i == last;
        if !is_final && *seg == "data" {
            continue;
        }
        if !is_final && is_numeric(seg) {
            continue;
        }
        if !is_final && i > 0 && is_panel_wrapper(seg) {
            continue;
        }
        // A leading panel wrapper is a real container segment, keep it.
        kept.push(seg);
    }

    collapse_repeats(&mut kept);
    kept.join(".")
}

fn is_numeric(seg: &str) -> bool {
    !seg.is_empty() && seg.bytes().all(|b| b.is_ascii_digit())
}

fn is_panel_wrapper(seg: &str) -> bool {
    let Some(rest) = seg.strip_prefix("panel") else {
        return false;
    };
    rest.is_empty() || rest.bytes().all(|b| b.is_ascii_digit())
}

/// Collapse immediately-repeated segment windows (`X.X` but also `a.b.a.b`)
/// to a fixpoint. Window lengths beyond 3 do not occur in practice; the
/// double-prefix bug repeats at most a sub-form path of that depth.
fn collapse_repeats(segs: &mut Vec<&str>) {
    loop {
        let mut changed = false;
        for width in 1..=3usize {
            let mut i = 0;
            while i + 2 * width <= segs.len() {
                if segs[i..i + width] == segs[i + width..i + 2 * width] {
                    segs.drain(i + width..i + 2 * width);
                    changed = true;
                } else {
                    i += 1;
                }
            }
        }
        if !changed {
            return;
        }
    }
}

fn anchor_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"[A-Za-z_][A-Za-z0-9_]*\[\d+\]").expect("static regex"))
}

/// The trailing `name[N]` row-addressing substring, if the path has one.
pub fn bracket_anchor(path: &str) -> Option<&str> {
    anchor_re().find_iter(path).last().map(|m| m.as_str())
}

pub fn has_bracket(path: &str) -> bool {
    path.contains('[')
}

/// The final dot-segment of a path (the field's own key).
pub fn terminal_key(path: &str) -> &str {
    path.rsplit('.').next().unwrap_or(path)
}

/// Split a normalized path into segments, dropping pure-numeric ones.
pub fn display_segments(path: &str) -> Vec<&str> {
    path.split('.')
        .filter(|s| !s.is_empty() && !is_numeric(s))
        .collect()
}

/// Split a segment into its name and an optional `[N]` row index.
pub fn split_row_index(seg: &str) -> (&str, Option<usize>) {
    if let Some(open) = seg.rfind('[') {
        if seg.ends_with(']') {
            if let Ok(n) = seg[open + 1..seg.len() - 1].parse::<usize>() {
                return (&seg[..open], Some(n));
            }
        }
    }
    (seg, None)
}
