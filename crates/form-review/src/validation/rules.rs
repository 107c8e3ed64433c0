//! Built-in validity rules.

use form_review_macros::Rule;
use serde_json::Value;

use crate::error::Result;
use crate::tree::{FieldTree, NodeId, is_blank};

/// Messages for the generic host required-check, read-only form.
fn generic_required(tree: &FieldTree, id: NodeId) -> Vec<String> {
    let node = tree.node(id);
    if !node.required {
        return Vec::new();
    }
    let ok = match node.kind {
        crate::kind::FieldKind::Checkbox => node.value.as_bool().unwrap_or(false),
        _ => !is_blank(&node.value),
    };
    if ok {
        return Vec::new();
    }
    if !node.errors.is_empty() {
        return node.errors.clone();
    }
    vec![format!("{} is required", node.display_label())]
}

fn formatted_place(value: &Value) -> Option<&str> {
    value
        .get("formattedPlace")
        .or_else(|| value.get("address").and_then(|a| a.get("formattedPlace")))
        .and_then(Value::as_str)
}

/// Geocoded addresses are complete only once the provider has written a
/// formatted place string; a half-typed address otherwise passes the
/// generic blankness check.
#[Rule(id = "address-complete", kinds = [Address])]
pub struct AddressRule;

impl AddressRule {
    pub fn run(tree: &FieldTree, id: NodeId) -> Result<Vec<String>> {
        let node = tree.node(id);
        if !node.required {
            return Ok(Vec::new());
        }
        match formatted_place(&node.value) {
            Some(place) if !place.trim().is_empty() => Ok(Vec::new()),
            _ => Ok(if node.errors.is_empty() {
                vec![format!("{} is required", node.display_label())]
            } else {
                node.errors.clone()
            }),
        }
    }
}

/// Upload state is scattered across storage backends: the data value, the
/// component-local file list, the file service, the submission data under
/// the component key, and (while an async upload is settling) a still-
/// populated native file input. Any one signal counts as presence.
#[Rule(id = "file-presence", kinds = [File])]
pub struct FilePresenceRule;

impl FilePresenceRule {
    pub fn run(tree: &FieldTree, id: NodeId) -> Result<Vec<String>> {
        let node = tree.node(id);
        if !node.required {
            return Ok(Vec::new());
        }
        let present = !is_blank(&node.value)
            || !node.uploads.is_empty()
            || tree
                .submission_value(&node.key)
                .map(|v| !is_blank(v))
                .unwrap_or(false)
            || tree
                .service_uploads
                .get(&node.key)
                .map(|v| !v.is_empty())
                .unwrap_or(false)
            || node.pending_native_files > 0;
        if present {
            return Ok(Vec::new());
        }
        Ok(if node.errors.is_empty() {
            vec!["Invalid".to_string()]
        } else {
            node.errors.clone()
        })
    }
}

/// Fallback for every other kind: the host's generic required-check.
#[Rule(id = "required", fallback = true)]
pub struct RequiredRule;

impl RequiredRule {
    pub fn run(tree: &FieldTree, id: NodeId) -> Result<Vec<String>> {
        Ok(generic_required(tree, id))
    }
}
