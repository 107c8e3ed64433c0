//! Validation pass over the live component tree.
//!
//! One depth-first walk applies per-kind validity rules and aggregates a
//! structured result. A failure while inspecting a single node is logged
//! and that node skipped; the walk itself never aborts.

use std::collections::BTreeMap;

use tracing::warn;

use crate::config::ValidateOptions;
use crate::error::Result;
use crate::kind::FieldKind;
use crate::matcher::InvalidFieldSet;
use crate::paths::PathCache;
use crate::tree::{FieldTree, NodeId};

pub mod rules;

pub trait ValidityRule {
    fn id(&self) -> &'static str;
    fn applies(&self, kind: FieldKind) -> bool;
    /// Returns the error messages for this node; empty means valid.
    fn check(&self, tree: &FieldTree, id: NodeId) -> Result<Vec<String>>;
}

/// Rule dispatch order matters: the first applicable rule wins, with the
/// generic required-check as the fallback.
pub fn builtin_rules() -> Vec<Box<dyn ValidityRule>> {
    vec![
        Box::new(rules::AddressRule),
        Box::new(rules::FilePresenceRule),
        Box::new(rules::RequiredRule),
    ]
}

#[derive(Debug, Clone, Default)]
pub struct FieldError {
    pub label: String,
    pub messages: Vec<String>,
}

#[derive(Debug, Clone)]
pub struct InvalidComponent {
    pub node: NodeId,
    pub path: String,
    pub label: String,
}

#[derive(Debug, Default)]
pub struct ValidationResult {
    pub is_valid: bool,
    pub errors: BTreeMap<String, FieldError>,
    pub warnings: BTreeMap<String, FieldError>,
    pub invalid: Vec<InvalidComponent>,
}

impl ValidationResult {
    /// Derive the invalid-path set consumed by the review and render
    /// passes: normalized error keys plus invalid-component paths.
    pub fn invalid_paths(&self, cache: &mut PathCache) -> InvalidFieldSet {
        let mut set = InvalidFieldSet::new();
        for p in self.errors.keys() {
            set.insert(cache.normalize(p));
        }
        for c in &self.invalid {
            set.insert(cache.normalize(&c.path));
        }
        set
    }
}

pub fn validate(tree: &mut FieldTree, opts: &ValidateOptions) -> ValidationResult {
    let rules = builtin_rules();
    let mut result = ValidationResult {
        is_valid: true,
        ..Default::default()
    };

    for id in tree.descendants(tree.root()) {
        let node = tree.node(id);
        if node.is_template || node.kind == FieldKind::Button {
            continue;
        }
        if tree.effectively_hidden(id) {
            continue;
        }

        let kind = node.kind;
        let Some(rule) = rules.iter().find(|r| r.applies(kind)) else {
            continue;
        };

        if opts.include_warnings && !node.warnings.is_empty() {
            result.warnings.insert(
                node.path.clone(),
                FieldError {
                    label: node.display_label(),
                    messages: node.warnings.clone(),
                },
            );
        }

        let messages = match rule.check(tree, id) {
            Ok(m) => m,
            Err(e) => {
                warn!(
                    rule = rule.id(),
                    path = %tree.node(id).path,
                    "validity check failed, skipping node: {e}"
                );
                continue;
            }
        };
        if messages.is_empty() {
            continue;
        }

        result.is_valid = false;
        let node = tree.node(id);
        result.errors.insert(
            node.path.clone(),
            FieldError {
                label: node.display_label(),
                messages: messages.clone(),
            },
        );
        result.invalid.push(InvalidComponent {
            node: id,
            path: node.path.clone(),
            label: node.display_label(),
        });
        if opts.show_errors {
            tree.set_custom_validity(id, messages);
        }
    }

    result
}
