//! Review outline construction.
//!
//! Second walk over the live tree: decides which fields surface in the
//! review summary and flattens them into path-addressed leaves plus side
//! maps of container metadata. Invalidity always wins over visibility:
//! a field that failed validation is surfaced no matter how it is flagged,
//! so the user can find and fix it.

use std::collections::{BTreeMap, BTreeSet, VecDeque};

use serde_json::Value;
use tracing::warn;

use crate::config::SuffixFallback;
use crate::engine::ReviewCycle;
use crate::format;
use crate::kind::FieldKind;
use crate::matcher::{self, InvalidFieldSet};
use crate::tree::{FieldTree, NodeId};

pub const NO_ROWS_TEXT: &str = "No data entered";
pub const PANEL_PLACEHOLDER: &str = "(Panel contents)";
pub const WELL_PLACEHOLDER: &str = "(Well contents)";

#[derive(Debug, Clone)]
pub struct ReviewLeaf {
    /// Raw path the leaf was collected under; normalized for comparisons.
    pub path: String,
    pub label: String,
    pub value: Value,
    pub node: NodeId,
    pub source_index: usize,
}

#[derive(Debug, Clone)]
pub struct GridMeta {
    pub kind: FieldKind,
    pub column_keys: Vec<String>,
    pub column_labels: Vec<String>,
}

#[derive(Debug, Default)]
pub struct ReviewOutline {
    pub leaves: Vec<ReviewLeaf>,
    /// Normalized container path -> display label.
    pub container_labels: BTreeMap<String, String>,
    /// Normalized container path -> column definitions for tabular kinds.
    pub container_meta: BTreeMap<String, GridMeta>,
    /// Normalized container path -> original form position.
    pub container_form_index: BTreeMap<String, usize>,
}

struct Builder<'a> {
    tree: &'a FieldTree,
    invalid: &'a InvalidFieldSet,
    policy: SuffixFallback,
    out: ReviewOutline,
    seen: BTreeSet<String>,
}

pub fn build_outline(
    tree: &FieldTree,
    invalid: &InvalidFieldSet,
    policy: SuffixFallback,
    cycle: &mut ReviewCycle,
) -> ReviewOutline {
    let mut b = Builder {
        tree,
        invalid,
        policy,
        out: ReviewOutline::default(),
        seen: BTreeSet::new(),
    };

    let mut queue: VecDeque<NodeId> = tree.children(tree.root()).iter().copied().collect();
    while let Some(id) = queue.pop_front() {
        b.visit(id, &mut queue, cycle);
    }
    b.cleanup_top_level(cycle);
    b.out
}

impl<'a> Builder<'a> {
    fn is_invalid(&self, cycle: &mut ReviewCycle, raw_path: &str) -> bool {
        let norm = cycle.paths.normalize(raw_path);
        matcher::any_invalid([raw_path, norm.as_str()], self.invalid, self.policy)
    }

    /// §Inclusion gates for a node that is not invalid. Hidden and disabled
    /// flags always exclude; beyond that only reviewVisible promotes a
    /// field, except address and editgrid which carry a container entry.
    fn passes_gates(&self, id: NodeId) -> bool {
        let node = self.tree.node(id);
        if node.hidden || !node.visible {
            return false;
        }
        if node.disabled && !node.review_visible {
            return false;
        }
        node.review_visible || matches!(node.kind, FieldKind::Address | FieldKind::EditGrid)
    }

    /// Hidden/disabled containers drop their whole subtree.
    fn container_walkable(&self, id: NodeId) -> bool {
        let node = self.tree.node(id);
        if node.hidden || !node.visible {
            return false;
        }
        !(node.disabled && !node.review_visible)
    }

    fn push_leaf(
        &mut self,
        cycle: &mut ReviewCycle,
        id: NodeId,
        path: &str,
        label: String,
        value: Value,
    ) {
        let norm = cycle.paths.normalize(path);
        if norm.is_empty() || !self.seen.insert(norm) {
            // First writer wins.
            return;
        }
        let source_index = cycle.source_index(self.tree, id);
        self.out.leaves.push(ReviewLeaf {
            path: path.to_string(),
            label,
            value,
            node: id,
            source_index,
        });
    }

    fn note_container(&mut self, cycle: &mut ReviewCycle, id: NodeId) {
        let node = self.tree.node(id);
        let norm = cycle.paths.normalize(&node.path);
        self.out
            .container_labels
            .entry(norm.clone())
            .or_insert_with(|| node.display_label());
        let idx = cycle.source_index(self.tree, id);
        self.out.container_form_index.entry(norm).or_insert(idx);
    }

    fn note_grid_meta(&mut self, cycle: &mut ReviewCycle, id: NodeId) {
        let node = self.tree.node(id);
        let norm = cycle.paths.normalize(&node.path);
        if self.out.container_meta.contains_key(&norm) {
            return;
        }
        let mut column_keys = Vec::new();
        let mut column_labels = Vec::new();
        for &tmpl in self.tree.children(id) {
            let t = self.tree.node(tmpl);
            if t.hidden || !t.visible {
                continue;
            }
            column_keys.push(t.key.clone());
            column_labels.push(t.display_label());
        }
        self.out.container_meta.insert(
            norm,
            GridMeta {
                kind: node.kind,
                column_keys,
                column_labels,
            },
        );
    }

    fn visit(&mut self, id: NodeId, queue: &mut VecDeque<NodeId>, cycle: &mut ReviewCycle) {
        let node = self.tree.node(id);
        if node.is_template {
            return;
        }
        match node.kind {
            FieldKind::Button => {}
            k if k.is_presentation() => {}
            k if k.is_layout_only() => {
                // Promote children into the parent's field list.
                if self.container_walkable(id) {
                    for &c in self.tree.children(id) {
                        queue.push_back(c);
                    }
                }
            }
            FieldKind::Form => self.visit_form(id, queue, cycle),
            FieldKind::Panel | FieldKind::Well => self.visit_group(id, queue, cycle),
            FieldKind::DataGrid | FieldKind::DataTable => self.visit_grid(id, cycle),
            FieldKind::EditGrid => self.visit_editgrid(id, cycle),
            FieldKind::DataMap => self.visit_datamap(id, cycle),
            FieldKind::TagPad => self.visit_tagpad(id, cycle),
            FieldKind::Table => self.visit_table(id, cycle),
            _ => self.visit_field(id, cycle),
        }
    }

    fn visit_field(&mut self, id: NodeId, cycle: &mut ReviewCycle) {
        let node = self.tree.node(id);
        let invalid = self.is_invalid(cycle, &node.path);
        if !invalid && !self.passes_gates(id) {
            return;
        }
        let (path, label, value) = {
            let n = self.tree.node(id);
            (n.path.clone(), n.display_label(), n.value.clone())
        };
        self.push_leaf(cycle, id, &path, label, value);
    }

    /// Nested sub-form: expand its inner tree in place. A sub-form that is
    /// not ready (or exposes no subtree) yields a leaf of its own instead
    /// of silently disappearing.
    fn visit_form(&mut self, id: NodeId, queue: &mut VecDeque<NodeId>, cycle: &mut ReviewCycle) {
        let node = self.tree.node(id);
        if !self.container_walkable(id) && !self.is_invalid(cycle, &node.path) {
            return;
        }
        if node.ready && !node.children.is_empty() {
            for &c in self.tree.children(id) {
                queue.push_back(c);
            }
            return;
        }
        warn!(path = %node.path, "sub-form exposes no subtree, emitting value leaf");
        let (path, label, value) = (node.path.clone(), node.display_label(), node.value.clone());
        self.push_leaf(cycle, id, &path, label, value);
    }

    /// Panel/well keep their own review entry; their children are enqueued
    /// under the container path prefix (already spelled into child paths by
    /// the host).
    fn visit_group(&mut self, id: NodeId, queue: &mut VecDeque<NodeId>, cycle: &mut ReviewCycle) {
        let node = self.tree.node(id);
        if !self.container_walkable(id) && !self.is_invalid(cycle, &node.path) {
            return;
        }
        self.note_container(cycle, id);
        let (path, label) = (node.path.clone(), node.display_label());
        self.push_leaf(cycle, id, &path, label, Value::Null);
        for &c in self.tree.children(id) {
            queue.push_back(c);
        }
    }

    fn visit_grid(&mut self, id: NodeId, cycle: &mut ReviewCycle) {
        let node = self.tree.node(id);
        let invalid = self.is_invalid(cycle, &node.path);
        if !invalid && !self.passes_gates(id) && !self.rows_have_invalid(id, cycle) {
            return;
        }
        self.note_container(cycle, id);
        self.note_grid_meta(cycle, id);
        if node.rows.is_empty() {
            let (path, label) = (node.path.clone(), node.display_label());
            self.push_leaf(cycle, id, &path, label, Value::String(NO_ROWS_TEXT.into()));
            return;
        }
        let rows = node.rows.clone();
        for row in rows {
            self.emit_row_cells(&row, cycle);
        }
    }

    fn visit_editgrid(&mut self, id: NodeId, cycle: &mut ReviewCycle) {
        let node = self.tree.node(id);
        if !self.container_walkable(id) && !self.is_invalid(cycle, &node.path) {
            return;
        }
        self.note_container(cycle, id);
        self.note_grid_meta(cycle, id);
        let summary = if node.rows.is_empty() {
            NO_ROWS_TEXT.to_string()
        } else {
            format!("{} row(s)", node.rows.len())
        };
        let (path, label) = (node.path.clone(), node.display_label());
        self.push_leaf(cycle, id, &path, label, Value::String(summary));
        let rows = self.tree.node(id).rows.clone();
        for row in rows {
            self.emit_row_cells(&row, cycle);
        }
    }

    /// Cells inside a grid row surface unconditionally (the grid context
    /// already passed the gates); container wrappers inside a row are
    /// flattened per the classifier.
    fn emit_row_cells(&mut self, cells: &[NodeId], cycle: &mut ReviewCycle) {
        for &cell in cells {
            let node = self.tree.node(cell);
            if node.hidden || !node.visible {
                continue;
            }
            if node.kind.is_presentation() || node.kind == FieldKind::Button {
                continue;
            }
            if !node.children.is_empty()
                && (node.kind.should_flatten() || node.kind.is_container())
            {
                let children = node.children.clone();
                self.emit_row_cells(&children, cycle);
                continue;
            }
            let (path, label, value) = (node.path.clone(), node.display_label(), node.value.clone());
            self.push_leaf(cycle, cell, &path, label, value);
        }
    }

    /// One key/value leaf per datamap row, labeled by the row's key.
    fn visit_datamap(&mut self, id: NodeId, cycle: &mut ReviewCycle) {
        let node = self.tree.node(id);
        let invalid = self.is_invalid(cycle, &node.path);
        if !invalid && !self.passes_gates(id) {
            return;
        }
        self.note_container(cycle, id);
        let base = node.path.clone();
        let entries: Vec<(String, Value)> = node
            .value
            .as_object()
            .map(|o| o.iter().map(|(k, v)| (k.clone(), v.clone())).collect())
            .unwrap_or_default();
        if entries.is_empty() {
            let label = node.display_label();
            self.push_leaf(cycle, id, &base, label, Value::String(NO_ROWS_TEXT.into()));
            return;
        }
        for (k, v) in entries {
            let path = format!("{base}.{k}");
            self.push_leaf(cycle, id, &path, k, v);
        }
    }

    fn visit_tagpad(&mut self, id: NodeId, cycle: &mut ReviewCycle) {
        let node = self.tree.node(id);
        let invalid = self.is_invalid(cycle, &node.path);
        if !invalid && !self.passes_gates(id) {
            return;
        }
        self.note_container(cycle, id);
        if node.rows.is_empty() {
            let (path, label) = (node.path.clone(), node.display_label());
            self.push_leaf(cycle, id, &path, label, Value::String(NO_ROWS_TEXT.into()));
            return;
        }
        let rows = node.rows.clone();
        for row in rows {
            self.emit_row_cells(&row, cycle);
        }
    }

    /// Static table: one container leaf holding the transposed structure,
    /// plus one leaf per cell component.
    fn visit_table(&mut self, id: NodeId, cycle: &mut ReviewCycle) {
        let node = self.tree.node(id);
        let invalid = self.is_invalid(cycle, &node.path);
        if !invalid && !self.passes_gates(id) && !self.rows_have_invalid(id, cycle) {
            return;
        }
        self.note_container(cycle, id);
        let (path, label) = (node.path.clone(), node.display_label());
        let structure = format::table_structure(self.tree, id);
        self.push_leaf(cycle, id, &path, label, structure);
        let rows = self.tree.node(id).rows.clone();
        for row in rows {
            self.emit_row_cells(&row, cycle);
        }
    }

    fn rows_have_invalid(&self, id: NodeId, cycle: &mut ReviewCycle) -> bool {
        let node = self.tree.node(id);
        for row in &node.rows {
            for &cell in row {
                if self.is_invalid(cycle, &self.tree.node(cell).path.clone()) {
                    return true;
                }
            }
        }
        false
    }

    /// Guarantee no top-level panel/well is silently dropped: synthesize a
    /// placeholder group plus one leaf per direct child for any that did
    /// not make it into the outline.
    fn cleanup_top_level(&mut self, cycle: &mut ReviewCycle) {
        let top: Vec<NodeId> = self.tree.children(self.tree.root()).to_vec();
        for id in top {
            let node = self.tree.node(id);
            let placeholder = match node.kind {
                FieldKind::Panel => PANEL_PLACEHOLDER,
                FieldKind::Well => WELL_PLACEHOLDER,
                _ => continue,
            };
            let norm = cycle.paths.normalize(&node.path);
            if self.seen.contains(&norm) {
                continue;
            }
            if node.hidden || !node.visible {
                continue;
            }
            self.note_container(cycle, id);
            let (path, label) = (node.path.clone(), node.display_label());
            self.push_leaf(cycle, id, &path, label, Value::String(placeholder.into()));
            let children = node.children.clone();
            for c in children {
                let child = self.tree.node(c);
                if child.kind.is_container() || child.kind == FieldKind::Button {
                    continue;
                }
                let (cp, cl, cv) = (
                    child.path.clone(),
                    child.display_label(),
                    child.value.clone(),
                );
                self.push_leaf(cycle, c, &cp, cl, cv);
            }
        }
    }
}
