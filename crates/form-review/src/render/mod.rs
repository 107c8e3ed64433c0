//! HTML rendering of a review outline.
//!
//! Leaves are sorted, folded into a logical tree keyed by path segment,
//! then rendered recursively. Visibility gates are re-applied at render
//! time because the live tree may have been mutated between the build and
//! render passes; invalidity, checked through the matcher, always forces a
//! node to show.

use std::collections::{BTreeMap, BTreeSet};

use serde_json::Value;

use crate::config::{ReviewOptions, SuffixFallback};
use crate::engine::ReviewCycle;
use crate::format::{self, Formatted};
use crate::kind::FieldKind;
use crate::matcher::{self, InvalidFieldSet};
use crate::paths;
use crate::review::{GridMeta, ReviewOutline, NO_ROWS_TEXT};
use crate::tree::{FieldTree, NodeId};

#[derive(Debug)]
struct RenderNode {
    label: Option<String>,
    value: Option<Value>,
    node_ref: Option<NodeId>,
    kind: Option<FieldKind>,
    /// Normalized accumulated path down to this node.
    full_path: String,
    /// Path segment name, without any `[N]` suffix.
    key: String,
    /// Raw leaf path as collected, kept as an extra invalidity probe.
    raw_path: Option<String>,
    source_index: usize,
    created_at: usize,
    is_group: bool,
    children: BTreeMap<String, RenderNode>,
    rows: BTreeMap<usize, RenderNode>,
    meta: Option<GridMeta>,
}

impl RenderNode {
    fn new(full_path: String, key: String, created_at: usize) -> Self {
        Self {
            label: None,
            value: None,
            node_ref: None,
            kind: None,
            full_path,
            key,
            raw_path: None,
            source_index: usize::MAX,
            created_at,
            is_group: false,
            children: BTreeMap::new(),
            rows: BTreeMap::new(),
            meta: None,
        }
    }
}

pub fn render(
    outline: &ReviewOutline,
    tree: &FieldTree,
    invalid: &InvalidFieldSet,
    invalid_nodes: &BTreeSet<NodeId>,
    options: &ReviewOptions,
    cycle: &mut ReviewCycle,
) -> String {
    let mut leaves: Vec<_> = outline.leaves.iter().collect();
    sort_leaves(&mut leaves, tree);

    let mut root = RenderNode::new(String::new(), String::new(), 0);
    let mut counter = 0usize;
    for leaf in &leaves {
        fold_leaf(&mut root, leaf, tree, cycle, &mut counter);
    }
    attach_container_meta(&mut root, outline);

    let ctx = RenderCtx {
        tree,
        invalid,
        invalid_nodes,
        options,
    };
    let mut html = String::from("<div class=\"review-summary\"><ul>");
    for (name, child) in ordered_children(&root) {
        html.push_str(&ctx.render_node(name, child));
    }
    html.push_str("</ul></div>");
    html
}

/// Step 1: container leaves first, tagpad leaves by source form index, the
/// rest by source form index with path depth and lexical order as the tie
/// break.
fn sort_leaves(leaves: &mut [&crate::review::ReviewLeaf], tree: &FieldTree) {
    leaves.sort_by(|a, b| {
        let rank = |l: &crate::review::ReviewLeaf| {
            let node = tree.node(l.node);
            let container = matches!(node.kind, FieldKind::Panel | FieldKind::Well);
            let tagpad = node.kind == FieldKind::TagPad
                || node
                    .parent
                    .map(|p| tree.node(p).kind == FieldKind::TagPad)
                    .unwrap_or(false);
            (
                if container { 0u8 } else { 1 },
                if tagpad { 0u8 } else { 1 },
                l.source_index,
                l.path.matches('.').count(),
            )
        };
        rank(a).cmp(&rank(b)).then_with(|| a.path.cmp(&b.path))
    });
}

/// Step 2: replay one leaf's normalized path through the tree, creating
/// each node on the path exactly once; labels and kinds keep their first
/// writer, source indices keep their minimum.
fn fold_leaf(
    root: &mut RenderNode,
    leaf: &crate::review::ReviewLeaf,
    tree: &FieldTree,
    cycle: &mut ReviewCycle,
    counter: &mut usize,
) {
    let norm = cycle.paths.normalize(&leaf.path);
    let segs = paths::display_segments(&norm);
    if segs.is_empty() {
        return;
    }

    let mut cur = root;
    let mut acc = String::new();
    let last = segs.len() - 1;
    for (i, seg) in segs.iter().enumerate() {
        if !acc.is_empty() {
            acc.push('.');
        }
        acc.push_str(seg);

        let (name, row_idx) = paths::split_row_index(seg);
        *counter += 1;
        let created = *counter;
        let acc_for_child = acc.clone();
        let child_key = name.to_string();
        cur = cur
            .children
            .entry(name.to_string())
            .or_insert_with(|| RenderNode::new(acc_for_child, child_key, created));

        if let Some(ri) = row_idx {
            *counter += 1;
            let created = *counter;
            let acc_row = acc.clone();
            cur = cur
                .rows
                .entry(ri)
                .or_insert_with(|| RenderNode::new(acc_row, String::new(), created));
        }

        if i == last {
            let node = tree.node(leaf.node);
            if cur.kind.is_none() {
                cur.kind = Some(node.kind);
            }
            if cur.label.is_none() {
                cur.label = Some(leaf.label.clone());
            }
            if matches!(node.kind, FieldKind::Panel | FieldKind::Well)
                && leaf.value.is_null()
            {
                cur.is_group = true;
            } else if cur.value.is_none() {
                cur.value = Some(leaf.value.clone());
            }
            if cur.node_ref.is_none() {
                cur.node_ref = Some(leaf.node);
            }
            if cur.raw_path.is_none() {
                cur.raw_path = Some(leaf.path.clone());
            }
            cur.source_index = cur.source_index.min(leaf.source_index);
        }
    }
}

fn attach_container_meta(root: &mut RenderNode, outline: &ReviewOutline) {
    for (path, meta) in &outline.container_meta {
        if let Some(node) = locate_mut(root, path) {
            node.meta = Some(meta.clone());
            if node.kind.is_none() {
                node.kind = Some(meta.kind);
            }
        }
    }
    for (path, label) in &outline.container_labels {
        if let Some(node) = locate_mut(root, path) {
            if node.label.is_none() {
                node.label = Some(label.clone());
            }
        }
    }
    for (path, idx) in &outline.container_form_index {
        if let Some(node) = locate_mut(root, path) {
            node.source_index = node.source_index.min(*idx);
        }
    }
}

fn locate_mut<'a>(root: &'a mut RenderNode, path: &str) -> Option<&'a mut RenderNode> {
    let mut cur = root;
    for seg in paths::display_segments(path) {
        let (name, _) = paths::split_row_index(seg);
        cur = cur.children.get_mut(name)?;
    }
    Some(cur)
}

/// Render order: tagpad priority, then source form index, then creation
/// order (mirrors the step-1 leaf sort).
fn ordered_children(node: &RenderNode) -> Vec<(&String, &RenderNode)> {
    let mut out: Vec<_> = node.children.iter().collect();
    out.sort_by_key(|(_, n)| {
        (
            if n.kind == Some(FieldKind::TagPad) { 0u8 } else { 1 },
            n.source_index,
            n.created_at,
        )
    });
    out
}

struct RenderCtx<'a> {
    tree: &'a FieldTree,
    invalid: &'a InvalidFieldSet,
    invalid_nodes: &'a BTreeSet<NodeId>,
    options: &'a ReviewOptions,
}

impl<'a> RenderCtx<'a> {
    fn policy(&self) -> SuffixFallback {
        self.options.matcher.suffix_fallback
    }

    /// Probes the accumulated path, the raw path the leaf was collected
    /// under, the bare segment key, and direct component membership.
    fn node_invalid(&self, rn: &RenderNode) -> bool {
        if let Some(id) = rn.node_ref {
            if self.invalid_nodes.contains(&id) {
                return true;
            }
        }
        let mut candidates = vec![rn.full_path.as_str(), rn.key.as_str()];
        if let Some(raw) = &rn.raw_path {
            candidates.push(raw.as_str());
        }
        matcher::any_invalid(candidates, self.invalid, self.policy())
    }

    /// Render-time visibility gates; the tree may have changed since the
    /// outline was built.
    fn gated_out(&self, rn: &RenderNode) -> bool {
        let Some(id) = rn.node_ref else {
            return false;
        };
        let node = self.tree.node(id);
        if node.hidden || !node.visible {
            return true;
        }
        node.disabled && !node.review_visible
    }

    fn render_node(&self, name: &str, rn: &RenderNode) -> String {
        let invalid = self.node_invalid(rn);
        if !invalid && self.gated_out(rn) {
            return String::new();
        }

        if !rn.rows.is_empty() || rn.kind.map(FieldKind::is_grid_like).unwrap_or(false) {
            return self.render_grid(name, rn, invalid);
        }
        if let Some(Value::Object(obj)) = &rn.value {
            if obj.get("mode").and_then(Value::as_str) == Some("regular") {
                return self.render_regular_table(rn, invalid);
            }
        }
        if rn.is_group || !rn.children.is_empty() {
            return self.render_group(name, rn, invalid);
        }
        self.render_leaf(name, rn, invalid)
    }

    fn label_span(&self, rn: &RenderNode, fallback: &str, invalid: bool) -> String {
        let label = rn.label.as_deref().unwrap_or(fallback);
        if invalid {
            format!(
                "<span class=\"review-label\" style=\"{}\">{}</span>",
                escape(&self.options.render.highlight_style),
                escape(label)
            )
        } else {
            format!("<span class=\"review-label\">{}</span>", escape(label))
        }
    }

    fn render_group(&self, name: &str, rn: &RenderNode, invalid: bool) -> String {
        let mut inner = String::new();
        for (cname, child) in ordered_children(rn) {
            inner.push_str(&self.render_node(cname, child));
        }
        if inner.is_empty() {
            // A malformed or fully-gated group contributes nothing rather
            // than an empty shell.
            if rn.value.is_some() {
                return self.render_leaf(name, rn, invalid);
            }
            return String::new();
        }
        format!(
            "<li class=\"review-group\">{}<ul>{}</ul></li>",
            self.label_span(rn, name, invalid),
            inner
        )
    }

    fn render_leaf(&self, name: &str, rn: &RenderNode, invalid: bool) -> String {
        let formatted = self.leaf_value(rn);
        let mut text = escape(&formatted.text);
        if formatted.multiline {
            text = text.replace('\n', "<br/>");
        }
        format!(
            "<li class=\"review-field\">{}: <span class=\"review-value\">{}</span></li>",
            self.label_span(rn, name, invalid),
            text
        )
    }

    fn leaf_value(&self, rn: &RenderNode) -> Formatted {
        let Some(value) = &rn.value else {
            return Formatted::plain("");
        };
        if let Some(s) = value.as_str() {
            let row_holder = rn
                .kind
                .map(|k| {
                    k.is_grid_like() || matches!(k, FieldKind::DataMap | FieldKind::TagPad)
                })
                .unwrap_or(false);
            if s == NO_ROWS_TEXT && row_holder {
                return Formatted::plain(self.options.render.empty_grid_text.clone());
            }
        }
        if let Some(id) = rn.node_ref {
            if self.tree.node(id).value == *value {
                return format::format_node(self.tree, id, &self.options.render);
            }
        }
        format::format_plain(value, &self.options.render)
    }

    fn render_grid(&self, name: &str, rn: &RenderNode, invalid: bool) -> String {
        if rn.rows.is_empty() {
            // Empty grid: single placeholder line, never highlighted by
            // itself.
            return self.render_leaf(name, rn, invalid);
        }
        if rn.kind == Some(FieldKind::DataTable) {
            if let Some(meta) = &rn.meta {
                return self.render_data_table(name, rn, meta, invalid);
            }
        }

        let mut out = format!("<li class=\"review-grid\">{}", self.label_span(rn, name, invalid));
        if let Some(value) = &rn.value {
            if let Some(s) = value.as_str() {
                out.push_str(&format!(
                    ": <span class=\"review-value\">{}</span>",
                    escape(s)
                ));
            }
        }
        out.push_str("<ul>");
        for (ri, row) in &rn.rows {
            let cells = ordered_children(row);
            if cells.len() == 1 {
                let (cname, cell) = cells[0];
                let cell_invalid = self.node_invalid(cell);
                if !cell_invalid && self.gated_out(cell) {
                    continue;
                }
                let formatted = self.leaf_value(cell);
                let mut text = escape(&formatted.text);
                if formatted.multiline {
                    text = text.replace('\n', "<br/>");
                }
                out.push_str(&format!(
                    "<li>Row {}: {}: <span class=\"review-value\">{}</span></li>",
                    ri + 1,
                    self.label_span(cell, cname, cell_invalid),
                    text
                ));
            } else {
                out.push_str(&format!("<li>Row {}<ul>", ri + 1));
                for (cname, cell) in cells {
                    out.push_str(&self.render_node(cname, cell));
                }
                out.push_str("</ul></li>");
            }
        }
        out.push_str("</ul></li>");
        out
    }

    /// Data-table mode: header row from column labels, one body row per
    /// data record.
    fn render_data_table(
        &self,
        name: &str,
        rn: &RenderNode,
        meta: &GridMeta,
        invalid: bool,
    ) -> String {
        let mut out = format!(
            "<li class=\"review-table\">{}<table><thead><tr>",
            self.label_span(rn, name, invalid)
        );
        for label in &meta.column_labels {
            out.push_str(&format!("<th>{}</th>", escape(label)));
        }
        out.push_str("</tr></thead><tbody>");
        for row in rn.rows.values() {
            out.push_str("<tr>");
            for key in &meta.column_keys {
                let (text, cell_invalid) = match row.children.get(key) {
                    Some(c) => (self.leaf_value(c).text, self.node_invalid(c)),
                    None => (String::new(), false),
                };
                if cell_invalid {
                    out.push_str(&format!(
                        "<td><span style=\"{}\">{}</span></td>",
                        escape(&self.options.render.highlight_style),
                        escape(&text)
                    ));
                } else {
                    out.push_str(&format!("<td>{}</td>", escape(&text)));
                }
            }
            out.push_str("</tr>");
        }
        out.push_str("</tbody></table></li>");
        out
    }

    /// Regular-table mode: the pre-transposed cell grid built by
    /// `format::table_structure`; each original row renders as one column.
    fn render_regular_table(&self, rn: &RenderNode, invalid: bool) -> String {
        let grid = rn
            .value
            .as_ref()
            .and_then(|v| v.get("grid"))
            .and_then(Value::as_array);
        let Some(grid) = grid else {
            return String::new();
        };
        let mut out = format!(
            "<li class=\"review-table\">{}<table><tbody>",
            self.label_span(rn, rn.label.as_deref().unwrap_or_default(), invalid)
        );
        for row in grid {
            out.push_str("<tr>");
            for rec in row.as_array().into_iter().flatten() {
                if rec.is_null() {
                    out.push_str("<td></td>");
                    continue;
                }
                let label = rec.get("_label").and_then(Value::as_str).unwrap_or("");
                let key = rec.get("_key").and_then(Value::as_str).unwrap_or("");
                let value = rec.get("_value").unwrap_or(&Value::Null);
                let text = format::format_plain(value, &self.options.render).text;
                let cell_invalid = match rn.children.get(key) {
                    Some(c) => self.node_invalid(c),
                    None => matcher::is_invalid(
                        &format!("{}.{key}", rn.full_path),
                        self.invalid,
                        self.policy(),
                    ),
                };
                if cell_invalid {
                    out.push_str(&format!(
                        "<td><span style=\"{}\">{}: {}</span></td>",
                        escape(&self.options.render.highlight_style),
                        escape(label),
                        escape(&text)
                    ));
                } else {
                    out.push_str(&format!(
                        "<td>{}: {}</td>",
                        escape(label),
                        escape(&text)
                    ));
                }
            }
            out.push_str("</tr>");
        }
        out.push_str("</tbody></table></li>");
        out
    }
}

fn escape(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for c in s.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(c),
        }
    }
    out
}
