//! In-memory model of the host form's live component tree.
//!
//! The arena owns every node; parent links are plain indices, never owning
//! references. The loader materializes the tree from a Form.io-style JSON
//! definition plus a submission-data document, reproducing the host's raw
//! path spelling (layout containers inject their key as a structural
//! segment, grid cells are addressed `grid[N].key`) so the normalizer and
//! matcher see realistic input.

use std::collections::BTreeMap;

use serde_json::Value;

use crate::error::{Error, Result};
use crate::kind::FieldKind;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct NodeId(pub usize);

/// One uploaded-file record, as stored by any of the host's storage
/// backends (component value, component-local list, or file service).
#[derive(Debug, Clone, Default)]
pub struct FileRef {
    pub name: Option<String>,
    pub original_name: Option<String>,
    pub url: Option<String>,
    pub size: Option<u64>,
}

impl FileRef {
    pub fn display_name(&self) -> String {
        self.original_name
            .clone()
            .or_else(|| self.name.clone())
            .unwrap_or_else(|| "[file]".to_string())
    }
}

#[derive(Debug, Clone)]
pub struct FieldNode {
    pub kind: FieldKind,
    /// Original schema tag, kept for `FieldKind::Other` components.
    pub tag: String,
    pub key: String,
    /// Raw host path, possibly carrying duplicated segments, stray indices
    /// and panel wrappers. Compare via `paths::normalize`, never literally.
    pub path: String,
    pub label: String,
    pub value: Value,
    pub visible: bool,
    pub hidden: bool,
    pub disabled: bool,
    pub required: bool,
    /// Extension flag: always show this field in the review summary.
    pub review_visible: bool,
    /// Sub-form readiness signal; an unready sub-form is not walked.
    pub ready: bool,
    pub errors: Vec<String>,
    pub warnings: Vec<String>,
    pub parent: Option<NodeId>,
    pub children: Vec<NodeId>,
    /// Instantiated row components for datagrid/datatable/editgrid/tagpad
    /// and the cell grid of a static table.
    pub rows: Vec<Vec<NodeId>>,
    pub uploads: Vec<FileRef>,
    /// Host-reported count of files sitting in a native file input that the
    /// framework has not yet folded into the data value.
    pub pending_native_files: usize,
    /// Grid column template, carries metadata but never a value.
    pub is_template: bool,
    /// Raw component definition, consulted by formatters for schema extras
    /// (survey questions, selectboxes labels).
    pub schema: Value,
}

impl FieldNode {
    fn blank(kind: FieldKind) -> Self {
        Self {
            kind,
            tag: String::new(),
            key: String::new(),
            path: String::new(),
            label: String::new(),
            value: Value::Null,
            visible: true,
            hidden: false,
            disabled: false,
            required: false,
            review_visible: false,
            ready: true,
            errors: Vec::new(),
            warnings: Vec::new(),
            parent: None,
            children: Vec::new(),
            rows: Vec::new(),
            uploads: Vec::new(),
            pending_native_files: 0,
            is_template: false,
            schema: Value::Null,
        }
    }

    pub fn display_label(&self) -> String {
        if self.label.is_empty() {
            self.key.clone()
        } else {
            self.label.clone()
        }
    }
}

#[derive(Debug)]
pub struct FieldTree {
    nodes: Vec<FieldNode>,
    root: NodeId,
    /// Full submission data document.
    pub data: Value,
    /// File-service state, keyed by component key.
    pub service_uploads: BTreeMap<String, Vec<FileRef>>,
}

impl FieldTree {
    pub fn from_schema(schema: &Value, data: &Value) -> Result<Self> {
        let components = schema
            .get("components")
            .and_then(Value::as_array)
            .ok_or_else(|| Error::msg("form definition has no 'components' array"))?;

        let mut tree = Self {
            nodes: vec![FieldNode::blank(FieldKind::Form)],
            root: NodeId(0),
            data: data.clone(),
            service_uploads: BTreeMap::new(),
        };

        let scope = data.get("data").unwrap_or(data).clone();
        let ctx = LoadCtx {
            parent: NodeId(0),
            raw_prefix: String::new(),
            scope,
        };
        for c in components {
            tree.load_component(c, &ctx)?;
        }
        Ok(tree)
    }

    pub fn root(&self) -> NodeId {
        self.root
    }

    pub fn node(&self, id: NodeId) -> &FieldNode {
        &self.nodes[id.0]
    }

    pub fn node_mut(&mut self, id: NodeId) -> &mut FieldNode {
        &mut self.nodes[id.0]
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn children(&self, id: NodeId) -> &[NodeId] {
        &self.nodes[id.0].children
    }

    /// Find a node by exact raw path.
    pub fn by_path(&self, path: &str) -> Option<NodeId> {
        self.nodes.iter().position(|n| n.path == path).map(NodeId)
    }

    /// Depth-first visitor over the subtree rooted at `id`, covering both
    /// template children and instantiated rows. Returning `false` from the
    /// visitor short-circuits that branch.
    pub fn every_component(&self, id: NodeId, visitor: &mut impl FnMut(NodeId) -> bool) {
        for &child in &self.nodes[id.0].children {
            if visitor(child) {
                self.every_component(child, visitor);
            }
        }
        for row in &self.nodes[id.0].rows {
            for &cell in row {
                if visitor(cell) {
                    self.every_component(cell, visitor);
                }
            }
        }
    }

    /// All descendants of `id` in depth-first order.
    pub fn descendants(&self, id: NodeId) -> Vec<NodeId> {
        let mut out = Vec::new();
        self.every_component(id, &mut |n| {
            out.push(n);
            true
        });
        out
    }

    pub fn data_value(&self, id: NodeId) -> &Value {
        &self.nodes[id.0].value
    }

    /// Submission data stored under a component key at the top level.
    pub fn submission_value(&self, key: &str) -> Option<&Value> {
        let root = self.data.get("data").unwrap_or(&self.data);
        root.get(key)
    }

    /// Whether this node or any ancestor is hidden, invisible, or disabled
    /// without the review override. Validation and the review walk must
    /// agree on this: a flag on a container suppresses its whole subtree.
    pub fn effectively_hidden(&self, id: NodeId) -> bool {
        let mut cur = Some(id);
        while let Some(n) = cur {
            let node = &self.nodes[n.0];
            if node.hidden || !node.visible {
                return true;
            }
            if node.disabled && !node.review_visible {
                return true;
            }
            cur = node.parent;
        }
        false
    }

    /// Generic host validity check: a required component must carry a
    /// non-blank value. Populates the node's error list.
    pub fn check_validity(&mut self, id: NodeId) -> bool {
        let node = &self.nodes[id.0];
        if !node.required {
            return true;
        }
        let ok = match node.kind {
            FieldKind::Checkbox => node.value.as_bool().unwrap_or(false),
            _ => !is_blank(&node.value),
        };
        if ok {
            self.nodes[id.0].errors.clear();
            true
        } else {
            let msg = format!("{} is required", self.nodes[id.0].display_label());
            self.nodes[id.0].errors = vec![msg];
            false
        }
    }

    pub fn set_custom_validity(&mut self, id: NodeId, errors: Vec<String>) {
        self.nodes[id.0].errors = errors;
    }

    fn load_component(&mut self, c: &Value, ctx: &LoadCtx) -> Result<NodeId> {
        let obj = c
            .as_object()
            .ok_or_else(|| Error::msg("component entry is not an object"))?;

        let tag = obj
            .get("type")
            .and_then(Value::as_str)
            .unwrap_or("textfield")
            .to_string();
        let kind = FieldKind::from_tag(&tag);
        let key = obj
            .get("key")
            .and_then(Value::as_str)
            .unwrap_or("")
            .to_string();

        let raw_path = join_path(&ctx.raw_prefix, &key);
        let value = if key.is_empty() {
            Value::Null
        } else {
            ctx.scope.get(&key).cloned().unwrap_or(Value::Null)
        };

        let id = NodeId(self.nodes.len());
        let mut node = FieldNode::blank(kind);
        node.tag = tag;
        node.label = obj
            .get("label")
            .and_then(Value::as_str)
            .unwrap_or(&key)
            .to_string();
        node.key = key.clone();
        node.path = raw_path.clone();
        node.parent = Some(ctx.parent);
        node.hidden = obj.get("hidden").and_then(Value::as_bool).unwrap_or(false);
        node.disabled = obj.get("disabled").and_then(Value::as_bool).unwrap_or(false);
        node.visible = obj.get("visible").and_then(Value::as_bool).unwrap_or(true);
        node.required = obj
            .get("validate")
            .and_then(|v| v.get("required"))
            .and_then(Value::as_bool)
            .unwrap_or(false);
        node.review_visible = obj
            .get("reviewVisible")
            .and_then(Value::as_bool)
            .unwrap_or(false);
        node.ready = obj.get("ready").and_then(Value::as_bool).unwrap_or(true);
        node.pending_native_files = obj
            .get("pendingNativeFiles")
            .and_then(Value::as_u64)
            .unwrap_or(0) as usize;
        node.uploads = parse_file_refs(&value);
        node.value = value;
        node.schema = c.clone();
        self.nodes.push(node);
        self.nodes[ctx.parent.0].children.push(id);

        match kind {
            FieldKind::Columns => {
                // Column wrappers carry no data scope of their own.
                if let Some(cols) = obj.get("columns").and_then(Value::as_array) {
                    let child_ctx = LoadCtx {
                        parent: id,
                        raw_prefix: raw_path.clone(),
                        scope: ctx.scope.clone(),
                    };
                    for col in cols {
                        self.load_children(col, &child_ctx)?;
                    }
                }
            }
            FieldKind::Tabs => {
                let child_ctx = LoadCtx {
                    parent: id,
                    raw_prefix: raw_path.clone(),
                    scope: ctx.scope.clone(),
                };
                for tab in obj
                    .get("components")
                    .and_then(Value::as_array)
                    .into_iter()
                    .flatten()
                {
                    self.load_children(tab, &child_ctx)?;
                }
            }
            FieldKind::Table => {
                // rows: [[{components: [...]}, ...], ...]; one arena node per
                // cell component, recorded row-major in `rows`.
                if let Some(rows) = obj.get("rows").and_then(Value::as_array) {
                    let child_ctx = LoadCtx {
                        parent: id,
                        raw_prefix: raw_path.clone(),
                        scope: ctx.scope.clone(),
                    };
                    for row in rows {
                        let mut row_ids = Vec::new();
                        for cell in row.as_array().into_iter().flatten() {
                            for comp in cell
                                .get("components")
                                .and_then(Value::as_array)
                                .into_iter()
                                .flatten()
                            {
                                let cell_id = self.load_component(comp, &child_ctx)?;
                                // Row cells live in `rows`, not `children`.
                                self.nodes[id.0].children.pop();
                                row_ids.push(cell_id);
                            }
                        }
                        self.nodes[id.0].rows.push(row_ids);
                    }
                }
            }
            FieldKind::DataGrid | FieldKind::DataTable | FieldKind::EditGrid | FieldKind::TagPad => {
                self.load_grid(id, obj, &raw_path)?;
            }
            FieldKind::Panel | FieldKind::Well | FieldKind::FieldSet => {
                // Structural containers: key appears in the raw path but the
                // data scope does not narrow.
                let child_ctx = LoadCtx {
                    parent: id,
                    raw_prefix: raw_path.clone(),
                    scope: ctx.scope.clone(),
                };
                self.load_children(c, &child_ctx)?;
            }
            FieldKind::Container | FieldKind::Form => {
                // Data containers: children read from the nested object.
                let child_scope = if self.nodes[id.0].value.is_object() {
                    let inner = &self.nodes[id.0].value;
                    inner.get("data").unwrap_or(inner).clone()
                } else {
                    Value::Null
                };
                let child_ctx = LoadCtx {
                    parent: id,
                    raw_prefix: raw_path.clone(),
                    scope: child_scope,
                };
                self.load_children(c, &child_ctx)?;
            }
            _ => {}
        }

        Ok(id)
    }

    fn load_children(&mut self, holder: &Value, ctx: &LoadCtx) -> Result<()> {
        for comp in holder
            .get("components")
            .and_then(Value::as_array)
            .into_iter()
            .flatten()
        {
            self.load_component(comp, ctx)?;
        }
        Ok(())
    }

    /// Instantiate one set of cell nodes per data row, addressed
    /// `<gridPath>[<i>].<childKey>`.
    fn load_grid(
        &mut self,
        id: NodeId,
        obj: &serde_json::Map<String, Value>,
        raw_path: &str,
    ) -> Result<()> {
        let template: Vec<Value> = obj
            .get("components")
            .and_then(Value::as_array)
            .cloned()
            .unwrap_or_default();

        // Template children stay attached for column metadata; they carry
        // no values of their own.
        {
            let tmpl_ctx = LoadCtx {
                parent: id,
                raw_prefix: raw_path.to_string(),
                scope: Value::Null,
            };
            for comp in &template {
                let tmpl = self.load_component(comp, &tmpl_ctx)?;
                self.nodes[tmpl.0].is_template = true;
                for desc in self.descendants(tmpl) {
                    self.nodes[desc.0].is_template = true;
                }
            }
        }

        let row_values: Vec<Value> = self.nodes[id.0]
            .value
            .as_array()
            .cloned()
            .unwrap_or_default();

        for (ri, row_value) in row_values.iter().enumerate() {
            let row_scope = row_value.get("data").unwrap_or(row_value).clone();
            let cell_ctx = LoadCtx {
                parent: id,
                raw_prefix: format!("{raw_path}[{ri}]"),
                scope: row_scope,
            };
            let mut row_ids = Vec::new();
            for comp in &template {
                let cell = self.load_component(comp, &cell_ctx)?;
                // Instantiated cells live in `rows`, not `children`.
                self.nodes[id.0].children.pop();
                row_ids.push(cell);
            }
            self.nodes[id.0].rows.push(row_ids);
        }
        Ok(())
    }
}

struct LoadCtx {
    parent: NodeId,
    raw_prefix: String,
    /// Submission-data object the children of this position resolve their
    /// values against.
    scope: Value,
}

fn join_path(prefix: &str, key: &str) -> String {
    match (prefix.is_empty(), key.is_empty()) {
        (true, _) => key.to_string(),
        (_, true) => prefix.to_string(),
        _ => format!("{prefix}.{key}"),
    }
}

/// Blankness as the host's generic validity check sees it.
pub fn is_blank(v: &Value) -> bool {
    match v {
        Value::Null => true,
        Value::String(s) => s.trim().is_empty(),
        Value::Array(a) => a.is_empty(),
        Value::Object(o) => o.is_empty() || o.values().all(is_blank),
        Value::Bool(_) | Value::Number(_) => false,
    }
}

/// Interpret a value as a list of uploaded-file records, if it looks like
/// one. The host stores file state in several shapes depending on backend.
pub fn parse_file_refs(value: &Value) -> Vec<FileRef> {
    let entries: Vec<&Value> = match value {
        Value::Array(a) => a.iter().collect(),
        Value::Object(_) if value.get("name").is_some() || value.get("originalName").is_some() => {
            vec![value]
        }
        _ => return Vec::new(),
    };
    let mut out = Vec::new();
    for e in entries {
        let Some(obj) = e.as_object() else { continue };
        if !obj.contains_key("name") && !obj.contains_key("originalName") && !obj.contains_key("url")
        {
            continue;
        }
        out.push(FileRef {
            name: obj.get("name").and_then(Value::as_str).map(str::to_string),
            original_name: obj
                .get("originalName")
                .and_then(Value::as_str)
                .map(str::to_string),
            url: obj.get("url").and_then(Value::as_str).map(str::to_string),
            size: obj.get("size").and_then(Value::as_u64),
        });
    }
    out
}
