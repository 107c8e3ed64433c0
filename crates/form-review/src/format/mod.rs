//! Per-kind display formatting for review values.

use chrono::{NaiveDate, NaiveDateTime, NaiveTime};
use form_review_macros::Format;
use serde_json::{Value, json};

use crate::config::RenderOptions;
use crate::kind::FieldKind;
use crate::tree::{FieldTree, NodeId, parse_file_refs};

/// A display-ready value. `multiline` replaces the string sentinel the
/// renderer would otherwise need to preserve line breaks.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Formatted {
    pub text: String,
    pub multiline: bool,
}

impl Formatted {
    pub fn plain<S: Into<String>>(text: S) -> Self {
        Self {
            text: text.into(),
            multiline: false,
        }
    }

    pub fn multiline<S: Into<String>>(text: S) -> Self {
        Self {
            text: text.into(),
            multiline: true,
        }
    }
}

pub trait FormatRule {
    fn id(&self) -> &'static str;
    fn applies(&self, kind: FieldKind) -> bool;
    /// `None` falls through to the next rule, ultimately to the generic
    /// formatter.
    fn format(&self, tree: &FieldTree, id: NodeId, opts: &RenderOptions) -> Option<Formatted>;
}

pub fn builtin_formatters() -> Vec<Box<dyn FormatRule>> {
    vec![
        Box::new(CurrencyFormat),
        Box::new(PasswordFormat),
        Box::new(DateTimeFormat),
        Box::new(FileFormat),
        Box::new(SelectBoxesFormat),
        Box::new(SurveyFormat),
        Box::new(TagPadFormat),
        Box::new(CheckboxFormat),
        Box::new(TextAreaFormat),
    ]
}

/// Kind-aware formatting of a node's own value.
pub fn format_node(tree: &FieldTree, id: NodeId, opts: &RenderOptions) -> Formatted {
    let kind = tree.node(id).kind;
    for rule in builtin_formatters() {
        if rule.applies(kind) {
            if let Some(out) = rule.format(tree, id, opts) {
                return out;
            }
        }
    }
    format_plain(&tree.node(id).value, opts)
}

/// Generic formatting for detached values (grid summaries, datamap rows).
pub fn format_plain(value: &Value, opts: &RenderOptions) -> Formatted {
    match value {
        Value::Null => Formatted::plain(""),
        Value::Bool(b) => Formatted::plain(if *b { "Yes" } else { "No" }),
        Value::Number(n) => Formatted::plain(n.to_string()),
        Value::String(s) => {
            if s.contains('\n') {
                Formatted::multiline(s.clone())
            } else {
                Formatted::plain(s.clone())
            }
        }
        Value::Array(items) => {
            let parts: Vec<String> = items
                .iter()
                .map(|v| match v {
                    Value::String(s) => s.clone(),
                    Value::Object(_) => serde_json::to_string(v).unwrap_or_default(),
                    other => format_plain(other, opts).text,
                })
                .collect();
            Formatted::plain(parts.join(", "))
        }
        Value::Object(_) => Formatted::plain(serde_json::to_string(value).unwrap_or_default()),
    }
}

/// Transposed structure for a static table: per-cell records are built in
/// original row-major order, then the row/column indices are swapped once.
pub fn table_structure(tree: &FieldTree, id: NodeId) -> Value {
    let node = tree.node(id);
    let mut records: Vec<Vec<Value>> = Vec::new();
    for row in &node.rows {
        let mut rec_row = Vec::new();
        for &cell in row {
            let c = tree.node(cell);
            rec_row.push(json!({
                "_label": c.display_label(),
                "_key": c.key,
                "_type": c.tag,
                "_value": c.value,
            }));
        }
        records.push(rec_row);
    }

    let rows = records.len();
    let cols = records.iter().map(Vec::len).max().unwrap_or(0);
    let mut grid: Vec<Vec<Value>> = vec![vec![Value::Null; rows]; cols];
    for (r, rec_row) in records.into_iter().enumerate() {
        for (c, rec) in rec_row.into_iter().enumerate() {
            grid[c][r] = rec;
        }
    }
    json!({ "mode": "regular", "grid": grid })
}

fn group_thousands(text: &str) -> String {
    let (int_part, frac_part) = match text.split_once('.') {
        Some((i, f)) => (i, Some(f)),
        None => (text, None),
    };
    let (sign, digits) = match int_part.strip_prefix('-') {
        Some(d) => ("-", d),
        None => ("", int_part),
    };
    let mut grouped = String::new();
    for (i, ch) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            grouped.push(',');
        }
        grouped.push(ch);
    }
    match frac_part {
        Some(f) => format!("{sign}{grouped}.{f}"),
        None => format!("{sign}{grouped}"),
    }
}

fn value_as_f64(v: &Value) -> Option<f64> {
    match v {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().replace(',', "").parse().ok(),
        _ => None,
    }
}

fn parse_datetime(s: &str) -> Option<NaiveDateTime> {
    if let Ok(dt) = chrono::DateTime::parse_from_rfc3339(s) {
        return Some(dt.naive_local());
    }
    NaiveDateTime::parse_from_str(s, "%Y-%m-%dT%H:%M:%S")
        .or_else(|_| NaiveDateTime::parse_from_str(s, "%Y-%m-%d %H:%M:%S"))
        .ok()
}

#[Format(id = "currency", kinds = [Currency])]
pub struct CurrencyFormat;

impl CurrencyFormat {
    pub fn run(tree: &FieldTree, id: NodeId, opts: &RenderOptions) -> Option<Formatted> {
        let amount = value_as_f64(&tree.node(id).value)?;
        let text = group_thousands(&format!("{amount:.2}"));
        Some(Formatted::plain(format!("{}{text}", opts.currency_symbol)))
    }
}

/// One mask character per input character; the cleartext never reaches the
/// review output.
#[Format(id = "password", kinds = [Password])]
pub struct PasswordFormat;

impl PasswordFormat {
    pub fn run(tree: &FieldTree, id: NodeId, opts: &RenderOptions) -> Option<Formatted> {
        let s = tree.node(id).value.as_str()?;
        Some(Formatted::plain(
            std::iter::repeat(opts.mask_char)
                .take(s.chars().count())
                .collect::<String>(),
        ))
    }
}

#[Format(id = "datetime", kinds = [DateTime, Date, Time])]
pub struct DateTimeFormat;

impl DateTimeFormat {
    pub fn run(tree: &FieldTree, id: NodeId, opts: &RenderOptions) -> Option<Formatted> {
        let node = tree.node(id);
        let raw = node.value.as_str()?;
        let formatted = match node.kind {
            FieldKind::Date => NaiveDate::parse_from_str(raw, "%Y-%m-%d")
                .ok()
                .or_else(|| parse_datetime(raw).map(|dt| dt.date()))
                .map(|d| d.format(&opts.date_format).to_string()),
            FieldKind::Time => NaiveTime::parse_from_str(raw, "%H:%M:%S")
                .or_else(|_| NaiveTime::parse_from_str(raw, "%H:%M"))
                .ok()
                .map(|t| t.format(&opts.time_format).to_string()),
            _ => parse_datetime(raw).map(|dt| dt.format(&opts.datetime_format).to_string()),
        };
        // Unparseable values fall back to the raw string.
        Some(Formatted::plain(formatted.unwrap_or_else(|| raw.to_string())))
    }
}

#[Format(id = "file", kinds = [File, Signature])]
pub struct FileFormat;

impl FileFormat {
    pub fn run(tree: &FieldTree, id: NodeId, _opts: &RenderOptions) -> Option<Formatted> {
        let node = tree.node(id);
        let refs = if node.uploads.is_empty() {
            parse_file_refs(&node.value)
        } else {
            node.uploads.clone()
        };
        if refs.is_empty() {
            return None;
        }
        let names: Vec<String> = refs.iter().map(|f| f.display_name()).collect();
        Some(Formatted::plain(names.join(", ")))
    }
}

#[Format(id = "selectboxes", kinds = [SelectBoxes])]
pub struct SelectBoxesFormat;

impl SelectBoxesFormat {
    pub fn run(tree: &FieldTree, id: NodeId, _opts: &RenderOptions) -> Option<Formatted> {
        let obj = tree.node(id).value.as_object()?;
        let picked: Vec<&str> = obj
            .iter()
            .filter(|(_, v)| v.as_bool().unwrap_or(false))
            .map(|(k, _)| k.as_str())
            .collect();
        Some(Formatted::plain(picked.join(", ")))
    }
}

#[Format(id = "survey", kinds = [Survey])]
pub struct SurveyFormat;

impl SurveyFormat {
    pub fn run(tree: &FieldTree, id: NodeId, _opts: &RenderOptions) -> Option<Formatted> {
        let node = tree.node(id);
        let answers = node.value.as_object()?;
        let mut lines = Vec::new();
        for (q, a) in answers {
            let label = node
                .schema
                .get("questions")
                .and_then(Value::as_array)
                .and_then(|qs| {
                    qs.iter().find(|e| {
                        e.get("value").and_then(Value::as_str) == Some(q.as_str())
                    })
                })
                .and_then(|e| e.get("label"))
                .and_then(Value::as_str)
                .unwrap_or(q.as_str());
            let answer = match a {
                Value::String(s) => s.clone(),
                other => other.to_string(),
            };
            lines.push(format!("{label}: {answer}"));
        }
        Some(Formatted::multiline(lines.join("\n")))
    }
}

/// A tag's display value is the first meaningful scalar in its data.
#[Format(id = "tagpad", kinds = [TagPad])]
pub struct TagPadFormat;

impl TagPadFormat {
    pub fn run(tree: &FieldTree, id: NodeId, _opts: &RenderOptions) -> Option<Formatted> {
        let value = &tree.node(id).value;
        let first = match value {
            Value::Array(items) => items.first()?,
            other => other,
        };
        let data = first.get("data").unwrap_or(first);
        let obj = data.as_object()?;
        for v in obj.values() {
            match v {
                Value::String(s) if !s.trim().is_empty() => {
                    return Some(Formatted::plain(s.clone()));
                }
                Value::Number(n) => return Some(Formatted::plain(n.to_string())),
                Value::Bool(b) => {
                    return Some(Formatted::plain(if *b { "Yes" } else { "No" }));
                }
                _ => {}
            }
        }
        None
    }
}

#[Format(id = "checkbox", kinds = [Checkbox])]
pub struct CheckboxFormat;

impl CheckboxFormat {
    pub fn run(tree: &FieldTree, id: NodeId, _opts: &RenderOptions) -> Option<Formatted> {
        let b = tree.node(id).value.as_bool().unwrap_or(false);
        Some(Formatted::plain(if b { "Yes" } else { "No" }))
    }
}

#[Format(id = "textarea", kinds = [TextArea])]
pub struct TextAreaFormat;

impl TextAreaFormat {
    pub fn run(tree: &FieldTree, id: NodeId, _opts: &RenderOptions) -> Option<Formatted> {
        let s = tree.node(id).value.as_str()?;
        if s.contains('\n') {
            Some(Formatted::multiline(s.to_string()))
        } else {
            Some(Formatted::plain(s.to_string()))
        }
    }
}
