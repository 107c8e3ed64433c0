//! Closed vocabulary of component kinds and the container capability table.
//!
//! The host schema tags components with a free-form `type` string; we resolve
//! it once at load time into `FieldKind` and dispatch on the enum from then
//! on. Unknown tags degrade to `Other`, which behaves like a plain input.

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FieldKind {
    TextField,
    TextArea,
    Number,
    Email,
    Checkbox,
    Select,
    SelectBoxes,
    Survey,
    File,
    Address,
    DataGrid,
    DataTable,
    EditGrid,
    DataMap,
    TagPad,
    Panel,
    Well,
    Columns,
    Column,
    Row,
    Tabs,
    FieldSet,
    Table,
    Container,
    Form,
    Button,
    Content,
    HtmlElement,
    Signature,
    Currency,
    Password,
    DateTime,
    Date,
    Time,
    Other,
}

impl FieldKind {
    pub fn from_tag(tag: &str) -> Self {
        match tag {
            "textfield" => Self::TextField,
            "textarea" => Self::TextArea,
            "number" => Self::Number,
            "email" => Self::Email,
            "checkbox" => Self::Checkbox,
            "select" => Self::Select,
            "selectboxes" => Self::SelectBoxes,
            "survey" => Self::Survey,
            "file" => Self::File,
            "address" => Self::Address,
            "datagrid" => Self::DataGrid,
            "datatable" => Self::DataTable,
            "editgrid" => Self::EditGrid,
            "datamap" => Self::DataMap,
            "tagpad" => Self::TagPad,
            "panel" => Self::Panel,
            "well" => Self::Well,
            "columns" => Self::Columns,
            "column" => Self::Column,
            "row" => Self::Row,
            "tabs" => Self::Tabs,
            "fieldset" => Self::FieldSet,
            "table" => Self::Table,
            "container" => Self::Container,
            "form" => Self::Form,
            "button" => Self::Button,
            "content" => Self::Content,
            "htmlelement" => Self::HtmlElement,
            "signature" => Self::Signature,
            "currency" => Self::Currency,
            "password" => Self::Password,
            "datetime" => Self::DateTime,
            "date" => Self::Date,
            "time" => Self::Time,
            _ => Self::Other,
        }
    }

    /// Semantic grouping role. Both predicates are pure; call sites decide
    /// which one to act on (the review builder gives panel/well their own
    /// entry while grid-cell promotion flattens them).
    pub fn is_container(self) -> bool {
        matches!(
            self,
            Self::Panel
                | Self::Columns
                | Self::Well
                | Self::FieldSet
                | Self::DataMap
                | Self::EditGrid
                | Self::Table
                | Self::Tabs
                | Self::Row
                | Self::Column
                | Self::Content
                | Self::HtmlElement
        )
    }

    /// Containers whose children are promoted into the parent's field list
    /// instead of producing a review entry of their own.
    pub fn should_flatten(self) -> bool {
        matches!(
            self,
            Self::Columns
                | Self::FieldSet
                | Self::Tabs
                | Self::TagPad
                | Self::Survey
                | Self::Panel
                | Self::Well
                | Self::Container
                | Self::DataGrid
                | Self::DataTable
        )
    }

    /// Layout-only wrappers that never carry a value or a review entry.
    pub fn is_layout_only(self) -> bool {
        matches!(
            self,
            Self::Columns | Self::Column | Self::Row | Self::Tabs | Self::FieldSet | Self::Container
        )
    }

    /// Row-repeating containers addressed with `name[N]` cell paths.
    pub fn is_grid_like(self) -> bool {
        matches!(self, Self::DataGrid | Self::DataTable | Self::EditGrid)
    }

    pub fn is_presentation(self) -> bool {
        matches!(self, Self::Content | Self::HtmlElement)
    }
}
