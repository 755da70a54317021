//! Discovery of the date/datetime fields a view can filter on.

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

/// Temporal kind of an eligible field. Controls how range bounds are
/// serialized into domain leaves.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FieldKind {
    Date,
    Datetime,
}

impl FieldKind {
    /// Serialize a range bound in the form the ORM expects for this kind.
    pub fn serialize_bound(&self, value: NaiveDateTime) -> String {
        match self {
            FieldKind::Date => value.date().format("%Y-%m-%d").to_string(),
            FieldKind::Datetime => value.format("%Y-%m-%d %H:%M:%S").to_string(),
        }
    }
}

/// Raw field definition as described by the view, before eligibility
/// filtering. `field_type` is the ORM type name ("date", "datetime",
/// "char", ...).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FieldDef {
    pub name: String,
    pub label: String,
    pub field_type: String,
    pub searchable: bool,
    pub deprecated: bool,
}

impl FieldDef {
    pub fn temporal_kind(&self) -> Option<FieldKind> {
        match self.field_type.as_str() {
            "date" => Some(FieldKind::Date),
            "datetime" => Some(FieldKind::Datetime),
            _ => None,
        }
    }
}

/// A field the date-range filter may target.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EligibleField {
    pub name: String,
    pub label: String,
    pub kind: FieldKind,
}

/// Select the searchable, non-deprecated date/datetime fields, optionally
/// restricted to an allow-list, sorted by display label.
///
/// An empty allow-list means no manual restriction: every temporal field
/// stays a candidate. The sort is plain ordinal comparison, not
/// locale-aware collation.
pub fn eligible_fields(defs: &[FieldDef], allow_list: Option<&[String]>) -> Vec<EligibleField> {
    let mut fields: Vec<EligibleField> = defs
        .iter()
        .filter(|def| def.searchable && !def.deprecated)
        .filter(|def| match allow_list {
            Some(allowed) if !allowed.is_empty() => allowed.iter().any(|name| name == &def.name),
            _ => true,
        })
        .filter_map(|def| {
            def.temporal_kind().map(|kind| EligibleField {
                name: def.name.clone(),
                label: def.label.clone(),
                kind,
            })
        })
        .collect();
    fields.sort_by(|a, b| a.label.cmp(&b.label));
    fields
}
