// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

use serde::{Deserialize, Deserializer, Serialize};
use serde_json::{Map, Value};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DataType {
    String,
    Number,
    Currency,
    Date,
    Datetime,
    Boolean,
}

impl DataType {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::String => "string",
            Self::Number => "number",
            Self::Currency => "currency",
            Self::Date => "date",
            Self::Datetime => "datetime",
            Self::Boolean => "boolean",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "string" => Some(Self::String),
            "number" => Some(Self::Number),
            "currency" => Some(Self::Currency),
            "date" => Some(Self::Date),
            "datetime" => Some(Self::Datetime),
            "boolean" => Some(Self::Boolean),
            _ => None,
        }
    }

    /// Numeric columns take their filter as typed text rather than checkboxes.
    pub const fn is_numeric(self) -> bool {
        matches!(self, Self::Number | Self::Currency)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Provenance {
    Native,
    /// `path` is carried for discovery and display only; the engine never
    /// evaluates it.
    Joined { source_table: String, path: String },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ColumnDefinition {
    pub key: String,
    pub label: String,
    pub visible: bool,
    pub data_type: DataType,
    pub provenance: Provenance,
}

impl ColumnDefinition {
    pub fn native(key: impl Into<String>, label: impl Into<String>, data_type: DataType) -> Self {
        Self {
            key: key.into(),
            label: label.into(),
            visible: true,
            data_type,
            provenance: Provenance::Native,
        }
    }

    pub fn joined(
        key: impl Into<String>,
        label: impl Into<String>,
        source_table: impl Into<String>,
        path: impl Into<String>,
    ) -> Self {
        Self {
            key: key.into(),
            label: label.into(),
            visible: true,
            data_type: DataType::String,
            provenance: Provenance::Joined {
                source_table: source_table.into(),
                path: path.into(),
            },
        }
    }

    #[must_use]
    pub fn hidden(mut self) -> Self {
        self.visible = false;
        self
    }

    pub const fn is_joined(&self) -> bool {
        matches!(self.provenance, Provenance::Joined { .. })
    }

    pub fn source_table(&self) -> Option<&str> {
        match &self.provenance {
            Provenance::Native => None,
            Provenance::Joined { source_table, .. } => Some(source_table),
        }
    }
}

/// One server row. Joined-column values arrive in the `additionalColumns`
/// side-map; everything else is a native field.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Row {
    #[serde(
        rename = "additionalColumns",
        default,
        deserialize_with = "null_as_empty",
        skip_serializing_if = "Map::is_empty"
    )]
    pub additional_columns: Map<String, Value>,
    #[serde(flatten)]
    pub fields: Map<String, Value>,
}

impl Row {
    pub fn cell(&self, column: &ColumnDefinition) -> Option<&Value> {
        if column.is_joined() {
            self.additional_columns.get(&column.key)
        } else {
            self.fields.get(&column.key)
        }
    }
}

fn null_as_empty<'de, D>(deserializer: D) -> Result<Map<String, Value>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(Option::<Map<String, Value>>::deserialize(deserializer)?.unwrap_or_default())
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PageMeta {
    pub page: u32,
    pub page_size: u32,
    pub total_count: u64,
}

impl PageMeta {
    pub fn total_pages(&self) -> u32 {
        if self.page_size == 0 || self.total_count == 0 {
            return 1;
        }
        let pages = self.total_count.div_ceil(u64::from(self.page_size));
        u32::try_from(pages).unwrap_or(u32::MAX)
    }
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct ResultPage {
    #[serde(rename = "data")]
    pub rows: Vec<Row>,
    pub meta: PageMeta,
}

impl ResultPage {
    pub fn total_count(&self) -> u64 {
        self.meta.total_count
    }
}

/// A joinable column advertised by the schema service.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RelatedColumnSpec {
    pub table: String,
    pub key: String,
    pub label: String,
    #[serde(default)]
    pub path: String,
}

impl RelatedColumnSpec {
    pub fn to_column(&self) -> ColumnDefinition {
        ColumnDefinition::joined(&self.key, &self.label, &self.table, &self.path)
    }
}

#[cfg(test)]
mod tests {
    use super::{ColumnDefinition, DataType, PageMeta, ResultPage};
    use serde_json::json;

    #[test]
    fn data_type_round_trips_through_labels() {
        for data_type in [
            DataType::String,
            DataType::Number,
            DataType::Currency,
            DataType::Date,
            DataType::Datetime,
            DataType::Boolean,
        ] {
            assert_eq!(DataType::parse(data_type.as_str()), Some(data_type));
        }
        assert_eq!(DataType::parse("money"), None);
    }

    #[test]
    fn result_page_decodes_wire_shape_with_side_map() {
        let page: ResultPage = serde_json::from_value(json!({
            "data": [
                {"claID": 100, "claStatus": "Open", "additionalColumns": {"patName": "Avery"}},
                {"claID": 101, "claStatus": null, "additionalColumns": null},
                {"claID": 102}
            ],
            "meta": {"page": 2, "pageSize": 3, "totalCount": 7}
        }))
        .expect("wire page should decode");

        assert_eq!(page.rows.len(), 3);
        assert_eq!(page.meta.page, 2);
        assert_eq!(page.total_count(), 7);
        assert_eq!(page.meta.total_pages(), 3);

        let joined = ColumnDefinition::joined("patName", "Patient", "patients", "claims.patID");
        let native = ColumnDefinition::native("claStatus", "Status", DataType::String);
        assert_eq!(page.rows[0].cell(&joined), Some(&json!("Avery")));
        assert_eq!(page.rows[0].cell(&native), Some(&json!("Open")));
        assert!(page.rows[1].additional_columns.is_empty());
        assert_eq!(page.rows[2].cell(&joined), None);
        assert!(!page.rows[0].fields.contains_key("additionalColumns"));
    }

    #[test]
    fn total_pages_never_reports_zero() {
        let empty = PageMeta {
            page: 1,
            page_size: 25,
            total_count: 0,
        };
        assert_eq!(empty.total_pages(), 1);

        let exact = PageMeta {
            page: 1,
            page_size: 25,
            total_count: 50,
        };
        assert_eq!(exact.total_pages(), 2);
    }
}
