//! Schema projection: destination column definitions from captured headers.
//!
//! Every captured header becomes one [`ColumnDefinition`] keyed by the
//! normalized header. Labels mirror keys, descriptions and required flags come
//! from the capture's side-channels when present, and every column is typed as
//! a plain string. Schemas persist as YAML or JSON depending on the extension.

use std::{
    fs::File,
    io::{BufReader, BufWriter},
    path::Path,
};

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use crate::{
    capture::{SheetCapture, WorkbookCapture},
    options::is_yaml,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FieldType {
    #[default]
    String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ColumnDefinition {
    pub key: String,
    pub label: String,
    #[serde(default)]
    pub description: String,
    #[serde(rename = "type", default)]
    pub field_type: FieldType,
    #[serde(default)]
    pub required: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SheetSchema {
    pub name: String,
    pub fields: Vec<ColumnDefinition>,
}

impl SheetSchema {
    pub fn field(&self, key: &str) -> Option<&ColumnDefinition> {
        self.fields.iter().find(|field| field.key == key)
    }

    pub fn required_keys(&self) -> Vec<&str> {
        self.fields
            .iter()
            .filter(|field| field.required)
            .map(|field| field.key.as_str())
            .collect()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct WorkbookSchema {
    pub sheets: Vec<SheetSchema>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub schema_version: Option<String>,
}

impl WorkbookSchema {
    pub fn sheet(&self, name: &str) -> Option<&SheetSchema> {
        self.sheets.iter().find(|sheet| sheet.name == name)
    }

    pub fn save(&self, path: &Path) -> Result<()> {
        let file =
            File::create(path).with_context(|| format!("Creating schema file {path:?}"))?;
        let writer = BufWriter::new(file);
        if is_yaml(path) {
            serde_yaml::to_writer(writer, self).context("Writing schema YAML")
        } else {
            serde_json::to_writer_pretty(writer, self).context("Writing schema JSON")
        }
    }

    pub fn load(path: &Path) -> Result<Self> {
        let file = File::open(path).with_context(|| format!("Opening schema file {path:?}"))?;
        let reader = BufReader::new(file);
        let schema = if is_yaml(path) {
            serde_yaml::from_reader(reader).context("Parsing schema YAML")?
        } else {
            serde_json::from_reader(reader).context("Parsing schema JSON")?
        };
        Ok(schema)
    }
}

/// Maps captures onto a destination schema.
pub trait SchemaProjector {
    fn project_sheet(&self, name: &str, capture: &SheetCapture) -> SheetSchema;

    fn project_workbook(&self, workbook: &WorkbookCapture) -> WorkbookSchema {
        WorkbookSchema {
            sheets: workbook
                .iter()
                .map(|(name, capture)| self.project_sheet(name, capture))
                .collect(),
            schema_version: None,
        }
    }
}

/// The untyped projection: every column is a string.
#[derive(Debug, Clone, Copy, Default)]
pub struct StringSchemaProjector;

impl SchemaProjector for StringSchemaProjector {
    fn project_sheet(&self, name: &str, capture: &SheetCapture) -> SheetSchema {
        let fields = capture
            .headers
            .iter()
            .map(|key| ColumnDefinition {
                key: key.clone(),
                label: key.clone(),
                description: capture.description(key).unwrap_or_default().to_string(),
                field_type: FieldType::String,
                required: capture.is_required(key),
            })
            .collect();
        SheetSchema {
            name: name.to_string(),
            fields,
        }
    }
}

pub fn project_workbook(workbook: &WorkbookCapture) -> WorkbookSchema {
    StringSchemaProjector.project_workbook(workbook)
}

#[cfg(test)]
mod tests {
    use super::*;
    use indexmap::IndexMap;
    use tempfile::tempdir;

    fn capture() -> SheetCapture {
        SheetCapture {
            headers: vec!["email".into(), "name".into()],
            required: Some(IndexMap::from([
                ("email".to_string(), true),
                ("name".to_string(), false),
            ])),
            descriptions: Some(IndexMap::from([
                ("email".to_string(), Some("Contact address".to_string())),
                ("name".to_string(), None),
            ])),
            ..SheetCapture::default()
        }
    }

    #[test]
    fn projection_uses_side_channels() {
        let schema = StringSchemaProjector.project_sheet("contacts", &capture());
        let email = schema.field("email").expect("email field");
        assert_eq!(email.label, "email");
        assert_eq!(email.description, "Contact address");
        assert!(email.required);
        let name = schema.field("name").expect("name field");
        assert_eq!(name.description, "");
        assert!(!name.required);
        assert_eq!(schema.required_keys(), vec!["email"]);
    }

    #[test]
    fn missing_side_channels_default_to_optional() {
        let capture = SheetCapture {
            headers: vec!["id".into()],
            ..SheetCapture::default()
        };
        let schema = StringSchemaProjector.project_sheet("s", &capture);
        assert_eq!(
            schema.fields,
            vec![ColumnDefinition {
                key: "id".into(),
                label: "id".into(),
                description: String::new(),
                field_type: FieldType::String,
                required: false,
            }]
        );
    }

    #[test]
    fn schema_round_trips_through_yaml_and_json() {
        let mut workbook = WorkbookCapture::new();
        workbook.insert("contacts", capture()).expect("insert");
        let schema = project_workbook(&workbook);

        let dir = tempdir().expect("temp dir");
        for name in ["schema.yml", "schema.json"] {
            let path = dir.path().join(name);
            schema.save(&path).expect("save schema");
            let loaded = WorkbookSchema::load(&path).expect("load schema");
            assert_eq!(loaded, schema);
        }
        let yaml = std::fs::read_to_string(dir.path().join("schema.yml")).expect("read yaml");
        assert!(yaml.contains("type: string"));
    }
}
