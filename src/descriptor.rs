use std::collections::BTreeMap;

use serde::Serialize;

/// Whether a multi-value path field is consumed or produced by the tool.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Direction {
    Input,
    Output,
}

/// Semantic type of a translated field.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum FieldType {
    Int,
    Float,
    Bool,
    Str,
    File {
        must_exist: bool,
    },
    Directory {
        must_exist: bool,
    },
    /// Untyped list, used for scalar point and region parameters.
    List,
    FixedList {
        element: Box<FieldType>,
        len: usize,
    },
    Enum {
        values: Vec<String>,
    },
    MultiPath {
        element: Box<FieldType>,
        direction: Direction,
    },
}

impl FieldType {
    /// The type an output-channel field takes when mirrored into the output list.
    pub fn to_output(&self) -> FieldType {
        match self {
            FieldType::File { .. } => FieldType::File { must_exist: false },
            FieldType::Directory { .. } => FieldType::Directory { must_exist: false },
            FieldType::MultiPath { element, .. } => FieldType::MultiPath {
                element: element.clone(),
                direction: Direction::Output,
            },
            other => other.clone(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FieldDescriptor {
    pub name: String,
    pub field_type: FieldType,
    /// `None` once an output field's argument template has been replaced by
    /// `output_file_template`.
    pub argstr: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub position: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub help: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sep: Option<char>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub output_file_template: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub default_value: Option<i64>,
}

impl FieldDescriptor {
    pub fn new(name: impl Into<String>, field_type: FieldType) -> Self {
        FieldDescriptor {
            name: name.into(),
            field_type,
            argstr: None,
            position: None,
            help: None,
            sep: None,
            output_file_template: None,
            default_value: None,
        }
    }
}

/// The translated interface of one wrapped executable.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ModuleDescriptor {
    /// Module name as it was requested, used to invoke the tool.
    pub module: String,
    /// Class name in the generated code.
    pub name: String,
    /// Full command, launcher tokens included.
    pub executable: String,
    pub category: String,
    /// One `tag: value` entry per descriptive schema field.
    pub docstring: Vec<String>,
    pub inputs: Vec<FieldDescriptor>,
    pub outputs: Vec<FieldDescriptor>,
    pub output_filenames: BTreeMap<String, String>,
}

impl ModuleDescriptor {
    /// Category path segments; only the first space-separated token counts.
    pub fn category_path(&self) -> Vec<&str> {
        self.category
            .split_whitespace()
            .next()
            .unwrap_or_default()
            .split('.')
            .collect()
    }
}
