use std::fmt;
use std::str::FromStr;

use crate::descriptor::FieldType;
use crate::error::SchemaValidationError;

/// Base parameter types of the execution model schema vocabulary.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NodeType {
    Integer,
    Double,
    Float,
    Boolean,
    String,
    File,
    Directory,
    Image,
    Transform,
    Geometry,
    Table,
    Point,
    Region,
}

impl NodeType {
    pub fn as_str(self) -> &'static str {
        match self {
            NodeType::Integer => "integer",
            NodeType::Double => "double",
            NodeType::Float => "float",
            NodeType::Boolean => "boolean",
            NodeType::String => "string",
            NodeType::File => "file",
            NodeType::Directory => "directory",
            NodeType::Image => "image",
            NodeType::Transform => "transform",
            NodeType::Geometry => "geometry",
            NodeType::Table => "table",
            NodeType::Point => "point",
            NodeType::Region => "region",
        }
    }

    /// File-like parameters must declare a channel.
    pub fn is_file_like(self) -> bool {
        matches!(
            self,
            NodeType::File
                | NodeType::Directory
                | NodeType::Image
                | NodeType::Geometry
                | NodeType::Transform
                | NodeType::Table
        )
    }

    /// The field type of a plain scalar parameter.
    pub fn scalar_field_type(self) -> FieldType {
        match self {
            NodeType::Integer => FieldType::Int,
            NodeType::Double | NodeType::Float => FieldType::Float,
            NodeType::Boolean => FieldType::Bool,
            NodeType::String => FieldType::Str,
            NodeType::File
            | NodeType::Image
            | NodeType::Transform
            | NodeType::Geometry
            | NodeType::Table => FieldType::File { must_exist: true },
            NodeType::Directory => FieldType::Directory { must_exist: false },
            NodeType::Point | NodeType::Region => FieldType::List,
        }
    }

    /// The element type used when this parameter accepts several values.
    pub fn element_field_type(self) -> FieldType {
        match self {
            NodeType::Directory => FieldType::Directory { must_exist: true },
            other => other.scalar_field_type(),
        }
    }

    /// Extension appended to derived output filenames when the schema gives none.
    pub fn default_extension(self) -> &'static str {
        match self {
            NodeType::Image => ".nii",
            NodeType::Transform => ".mat",
            NodeType::Geometry => ".vtk",
            _ => "",
        }
    }
}

impl fmt::Display for NodeType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for NodeType {
    type Err = SchemaValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let node_type = match s {
            "integer" => NodeType::Integer,
            "double" => NodeType::Double,
            "float" => NodeType::Float,
            "boolean" => NodeType::Boolean,
            "string" => NodeType::String,
            "file" => NodeType::File,
            "directory" => NodeType::Directory,
            "image" => NodeType::Image,
            "transform" => NodeType::Transform,
            "geometry" => NodeType::Geometry,
            "table" => NodeType::Table,
            "point" => NodeType::Point,
            "region" => NodeType::Region,
            other => return Err(SchemaValidationError::UnknownType(other.to_owned())),
        };
        Ok(node_type)
    }
}

/// A parameter element's tag: a base type, optionally suffixed with
/// `-vector` or `-enumeration`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParamKind {
    Scalar(NodeType),
    Vector(NodeType),
    Enumeration(NodeType),
}

impl FromStr for ParamKind {
    type Err = SchemaValidationError;

    fn from_str(tag: &str) -> Result<Self, Self::Err> {
        let unknown = || SchemaValidationError::UnknownType(tag.to_owned());

        if let Some(base) = tag.strip_suffix("-enumeration") {
            base.parse().map(ParamKind::Enumeration).map_err(|_| unknown())
        } else if let Some(base) = tag.strip_suffix("-vector") {
            base.parse().map(ParamKind::Vector).map_err(|_| unknown())
        } else {
            tag.parse().map(ParamKind::Scalar)
        }
    }
}
