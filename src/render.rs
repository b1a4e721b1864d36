use std::fmt::Write;

use crate::descriptor::{Direction, FieldDescriptor, FieldType, ModuleDescriptor};

const HEADER: &str = r#""""
Autogenerated file - DO NOT EDIT
If you spot a bug, please report it on the mailing list and/or change the generator.
"""

"#;

const IMPORTS: &str = "import attr
from nipype.interfaces.base import Directory, File, InputMultiPath, OutputMultiPath, traits
from pydra import ShellCommandTask
from pydra.engine.specs import SpecInfo, ShellSpec
import pydra


";

/// Renders one generated Python module holding a class per descriptor.
pub fn render_module<'a>(descriptors: impl IntoIterator<Item = &'a ModuleDescriptor>) -> String {
    let classes: Vec<String> = descriptors.into_iter().map(render_class).collect();
    format!("{HEADER}{IMPORTS}{}", classes.join("\n\n"))
}

pub fn render_class(descriptor: &ModuleDescriptor) -> String {
    let docstring: String = descriptor
        .docstring
        .iter()
        .map(|line| format!("    {}\n", line.replace('"', "'")))
        .collect();
    let inputs = render_fields(&descriptor.inputs, false);
    let outputs = render_fields(&descriptor.outputs, true);

    format!(
        r#"class {name}():
    """
{docstring}    """

    input_fields = [{inputs}]
    output_fields = [{outputs}]

    input_spec = SpecInfo(name="Input", fields=input_fields, bases=(ShellSpec,))
    output_spec = SpecInfo(name="Output", fields=output_fields, bases=(pydra.specs.ShellOutSpec,))

    task = ShellCommandTask(
        name="{name}",
        executable="{executable}",
        input_spec=input_spec,
        output_spec=output_spec,
    )
"#,
        name = descriptor.name,
        executable = descriptor.executable,
    )
}

/// Renders a `setup.py` registering each sub-package as a data directory.
pub fn render_setup(package: &str, subpackages: &[String]) -> String {
    let sub_packages = subpackages
        .iter()
        .map(|sub| format!("config.add_data_dir(\"{sub}\")"))
        .collect::<Vec<_>>()
        .join("\n    ");

    format!(
        r#"def configuration(parent_package="", top_path=None):
    from numpy.distutils.misc_util import Configuration

    config = Configuration("{package}", parent_package, top_path)

    {sub_packages}

    return config

if __name__ == "__main__":
    from numpy.distutils.core import setup
    setup(**configuration(top_path="").todict())
"#
    )
}

fn render_fields(fields: &[FieldDescriptor], output: bool) -> String {
    fields.iter().fold(String::new(), |mut out, field| {
        let _ = write!(out, "{}, ", render_field(field, output));
        out
    })
}

fn render_field(field: &FieldDescriptor, output: bool) -> String {
    let mut metadata = Vec::new();
    if let Some(argstr) = &field.argstr {
        metadata.push(("argstr", argstr.clone()));
    }
    if let Some(help) = &field.help {
        metadata.push(("help_string", help.clone()));
    }
    if let Some(position) = field.position {
        metadata.push(("position", position.to_string()));
    }
    if let Some(sep) = field.sep {
        metadata.push(("sep", sep.to_string()));
    }
    if let Some(template) = &field.output_file_template {
        metadata.push(("output_file_template", template.clone()));
    }
    let metadata = metadata
        .into_iter()
        .map(|(key, value)| format!("\"{key}\": \"{}\"", escape(&value)))
        .collect::<Vec<_>>()
        .join(", ");

    let prefix = if output { "pydra.specs." } else { "" };
    let default = field
        .default_value
        .map(|value| format!(", default={value}"))
        .unwrap_or_default();

    format!(
        "(\"{name}\", attr.ib(type={prefix}{ty}{default}, metadata={{{metadata}}}))",
        name = field.name,
        ty = type_name(&field.field_type),
    )
}

fn type_name(field_type: &FieldType) -> &'static str {
    match field_type {
        FieldType::Int => "traits.Int",
        FieldType::Float => "traits.Float",
        FieldType::Bool => "traits.Bool",
        FieldType::Str => "traits.Str",
        FieldType::File { .. } => "File",
        FieldType::Directory { .. } => "Directory",
        FieldType::List | FieldType::FixedList { .. } => "traits.List",
        FieldType::Enum { .. } => "traits.Enum",
        FieldType::MultiPath {
            direction: Direction::Input,
            ..
        } => "InputMultiPath",
        FieldType::MultiPath {
            direction: Direction::Output,
            ..
        } => "OutputMultiPath",
    }
}

fn escape(value: &str) -> String {
    value.replace('"', "'").replace('\n', "\\n")
}
