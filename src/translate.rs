use std::collections::BTreeMap;

use tracing::debug;
use xmltree::{Element, XMLNode};

use crate::descriptor::{Direction, FieldDescriptor, FieldType, ModuleDescriptor};
use crate::error::{Result, SchemaValidationError};
use crate::node_type::{NodeType, ParamKind};
use crate::schema::launcher_command;

/// Descriptive fields copied into the docstring, in order.
const DOC_FIELDS: [&str; 8] = [
    "title",
    "category",
    "description",
    "version",
    "documentation-url",
    "license",
    "contributor",
    "acknowledgements",
];

/// Children of `<parameters>` that are not parameters.
const GROUP_PSEUDO_NODES: [&str; 2] = ["label", "description"];

/// Inputs dropped when MIPAV compatibility inputs are enabled.
const BLACKLISTED_INPUTS: [&str; 1] = ["maxMemoryUsage"];

const PYTHON_KEYWORDS: [&str; 35] = [
    "False", "None", "True", "and", "as", "assert", "async", "await", "break", "class", "continue",
    "def", "del", "elif", "else", "except", "finally", "for", "from", "global", "if", "import",
    "in", "is", "lambda", "nonlocal", "not", "or", "pass", "raise", "return", "try", "while",
    "with", "yield",
];

/// Options controlling the translation of a schema into a descriptor.
#[derive(Debug, Clone)]
pub struct Config {
    /// Separate `-vector` values with `;` rather than `,`.
    pub semicolon_separator: bool,
    /// Drop blacklisted inputs and append the MIPAV memory/process options.
    pub mipav_inputs: bool,
    /// Name the generated class after the last dot-separated module segment.
    pub strip_module_prefix: bool,
    /// Tokens prefixed to the module name in the generated executable.
    pub launcher: Vec<String>,
}

impl Default for Config {
    fn default() -> Self {
        Config {
            semicolon_separator: false,
            mipav_inputs: false,
            strip_module_prefix: true,
            launcher: Vec::new(),
        }
    }
}

/// Makes a parameter name usable as a Python identifier.
pub fn sanitize_name(name: &str) -> String {
    let name = name.trim();
    if PYTHON_KEYWORDS.contains(&name) {
        format!("opt_{name}")
    } else {
        name.to_owned()
    }
}

pub fn translate(module: &str, root: &Element, config: &Config) -> Result<ModuleDescriptor> {
    let name = if config.strip_module_prefix {
        module.rsplit('.').next().unwrap_or(module)
    } else {
        module
    };

    let mut docstring = Vec::new();
    let mut category = None;
    for tag in DOC_FIELDS {
        let value = find_descendant(root, tag).and_then(text_of);
        let value = value.as_deref().map(str::trim).unwrap_or_default();
        if !value.is_empty() {
            docstring.push(format!("{tag}: {value}"));
        }
        if tag == "category" && !value.is_empty() {
            category = Some(value.to_owned());
        }
    }
    let category = category.ok_or(SchemaValidationError::MissingElement("category"))?;

    let mut translator = Translator {
        module_name: name,
        config,
        inputs: Vec::new(),
        outputs: Vec::new(),
        output_filenames: BTreeMap::new(),
    };

    for group in child_elements(root).filter(|el| el.name == "parameters") {
        let max_index = max_index(group)?;
        for param in child_elements(group) {
            if GROUP_PSEUDO_NODES.contains(&param.name.as_str()) {
                continue;
            }
            translator.parameter(param, max_index)?;
        }
    }

    let Translator {
        mut inputs,
        outputs,
        output_filenames,
        ..
    } = translator;

    if config.mipav_inputs {
        inputs.retain(|field| !BLACKLISTED_INPUTS.contains(&field.name.as_str()));
        inputs.extend(compulsory_inputs());
    }

    debug!(
        module,
        inputs = inputs.len(),
        outputs = outputs.len(),
        "translated schema"
    );

    Ok(ModuleDescriptor {
        module: module.to_owned(),
        name: name.to_owned(),
        executable: launcher_command(&config.launcher, module),
        category,
        docstring,
        inputs,
        outputs,
        output_filenames,
    })
}

struct Translator<'a> {
    module_name: &'a str,
    config: &'a Config,
    inputs: Vec<FieldDescriptor>,
    outputs: Vec<FieldDescriptor>,
    output_filenames: BTreeMap<String, String>,
}

impl Translator<'_> {
    fn parameter(&mut self, param: &Element, max_index: i64) -> Result<()> {
        let kind: ParamKind = param.name.parse()?;

        let (name, mut argstr) = match child_text(param, "longflag") {
            Some(flag) => {
                // `--flag` and `flag` are equivalent in the schema.
                let flag = flag.trim_start_matches([' ', '-']).trim_end_matches(' ');
                (sanitize_name(flag), format!("--{flag} "))
            }
            None => {
                let name = child_text(param, "name")
                    .filter(|name| !name.trim().is_empty())
                    .ok_or(SchemaValidationError::MissingElement("name"))?;
                let name = sanitize_name(&name);
                let argstr = if param.get_child("index").is_some() {
                    String::new()
                } else {
                    format!("--{name} ")
                };
                (name, argstr)
            }
        };

        let description = child_text(param, "description");
        let mut help = description.as_deref().map(|d| d.replace('\n', ", "));

        let position = match child_text(param, "index") {
            Some(index) => {
                let index: i64 = index.trim().parse().map_err(|_| {
                    SchemaValidationError::InvalidIndex {
                        parameter: name.clone(),
                        index: index.clone(),
                    }
                })?;
                // Positional arguments keep the raw description.
                help = description;
                Some(index - (max_index + 1))
            }
            None => None,
        };

        let mut sep = None;
        let field_type = match kind {
            ParamKind::Enumeration(_) => FieldType::Enum {
                values: descendants(param, "element")
                    .into_iter()
                    .map(|el| text_of(el).unwrap_or_default().replace('"', ""))
                    .collect(),
            },
            ParamKind::Vector(node_type) => {
                sep = Some(if self.config.semicolon_separator { ';' } else { ',' });
                FieldType::MultiPath {
                    element: Box::new(node_type.element_field_type()),
                    direction: Direction::Input,
                }
            }
            ParamKind::Scalar(node_type) if is_multiple(param) => {
                argstr.push_str("...");
                let element = match node_type {
                    NodeType::Point | NodeType::Region => FieldType::FixedList {
                        element: Box::new(FieldType::Float),
                        len: 3,
                    },
                    other => other.element_field_type(),
                };
                FieldType::MultiPath {
                    element: Box::new(element),
                    direction: Direction::Input,
                }
            }
            ParamKind::Scalar(node_type) => node_type.scalar_field_type(),
        };

        let field = FieldDescriptor {
            name,
            field_type,
            argstr: Some(argstr),
            position,
            help,
            sep,
            output_file_template: None,
            default_value: None,
        };

        match kind {
            ParamKind::Scalar(node_type) if node_type.is_file_like() => {
                self.file_like(param, node_type, field)
            }
            _ => {
                self.inputs.push(field);
                Ok(())
            }
        }
    }

    fn file_like(
        &mut self,
        param: &Element,
        node_type: NodeType,
        field: FieldDescriptor,
    ) -> Result<()> {
        let Some(channel) = child_text(param, "channel") else {
            return Err(SchemaValidationError::MissingChannel {
                parameter: field.name,
                node_type: node_type.to_string(),
            }
            .into());
        };

        match channel.trim() {
            "input" => self.inputs.push(field),
            "output" => {
                let template = format!("{{{}}}_{}", field.name, self.module_name)
                    .replace("output", "input");
                let output = FieldDescriptor {
                    field_type: field.field_type.to_output(),
                    argstr: None,
                    output_file_template: Some(template),
                    ..field.clone()
                };
                self.output_filenames.insert(
                    field.name.clone(),
                    output_filename(param, node_type, &field.name),
                );
                self.inputs.push(field);
                self.outputs.push(output);
            }
            other => {
                return Err(SchemaValidationError::UnknownChannel {
                    parameter: field.name,
                    channel: other.to_owned(),
                }
                .into())
            }
        }
        Ok(())
    }
}

/// Default filename for an output parameter: the field name plus the first
/// declared extension, or the type's default extension.
fn output_filename(param: &Element, node_type: NodeType, base: &str) -> String {
    let extension = param
        .attributes
        .get("fileExtensions")
        .filter(|exts| !exts.is_empty())
        .map(|exts| exts.split(',').next().unwrap_or_default())
        .unwrap_or_else(|| node_type.default_extension());
    format!("{base}{extension}")
}

fn compulsory_inputs() -> [FieldDescriptor; 2] {
    let mut default_mem = FieldDescriptor::new("xDefaultMem", FieldType::Int);
    default_mem.argstr = Some("-xDefaultMem ".to_owned());
    default_mem.help = Some("Set default maximum heap size".to_owned());

    let mut max_process = FieldDescriptor::new("xMaxProcess", FieldType::Int);
    max_process.argstr = Some("-xMaxProcess ".to_owned());
    max_process.help = Some("Set default maximum number of processes.".to_owned());
    max_process.default_value = Some(1);

    [default_mem, max_process]
}

fn is_multiple(param: &Element) -> bool {
    param.attributes.get("multiple").map(String::as_str) == Some("true")
}

fn max_index(group: &Element) -> Result<i64> {
    let mut max = 0;
    for index in descendants(group, "index") {
        let text = text_of(index).unwrap_or_default();
        let value: i64 = text
            .trim()
            .parse()
            .map_err(|_| SchemaValidationError::InvalidIndex {
                parameter: group.name.clone(),
                index: text.clone(),
            })?;
        max = max.max(value);
    }
    Ok(max)
}

fn child_elements(el: &Element) -> impl Iterator<Item = &Element> {
    el.children.iter().filter_map(XMLNode::as_element)
}

fn child_text(el: &Element, name: &str) -> Option<String> {
    el.get_child(name).and_then(text_of)
}

fn text_of(el: &Element) -> Option<String> {
    el.get_text().map(|text| text.into_owned())
}

/// First element named `name` below `el`, in document order.
fn find_descendant<'a>(el: &'a Element, name: &str) -> Option<&'a Element> {
    child_elements(el).find_map(|child| {
        if child.name == name {
            Some(child)
        } else {
            find_descendant(child, name)
        }
    })
}

/// Every element named `name` below `el`, in document order.
fn descendants<'a>(el: &'a Element, name: &str) -> Vec<&'a Element> {
    let mut found = Vec::new();
    for child in child_elements(el) {
        if child.name == name {
            found.push(child);
        }
        found.extend(descendants(child, name));
    }
    found
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::TaskgenError;

    fn schema(parameters: &str) -> Element {
        let xml = format!(
            r#"<?xml version="1.0" encoding="utf-8"?>
<executable>
  <category>Filtering.Denoising</category>
  <title>Test Module</title>
  <description>Does things</description>
  <version>1.0</version>
  <license></license>
  <contributor>Someone</contributor>
  <parameters>
    <label>IO</label>
    <description>Input/output parameters</description>
    {parameters}
  </parameters>
</executable>"#
        );
        Element::parse(xml.as_bytes()).unwrap()
    }

    fn run(parameters: &str) -> ModuleDescriptor {
        translate("TestModule", &schema(parameters), &Config::default()).unwrap()
    }

    fn run_err(parameters: &str) -> TaskgenError {
        translate("TestModule", &schema(parameters), &Config::default()).unwrap_err()
    }

    #[test]
    fn test_docstring_and_category() {
        let descriptor = run("");
        assert_eq!(descriptor.category, "Filtering.Denoising");
        assert_eq!(
            descriptor.docstring,
            vec![
                "title: Test Module",
                "category: Filtering.Denoising",
                "description: Does things",
                "version: 1.0",
                "contributor: Someone",
            ]
        );
        assert_eq!(descriptor.executable, "TestModule");
    }

    #[test]
    fn test_missing_category() {
        let root = Element::parse("<executable><title>x</title></executable>".as_bytes()).unwrap();
        let err = translate("M", &root, &Config::default()).unwrap_err();
        assert!(matches!(
            err,
            TaskgenError::Validation(SchemaValidationError::MissingElement("category"))
        ));
    }

    #[test]
    fn test_scalar_and_output_image() {
        let descriptor = run(
            r#"<integer><name>threshold</name><description>Cutoff</description></integer>
               <image><name>outputVolume</name><channel>output</channel></image>"#,
        );

        let threshold = &descriptor.inputs[0];
        assert_eq!(threshold.name, "threshold");
        assert_eq!(threshold.field_type, FieldType::Int);
        assert_eq!(threshold.argstr.as_deref(), Some("--threshold "));
        assert_eq!(threshold.help.as_deref(), Some("Cutoff"));
        assert_eq!(threshold.position, None);

        let mirrored = &descriptor.inputs[1];
        assert_eq!(mirrored.name, "outputVolume");
        assert_eq!(mirrored.field_type, FieldType::File { must_exist: true });
        assert_eq!(mirrored.argstr.as_deref(), Some("--outputVolume "));

        assert_eq!(descriptor.outputs.len(), 1);
        let output = &descriptor.outputs[0];
        assert_eq!(output.name, "outputVolume");
        assert_eq!(output.field_type, FieldType::File { must_exist: false });
        assert_eq!(output.argstr, None);
        assert_eq!(
            output.output_file_template.as_deref(),
            Some("{inputVolume}_TestModule")
        );

        assert_eq!(
            descriptor.output_filenames,
            BTreeMap::from([("outputVolume".to_owned(), "outputVolume.nii".to_owned())])
        );
    }

    #[test]
    fn test_output_filename_extensions() {
        let descriptor = run(
            r#"<transform fileExtensions=".h5,.mat"><name>xfm</name><channel>output</channel></transform>
               <geometry><name>surface</name><channel>output</channel></geometry>
               <file><name>report</name><channel>output</channel></file>
               <directory><name>outDir</name><channel>output</channel></directory>
               <table><name>stats</name><channel>output</channel></table>"#,
        );
        assert_eq!(descriptor.output_filenames["xfm"], "xfm.h5");
        assert_eq!(descriptor.output_filenames["surface"], "surface.vtk");
        assert_eq!(descriptor.output_filenames["report"], "report");
        assert_eq!(descriptor.output_filenames["outDir"], "outDir");
        assert_eq!(descriptor.output_filenames["stats"], "stats");
        assert_eq!(descriptor.inputs.len(), 5);
        assert_eq!(descriptor.outputs.len(), 5);
        assert_eq!(
            descriptor.outputs[3].field_type,
            FieldType::Directory { must_exist: false }
        );
    }

    #[test]
    fn test_input_channel_only_in_inputs() {
        let descriptor = run(r#"<image><name>inputVolume</name><channel>input</channel></image>"#);
        assert_eq!(descriptor.inputs.len(), 1);
        assert!(descriptor.outputs.is_empty());
        assert!(descriptor.output_filenames.is_empty());
    }

    #[test]
    fn test_missing_channel() {
        let err = run_err(r#"<image><name>inputVolume</name></image>"#);
        assert!(matches!(
            err,
            TaskgenError::Validation(SchemaValidationError::MissingChannel { parameter, node_type })
                if parameter == "inputVolume" && node_type == "image"
        ));
    }

    #[test]
    fn test_unknown_channel() {
        let err = run_err(r#"<file><name>f</name><channel>sideways</channel></file>"#);
        assert!(matches!(
            err,
            TaskgenError::Validation(SchemaValidationError::UnknownChannel { channel, .. })
                if channel == "sideways"
        ));
    }

    #[test]
    fn test_parameter_without_name() {
        let err = run_err(r#"<integer><description>x</description></integer>"#);
        assert!(matches!(
            err,
            TaskgenError::Validation(SchemaValidationError::MissingElement("name"))
        ));

        let err = run_err(r#"<string><name>  </name><index>0</index></string>"#);
        assert!(matches!(
            err,
            TaskgenError::Validation(SchemaValidationError::MissingElement("name"))
        ));
    }

    #[test]
    fn test_unknown_type() {
        let err = run_err(r#"<measurement><name>m</name></measurement>"#);
        assert!(matches!(
            err,
            TaskgenError::Validation(SchemaValidationError::UnknownType(t)) if t == "measurement"
        ));
    }

    #[test]
    fn test_positions_are_relative_to_max_index() {
        let descriptor = run(
            r#"<image><name>fixed</name><index>0</index><channel>input</channel><description>Fixed image</description></image>
               <image><name>moving</name><index>1</index><channel>input</channel><description>Moving
image</description></image>
               <boolean><name>verbose</name></boolean>"#,
        );
        let fixed = &descriptor.inputs[0];
        assert_eq!(fixed.position, Some(-2));
        assert_eq!(fixed.argstr.as_deref(), Some(""));
        assert_eq!(fixed.help.as_deref(), Some("Fixed image"));

        let moving = &descriptor.inputs[1];
        assert_eq!(moving.position, Some(-1));
        assert_eq!(moving.help.as_deref(), Some("Moving\nimage"));

        assert_eq!(descriptor.inputs[2].position, None);
        assert_eq!(descriptor.inputs[2].argstr.as_deref(), Some("--verbose "));
    }

    #[test]
    fn test_max_index_is_per_group() {
        let xml = r#"<executable>
  <category>A</category>
  <parameters>
    <string><name>a</name><index>3</index></string>
  </parameters>
  <parameters>
    <string><name>b</name><index>0</index></string>
  </parameters>
</executable>"#;
        let root = Element::parse(xml.as_bytes()).unwrap();
        let descriptor = translate("M", &root, &Config::default()).unwrap();
        assert_eq!(descriptor.inputs[0].position, Some(-1));
        assert_eq!(descriptor.inputs[1].position, Some(-1));
    }

    #[test]
    fn test_longflag_preferred_over_name() {
        let descriptor = run(
            r#"<double><name>sigmaValue</name><longflag> --sigma </longflag></double>
               <float><name>ignored</name><longflag>lambda</longflag></float>
               <string><name>from</name></string>"#,
        );
        assert_eq!(descriptor.inputs[0].name, "sigma");
        assert_eq!(descriptor.inputs[0].argstr.as_deref(), Some("--sigma "));
        assert_eq!(descriptor.inputs[0].field_type, FieldType::Float);

        assert_eq!(descriptor.inputs[1].name, "opt_lambda");
        assert_eq!(descriptor.inputs[1].argstr.as_deref(), Some("--lambda "));

        assert_eq!(descriptor.inputs[2].name, "opt_from");
        assert_eq!(descriptor.inputs[2].argstr.as_deref(), Some("--opt_from "));
    }

    #[test]
    fn test_sanitize_name() {
        assert_eq!(sanitize_name("lambda"), "opt_lambda");
        assert_eq!(sanitize_name("inputVolume"), "inputVolume");
        assert_eq!(sanitize_name(" None "), "opt_None");
    }

    #[test]
    fn test_enumeration_values() {
        let descriptor = run(
            r#"<string-enumeration>
                 <name>interpolation</name>
                 <element>Linear</element>
                 <element>"BSpline"</element>
                 <element>Nearest</element>
               </string-enumeration>"#,
        );
        assert_eq!(
            descriptor.inputs[0].field_type,
            FieldType::Enum {
                values: vec!["Linear".into(), "BSpline".into(), "Nearest".into()]
            }
        );
    }

    #[test]
    fn test_vector_separator() {
        let params = r#"<file-vector><name>inputs</name></file-vector>
                        <integer-vector><name>iterations</name></integer-vector>"#;
        let descriptor = run(params);
        assert_eq!(descriptor.inputs[0].sep, Some(','));
        assert_eq!(
            descriptor.inputs[0].field_type,
            FieldType::MultiPath {
                element: Box::new(FieldType::File { must_exist: true }),
                direction: Direction::Input,
            }
        );
        assert_eq!(
            descriptor.inputs[1].field_type,
            FieldType::MultiPath {
                element: Box::new(FieldType::Int),
                direction: Direction::Input,
            }
        );

        let config = Config {
            semicolon_separator: true,
            ..Config::default()
        };
        let descriptor = translate("TestModule", &schema(params), &config).unwrap();
        assert_eq!(descriptor.inputs[0].sep, Some(';'));
        assert_eq!(descriptor.inputs[1].sep, Some(';'));
    }

    #[test]
    fn test_multiple_parameters() {
        let descriptor = run(
            r#"<point multiple="true"><name>seed</name></point>
               <image multiple="true"><name>outputs</name><channel>output</channel></image>
               <string multiple="true"><name>tag</name><index>0</index></string>"#,
        );
        let seed = &descriptor.inputs[0];
        assert_eq!(seed.argstr.as_deref(), Some("--seed ..."));
        assert_eq!(
            seed.field_type,
            FieldType::MultiPath {
                element: Box::new(FieldType::FixedList {
                    element: Box::new(FieldType::Float),
                    len: 3
                }),
                direction: Direction::Input,
            }
        );

        let output = &descriptor.outputs[0];
        assert_eq!(
            output.field_type,
            FieldType::MultiPath {
                element: Box::new(FieldType::File { must_exist: true }),
                direction: Direction::Output,
            }
        );
        assert_eq!(descriptor.output_filenames["outputs"], "outputs.nii");

        assert_eq!(descriptor.inputs[2].argstr.as_deref(), Some("..."));
        assert_eq!(descriptor.inputs[2].position, Some(-1));
    }

    #[test]
    fn test_mipav_inputs() {
        let config = Config {
            mipav_inputs: true,
            ..Config::default()
        };
        let root = schema(
            r#"<integer><name>maxMemoryUsage</name></integer>
               <integer><name>keep</name></integer>"#,
        );
        let descriptor = translate("TestModule", &root, &config).unwrap();
        let names: Vec<_> = descriptor.inputs.iter().map(|f| f.name.as_str()).collect();
        assert_eq!(names, vec!["keep", "xDefaultMem", "xMaxProcess"]);
        assert_eq!(descriptor.inputs[2].default_value, Some(1));
        assert_eq!(descriptor.inputs[2].argstr.as_deref(), Some("-xMaxProcess "));
    }

    #[test]
    fn test_module_prefix_and_launcher() {
        let config = Config {
            launcher: vec!["Slicer".into(), "--launch".into()],
            ..Config::default()
        };
        let root = schema(r#"<image><name>outputVolume</name><channel>output</channel></image>"#);
        let descriptor = translate("edu.mipav.Blur", &root, &config).unwrap();
        assert_eq!(descriptor.name, "Blur");
        assert_eq!(descriptor.module, "edu.mipav.Blur");
        assert_eq!(descriptor.executable, "Slicer --launch edu.mipav.Blur");
        assert_eq!(
            descriptor.outputs[0].output_file_template.as_deref(),
            Some("{inputVolume}_Blur")
        );

        let config = Config {
            strip_module_prefix: false,
            ..Config::default()
        };
        let descriptor = translate("edu.mipav.Blur", &root, &config).unwrap();
        assert_eq!(descriptor.name, "edu.mipav.Blur");
    }
}
