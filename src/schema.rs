use std::fs;
use std::path::{Path, PathBuf};
use std::process::Command;

use tracing::{debug, error, warn};
use xmltree::Element;

use crate::error::{ParseError, Result, SchemaAcquisitionError};

/// Flag that makes an execution-model tool print its schema.
const SCHEMA_FLAG: &str = "--xml";

/// Emitted by some JIST tools in place of a `<file-vector>` opening tag.
const VECTOR_SENTINEL: &str = "<file collection: semi-colon delimited list>";

/// Noise some JIST tools print before their schema.
const ATLAS_ERROR_PREFIX: &str = "Error: Unable to set default atlas";

/// Where a module's parameter schema comes from.
#[derive(Debug, Clone)]
pub enum SchemaSource {
    /// Run the module (optionally through a launcher) with `--xml`.
    Binary {
        launcher: Vec<String>,
        /// Apply [`repair_output`] to the captured text before parsing.
        repair: bool,
    },
    /// Read `<module>.xml` from a directory of pre-dumped schemas.
    Directory(PathBuf),
}

impl SchemaSource {
    pub fn load(&self, module: &str) -> Result<Element> {
        match self {
            SchemaSource::Binary { launcher, repair } => {
                let text = run_module(launcher, module)?;
                let text = if *repair { repair_output(&text) } else { text };
                parse_schema(module, text.trim())
            }
            SchemaSource::Directory(dir) => {
                let path = dir.join(format!("{module}.xml"));
                let text = read_schema_file(&path)?;
                parse_schema(module, &text)
            }
        }
    }
}

fn run_module(launcher: &[String], module: &str) -> Result<String> {
    let mut tokens = launcher
        .iter()
        .map(String::as_str)
        .chain([module, SCHEMA_FLAG]);
    // The chain always yields at least the module and the flag.
    let program = tokens.next().unwrap_or(module);
    let command_line = launcher_command(launcher, module) + " " + SCHEMA_FLAG;
    debug!(command = %command_line, "requesting schema");

    let output = Command::new(program)
        .args(tokens)
        .output()
        .map_err(|source| SchemaAcquisitionError::Spawn {
            command: command_line.clone(),
            source,
        })?;

    if !output.status.success() {
        warn!(command = %command_line, status = %output.status, "schema request exited unsuccessfully");
    }

    Ok(String::from_utf8_lossy(&output.stdout).into_owned())
}

fn read_schema_file(path: &Path) -> Result<String> {
    fs::read_to_string(path).map_err(|source| {
        error!(path = %path.display(), "unable to read schema file");
        SchemaAcquisitionError::Read {
            path: path.to_owned(),
            source,
        }
        .into()
    })
}

/// The command used to invoke a module, launcher tokens first.
pub fn launcher_command(launcher: &[String], module: &str) -> String {
    launcher
        .iter()
        .map(String::as_str)
        .chain([module])
        .collect::<Vec<_>>()
        .join(" ")
}

pub fn parse_schema(module: &str, text: &str) -> Result<Element> {
    Element::parse(text.as_bytes()).map_err(|source| {
        error!(module, payload = %text, "schema is not well-formed XML");
        ParseError {
            module: module.to_owned(),
            payload: text.to_owned(),
            source,
        }
        .into()
    })
}

/// Applies both workarounds for malformed JIST schema output.
pub fn repair_output(text: &str) -> String {
    strip_noise(&repair_vector_tags(text)).to_owned()
}

/// Replaces the sentinel line with `<file-vector>` and the next `</file>`
/// line after it with `</file-vector>`. Every line gets a trailing newline.
pub fn repair_vector_tags(text: &str) -> String {
    let mut repaired = String::with_capacity(text.len() + 32);
    let mut in_vector = false;

    for line in text.lines() {
        let trimmed = line.trim();
        if trimmed == VECTOR_SENTINEL {
            repaired.push_str("<file-vector>");
            in_vector = true;
        } else if in_vector && trimmed == "</file>" {
            repaired.push_str("</file-vector>");
            in_vector = false;
        } else {
            repaired.push_str(line);
        }
        repaired.push('\n');
    }

    repaired
}

/// Strips a trailing `XML` and a leading atlas error message.
pub fn strip_noise(text: &str) -> &str {
    let mut text = text.trim();
    if let Some(stripped) = text.strip_suffix("XML") {
        text = stripped;
    }
    // The atlas check looks at the re-trimmed text.
    if let Some(stripped) = text.trim().strip_prefix(ATLAS_ERROR_PREFIX) {
        text = stripped;
    }
    text
}
