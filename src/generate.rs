use std::collections::BTreeMap;
use std::fs;
use std::path::Path;
use std::process::Command;

use anyhow::Context;
use tracing::{error, info, warn};

use crate::descriptor::ModuleDescriptor;
use crate::namespace::NamespaceNode;
use crate::render::{render_module, render_setup};
use crate::schema::SchemaSource;
use crate::translate::{translate, Config};

/// Everything needed to turn a list of modules into wrapper packages.
pub struct Generator {
    pub source: SchemaSource,
    pub config: Config,
    /// Skip modules that fail instead of aborting the run.
    pub keep_going: bool,
}

impl Generator {
    /// Acquires and translates every module, grouping them by category.
    pub fn collect(&self, modules: &[String]) -> anyhow::Result<NamespaceNode> {
        let mut root = NamespaceNode::default();
        for module in modules {
            info!(module = %module, "generating definition");
            let result = self
                .source
                .load(module)
                .and_then(|schema| translate(module, &schema, &self.config));
            match result {
                Ok(descriptor) => root.insert(descriptor),
                Err(err) if self.keep_going => {
                    error!(module = %module, error = %err, "skipping module");
                }
                Err(err) => {
                    return Err(err).with_context(|| format!("Failed to generate module `{module}`"))
                }
            }
        }
        Ok(root)
    }
}

/// Writes the tree below `package_dir`, which is created if missing.
pub fn write_package(root: &NamespaceNode, package_dir: &Path) -> anyhow::Result<()> {
    fs::create_dir_all(package_dir)
        .with_context(|| format!("Failed to create {}", package_dir.display()))?;
    match root {
        NamespaceNode::Branch(children) => write_children(children, package_dir),
        NamespaceNode::Leaf(modules) => {
            let name = package_name(package_dir);
            write_module(&package_dir.join(format!("{name}.py")), modules.values())
        }
    }
}

fn write_children(children: &BTreeMap<String, NamespaceNode>, dir: &Path) -> anyhow::Result<()> {
    let mut subpackages = Vec::new();

    for (name, node) in children {
        let name = name.to_lowercase();
        match node {
            NamespaceNode::Leaf(modules) => {
                write_module(&dir.join(format!("{name}.py")), modules.values())?;
            }
            NamespaceNode::Branch(grandchildren) => {
                let sub_dir = dir.join(&name);
                if sub_dir.exists() {
                    fs::remove_dir_all(&sub_dir)
                        .with_context(|| format!("Failed to remove {}", sub_dir.display()))?;
                }
                fs::create_dir(&sub_dir)
                    .with_context(|| format!("Failed to create {}", sub_dir.display()))?;
                write_children(grandchildren, &sub_dir)?;
                subpackages.push(name);
            }
        }
    }

    if !subpackages.is_empty() {
        let path = dir.join("setup.py");
        fs::write(&path, render_setup(&package_name(dir), &subpackages))
            .with_context(|| format!("Failed to write {}", path.display()))?;
    }
    Ok(())
}

fn write_module<'a>(
    path: &Path,
    descriptors: impl IntoIterator<Item = &'a ModuleDescriptor>,
) -> anyhow::Result<()> {
    fs::write(path, render_module(descriptors))
        .with_context(|| format!("Failed to write {}", path.display()))?;
    info!(path = %path.display(), "module written");
    Ok(())
}

/// Last component of the resolved directory, so `.` names the working directory.
fn package_name(dir: &Path) -> String {
    let resolved = fs::canonicalize(dir).unwrap_or_else(|_| dir.to_owned());
    resolved
        .file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_default()
}

/// Runs an external formatter over the generated package. Failures are only
/// reported since the generated code is usable unformatted.
pub fn run_formatter(formatter: &str, package_dir: &Path) {
    let mut tokens = formatter.split_whitespace();
    let Some(program) = tokens.next() else {
        return;
    };
    match Command::new(program).args(tokens).arg(package_dir).status() {
        Ok(status) if status.success() => info!(formatter, "formatted generated code"),
        Ok(status) => warn!(formatter, %status, "formatter exited unsuccessfully"),
        Err(err) => warn!(formatter, error = %err, "failed to launch formatter"),
    }
}

/// Writes every descriptor in the tree as pretty JSON keyed by module name.
pub fn dump_json(root: &NamespaceNode, path: &Path) -> anyhow::Result<()> {
    let mut all = BTreeMap::new();
    collect_descriptors(root, &mut all);
    let file = fs::File::create(path)
        .with_context(|| format!("Failed to create {}", path.display()))?;
    serde_json::to_writer_pretty(file, &all)?;
    info!(path = %path.display(), modules = all.len(), "descriptors written");
    Ok(())
}

fn collect_descriptors<'a>(node: &'a NamespaceNode, out: &mut BTreeMap<&'a str, &'a ModuleDescriptor>) {
    match node {
        NamespaceNode::Leaf(modules) => {
            out.extend(modules.values().map(|d| (d.module.as_str(), d)));
        }
        NamespaceNode::Branch(children) => {
            for child in children.values() {
                collect_descriptors(child, out);
            }
        }
    }
}
