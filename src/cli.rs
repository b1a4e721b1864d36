use std::fs;
use std::path::PathBuf;

use anyhow::{bail, Context};
use clap::Parser;

/// Generate pydra task wrappers from Slicer Execution Model tool schemas.
#[derive(Parser, Debug)]
#[command(author, version, about)]
pub struct Cli {
    /// Modules to generate wrappers for.
    pub modules: Vec<String>,
    /// File listing additional modules, one per line. `#` starts a comment line.
    #[arg(long)]
    pub modules_file: Option<PathBuf>,
    /// Command prefix used to launch every module, one token per flag.
    #[arg(long = "launcher", allow_hyphen_values = true)]
    pub launcher: Vec<String>,
    /// Read `<module>.xml` from this directory instead of running `<module> --xml`.
    #[arg(long, env = "SEM_TASKGEN_XML_DIR")]
    pub xml_dir: Option<PathBuf>,
    /// The directory to write the generated package to.
    #[arg(long, env = "SEM_TASKGEN_OUTPUT_DIR", default_value = ".")]
    pub output_dir: PathBuf,
    /// Repair known-malformed schema output from JIST tools.
    #[arg(long)]
    pub repair_output: bool,
    /// Separate vector values with `;` instead of `,`.
    #[arg(long)]
    pub semicolon_separator: bool,
    /// Enable every MIPAV/JIST workaround, including the memory and process inputs.
    #[arg(long)]
    pub mipav_hacks: bool,
    /// Keep dotted module prefixes in generated class names.
    #[arg(long)]
    pub keep_module_prefix: bool,
    /// Skip modules that fail instead of stopping at the first one.
    #[arg(long)]
    pub keep_going: bool,
    /// Formatter run over the output directory once generation finishes, e.g. `black`.
    #[arg(long)]
    pub formatter: Option<String>,
    /// Also write every translated descriptor to this JSON file.
    #[arg(long)]
    pub dump_json: Option<PathBuf>,
    /// Log debug output.
    #[arg(short, long)]
    pub verbose: bool,
    /// Only log errors.
    #[arg(short, long, conflicts_with = "verbose")]
    pub quiet: bool,
}

impl Cli {
    /// Modules named on the command line followed by those in `--modules-file`.
    pub fn module_list(&self) -> anyhow::Result<Vec<String>> {
        let mut modules = self.modules.clone();
        if let Some(path) = &self.modules_file {
            let contents = fs::read_to_string(path)
                .with_context(|| format!("Failed to read modules file: {}", path.display()))?;
            modules.extend(parse_module_list(&contents));
        }
        if modules.is_empty() {
            bail!("No modules given; pass module names or --modules-file");
        }
        Ok(modules)
    }
}

fn parse_module_list(contents: &str) -> impl Iterator<Item = String> + '_ {
    contents
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty() && !line.starts_with('#'))
        .map(str::to_owned)
}

pub fn get_args() -> Cli {
    Cli::parse()
}
