mod cli;
mod descriptor;
mod error;
mod generate;
mod namespace;
mod node_type;
mod render;
mod schema;
mod translate;

use tracing::{info, Level};

use cli::get_args;
use generate::{dump_json, run_formatter, write_package, Generator};
use schema::SchemaSource;
use translate::Config;

fn main() -> anyhow::Result<()> {
    let cli = get_args();

    let level = if cli.quiet {
        Level::ERROR
    } else if cli.verbose {
        Level::DEBUG
    } else {
        Level::INFO
    };
    tracing_subscriber::fmt()
        .with_max_level(level)
        .with_target(false)
        .init();

    let modules = cli.module_list()?;

    let source = match &cli.xml_dir {
        Some(dir) => SchemaSource::Directory(dir.clone()),
        None => SchemaSource::Binary {
            launcher: cli.launcher.clone(),
            repair: cli.repair_output || cli.mipav_hacks,
        },
    };
    let generator = Generator {
        source,
        config: Config {
            semicolon_separator: cli.semicolon_separator || cli.mipav_hacks,
            mipav_inputs: cli.mipav_hacks,
            strip_module_prefix: !cli.keep_module_prefix,
            launcher: cli.launcher.clone(),
        },
        keep_going: cli.keep_going,
    };

    let root = generator.collect(&modules)?;
    write_package(&root, &cli.output_dir)?;
    info!(
        modules = root.module_count(),
        output = %cli.output_dir.display(),
        "package written"
    );

    if let Some(path) = &cli.dump_json {
        dump_json(&root, path)?;
    }
    if let Some(formatter) = &cli.formatter {
        run_formatter(formatter, &cli.output_dir);
    }

    Ok(())
}
