use std::fs;
use std::io::Read;
use std::path::Path;

use anyhow::{bail, Context, Result};
use asa_objconv::inspect::render_tree;
use asa_objconv::pipeline::check;
use asa_objconv::report::render_check;
use clap::Parser;
use xml_doc_core::parse_file;

mod cli;
mod convert_cmd;
mod keys_cmd;
mod logging;
mod path_guard;

use cli::{CheckArgs, Cli, Command, InspectArgs, OutputFormat};

fn main() -> Result<()> {
    let cli = Cli::parse();
    logging::init(cli.verbose)?;

    match cli.command {
        Command::Convert(args) => convert_cmd::run_convert(args),
        Command::Check(args) => run_check(args),
        Command::Keys(args) => keys_cmd::run_keys(args),
        Command::Inspect(args) => run_inspect(args),
    }
}

/// Read configuration text from a file, or stdin for `-`.
pub(crate) fn read_input(path: &Path) -> Result<String> {
    if is_stdin(path) {
        let mut text = String::new();
        std::io::stdin()
            .read_to_string(&mut text)
            .context("failed to read configuration from stdin")?;
        return Ok(text);
    }
    fs::read_to_string(path).with_context(|| format!("failed to read {}", path.display()))
}

pub(crate) fn is_stdin(path: &Path) -> bool {
    path.as_os_str() == "-"
}

fn run_check(args: CheckArgs) -> Result<()> {
    let text = read_input(&args.input)?;
    let result = check(&text);

    match args.format {
        OutputFormat::Text => println!("{}", render_check(&result)),
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&result)?),
    }

    if !result.errors.is_empty() {
        bail!("check failed: {} object(s) rejected", result.errors.len());
    }
    Ok(())
}

fn run_inspect(args: InspectArgs) -> Result<()> {
    let node = parse_file(&args.file)
        .with_context(|| format!("failed to parse {}", args.file.display()))?;
    print!("{}", render_tree(&node, args.depth));
    Ok(())
}
