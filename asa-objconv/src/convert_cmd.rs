use std::fs;
use std::path::Path;

use anyhow::{bail, Context, Result};
use asa_objconv::config::{default_config, load_config, ConvertConfig};
use asa_objconv::pipeline::Translator;
use asa_objconv::registry::{IdentifierRegistry, JsonFileStore, KeySpace};
use asa_objconv::report::{render_errors, render_summary};

use crate::cli::{ConvertArgs, OutputFormat};
use crate::path_guard::ensure_output_not_same;
use crate::{is_stdin, read_input};

/// Translate one configuration file and write the export document.
///
/// The XML (or JSON result) goes to `--output` or stdout; rejected objects and
/// the summary go to stderr so the document stream stays clean. Keys
/// allocated against `--registry` are saved before anything is written.
pub fn run_convert(args: ConvertArgs) -> Result<()> {
    if let Some(output) = &args.output {
        let mut protected: Vec<&Path> = Vec::new();
        if !is_stdin(&args.input) {
            protected.push(&args.input);
        }
        if let Some(registry) = &args.registry {
            protected.push(registry);
        }
        if let Some(config) = &args.config {
            protected.push(config);
        }
        ensure_output_not_same(output, &protected)?;
    }

    let config = resolve_config(&args)?;
    let text = read_input(&args.input)?;

    let registry = match &args.registry {
        Some(path) => IdentifierRegistry::open(
            JsonFileStore::new(path),
            config.db_key_start,
            config.key_space,
        )
        .with_context(|| format!("failed to open key registry {}", path.display()))?,
        None => IdentifierRegistry::in_memory(config.db_key_start, config.key_space),
    };

    let result = Translator::new(&registry, &config)
        .translate(&text)
        .context("translation aborted")?;

    let payload = match args.format {
        OutputFormat::Text => result.document.clone(),
        OutputFormat::Json => serde_json::to_string_pretty(&result)?,
    };
    match &args.output {
        Some(path) => {
            let mut body = payload;
            body.push('\n');
            fs::write(path, body)
                .with_context(|| format!("failed to write output {}", path.display()))?;
        }
        None => println!("{payload}"),
    }

    if !result.errors.is_empty() {
        eprintln!("{}", render_errors(&result.errors));
    }
    eprintln!("{}", render_summary(&result));

    if args.strict && !result.is_clean() {
        bail!(
            "strict mode failed: {} object(s) rejected",
            result.errors.len()
        );
    }
    Ok(())
}

fn resolve_config(args: &ConvertArgs) -> Result<ConvertConfig> {
    let mut config = match &args.config {
        Some(path) => load_config(path)?,
        None => default_config(),
    };

    if let Some(build) = args.build {
        config.build = build;
    }
    if let Some(version) = args.update_package_version {
        config.update_package_version = version;
    }
    if let Some(start) = args.db_key_start {
        if start == 0 {
            bail!("--db-key-start must be at least 1");
        }
        config.db_key_start = start;
    }
    if args.no_broadcast {
        config.default_broadcast = false;
    }
    if args.shared_keys {
        config.key_space = KeySpace::Shared;
    }
    Ok(config)
}
