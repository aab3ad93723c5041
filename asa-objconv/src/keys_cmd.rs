use anyhow::{bail, Context, Result};
use asa_objconv::registry::{IdentifierRegistry, JsonFileStore, KeySpace, Namespace};
use asa_objconv::report::render_keys;

use crate::cli::{KeysArgs, NamespaceArg, OutputFormat};

pub fn run_keys(args: KeysArgs) -> Result<()> {
    if !args.registry.exists() {
        bail!("key registry {} does not exist", args.registry.display());
    }
    // Listing never allocates, so floor and key space do not matter here.
    let registry = IdentifierRegistry::open(
        JsonFileStore::new(&args.registry),
        1,
        KeySpace::PerNamespace,
    )
    .with_context(|| format!("failed to open key registry {}", args.registry.display()))?;

    let wanted = args.namespace.map(namespace);
    let entries: Vec<_> = registry
        .entries()
        .into_iter()
        .filter(|e| wanted.map_or(true, |ns| e.namespace == ns))
        .collect();

    match args.format {
        OutputFormat::Text => println!("{}", render_keys(&entries)),
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&entries)?),
    }
    Ok(())
}

fn namespace(arg: NamespaceArg) -> Namespace {
    match arg {
        NamespaceArg::Network => Namespace::Network,
        NamespaceArg::Service => Namespace::Service,
    }
}
