use std::fs;

use anyhow::Context;
use colored::Colorize;
use gpps_sdk::Client;
use gpps_store::{JournaledStore, ScopedBlobStore, StoreConfig, WriteOutcome};
use gpps_types::{decode_hex, encode_hex, Requester};
use serde_json::json;

use crate::cli::*;

pub fn run_command(cli: Cli) -> anyhow::Result<()> {
    let config = effective_config(&cli)?;
    let out = Reporter { format: cli.format };
    tracing::debug!(
        data_dir = %config.data_dir.display(),
        policy = ?config.lock_policy,
        sync = ?config.sync_mode,
        "effective configuration"
    );

    // `config` never touches the data directory.
    let store = || {
        JournaledStore::open(&config)
            .with_context(|| format!("opening store in {}", config.data_dir.display()))
    };

    match cli.command {
        Command::Set(args) => cmd_set(&out, &store()?, args),
        Command::Get(args) => cmd_get(&out, &store()?, args),
        Command::Del(args) => cmd_del(&out, &store()?, args),
        Command::Lock(args) => cmd_lock(&out, &store()?, args),
        Command::Status(args) => cmd_status(&out, &store()?, args),
        Command::Ls(args) => cmd_ls(&out, &store()?, args),
        Command::Put(args) => cmd_put(&out, &store()?, args),
        Command::Fetch(args) => cmd_fetch(&out, &store()?, args),
        Command::Compact => cmd_compact(&out, &store()?),
        Command::Config => cmd_config(&out, &config),
    }
}

/// Config file first, then `--data-dir`.
fn effective_config(cli: &Cli) -> anyhow::Result<StoreConfig> {
    let mut config = match &cli.config {
        Some(path) => StoreConfig::load(path)
            .with_context(|| format!("loading config {}", path.display()))?,
        None => StoreConfig::default(),
    };
    if let Some(dir) = &cli.data_dir {
        config.data_dir = dir.clone();
    }
    Ok(config)
}

struct Reporter {
    format: OutputFormat,
}

impl Reporter {
    fn report(&self, value: serde_json::Value, text: impl FnOnce()) -> anyhow::Result<()> {
        match self.format {
            OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&value)?),
            OutputFormat::Text => text(),
        }
        Ok(())
    }
}

fn cmd_set(out: &Reporter, store: &JournaledStore, args: SetArgs) -> anyhow::Result<()> {
    let data = match (&args.hex, &args.file) {
        (Some(text), _) => decode_hex(text)?,
        (None, Some(path)) => {
            fs::read(path).with_context(|| format!("reading {}", path.display()))?
        }
        (None, None) => anyhow::bail!("either --hex or --file is required"),
    };
    let requester = Requester::new(args.owner.clone());
    let outcome = store.write(&args.owner, args.id, &data, &requester)?;
    let verb = match outcome {
        WriteOutcome::Created => "Created",
        WriteOutcome::Replaced => "Replaced",
    };
    out.report(
        json!({
            "scope": args.owner.as_str(),
            "id": args.id,
            "len": data.len(),
            "outcome": verb,
        }),
        || {
            println!(
                "{} {} node {} in {} ({} bytes)",
                "✓".green().bold(),
                verb,
                args.id.to_string().yellow(),
                args.owner.as_str().bold(),
                data.len()
            )
        },
    )
}

fn cmd_get(out: &Reporter, store: &JournaledStore, args: GetArgs) -> anyhow::Result<()> {
    let data = store.read(&args.scope, args.id)?;
    if let Some(path) = &args.out {
        fs::write(path, &data).with_context(|| format!("writing {}", path.display()))?;
        return out.report(
            json!({
                "scope": args.scope.as_str(),
                "id": args.id,
                "len": data.len(),
                "out": path,
            }),
            || {
                println!(
                    "{} Wrote {} bytes to {}",
                    "✓".green().bold(),
                    data.len(),
                    path.display()
                )
            },
        );
    }
    let hex = encode_hex(&data);
    out.report(
        json!({ "scope": args.scope.as_str(), "id": args.id, "data": hex }),
        || println!("{hex}"),
    )
}

fn cmd_del(out: &Reporter, store: &JournaledStore, args: DelArgs) -> anyhow::Result<()> {
    let requester = Requester::new(args.owner.clone());
    store.delete(&args.owner, args.id, &requester)?;
    out.report(
        json!({ "scope": args.owner.as_str(), "id": args.id, "deleted": true }),
        || {
            println!(
                "{} Deleted node {} from {}",
                "✓".green().bold(),
                args.id.to_string().yellow(),
                args.owner.as_str().bold()
            )
        },
    )
}

fn cmd_lock(out: &Reporter, store: &JournaledStore, args: LockArgs) -> anyhow::Result<()> {
    Client::new(store, Requester::new(args.owner.clone())).lock()?;
    out.report(
        json!({ "scope": args.owner.as_str(), "immutable": true }),
        || {
            println!(
                "{} Scope {} is now immutable",
                "✓".green().bold(),
                args.owner.as_str().bold()
            );
            println!("  {}", "All nodes are final; this cannot be undone.".dimmed());
        },
    )
}

fn cmd_status(out: &Reporter, store: &JournaledStore, args: StatusArgs) -> anyhow::Result<()> {
    let stats = store.stats(&args.scope)?;
    out.report(
        json!({
            "scope": args.scope.as_str(),
            "nodes": stats.nodes,
            "bytes": stats.bytes,
            "immutable": stats.immutable,
        }),
        || {
            println!("Scope {}", args.scope.as_str().bold());
            println!("  Nodes: {}", stats.nodes.to_string().bold());
            println!("  Bytes: {}", stats.bytes);
            let state = if stats.immutable {
                "immutable".red().bold()
            } else {
                "mutable".green()
            };
            println!("  State: {state}");
        },
    )
}

fn cmd_ls(out: &Reporter, store: &JournaledStore, args: LsArgs) -> anyhow::Result<()> {
    let Some(scope) = &args.scope else {
        let scopes = store.namespaces()?;
        let names: Vec<&str> = scopes.iter().map(|ns| ns.as_str()).collect();
        return out.report(json!({ "scopes": names }), || {
            if names.is_empty() {
                println!("No scopes.");
            }
            for name in &names {
                println!("{name}");
            }
        });
    };

    let rows = store.rows(scope, args.lower..=args.upper, args.limit)?;
    let json_rows: Vec<_> = rows
        .iter()
        .map(|node| json!({ "id": node.id, "data": encode_hex(&node.data) }))
        .collect();
    out.report(json!({ "scope": scope.as_str(), "rows": json_rows }), || {
        for node in &rows {
            println!("{:>20}  {:>8} bytes", node.id.to_string().yellow(), node.len());
        }
    })
}

fn cmd_put(out: &Reporter, store: &JournaledStore, args: PutArgs) -> anyhow::Result<()> {
    let data = fs::read(&args.file)
        .with_context(|| format!("reading {}", args.file.display()))?;
    let client = Client::new(store, Requester::new(args.owner.clone()));
    let manifest = client.put_object(args.start, &data, args.chunk_size)?;
    out.report(
        json!({
            "scope": args.owner.as_str(),
            "start": manifest.start,
            "chunks": manifest.chunks,
            "total_len": manifest.total_len,
        }),
        || {
            println!(
                "{} Stored {} bytes in {} chunks at nodes {}..={}",
                "✓".green().bold(),
                manifest.total_len,
                manifest.chunks,
                manifest.start.to_string().yellow(),
                manifest.last().to_string().yellow(),
            )
        },
    )
}

fn cmd_fetch(out: &Reporter, store: &JournaledStore, args: FetchArgs) -> anyhow::Result<()> {
    let client = Client::new(store, Requester::new(args.scope.clone()));
    let data = client.get_object(&args.scope, args.start)?;
    fs::write(&args.out, &data).with_context(|| format!("writing {}", args.out.display()))?;
    out.report(
        json!({
            "scope": args.scope.as_str(),
            "start": args.start,
            "len": data.len(),
            "out": args.out,
        }),
        || {
            println!(
                "{} Wrote {} bytes to {}",
                "✓".green().bold(),
                data.len(),
                args.out.display()
            )
        },
    )
}

fn cmd_compact(out: &Reporter, store: &JournaledStore) -> anyhow::Result<()> {
    let entries = store.compact()?;
    out.report(
        json!({ "entries": entries, "journal": store.journal_path() }),
        || println!("{} Journal compacted to {} entries", "✓".green().bold(), entries),
    )
}

fn cmd_config(out: &Reporter, config: &StoreConfig) -> anyhow::Result<()> {
    let text = config.to_toml_string()?;
    out.report(serde_json::to_value(config)?, || print!("{text}"))
}
