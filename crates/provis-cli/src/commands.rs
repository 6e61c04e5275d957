use anyhow::{anyhow, bail, Context};
use colored::Colorize;
use provis_schema::Item;
use provis_server::{ProvisServer, ServerConfig};
use provis_store::{Criteria, Store};
use provis_types::{Record, SlotState, Value, TYPE_FIELD};

use crate::cli::*;

pub fn run_command(cli: Cli) -> anyhow::Result<()> {
    let config = load_config(&cli)?;
    match cli.command {
        Command::Serve(args) => cmd_serve(config, args),
        Command::Types => cmd_types(&open_store(&config)?, &cli.format),
        Command::Schema(args) => cmd_schema(&open_store(&config)?, args, &cli.format),
        Command::List(args) => cmd_list(&open_store(&config)?, args, &cli.format),
        Command::Show(args) => cmd_show(&open_store(&config)?, args, &cli.format),
        Command::Validate(args) => cmd_validate(&open_store(&config)?, args, &cli.format),
    }
}

fn load_config(cli: &Cli) -> anyhow::Result<ServerConfig> {
    let mut config = match &cli.config {
        Some(path) => ServerConfig::load(path)
            .with_context(|| format!("loading {}", path.display()))?,
        None => ServerConfig::default(),
    };
    if let Some(dir) = &cli.data_dir {
        config.data_dir = Some(dir.clone());
    }
    Ok(config)
}

fn open_store(config: &ServerConfig) -> anyhow::Result<Store> {
    Ok(config.build_store()?)
}

fn print_json<T: serde::Serialize + ?Sized>(value: &T) -> anyhow::Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

fn by_type(item_type: Option<&str>) -> Criteria {
    item_type
        .map(|t| (TYPE_FIELD.to_string(), Value::from(t)))
        .into_iter()
        .collect()
}

fn cmd_serve(mut config: ServerConfig, args: ServeArgs) -> anyhow::Result<()> {
    if let Some(bind) = args.bind {
        config.bind_addr = bind;
    }
    println!(
        "provis server on {} ({})",
        config.bind_addr.to_string().bold(),
        config
            .data_dir
            .as_ref()
            .map(|d| d.display().to_string())
            .unwrap_or_else(|| "in-memory".into())
    );
    let runtime = tokio::runtime::Runtime::new()?;
    runtime.block_on(ProvisServer::new(config).serve())?;
    Ok(())
}

fn cmd_types(store: &Store, format: &OutputFormat) -> anyhow::Result<()> {
    let types = store.get_types();
    match format {
        OutputFormat::Json => print_json(&types),
        OutputFormat::Text => {
            for name in types {
                println!("{}", name.cyan());
            }
            Ok(())
        }
    }
}

fn cmd_schema(store: &Store, args: SchemaArgs, format: &OutputFormat) -> anyhow::Result<()> {
    let schema = store
        .registry()
        .get(&args.item_type)
        .ok_or_else(|| anyhow!("unknown item type: {}", args.item_type))?;
    let signature = schema.signature();
    if let OutputFormat::Json = format {
        return print_json(&signature);
    }

    println!("{}", signature.item_type.bold());
    if !signature.parents.is_empty() {
        println!("  inherits via: {}", signature.parents.join(", ").yellow());
    }
    for field in signature.fields.iter().filter(|f| args.all || f.visible) {
        let mut flags = Vec::new();
        if field.required {
            flags.push("required");
        }
        if field.inherit {
            flags.push("inherit");
        }
        if !field.editable {
            flags.push("read-only");
        }
        let kind = match &field.item_type {
            Some(target) => format!("{} -> {}", field.kind, target),
            None => field.kind.to_string(),
        };
        println!(
            "  {:<28} {:<20} {}",
            field.name.cyan(),
            kind,
            flags.join(",").dimmed()
        );
        if !field.comment.is_empty() {
            println!("  {:<28} {}", "", field.comment.dimmed());
        }
    }
    Ok(())
}

fn cmd_list(store: &Store, args: ListArgs, format: &OutputFormat) -> anyhow::Result<()> {
    if store.registry().get(&args.item_type).is_none() {
        bail!("unknown item type: {}", args.item_type);
    }
    let rows = store.find(&by_type(Some(args.item_type.as_str())), &["name"], None)?;
    let mut names: Vec<String> = rows
        .iter()
        .filter_map(|row| row.get(1).and_then(Value::as_str).map(str::to_string))
        .collect();
    names.sort();
    match format {
        OutputFormat::Json => print_json(&names),
        OutputFormat::Text => {
            if names.is_empty() {
                println!("No {} items.", args.item_type);
            }
            for name in names {
                println!("{}", name);
            }
            Ok(())
        }
    }
}

fn cmd_show(store: &Store, args: ShowArgs, format: &OutputFormat) -> anyhow::Result<()> {
    let item = store
        .find_one_by_name(&args.item_type, &args.name, None)?
        .ok_or_else(|| anyhow!("{} named {} not found", args.item_type, args.name))?;
    let record = if args.rendered {
        item.render(&store.resolver(None))
    } else {
        item.deflate()
    };
    match format {
        OutputFormat::Json => print_json(&record),
        OutputFormat::Text => {
            print_record(&item, &record);
            Ok(())
        }
    }
}

fn print_record(item: &Item, record: &Record) {
    println!("{} {}", item.type_name().bold(), item.name().unwrap_or_default().yellow());
    for field in item.fields() {
        let Some(slot) = record.get(field.name()) else {
            continue;
        };
        let value = slot.value.to_string();
        let line = format!("  {:<28} {}", field.name(), value);
        match slot.state {
            SlotState::Set => println!("{}", line),
            SlotState::Inherited => println!("{} {}", line, "(inherited)".cyan()),
            SlotState::Unset => println!("{}", line.dimmed()),
        }
    }
}

/// Items that fail validation, paired with their rendered error messages.
fn invalid_items(store: &Store, item_type: Option<&str>) -> anyhow::Result<Vec<(Item, Vec<String>)>> {
    let mut failures = Vec::new();
    for mut item in store.find_items(&by_type(item_type), None)? {
        if !item.validate(&store.resolver(None)) {
            let messages = item
                .errors()
                .iter()
                .map(|(name, error)| format!("{name}: {error}"))
                .collect();
            failures.push((item, messages));
        }
    }
    Ok(failures)
}

fn cmd_validate(store: &Store, args: ValidateArgs, format: &OutputFormat) -> anyhow::Result<()> {
    if let Some(t) = &args.item_type {
        if store.registry().get(t).is_none() {
            bail!("unknown item type: {t}");
        }
    }
    let failures = invalid_items(store, args.item_type.as_deref())?;
    match format {
        OutputFormat::Json => {
            let report: Vec<serde_json::Value> = failures
                .iter()
                .map(|(item, messages)| {
                    serde_json::json!({
                        "item_type": item.type_name(),
                        "uid": item.uid(),
                        "name": item.name(),
                        "errors": messages,
                    })
                })
                .collect();
            print_json(&report)?;
        }
        OutputFormat::Text => {
            if failures.is_empty() {
                println!("{} All items valid.", "✓".green().bold());
            }
            for (item, messages) in &failures {
                println!(
                    "{} {} {}",
                    "✗".red().bold(),
                    item.type_name(),
                    item.name().unwrap_or_default().yellow()
                );
                for message in messages {
                    println!("    {}", message);
                }
            }
        }
    }
    if !failures.is_empty() {
        bail!("{} invalid item(s)", failures.len());
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::Parser;
    use provis_schema::catalog::{PROFILE, REPO};
    use provis_store::Backend;

    fn file_config(dir: &std::path::Path) -> ServerConfig {
        ServerConfig {
            data_dir: Some(dir.to_path_buf()),
            ..ServerConfig::default()
        }
    }

    #[test]
    fn data_dir_flag_overrides_config() {
        let cli = Cli::try_parse_from(["provis", "--data-dir", "/tmp/items", "types"]).unwrap();
        let config = load_config(&cli).unwrap();
        assert_eq!(config.data_dir, Some(std::path::PathBuf::from("/tmp/items")));
    }

    #[test]
    fn missing_config_file_is_an_error() {
        let cli = Cli::try_parse_from(["provis", "--config", "/nonexistent/provis.toml", "types"])
            .unwrap();
        assert!(load_config(&cli).is_err());
    }

    #[test]
    fn validate_reports_items_broken_after_save() {
        let tmp = tempfile::tempdir().unwrap();
        let config = file_config(tmp.path());

        let store = open_store(&config).unwrap();
        let mut repo = store.new_item(REPO, None).unwrap();
        repo.set("name", "r1").unwrap();
        assert!(store.set(&mut repo).unwrap());

        // A profile record referencing a distro that was never stored.
        let mut profile = store.new_item(PROFILE, None).unwrap();
        profile.set("name", "orphan").unwrap();
        profile.set("distro", "gone").unwrap();
        store.backend(None).unwrap().store(&profile.deflate()).unwrap();

        let reopened = open_store(&config).unwrap();
        let failures = invalid_items(&reopened, None).unwrap();
        assert_eq!(failures.len(), 1);
        assert_eq!(failures[0].0.name(), Some("orphan"));
        assert!(failures[0].1[0].starts_with("distro:"));

        assert!(invalid_items(&reopened, Some(REPO)).unwrap().is_empty());
    }
}
