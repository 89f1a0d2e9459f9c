use std::{collections::HashMap, fs, path::Path, time::Duration};

use anyhow::{Context as _, Result, bail};
use clap::{Arg, ArgAction, ArgMatches, Command};
use serde_json::Value;
use tracing::debug;
use upward_engine::{Context, Engine, EngineConfig, ResolverRegistry, load_config, load_config_from_path, parse_definition_file};
use upward_util::expand_tilde;

#[tokio::main]
async fn main() -> Result<()> {
    init_tracing();
    let matches = build_cli().get_matches();

    match matches.subcommand() {
        Some(("resolve", sub)) => run_resolve(sub).await,
        Some(("kinds", _)) => run_kinds(),
        _ => {
            build_cli().print_help()?;
            Ok(())
        }
    }
}

fn init_tracing() {
    let filter = std::env::var("RUST_LOG").unwrap_or_else(|_| "info".into());
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .try_init();
}

fn build_cli() -> Command {
    Command::new("upward")
        .about("Resolve Upward definition files")
        .version(env!("CARGO_PKG_VERSION"))
        .subcommand(
            Command::new("resolve")
                .about("Resolve a definition file and print the result as JSON")
                .arg(Arg::new("file").required(true).action(ArgAction::Set).help("Path to a YAML or JSON definition"))
                .arg(
                    Arg::new("context")
                        .long("context")
                        .short('c')
                        .action(ArgAction::Append)
                        .value_name("KEY=VALUE")
                        .help("Seed a context value; VALUE is parsed as JSON when possible"),
                )
                .arg(
                    Arg::new("context-file")
                        .long("context-file")
                        .action(ArgAction::Set)
                        .value_name("PATH")
                        .help("YAML or JSON object of context values"),
                )
                .arg(Arg::new("config").long("config").action(ArgAction::Set).value_name("PATH").help("Engine configuration file"))
                .arg(Arg::new("field").long("field").short('f').action(ArgAction::Set).help("Resolve only this top-level field"))
                .arg(Arg::new("compact").long("compact").action(ArgAction::SetTrue).help("Print JSON on a single line")),
        )
        .subcommand(Command::new("kinds").about("List registered resolver kinds and their telltales"))
}

async fn run_resolve(matches: &ArgMatches) -> Result<()> {
    let config = match matches.get_one::<String>("config") {
        Some(path) => {
            let path = expand_tilde(path);
            if !path.exists() {
                bail!("config file not found: {}", path.display());
            }
            load_config_from_path(&path)?
        }
        None => load_config()?,
    };

    let file = matches.get_one::<String>("file").context("missing definition file")?;
    let definition = parse_definition_file(expand_tilde(file))?;

    let mut values = match matches.get_one::<String>("context-file") {
        Some(path) => load_context_file(&expand_tilde(path))?,
        None => HashMap::new(),
    };
    for pair in matches.get_many::<String>("context").into_iter().flatten() {
        let (key, value) = parse_context_pair(pair)?;
        values.insert(key, value);
    }
    debug!(keys = ?values.keys().collect::<Vec<_>>(), "seeding context");

    let engine = Engine::from_config(&config)?;
    let context = Context::from_values(values);
    let resolution = async {
        match matches.get_one::<String>("field") {
            Some(field) => engine.resolve_field(&definition, field, context).await,
            None => engine.resolve(&definition, context).await,
        }
    };

    let resolved = match deadline(&config) {
        Some(limit) => tokio::time::timeout(limit, resolution)
            .await
            .with_context(|| format!("resolution did not finish within {}s", limit.as_secs()))??,
        None => resolution.await?,
    };

    let output = if matches.get_flag("compact") {
        serde_json::to_string(&resolved)?
    } else {
        serde_json::to_string_pretty(&resolved)?
    };
    println!("{}", output);
    Ok(())
}

fn run_kinds() -> Result<()> {
    for descriptor in ResolverRegistry::standard().descriptors() {
        println!("{:<12} {}", descriptor.kind, descriptor.telltale);
    }
    Ok(())
}

fn deadline(config: &EngineConfig) -> Option<Duration> {
    config.resolution.deadline_secs.map(Duration::from_secs)
}

/// Split `KEY=VALUE`, reading VALUE as JSON and falling back to a plain string.
fn parse_context_pair(pair: &str) -> Result<(String, Value)> {
    let Some((key, raw)) = pair.split_once('=') else {
        bail!("context values must look like KEY=VALUE, got '{}'", pair);
    };
    let key = key.trim();
    if key.is_empty() {
        bail!("context key is empty in '{}'", pair);
    }
    let value = serde_json::from_str(raw).unwrap_or_else(|_| Value::String(raw.to_string()));
    Ok((key.to_string(), value))
}

fn load_context_file(path: &Path) -> Result<HashMap<String, Value>> {
    let content = fs::read_to_string(path).with_context(|| format!("Failed to read context file: {}", path.display()))?;
    let values: HashMap<String, Value> =
        serde_yaml::from_str(&content).with_context(|| format!("Context file must be an object of keys to values: {}", path.display()))?;
    Ok(values)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_parse_context_pair_reads_json() {
        assert_eq!(parse_context_pair("count=3").unwrap(), ("count".into(), json!(3)));
        assert_eq!(parse_context_pair("user={\"id\":1}").unwrap(), ("user".into(), json!({"id": 1})));
        assert_eq!(parse_context_pair("flag=true").unwrap(), ("flag".into(), json!(true)));
    }

    #[test]
    fn test_parse_context_pair_falls_back_to_string() {
        assert_eq!(parse_context_pair("path=/checkout").unwrap(), ("path".into(), json!("/checkout")));
        assert_eq!(parse_context_pair("query=a=b").unwrap(), ("query".into(), json!("a=b")));
        assert_eq!(parse_context_pair("empty=").unwrap(), ("empty".into(), json!("")));
    }

    #[test]
    fn test_parse_context_pair_rejects_malformed() {
        assert!(parse_context_pair("novalue").is_err());
        assert!(parse_context_pair("=value").is_err());
    }

    #[test]
    fn test_load_context_file() {
        let temp_dir = tempfile::tempdir().unwrap();
        let path = temp_dir.path().join("context.yml");
        fs::write(&path, "request:\n  url:\n    pathname: /cart\nstore: default\n").unwrap();

        let values = load_context_file(&path).unwrap();
        assert_eq!(values["request"], json!({"url": {"pathname": "/cart"}}));
        assert_eq!(values["store"], json!("default"));

        fs::write(&path, "- not\n- an object\n").unwrap();
        assert!(load_context_file(&path).is_err());
    }

    #[test]
    fn test_cli_parses_resolve_arguments() {
        let matches = build_cli()
            .try_get_matches_from(["upward", "resolve", "upward.yml", "-c", "a=1", "--context", "b=x", "--compact"])
            .unwrap();
        let (name, sub) = matches.subcommand().unwrap();
        assert_eq!(name, "resolve");
        let pairs: Vec<&String> = sub.get_many::<String>("context").unwrap().collect();
        assert_eq!(pairs, ["a=1", "b=x"]);
        assert!(sub.get_flag("compact"));
    }
}
