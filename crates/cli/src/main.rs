mod artifacts;

use std::path::{Path, PathBuf};
use std::sync::Arc;

use anvil_console_engine::{HttpTransport, InvocationDispatcher, build_request};
use anvil_console_registry::{Category, MethodDescriptor, MethodRegistry, build_clap, raw_values_from_matches};
use anvil_console_types::{ClassifiedError, Materialized, Outcome};
use anvil_console_util::{ConsoleConfig, redact_json, redact_sensitive};
use anyhow::{Context, Result, anyhow, bail};
use clap::ArgMatches;
use serde_json::json;
use tracing::debug;

use crate::artifacts::save_artifact;

#[tokio::main]
async fn main() -> Result<()> {
    let registry = Arc::new(MethodRegistry::from_embedded_catalog()?);
    let matches = build_clap(&registry).get_matches();
    init_tracing(matches.get_flag("verbose"));

    let Some((name, sub_matches)) = matches.subcommand() else {
        build_clap(&registry).print_help()?;
        println!();
        return Ok(());
    };

    match name {
        "list" => run_list(&registry, sub_matches, matches.get_flag("json")),
        "describe" => run_describe(&registry, sub_matches, matches.get_flag("json")),
        _ => {
            let config = load_config(&matches)?;
            run_method(registry, &config, &matches, sub_matches).await
        }
    }
}

fn init_tracing(verbose: bool) {
    let default_filter = if verbose { "debug" } else { "info" };
    let filter = std::env::var("RUST_LOG").unwrap_or_else(|_| default_filter.into());
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .try_init();
}

/// File and environment layers, then command-line overrides.
fn load_config(matches: &ArgMatches) -> Result<ConsoleConfig> {
    let mut config = ConsoleConfig::load().context("could not load console configuration")?;
    if let Some(url) = matches.get_one::<String>("rpc-url") {
        config.rpc_url = url.trim().to_string();
        config.rpc_endpoint()?;
    }
    if let Some(dir) = matches.get_one::<String>("out-dir") {
        config.artifact_dir = Some(PathBuf::from(dir));
    }
    debug!(rpc_url = %redact_sensitive(&config.rpc_url), timeout_secs = config.timeout_secs, "effective configuration");
    Ok(config)
}

fn run_list(registry: &MethodRegistry, matches: &ArgMatches, json_output: bool) -> Result<()> {
    let category = matches.get_one::<String>("category").map(|tag| Category::from(tag.as_str()));
    let candidates: Vec<&Arc<MethodDescriptor>> = match matches.get_one::<String>("search") {
        Some(query) => registry.search(query),
        None => registry.all().iter().collect(),
    };
    let selected: Vec<&Arc<MethodDescriptor>> = candidates
        .into_iter()
        .filter(|descriptor| category.as_ref().is_none_or(|category| &descriptor.category == category))
        .collect();

    if json_output {
        let summaries: Vec<_> = selected.iter().map(|descriptor| descriptor.summary()).collect();
        println!("{}", serde_json::to_string_pretty(&summaries)?);
        return Ok(());
    }

    if selected.is_empty() {
        println!("No methods found");
        return Ok(());
    }
    let mut current: Option<&Category> = None;
    for descriptor in &selected {
        if current != Some(&descriptor.category) {
            println!("{}", descriptor.category);
            current = Some(&descriptor.category);
        }
        let marker = if descriptor.produces_downloadable { " [download]" } else { "" };
        println!("  {:<36} {}{}", descriptor.method_name, descriptor.display_name, marker);
    }
    Ok(())
}

fn run_describe(registry: &MethodRegistry, matches: &ArgMatches, json_output: bool) -> Result<()> {
    let method_name = matches.get_one::<String>("method").context("missing method name")?;
    let descriptor = registry.lookup(method_name)?;
    if json_output {
        println!("{}", serde_json::to_string_pretty(&**descriptor)?);
        return Ok(());
    }

    println!("{} ({})", descriptor.method_name, descriptor.display_name);
    println!("category: {}", descriptor.category);
    if !descriptor.description.is_empty() {
        println!("\n{}\n", descriptor.description);
    }
    if descriptor.parameters.is_empty() {
        println!("parameters: none");
    } else {
        println!("parameters:");
        for parameter in &descriptor.parameters {
            println!("  --{} <{}>", parameter.name, parameter.declared_type);
        }
    }
    if descriptor.produces_downloadable {
        println!("result is saved as {}", anvil_console_engine::artifact_filename(&descriptor.method_name));
    }
    Ok(())
}

async fn run_method(
    registry: Arc<MethodRegistry>,
    config: &ConsoleConfig,
    root_matches: &ArgMatches,
    group_matches: &ArgMatches,
) -> Result<()> {
    let (method_name, method_matches) = group_matches
        .subcommand()
        .context("expected a method under the category")?;
    let descriptor = Arc::clone(registry.lookup(method_name)?);
    let raw_values = raw_values_from_matches(&descriptor, method_matches);
    let json_output = root_matches.get_flag("json");

    if root_matches.get_flag("dry-run") {
        let request = build_request(&descriptor, &raw_values)
            .map_err(|error| anyhow!("invalid --{}: {error}", error.parameter_name()))?;
        println!("{}", serde_json::to_string_pretty(&redact_json(&request.to_envelope(1)))?);
        return Ok(());
    }

    let transport = HttpTransport::from_config(config)?;
    let dispatcher = InvocationDispatcher::new(registry, Arc::new(transport));
    let id = dispatcher.submit(method_name, raw_values)?;
    let outcome = dispatcher.wait(id).await?;
    report_outcome(outcome, &descriptor, &config.artifact_dir(), json_output).await
}

async fn report_outcome(outcome: Outcome, descriptor: &MethodDescriptor, out_dir: &Path, json_output: bool) -> Result<()> {
    match outcome {
        Outcome::Success(Materialized::PassThrough(value)) => {
            println!("{}", serde_json::to_string_pretty(&value)?);
            Ok(())
        }
        Outcome::Success(Materialized::Artifact(artifact)) => {
            let path = save_artifact(out_dir, &artifact).await?;
            if json_output {
                let summary = json!({
                    "artifact": path.display().to_string(),
                    "mimeType": artifact.mime_type,
                    "bytes": artifact.bytes.len(),
                });
                println!("{}", serde_json::to_string_pretty(&summary)?);
            } else {
                println!("Saved {} ({} bytes)", path.display(), artifact.bytes.len());
            }
            Ok(())
        }
        Outcome::Failure(error) => {
            if json_output {
                let body = json!({
                    "error": {
                        "kind": error.kind().to_string(),
                        "field": error.field(),
                        "message": error.to_string(),
                    }
                });
                println!("{}", serde_json::to_string_pretty(&body)?);
            }
            bail!(failure_message(&descriptor.method_name, &error))
        }
    }
}

fn failure_message(method_name: &str, error: &ClassifiedError) -> String {
    match error {
        ClassifiedError::Validation(validation) => format!("invalid --{}: {validation}", validation.parameter_name()),
        ClassifiedError::Transport(transport) => format!("{method_name} could not reach the node: {transport}"),
        ClassifiedError::Rpc(rpc) => format!("{method_name} was rejected by the node: {rpc}"),
        ClassifiedError::Internal(internal) => format!("internal error while running {method_name}: {internal}"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use anvil_console_types::{RpcError, ValidationError};

    #[test]
    fn failure_messages_name_the_field() {
        let message = failure_message(
            "anvil_mine",
            &ClassifiedError::Validation(ValidationError::NotANumber {
                name: "blocks".into(),
                raw: "abc".into(),
            }),
        );
        assert!(message.starts_with("invalid --blocks:"), "{message}");
    }

    #[test]
    fn rpc_failures_keep_the_node_message() {
        let message = failure_message(
            "eth_sendRawTransaction",
            &ClassifiedError::Rpc(RpcError {
                code: -32003,
                message: "insufficient funds".into(),
                data: None,
            }),
        );
        assert!(message.contains("RPC error -32003: insufficient funds"), "{message}");
    }

    #[test]
    fn command_line_overrides_win() {
        let registry = MethodRegistry::from_embedded_catalog().expect("catalog");
        let matches = build_clap(&registry)
            .try_get_matches_from([
                "anvil-console",
                "--rpc-url",
                "http://10.0.0.5:8545",
                "--out-dir",
                "dumps",
                "chain",
                "anvil_mine",
                "--blocks",
                "1",
            ])
            .expect("parse");
        let config = temp_env::with_vars(
            [
                ("ANVIL_CONSOLE_CONFIG", Some("/nonexistent/anvil-console.json")),
                ("ANVIL_RPC_URL", Some("http://127.0.0.1:9999")),
            ],
            || load_config(&matches),
        )
        .expect("config");
        assert_eq!(config.rpc_url, "http://10.0.0.5:8545");
        assert_eq!(config.artifact_dir(), PathBuf::from("dumps"));
    }
}
