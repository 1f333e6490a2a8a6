use anvil_console_types::{MethodDescriptor, ParameterSpec, ParameterType, RawValue};
use clap::{Arg, ArgAction, ArgMatches, Command as ClapCommand};
use indexmap::IndexMap;

use crate::MethodRegistry;

/// Builds the complete Clap command tree from the registry.
///
/// Besides the built-in `list` and `describe` commands, every category
/// becomes a subcommand group and every method a subcommand of its group,
/// e.g. `anvil-console chain anvil_mine --blocks 5`. Parameters become long
/// flags named after the parameter. Boolean parameters are switches, so an
/// absent switch means `false`, like an unchecked box.
///
/// # Examples
///
/// ```rust
/// use anvil_console_registry::{MethodRegistry, build_clap};
///
/// let registry = MethodRegistry::from_embedded_catalog().unwrap();
/// let command = build_clap(&registry);
/// assert!(command.find_subcommand("chain").is_some());
/// ```
pub fn build_clap(registry: &MethodRegistry) -> ClapCommand {
    let mut root = create_root_command();
    for category in registry.categories() {
        let static_group_name: &'static str = Box::leak(category.as_str().to_string().into_boxed_str());
        let mut group_command = ClapCommand::new(static_group_name)
            .about(format!("{category} methods"))
            .subcommand_required(true);
        for descriptor in registry.list_by_category(&category) {
            group_command = group_command.subcommand(build_method_subcommand(descriptor));
        }
        root = root.subcommand(group_command);
    }
    root
}

/// Creates the root command with global flags and the built-in subcommands.
fn create_root_command() -> ClapCommand {
    ClapCommand::new("anvil-console")
        .about("Invoke Anvil JSON-RPC methods from the command line")
        .arg(
            Arg::new("json")
                .long("json")
                .help("JSON output")
                .global(true)
                .action(ArgAction::SetTrue),
        )
        .arg(
            Arg::new("verbose")
                .long("verbose")
                .help("Verbose logging")
                .global(true)
                .action(ArgAction::SetTrue),
        )
        .arg(
            Arg::new("rpc-url")
                .long("rpc-url")
                .help("Node JSON-RPC endpoint (overrides ANVIL_RPC_URL)")
                .global(true)
                .action(ArgAction::Set),
        )
        .arg(
            Arg::new("out-dir")
                .long("out-dir")
                .help("Directory for downloaded artifacts")
                .global(true)
                .action(ArgAction::Set),
        )
        .arg(
            Arg::new("dry-run")
                .long("dry-run")
                .help("Print the JSON-RPC request instead of sending it")
                .global(true)
                .action(ArgAction::SetTrue),
        )
        .subcommand(
            ClapCommand::new("list")
                .about("List available methods")
                .arg(Arg::new("category").long("category").action(ArgAction::Set).help("Only this category"))
                .arg(Arg::new("search").long("search").action(ArgAction::Set).help("Filter by words")),
        )
        .subcommand(
            ClapCommand::new("describe")
                .about("Show a method's parameters")
                .arg(Arg::new("method").required(true).index(1).help("Method name, e.g. anvil_mine")),
        )
}

fn build_method_subcommand(descriptor: &MethodDescriptor) -> ClapCommand {
    let static_name: &'static str = Box::leak(descriptor.method_name.clone().into_boxed_str());
    let mut subcommand = ClapCommand::new(static_name).about(descriptor.display_name.clone());
    if !descriptor.description.is_empty() {
        subcommand = subcommand.long_about(descriptor.description.clone());
    }
    for parameter in &descriptor.parameters {
        subcommand = subcommand.arg(build_parameter_argument(parameter));
    }
    subcommand
}

fn build_parameter_argument(parameter: &ParameterSpec) -> Arg {
    let name: &'static str = Box::leak(parameter.name.clone().into_boxed_str());
    let arg = Arg::new(name).long(name).help(format!("type: {}", parameter.declared_type));
    match parameter.declared_type {
        ParameterType::Boolean => arg.action(ArgAction::SetTrue),
        _ => arg.action(ArgAction::Set).allow_hyphen_values(true),
    }
}

/// Collects form-style raw values for `descriptor` from parsed matches.
///
/// Text parameters that were not supplied are left out so the request
/// builder can report them as missing.
pub fn raw_values_from_matches(descriptor: &MethodDescriptor, matches: &ArgMatches) -> IndexMap<String, RawValue> {
    let mut raw_values = IndexMap::new();
    for parameter in &descriptor.parameters {
        match parameter.declared_type {
            ParameterType::Boolean => {
                raw_values.insert(parameter.name.clone(), RawValue::Bool(matches.get_flag(&parameter.name)));
            }
            _ => {
                if let Some(value) = matches.get_one::<String>(&parameter.name) {
                    raw_values.insert(parameter.name.clone(), RawValue::Text(value.clone()));
                }
            }
        }
    }
    raw_values
}

#[cfg(test)]
mod tests {
    use super::*;

    fn registry() -> MethodRegistry {
        MethodRegistry::from_embedded_catalog().expect("load embedded catalog")
    }

    #[test]
    fn groups_methods_by_category() {
        let command = build_clap(&registry());
        let chain = command.find_subcommand("chain").expect("chain group");
        assert!(chain.find_subcommand("anvil_mine").is_some());
        assert!(chain.find_subcommand("eth_getCode").is_none());
        assert!(command.find_subcommand("list").is_some());
    }

    #[test]
    fn boolean_parameters_are_switches() {
        let registry = registry();
        let command = build_clap(&registry);
        let matches = command
            .try_get_matches_from(["anvil-console", "utility", "eth_getBlockByHash", "--hash", "0xabc", "--full"])
            .expect("parse arguments");
        let (_, group_matches) = matches.subcommand().expect("group");
        let (method, method_matches) = group_matches.subcommand().expect("method");
        let descriptor = registry.lookup(method).expect("descriptor");
        let raw_values = raw_values_from_matches(descriptor, method_matches);
        assert_eq!(raw_values.get("hash"), Some(&RawValue::Text("0xabc".into())));
        assert_eq!(raw_values.get("full"), Some(&RawValue::Bool(true)));
    }

    #[test]
    fn unset_text_parameters_are_omitted() {
        let registry = registry();
        let command = build_clap(&registry);
        let matches = command
            .try_get_matches_from(["anvil-console", "chain", "anvil_mine"])
            .expect("parse arguments");
        let (_, group_matches) = matches.subcommand().expect("group");
        let (_, method_matches) = group_matches.subcommand().expect("method");
        let descriptor = registry.lookup("anvil_mine").expect("descriptor");
        assert!(raw_values_from_matches(descriptor, method_matches).is_empty());
    }
}
