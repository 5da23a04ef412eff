// crates/cli/src/main.rs

use anyhow::{Context, Result};
use clap::{Arg, ArgAction, ArgMatches, Command};
use rampart_config::ConfigManager;
use std::path::PathBuf;

mod commands;

fn build_cli() -> Command {
    Command::new("rampart")
        .version(env!("CARGO_PKG_VERSION"))
        .about("Inspect and maintain the Rampart resilience layer")
        .arg(
            Arg::new("config-dir")
                .short('c')
                .long("config-dir")
                .value_name("DIR")
                .help("Directory holding config.toml (defaults to the platform config dir)")
                .global(true),
        )
        .subcommand(
            Command::new("config")
                .about("Manage the configuration file")
                .subcommand_required(true)
                .subcommand(Command::new("init").about("Write a default config file if none exists"))
                .subcommand(Command::new("show").about("Print the effective configuration"))
                .subcommand(Command::new("validate").about("Check the config file for invalid values"))
                .subcommand(Command::new("path").about("Print the config file location"))
                .subcommand(
                    Command::new("reset")
                        .about("Overwrite the config file with defaults")
                        .arg(
                            Arg::new("force")
                                .short('f')
                                .long("force")
                                .help("Skip confirmation prompt")
                                .action(ArgAction::SetTrue),
                        ),
                ),
        )
        .subcommand(
            Command::new("snapshot")
                .about("Inspect fallback snapshots")
                .subcommand_required(true)
                .subcommand(Command::new("list").about("List stored snapshots"))
                .subcommand(
                    Command::new("show")
                        .about("Print a snapshot")
                        .arg(Arg::new("data-type").required(true).value_name("DATA_TYPE")),
                )
                .subcommand(
                    Command::new("delete")
                        .about("Delete a snapshot")
                        .arg(Arg::new("data-type").required(true).value_name("DATA_TYPE")),
                ),
        )
        .subcommand(
            Command::new("db")
                .about("Database checks")
                .subcommand_required(true)
                .subcommand(
                    Command::new("ping").about("Connect and run SELECT 1, retrying connection failures"),
                ),
        )
}

fn config_manager(matches: &ArgMatches) -> Result<ConfigManager> {
    match matches.get_one::<String>("config-dir") {
        Some(dir) => Ok(ConfigManager::with_directory(PathBuf::from(dir))),
        None => ConfigManager::new().context("Failed to resolve config directory"),
    }
}

fn data_type(matches: &ArgMatches) -> Result<&str> {
    matches
        .get_one::<String>("data-type")
        .map(|s| s.as_str())
        .ok_or_else(|| anyhow::anyhow!("Data type is required"))
}

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    let matches = build_cli().get_matches();
    let manager = config_manager(&matches)?;

    match matches.subcommand() {
        Some(("config", sub)) => match sub.subcommand() {
            Some(("init", _)) => commands::config_init(&manager),
            Some(("show", _)) => commands::config_show(&manager),
            Some(("validate", _)) => commands::config_validate(&manager),
            Some(("path", _)) => commands::config_path(&manager),
            Some(("reset", args)) => commands::config_reset(&manager, args.get_flag("force")),
            _ => anyhow::bail!("Missing or unknown subcommand"),
        },
        Some(("snapshot", sub)) => {
            let config = manager.load().context("Failed to load config")?;
            match sub.subcommand() {
                Some(("list", _)) => commands::snapshot_list(&config),
                Some(("show", args)) => commands::snapshot_show(&config, data_type(args)?),
                Some(("delete", args)) => commands::snapshot_delete(&config, data_type(args)?),
                _ => anyhow::bail!("Missing or unknown subcommand"),
            }
        }
        Some(("db", sub)) => {
            let config = manager.load().context("Failed to load config")?;
            match sub.subcommand() {
                Some(("ping", _)) => commands::db_ping(&config),
                _ => anyhow::bail!("Missing or unknown subcommand"),
            }
        }
        _ => {
            build_cli().print_help()?;
            Ok(())
        }
    }
}
