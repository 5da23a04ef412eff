// crates/cli/src/commands.rs

use anyhow::{bail, Context, Result};
use console::style;
use rampart_config::{Config, ConfigManager};
use rampart_database::{SqliteSessionSource, UnitOfWork};
use rampart_fallback::{SnapshotInfo, SnapshotStore};
use rampart_resilience::Retry;
use std::io::BufRead;

/// Write a default config file if none exists
pub fn config_init(manager: &ConfigManager) -> Result<()> {
    let created = manager
        .initialize()
        .context("Failed to write default config")?;

    if created {
        println!(
            "{} Created {}",
            style("✓").green().bold(),
            manager.config_path().display()
        );
    } else {
        println!("Config already exists at {}", manager.config_path().display());
    }
    Ok(())
}

/// Print the effective configuration, environment overrides included
pub fn config_show(manager: &ConfigManager) -> Result<()> {
    let config = manager.load().context("Failed to load config")?;
    let rendered = toml::to_string_pretty(&config).context("Failed to render config")?;
    println!("{}", rendered);
    Ok(())
}

/// Check the config file, failing if any value is invalid
pub fn config_validate(manager: &ConfigManager) -> Result<()> {
    let errors = manager.validate().context("Failed to load config")?;
    if errors.is_empty() {
        println!(
            "{} {} is valid",
            style("✓").green().bold(),
            manager.config_path().display()
        );
        return Ok(());
    }

    for error in &errors {
        println!("  {} {}", style("✗").red().bold(), error);
    }
    bail!("{} invalid value(s) in {}", errors.len(), manager.config_path().display())
}

pub fn config_path(manager: &ConfigManager) -> Result<()> {
    println!("{}", manager.config_path().display());
    Ok(())
}

/// Overwrite the config file with defaults, asking first unless forced
pub fn config_reset(manager: &ConfigManager, force: bool) -> Result<()> {
    if !force && !confirm(&format!("Reset {} to defaults?", manager.config_path().display()))? {
        println!("Reset cancelled.");
        return Ok(());
    }

    manager.reset().context("Failed to reset config")?;
    println!("{} Config reset to defaults", style("✓").green().bold());
    Ok(())
}

/// List stored snapshots
pub fn snapshot_list(config: &Config) -> Result<()> {
    let store = open_store(config)?;
    let snapshots = store.list().context("Failed to list snapshots")?;

    if snapshots.is_empty() {
        println!("No snapshots in {}", store.data_dir().display());
        return Ok(());
    }

    println!(
        "\n{} Snapshots in {}",
        style(snapshots.len()).bold().cyan(),
        store.data_dir().display()
    );
    println!("{}", "=".repeat(80));
    for info in &snapshots {
        println!("{}", describe(&store, info));
    }
    Ok(())
}

/// Print one snapshot as JSON
pub fn snapshot_show(config: &Config, data_type: &str) -> Result<()> {
    let store = open_store(config)?;
    let Some(snapshot) = store
        .load_snapshot::<serde_json::Value>(data_type)
        .with_context(|| format!("Failed to read snapshot '{}'", data_type))?
    else {
        bail!("No snapshot named '{}'", data_type);
    };

    println!("{}", style(data_type).bold());
    println!("Updated: {}", snapshot.updated_at.to_rfc3339());
    println!("{}", "=".repeat(80));
    println!(
        "{}",
        serde_json::to_string_pretty(&snapshot.data).context("Failed to render snapshot")?
    );
    Ok(())
}

/// Delete one snapshot
pub fn snapshot_delete(config: &Config, data_type: &str) -> Result<()> {
    let store = open_store(config)?;
    if store
        .delete(data_type)
        .with_context(|| format!("Failed to delete snapshot '{}'", data_type))?
    {
        println!("{} Deleted snapshot '{}'", style("✓").green().bold(), data_type);
    } else {
        println!("No snapshot named '{}'", data_type);
    }
    Ok(())
}

/// Connect to the configured database and run `SELECT 1`
///
/// Connecting backs off per the `[retry]` section; the query itself runs in
/// a unit of work with the `[database]` retry settings.
pub fn db_ping(config: &Config) -> Result<()> {
    let pool_config = config.database.pool_config();
    let retry = Retry::new(config.retry.policy());
    let source = SqliteSessionSource::connect_with_retry(&pool_config, &retry)
        .with_context(|| format!("Failed to connect to {}", pool_config.url))?;

    let value = UnitOfWork::new(&source)
        .with_retries(config.database.max_retries, config.database.retry_delay())
        .run(|session| session.fetch_i64("SELECT 1"))
        .context("Database check failed")?;
    source.close().context("Failed to close connection pool")?;

    if value != 1 {
        bail!("Unexpected answer from database: {}", value);
    }
    println!("{} {} is reachable", style("✓").green().bold(), pool_config.url);
    Ok(())
}

fn open_store(config: &Config) -> Result<SnapshotStore> {
    SnapshotStore::open(&config.fallback.data_dir).with_context(|| {
        format!(
            "Failed to open snapshot directory {}",
            config.fallback.data_dir.display()
        )
    })
}

fn describe(store: &SnapshotStore, info: &SnapshotInfo) -> String {
    let updated = match store.load_snapshot::<serde_json::Value>(&info.data_type) {
        Ok(Some(snapshot)) => snapshot.updated_at.format("%Y-%m-%d %H:%M:%S UTC").to_string(),
        Ok(None) => "missing".to_string(),
        Err(_) => "unreadable".to_string(),
    };
    format!("  {:<40} {}", truncate(&info.data_type, 40), updated)
}

fn confirm(prompt: &str) -> Result<bool> {
    println!("{} (y/N)", prompt);
    let mut input = String::new();
    std::io::stdin()
        .lock()
        .read_line(&mut input)
        .context("Failed to read input")?;
    Ok(input.trim().eq_ignore_ascii_case("y"))
}

fn truncate(s: &str, max_chars: usize) -> String {
    if s.chars().count() <= max_chars {
        s.to_string()
    } else {
        let kept: String = s.chars().take(max_chars.saturating_sub(3)).collect();
        format!("{}...", kept)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use tempfile::TempDir;

    fn setup() -> (TempDir, ConfigManager, Config) {
        let temp_dir = TempDir::new().expect("Failed to create temp dir");
        let manager = ConfigManager::with_directory(temp_dir.path().join("config"));
        let mut config = Config::default();
        config.fallback.data_dir = temp_dir.path().join("fallback");
        config.database.url = format!("sqlite:{}", temp_dir.path().join("rampart.db").display());
        (temp_dir, manager, config)
    }

    #[test]
    fn test_config_init_is_idempotent() {
        let (_temp, manager, _) = setup();

        config_init(&manager).expect("init");
        assert!(manager.config_path().exists());
        config_init(&manager).expect("init again");
    }

    #[test]
    fn test_config_validate_reports_invalid_file() {
        let (_temp, manager, _) = setup();
        config_init(&manager).expect("init");
        config_validate(&manager).expect("default config is valid");

        std::fs::write(manager.config_path(), "[parallel]\nworkers = 0\n").expect("write");
        assert!(config_validate(&manager).is_err());
    }

    #[test]
    fn test_config_reset_forced() {
        let (_temp, manager, _) = setup();
        manager.update(|c| c.retry.max_retries = 7).expect("update");

        config_reset(&manager, true).expect("reset");
        assert_eq!(manager.stored().expect("stored").retry.max_retries, 3);
    }

    #[test]
    fn test_snapshot_commands() {
        let (_temp, _manager, config) = setup();
        let store = SnapshotStore::open(&config.fallback.data_dir).expect("open");
        store
            .save("search_general", &json!({"keyword": "tea", "results": []}))
            .expect("save");

        snapshot_list(&config).expect("list");
        snapshot_show(&config, "search_general").expect("show");
        assert!(snapshot_show(&config, "suppliers").is_err());

        snapshot_delete(&config, "search_general").expect("delete");
        assert!(store.list().expect("list").is_empty());
        snapshot_delete(&config, "search_general").expect("delete missing");
    }

    #[test]
    fn test_db_ping_creates_database() {
        let (temp, _manager, config) = setup();

        db_ping(&config).expect("ping");
        assert!(temp.path().join("rampart.db").exists());
    }

    #[test]
    fn test_db_ping_fails_fast_on_bad_url() {
        let (_temp, _manager, mut config) = setup();
        config.database.url = "postgres://localhost/rampart".to_string();

        let started = std::time::Instant::now();
        assert!(db_ping(&config).is_err());
        assert!(started.elapsed() < config.retry.policy().max_delay());
    }

    #[test]
    fn test_describe_pads_and_truncates() {
        let (_temp, _manager, config) = setup();
        let store = SnapshotStore::open(&config.fallback.data_dir).expect("open");
        let info = SnapshotInfo {
            data_type: "x".repeat(50),
            path: store.path_for("unsaved").expect("path"),
        };

        let line = describe(&store, &info);
        assert!(line.contains(&format!("{}...", "x".repeat(37))));
        assert!(line.ends_with("missing"));
    }

    #[test]
    fn test_truncate() {
        assert_eq!(truncate("suppliers", 40), "suppliers");
        assert_eq!(truncate("trend_通用品类", 8), "trend...");
    }
}
