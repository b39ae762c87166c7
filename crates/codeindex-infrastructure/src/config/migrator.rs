//! Config schema migration.
//!
//! Backs up the existing config before rewriting it, then applies an ordered
//! sequence of idempotent migration steps up to [`CURRENT_CONFIG_SCHEMA_VERSION`].

use std::path::{Path, PathBuf};

use codeindex_domain::constants::CURRENT_CONFIG_SCHEMA_VERSION;
use tracing::{error, info, warn};

use super::types::AppConfig;

/// Parse a `major.minor.patch` version string into a comparable tuple. Anything
/// that doesn't parse is treated as older than everything (forces migration).
fn parse_semver(raw: &str) -> (u32, u32, u32) {
    let mut parts = raw.split('.').map(|p| p.parse::<u32>().unwrap_or(0));
    (
        parts.next().unwrap_or(0),
        parts.next().unwrap_or(0),
        parts.next().unwrap_or(0),
    )
}

/// Whether `raw` is strictly less than `CURRENT_CONFIG_SCHEMA_VERSION`.
fn is_older_than_current(raw: &str) -> bool {
    parse_semver(raw) < parse_semver(CURRENT_CONFIG_SCHEMA_VERSION)
}

/// A config is legacy iff its schema version is absent or older than current.
#[must_use]
pub fn is_legacy(config: &AppConfig) -> bool {
    match &config.config_schema_version {
        None => true,
        Some(v) => is_older_than_current(v),
    }
}

/// One named, idempotent migration step.
pub struct MigrationStep {
    pub from: &'static str,
    pub to: &'static str,
    pub apply: fn(&mut AppConfig),
}

/// The ordered migration steps currently defined. Each must be safe to re-apply
/// (idempotent) since a crash between backup and persist can replay a step.
pub fn migration_steps() -> Vec<MigrationStep> {
    vec![MigrationStep {
        from: "0.x",
        to: "1.0.0",
        apply: |config| {
            if config.circuit_breaker_threshold == 0 {
                config.circuit_breaker_threshold =
                    codeindex_domain::constants::DEFAULT_CIRCUIT_BREAKER_THRESHOLD;
            }
            if config.max_connection_pool_size == 0 {
                config.max_connection_pool_size = codeindex_domain::constants::DEFAULT_POOL_SIZE;
            }
        },
    }]
}

/// Write a TOML backup of `config` under `storage_dir`, creating the directory if
/// needed. Backup failures are logged and do not abort migration.
fn write_backup(config: &AppConfig, storage_dir: &Path) -> Option<PathBuf> {
    if let Err(e) = std::fs::create_dir_all(storage_dir) {
        error!(error = %e, "failed to create config backup directory; continuing migration without a backup");
        return None;
    }
    let backup_path = storage_dir.join("config.backup.toml");
    let serialized = match toml::to_string_pretty(config) {
        Ok(s) => s,
        Err(e) => {
            error!(error = %e, "failed to serialize config for backup; continuing migration without a backup");
            return None;
        }
    };
    match std::fs::write(&backup_path, serialized) {
        Ok(()) => {
            info!(path = %backup_path.display(), "wrote config backup");
            Some(backup_path)
        }
        Err(e) => {
            error!(error = %e, "failed to write config backup; continuing migration without a backup");
            None
        }
    }
}

/// Migrate `config` to the current schema version, backing it up first.
///
/// `persist` is the host's config-update callback: it receives the migrated
/// config and is responsible for making it durable (e.g. writing it back to the
/// loaded file). `storage_dir` is where the pre-migration backup is written.
pub fn migrate_config<F>(mut config: AppConfig, storage_dir: &Path, persist: F) -> AppConfig
where
    F: FnOnce(&AppConfig),
{
    if !is_legacy(&config) {
        return config;
    }

    let _backup_path = write_backup(&config, storage_dir);

    for step in migration_steps() {
        (step.apply)(&mut config);
    }

    if config.config_schema_version.as_deref() != Some(CURRENT_CONFIG_SCHEMA_VERSION) {
        warn!(
            from = config.config_schema_version.as_deref().unwrap_or("<none>"),
            to = CURRENT_CONFIG_SCHEMA_VERSION,
            "migrating config schema version"
        );
    }
    config.config_schema_version = Some(CURRENT_CONFIG_SCHEMA_VERSION.to_owned());

    persist(&config);
    config
}
