//! Configuration loading, validation, and schema migration.

pub mod migrator;
pub mod types;
pub mod validator;

pub use types::{infer_encrypted_from_url, AppConfig};
pub use validator::{
    check_production_safety, clamp_value, enforce_numeric_bounds, is_within_bounds,
    is_within_recommended_bounds, validate_api_key, validate_config, validate_numeric_bounds,
    validate_string_length, validate_url, BoundsAction, BoundsViolation, ConfigValidationResult,
    Finding, Severity,
};

/// Load an [`AppConfig`] layering a TOML file under environment-variable
/// overrides (prefix `CODEINDEX_`) via stacked `figment` providers.
pub fn load_config(path: Option<&std::path::Path>) -> codeindex_domain::error::Result<AppConfig> {
    use figment::providers::{Env, Format, Toml};
    use figment::Figment;

    let mut figment = Figment::from(figment::providers::Serialized::defaults(AppConfig::default()));
    if let Some(path) = path {
        figment = figment.merge(Toml::file(path));
    }
    figment = figment.merge(Env::prefixed("CODEINDEX_"));

    figment
        .extract()
        .map_err(|e| codeindex_domain::error::Error::Configuration {
            field: "<root>".to_owned(),
            message: e.to_string(),
        })
}
