//! Configuration discovery and loading.
//!
//! The discovery order is:
//! 1. An explicit path (the `--config` flag).
//! 2. `LIGHTKEEPER_CONFIG` environment variable.
//! 3. `~/.lightkeeper/config.json`
//! 4. If none found, the built-in defaults.
//!
//! Environment overrides are applied on top of the file, then the result is
//! validated once. A configuration that fails validation is a startup error.

use std::ops::RangeInclusive;
use std::path::{Path, PathBuf};

use lightkeeper_types::config::{
    INSIGHT_HISTORY_MAX_RANGE, KeeperConfig, KvBackend, REPORTS_MAX_RUNS_RANGE,
};
use lightkeeper_types::error::{KeeperError, Result};
use lightkeeper_types::secret::SecretString;

use crate::env::Environment;

/// Environment variable naming the config file.
pub const CONFIG_PATH_VAR: &str = "LIGHTKEEPER_CONFIG";

/// Discover the config file path.
///
/// Returns `None` when no explicit or environment-provided path is given and
/// the default location does not exist.
pub fn discover_config_path(
    env: &dyn Environment,
    explicit: Option<&Path>,
    home_dir: Option<PathBuf>,
) -> Option<PathBuf> {
    if let Some(path) = explicit {
        return Some(path.to_path_buf());
    }
    if let Some(env_path) = env.get_var(CONFIG_PATH_VAR)
        && !env_path.is_empty()
    {
        return Some(PathBuf::from(env_path));
    }
    let default_path = home_dir?.join(".lightkeeper").join("config.json");
    default_path.exists().then_some(default_path)
}

/// Load, override, and validate the configuration.
pub async fn load_config(env: &dyn Environment, explicit: Option<&Path>) -> Result<KeeperConfig> {
    let mut config = match discover_config_path(env, explicit, dirs::home_dir()) {
        Some(path) => read_config_file(&path).await?,
        None => {
            tracing::info!("no config file found, using defaults");
            KeeperConfig::default()
        }
    };

    apply_env_overrides(&mut config, env)?;
    config.validate()?;
    Ok(config)
}

/// Read and parse one config file.
pub async fn read_config_file(path: &Path) -> Result<KeeperConfig> {
    tracing::debug!(path = %path.display(), "loading config file");
    let contents = tokio::fs::read_to_string(path).await.map_err(|e| {
        KeeperError::config(format!("failed to read config file {}: {e}", path.display()))
    })?;
    serde_json::from_str(&contents).map_err(|e| {
        KeeperError::config(format!("failed to parse config file {}: {e}", path.display()))
    })
}

/// Apply environment overrides to `config`.
///
/// Empty values are treated as unset. Numeric overrides that do not parse
/// are errors, not silently ignored.
pub fn apply_env_overrides(config: &mut KeeperConfig, env: &dyn Environment) -> Result<()> {
    let var = |name: &str| env.get_var(name).filter(|v| !v.trim().is_empty());

    if let Some(key) = var("CI_UPLOAD_SIGNING_KEY") {
        config.upload.signing_key = SecretString::new(key);
    }
    if let Some(secret) = var("CI_UPLOAD_SECRET") {
        config.upload.secret = SecretString::new(secret);
    }
    if let Some(raw) = var("REPORTS_MAX_RUNS") {
        config.retention.reports_max_runs =
            parse_bounded("REPORTS_MAX_RUNS", &raw, REPORTS_MAX_RUNS_RANGE)?;
    }
    if let Some(raw) = var("INSIGHT_HISTORY_MAX") {
        config.retention.insight_history_max =
            parse_bounded("INSIGHT_HISTORY_MAX", &raw, INSIGHT_HISTORY_MAX_RANGE)?;
    }
    if let Some(url) = var("KV_URL") {
        config.kv.backend = KvBackend::Redis;
        config.kv.url = Some(url);
    }
    if let Some(bind) = var("LIGHTKEEPER_BIND") {
        config.server.bind = bind;
    }
    if let Some(domain) = var("ALLOWED_EMAIL_DOMAIN") {
        config.viewer.allowed_email_domain = Some(domain);
    }
    Ok(())
}

/// Parse an integer setting and check it against `range`.
pub fn parse_bounded(name: &str, raw: &str, range: RangeInclusive<usize>) -> Result<usize> {
    let parsed: i64 = raw
        .trim()
        .parse()
        .map_err(|_| KeeperError::config(format!("{name} must be an integer, got {raw:?}")))?;
    usize::try_from(parsed)
        .ok()
        .filter(|n| range.contains(n))
        .ok_or_else(|| {
            KeeperError::config(format!(
                "{name} must be between {} and {}, got {parsed}",
                range.start(),
                range.end()
            ))
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::env::MapEnvironment;

    // ── discovery ─────────────────────────────────────────────────────

    #[test]
    fn explicit_path_wins() {
        let env = MapEnvironment::new().with(CONFIG_PATH_VAR, "/etc/lightkeeper.json");
        let found = discover_config_path(&env, Some(Path::new("/tmp/x.json")), None);
        assert_eq!(found, Some(PathBuf::from("/tmp/x.json")));
    }

    #[test]
    fn env_var_beats_home() {
        let env = MapEnvironment::new().with(CONFIG_PATH_VAR, "/etc/lightkeeper.json");
        let found = discover_config_path(&env, None, Some(PathBuf::from("/home/u")));
        assert_eq!(found, Some(PathBuf::from("/etc/lightkeeper.json")));
    }

    #[test]
    fn home_default_only_when_present() {
        let home = tempfile::tempdir().unwrap();
        let env = MapEnvironment::new();
        assert!(discover_config_path(&env, None, Some(home.path().to_path_buf())).is_none());

        let dir = home.path().join(".lightkeeper");
        std::fs::create_dir_all(&dir).unwrap();
        std::fs::write(dir.join("config.json"), "{}").unwrap();
        assert_eq!(
            discover_config_path(&env, None, Some(home.path().to_path_buf())),
            Some(dir.join("config.json"))
        );
    }

    // ── overrides ─────────────────────────────────────────────────────

    #[test]
    fn overrides_apply() {
        let env = MapEnvironment::new()
            .with("CI_UPLOAD_SIGNING_KEY", "sign-me")
            .with("REPORTS_MAX_RUNS", " 25 ")
            .with("INSIGHT_HISTORY_MAX", "5")
            .with("KV_URL", "redis://127.0.0.1:6379")
            .with("ALLOWED_EMAIL_DOMAIN", "example.com");
        let mut config = KeeperConfig::default();
        apply_env_overrides(&mut config, &env).unwrap();

        assert_eq!(config.upload.signing_key.expose(), "sign-me");
        assert!(!config.upload.secret.is_configured());
        assert_eq!(config.retention.reports_max_runs, 25);
        assert_eq!(config.retention.insight_history_max, 5);
        assert_eq!(config.kv.backend, KvBackend::Redis);
        assert_eq!(config.viewer.allowed_email_domain.as_deref(), Some("example.com"));
    }

    #[test]
    fn empty_override_is_unset() {
        let env = MapEnvironment::new().with("REPORTS_MAX_RUNS", "");
        let mut config = KeeperConfig::default();
        apply_env_overrides(&mut config, &env).unwrap();
        assert_eq!(config.retention.reports_max_runs, 30);
    }

    #[test]
    fn non_numeric_max_runs_rejected() {
        let env = MapEnvironment::new().with("REPORTS_MAX_RUNS", "abc");
        let err = apply_env_overrides(&mut KeeperConfig::default(), &env).unwrap_err();
        assert!(err.to_string().contains("REPORTS_MAX_RUNS must be an integer"));
    }

    #[test]
    fn out_of_range_max_runs_rejected() {
        for raw in ["0", "-3", "366"] {
            let env = MapEnvironment::new().with("REPORTS_MAX_RUNS", raw);
            let err = apply_env_overrides(&mut KeeperConfig::default(), &env).unwrap_err();
            assert!(
                err.to_string().contains("REPORTS_MAX_RUNS must be between"),
                "{raw}: {err}"
            );
        }
    }

    #[test]
    fn history_max_bounds() {
        assert_eq!(parse_bounded("INSIGHT_HISTORY_MAX", "100", 1..=100).unwrap(), 100);
        assert!(parse_bounded("INSIGHT_HISTORY_MAX", "101", 1..=100).is_err());
    }

    // ── load ──────────────────────────────────────────────────────────

    #[tokio::test]
    async fn load_reads_file_then_env() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.json");
        std::fs::write(
            &path,
            r#"{ "upload": { "secret": "from-file", "rateLimit": 4 }, "retention": { "reportsMaxRuns": 7 } }"#,
        )
        .unwrap();
        let env = MapEnvironment::new().with("REPORTS_MAX_RUNS", "9");

        let config = load_config(&env, Some(&path)).await.unwrap();
        assert_eq!(config.upload.secret.expose(), "from-file");
        assert_eq!(config.upload.rate_limit, 4);
        assert_eq!(config.retention.reports_max_runs, 9);
    }

    #[tokio::test]
    async fn load_rejects_missing_explicit_file() {
        let env = MapEnvironment::new();
        let err = load_config(&env, Some(Path::new("/nonexistent/lightkeeper.json")))
            .await
            .unwrap_err();
        assert!(err.to_string().contains("failed to read config file"));
    }

    #[tokio::test]
    async fn load_rejects_malformed_json() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.json");
        std::fs::write(&path, "{ not json").unwrap();
        let err = load_config(&MapEnvironment::new(), Some(&path))
            .await
            .unwrap_err();
        assert!(err.to_string().contains("failed to parse config file"));
    }

    #[tokio::test]
    async fn load_validates() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.json");
        std::fs::write(&path, r#"{ "upload": { "nonceTtlSecs": 10 } }"#).unwrap();
        let err = load_config(&MapEnvironment::new(), Some(&path))
            .await
            .unwrap_err();
        assert!(matches!(err, KeeperError::ConfigInvalid { .. }));
    }
}
