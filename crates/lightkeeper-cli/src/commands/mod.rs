//! CLI command implementations for `keeper`.
//!
//! - [`serve`] -- HTTP API over the configured key-value backend.
//! - [`sign`] -- Signature headers for a body.
//! - [`upload`] -- Signed upload client.
//! - [`config_cmd`] -- Resolved configuration.

pub mod config_cmd;
pub mod serve;
pub mod sign;
pub mod upload;

use std::path::Path;

use anyhow::Context;
use lightkeeper_platform::NativeEnvironment;
use lightkeeper_platform::config_loader;
use lightkeeper_types::config::KeeperConfig;
use tokio::io::AsyncReadExt;

/// Load configuration from the given path override or via auto-discovery:
/// `--config`, then `LIGHTKEEPER_CONFIG`, then `~/.lightkeeper/config.json`,
/// then defaults. Environment overrides apply on top.
pub async fn load_config(config_override: Option<&Path>) -> anyhow::Result<KeeperConfig> {
    if let Some(path) = config_override
        && !path.exists()
    {
        anyhow::bail!("config file not found: {}", path.display());
    }
    config_loader::load_config(&NativeEnvironment, config_override)
        .await
        .context("failed to load configuration")
}

/// Read a body from `path`, or from stdin when `path` is `-`.
pub async fn read_body(path: &Path) -> anyhow::Result<Vec<u8>> {
    if path == Path::new("-") {
        let mut buf = Vec::new();
        tokio::io::stdin().read_to_end(&mut buf).await?;
        return Ok(buf);
    }
    tokio::fs::read(path)
        .await
        .with_context(|| format!("failed to read {}", path.display()))
}

/// The signing key, or an error explaining how to configure one.
pub fn signing_key(config: &KeeperConfig) -> anyhow::Result<&str> {
    let key = &config.upload.signing_key;
    if !key.is_configured() {
        anyhow::bail!("no signing key configured; set CI_UPLOAD_SIGNING_KEY or upload.signing_key");
    }
    Ok(key.expose())
}
