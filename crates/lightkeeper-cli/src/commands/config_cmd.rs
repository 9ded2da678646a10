//! `keeper config` -- show the resolved configuration.

use lightkeeper_types::config::KeeperConfig;

/// Render the configuration as pretty JSON. Secrets serialize redacted.
pub fn render(config: &KeeperConfig) -> String {
    match serde_json::to_string_pretty(config) {
        Ok(json) => json,
        Err(e) => format!("error serializing config: {e}"),
    }
}

pub fn config_show(config: &KeeperConfig) {
    println!("{}", render(config));
}
