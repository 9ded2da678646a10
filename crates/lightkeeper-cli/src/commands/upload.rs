//! `keeper upload` -- sign a report body and POST it to a dashboard.

use std::path::PathBuf;

use anyhow::Context;
use chrono::Utc;
use clap::Args;
use lightkeeper_security::signature::sign_request;
use lightkeeper_types::config::KeeperConfig;
use tracing::{debug, info};

use super::{read_body, signing_key};

/// Arguments for `keeper upload`.
#[derive(Args)]
pub struct UploadArgs {
    /// Body file, or `-` for stdin.
    pub file: PathBuf,

    /// Dashboard base URL, e.g. `https://dash.example.com`.
    #[arg(long)]
    pub url: String,
}

/// Upload endpoint for a dashboard base URL.
pub fn upload_endpoint(base: &str) -> String {
    format!("{}/api/reports/upload", base.trim_end_matches('/'))
}

pub async fn run(config: &KeeperConfig, args: UploadArgs) -> anyhow::Result<()> {
    let key = signing_key(config)?;
    let body = read_body(&args.file).await?;
    let signed = sign_request(key.as_bytes(), &body, Utc::now());
    let endpoint = upload_endpoint(&args.url);

    debug!(%endpoint, bytes = body.len(), "uploading");

    let mut request = reqwest::Client::new()
        .post(&endpoint)
        .header(reqwest::header::CONTENT_TYPE, "application/json");
    for (name, value) in signed.pairs() {
        request = request.header(name, value);
    }

    let response = request
        .body(body)
        .send()
        .await
        .with_context(|| format!("request to {endpoint} failed"))?;
    let status = response.status();
    let text = response.text().await.unwrap_or_default();

    let pretty = serde_json::from_str::<serde_json::Value>(&text)
        .ok()
        .and_then(|v| serde_json::to_string_pretty(&v).ok())
        .unwrap_or(text);
    println!("{pretty}");

    if !status.is_success() {
        anyhow::bail!("upload rejected with status {status}");
    }
    info!(%status, "upload stored");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn endpoint_strips_trailing_slash() {
        assert_eq!(
            upload_endpoint("https://dash.example.com/"),
            "https://dash.example.com/api/reports/upload"
        );
        assert_eq!(
            upload_endpoint("http://127.0.0.1:8787"),
            "http://127.0.0.1:8787/api/reports/upload"
        );
    }
}
