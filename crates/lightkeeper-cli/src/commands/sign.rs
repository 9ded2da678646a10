//! `keeper sign` -- print signature headers for an upload body.

use std::path::Path;

use chrono::Utc;
use lightkeeper_security::signature::{SignedHeaders, sign_request};
use lightkeeper_types::config::KeeperConfig;

use super::{read_body, signing_key};

/// Format signed headers as `Name: value` lines.
pub fn format_headers(headers: &SignedHeaders) -> String {
    format!(
        "X-Timestamp: {}\nX-Nonce: {}\nX-Signature: {}",
        headers.timestamp, headers.nonce, headers.signature
    )
}

/// Sign the body at `file` with the configured key and print the headers.
pub async fn run(config: &KeeperConfig, file: &Path) -> anyhow::Result<()> {
    let key = signing_key(config)?;
    let body = read_body(file).await?;
    let headers = sign_request(key.as_bytes(), &body, Utc::now());
    println!("{}", format_headers(&headers));
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use lightkeeper_security::signature::{compute_signature, sign_request_with_nonce};

    #[test]
    fn headers_are_printed_in_order() {
        let at = Utc.with_ymd_and_hms(2024, 1, 15, 12, 0, 0).unwrap();
        let headers = sign_request_with_nonce(b"key", b"{}", at, "n-1");
        let out = format_headers(&headers);
        let lines: Vec<&str> = out.lines().collect();

        assert_eq!(lines[0], "X-Timestamp: 1705320000");
        assert_eq!(lines[1], "X-Nonce: n-1");
        assert_eq!(
            lines[2],
            format!(
                "X-Signature: {}",
                compute_signature(b"key", "1705320000", "n-1", b"{}")
            )
        );
    }
}
