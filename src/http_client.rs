use std::time::Duration;

use anyhow::{Context, Result};
use once_cell::sync::OnceCell;
use reqwest::blocking::Client;

/// Upper bound for any request that does not set its own timeout.
const DEFAULT_TIMEOUT_SECS: u64 = 60;
const USER_AGENT: &str = "anytime-td/0.1 (schedule + baseline refresh)";

static CLIENT: OnceCell<Client> = OnceCell::new();

pub fn http_client() -> Result<&'static Client> {
    CLIENT.get_or_try_init(|| {
        Client::builder()
            .user_agent(USER_AGENT)
            .timeout(Duration::from_secs(DEFAULT_TIMEOUT_SECS))
            .build()
            .context("failed to build http client")
    })
}

/// GET `url` and return the body bytes, failing on any non-2xx status.
pub fn fetch_bytes(url: &str, timeout: Duration) -> Result<Vec<u8>> {
    let client = http_client()?;
    let resp = client
        .get(url)
        .timeout(timeout)
        .send()
        .with_context(|| format!("request {url}"))?;
    let status = resp.status();
    if !status.is_success() {
        return Err(anyhow::anyhow!("http {status} for {url}"));
    }
    let body = resp
        .bytes()
        .with_context(|| format!("read body {url}"))?;
    Ok(body.to_vec())
}
