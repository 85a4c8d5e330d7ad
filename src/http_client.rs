use std::time::Duration;

use anyhow::{Context, Result, anyhow};
use once_cell::sync::OnceCell;
use reqwest::blocking::Client;
use reqwest::header::{ACCEPT, USER_AGENT};

const REQUEST_TIMEOUT_SECS: u64 = 10;
const UA: &str = concat!("matchday_feed/", env!("CARGO_PKG_VERSION"));

static CLIENT: OnceCell<Client> = OnceCell::new();

pub fn http_client() -> Result<&'static Client> {
    CLIENT.get_or_try_init(|| {
        Client::builder()
            .timeout(Duration::from_secs(REQUEST_TIMEOUT_SECS))
            .build()
            .context("failed to build http client")
    })
}

/// GETs `url` and returns the body. Non-2xx answers become errors unless the
/// body is JSON, since the fixtures API reports quota problems that way.
pub fn get_text(url: &str, headers: &[(&str, &str)]) -> Result<String> {
    let client = http_client()?;
    let mut req = client
        .get(url)
        .header(USER_AGENT, UA)
        .header(ACCEPT, "application/json");
    for (name, value) in headers {
        req = req.header(*name, *value);
    }

    let resp = req.send().context("request failed")?;
    let status = resp.status();
    let body = resp.text().context("failed reading body")?;
    if !status.is_success() && !body.trim_start().starts_with('{') {
        return Err(anyhow!("http {}: {}", status, body));
    }
    Ok(body)
}
