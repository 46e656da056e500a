//! Tor bulk exit list download and parsing.

use anyhow::{Context, Result, bail};
use std::collections::HashSet;
use std::net::Ipv4Addr;

/// Keep one dotted quad per line; anything else is ignored
pub fn parse_exit_list(body: &str) -> HashSet<String> {
    body.lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .filter_map(|line| line.parse::<Ipv4Addr>().ok())
        .map(|ip| ip.to_string())
        .collect()
}

/// Download and parse the exit list
pub async fn fetch_exit_list(client: &reqwest::Client, url: &str) -> Result<HashSet<String>> {
    let response = client
        .get(url)
        .send()
        .await
        .context("Tor exit list request failed")?;

    let status = response.status();
    if !status.is_success() {
        bail!("Tor exit list returned HTTP {}", status.as_u16());
    }

    let body = response
        .text()
        .await
        .context("Failed to read Tor exit list body")?;

    Ok(parse_exit_list(&body))
}
