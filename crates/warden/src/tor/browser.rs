//! Header heuristics for privacy-browser traffic.

use axum::http::HeaderMap;
use once_cell::sync::Lazy;
use regex::Regex;

use stillwater_common::constants::headers::{SEC_CH_UA, SEC_FETCH_MODE, SEC_FETCH_SITE};
use stillwater_common::{BrowserScore, BrowserSignal};

/// Fixed Firefox-ESR user agents shipped by the Tor Browser (lowercased)
static PRIVACY_UA: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"mozilla/5\.0 \((?:windows nt 10\.0|x11; linux x86_64|macintosh; intel mac os x 10\.15); rv:\d{1,4}\.0\) gecko/20100101 firefox/\d{1,4}\.0$",
    )
    .expect("privacy UA pattern is valid")
});

/// Accept-Language values the Tor Browser sends regardless of OS locale
const DEFAULT_LOCALES: [&str; 2] = ["en-us,en;q=0.5", "en-us,en;q=0.9"];

fn header_lower(headers: &HeaderMap, name: &str) -> String {
    headers
        .get(name)
        .and_then(|v| v.to_str().ok())
        .unwrap_or_default()
        .to_ascii_lowercase()
}

/// Weighted score over three independent signals
pub fn browser_score(headers: &HeaderMap) -> BrowserScore {
    let mut signals = Vec::with_capacity(3);

    if PRIVACY_UA.is_match(&header_lower(headers, "user-agent")) {
        signals.push(BrowserSignal::PrivacyUserAgent);
    }

    let lang = header_lower(headers, "accept-language");
    if DEFAULT_LOCALES.contains(&lang.as_str()) {
        signals.push(BrowserSignal::DefaultLocale);
    }

    let has_fetch_metadata = [SEC_FETCH_SITE, SEC_FETCH_MODE, SEC_CH_UA]
        .iter()
        .any(|name| headers.contains_key(*name));
    if !has_fetch_metadata {
        signals.push(BrowserSignal::MissingFetchMetadata);
    }

    BrowserScore::from_signals(signals)
}
