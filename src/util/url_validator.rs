use std::net::IpAddr;
use thiserror::Error;
use url::Url;

/// Why a URL was refused before handing it to the system browser.
#[derive(Error, Debug)]
pub enum UrlValidationError {
    #[error("Invalid URL: {0}")]
    InvalidUrl(#[from] url::ParseError),

    #[error("Unsupported scheme: {0} (only http/https allowed)")]
    UnsupportedScheme(String),

    #[error("URL has no host")]
    MissingHost,

    #[error("Private address not allowed: {0}")]
    PrivateAddress(String),
}

/// Validates a website URL taken from catalog data before it reaches
/// `open::that`.
///
/// Only `http` and `https` URLs with a public host pass. Anything else could
/// launch a local handler (`file://`, `javascript:`) or point at the user's
/// own network.
///
/// ```
/// use gamedex::util::validate_url_for_open;
///
/// assert!(validate_url_for_open("https://www.supergiantgames.com/games/hades").is_ok());
/// assert!(validate_url_for_open("file:///etc/passwd").is_err());
/// assert!(validate_url_for_open("http://192.168.0.10/").is_err());
/// ```
pub fn validate_url_for_open(raw: &str) -> Result<Url, UrlValidationError> {
    let url = Url::parse(raw.trim())?;

    if !matches!(url.scheme(), "http" | "https") {
        return Err(UrlValidationError::UnsupportedScheme(url.scheme().to_owned()));
    }

    let host = url.host_str().ok_or(UrlValidationError::MissingHost)?;
    if host.eq_ignore_ascii_case("localhost") {
        return Err(UrlValidationError::PrivateAddress(host.to_owned()));
    }

    let bare = host.trim_start_matches('[').trim_end_matches(']');
    if let Ok(ip) = bare.parse::<IpAddr>() {
        if is_non_public(&ip) {
            return Err(UrlValidationError::PrivateAddress(ip.to_string()));
        }
    }

    Ok(url)
}

fn is_non_public(ip: &IpAddr) -> bool {
    match ip {
        IpAddr::V4(v4) => {
            v4.is_private() || v4.is_loopback() || v4.is_link_local() || v4.is_unspecified()
        }
        IpAddr::V6(v6) => {
            let first = v6.segments()[0];
            v6.is_loopback()
                || v6.is_unspecified()
                // fc00::/7
                || (first & 0xfe00) == 0xfc00
                // fe80::/10
                || (first & 0xffc0) == 0xfe80
        }
    }
}
