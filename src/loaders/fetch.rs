use crate::error::{MetadataError, Result};
use reqwest::header::{ACCEPT, ACCEPT_LANGUAGE, CONTENT_TYPE};
use tracing::{debug, info};

const USER_AGENT: &str =
    "Mozilla/5.0 (X11; Linux x86_64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/124.0 Safari/537.36";

/// Blocking GET with browser-like headers, returning the response body.
/// Some catalog sites reject the default client signature.
pub fn get(url: &str) -> Result<String> {
    let url = if url.starts_with("www") {
        format!("http://{}", url)
    } else {
        url.to_string()
    };
    info!("Fetching {}", url);
    let client = reqwest::blocking::Client::builder()
        .user_agent(USER_AGENT)
        .build()?;
    let resp = client
        .get(&url)
        .header(ACCEPT, "text/html,application/xhtml+xml")
        .header(ACCEPT_LANGUAGE, "en-US,en;q=0.9")
        .send()?;
    let content_type = resp
        .headers()
        .get(CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .unwrap_or("text/html")
        .to_string();
    if !resp.status().is_success() {
        return Err(MetadataError::HttpStatus {
            url,
            status: resp.status().as_u16(),
        });
    }
    let body = resp.text()?;
    debug!("Fetched {} bytes ({}) from {}", body.len(), content_type, url);
    Ok(body)
}
