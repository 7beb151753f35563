//! Frontend revalidation pings.
//!
//! The website renders program pages from cached data. When the sweep (or
//! an admin) changes key statuses, this service pings the frontend's
//! revalidation endpoint with the affected page paths so they re-render.
//! Delivery is best-effort: failures are logged and never propagated, and
//! the sweep's outcome does not depend on the frontend being reachable.

use hmac::{Hmac, Mac};
use serde_json::json;
use sha2::Sha256;

use crate::config::Config;

type HmacSha256 = Hmac<Sha256>;

/// Ask the frontend to re-render the pages of the given programs.
///
/// # Process
///
/// 1. Build the page path list from the program slugs
/// 2. Sign the JSON body with HMAC-SHA256 when a secret is configured
/// 3. POST to the configured revalidation endpoint
///
/// No-op when `REVALIDATE_URL` is unset. A delivery failure is logged;
/// the stale page simply lives until the next successful ping.
///
/// # Headers Sent
///
/// - `Content-Type: application/json`
/// - `X-Revalidate-Signature: sha256=<hex>` (when a secret is configured)
pub async fn notify_program_pages(http: &reqwest::Client, config: &Config, programs: &[String]) {
    let Some(ref url) = config.revalidate_url else {
        return;
    };

    if programs.is_empty() {
        return;
    }

    let paths: Vec<String> = programs.iter().map(|slug| format!("/{slug}")).collect();

    let body = json!({ "paths": paths }).to_string();

    let mut request = http
        .post(url)
        .header("Content-Type", "application/json")
        .body(body.clone());

    if let Some(ref secret) = config.revalidate_secret {
        request = request.header("X-Revalidate-Signature", generate_signature(secret, &body));
    }

    match request.send().await {
        Ok(response) if response.status().is_success() => {
            tracing::info!("revalidated {} program page(s)", paths.len());
        }
        Ok(response) => {
            tracing::error!("revalidation endpoint answered {}", response.status());
        }
        Err(e) => {
            tracing::error!("failed to reach revalidation endpoint: {e}");
        }
    }
}

/// Generate HMAC-SHA256 signature for a revalidation body.
///
/// # Format
///
/// `sha256=<hex_encoded_hmac>`
///
/// The frontend verifies by computing HMAC-SHA256(secret, body) and
/// comparing in constant time.
fn generate_signature(secret: &str, payload: &str) -> String {
    let mut mac = HmacSha256::new_from_slice(secret.as_bytes()).expect("HMAC key length is valid");
    mac.update(payload.as_bytes());
    let result = mac.finalize();
    format!("sha256={}", hex::encode(result.into_bytes()))
}
