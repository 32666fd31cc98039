use std::net::IpAddr;
use std::time::Duration;

use tracing::warn;

/// Services tried, in order, to learn this station's public IP address.
const IP_SERVICES: &[&str] = &[
    "https://api.ipify.org",
    "https://ifconfig.me/ip",
    "https://icanhazip.com",
];

const FALLBACK_IP: &str = "127.0.0.1";

/// Resolves this station's public IP address.
///
/// In local-testing mode the fallback is used unconditionally. Otherwise
/// each service in [`IP_SERVICES`] is tried in turn with `timeout`; the
/// first syntactically valid address wins. If none respond, falls back to
/// `127.0.0.1`.
pub async fn resolve_public_ip(client: &reqwest::Client, local_testing: bool, timeout: Duration) -> String {
    if local_testing {
        return FALLBACK_IP.to_string();
    }

    for service in IP_SERVICES {
        match client.get(*service).timeout(timeout).send().await {
            Ok(response) => match response.text().await {
                Ok(body) => {
                    let candidate = body.trim();
                    if candidate.parse::<IpAddr>().is_ok() {
                        return candidate.to_string();
                    }
                    warn!(service, candidate, "public IP service returned unparsable body");
                }
                Err(err) => warn!(service, %err, "failed to read public IP service response body"),
            },
            Err(err) => warn!(service, %err, "public IP service request failed"),
        }
    }

    FALLBACK_IP.to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn local_testing_forces_loopback() {
        let client = reqwest::Client::new();
        let ip = resolve_public_ip(&client, true, Duration::from_millis(10)).await;
        assert_eq!(ip, FALLBACK_IP);
    }
}
