use std::env;
use std::time::Duration;

use tracing::debug;

const METADATA_INSTANCE_ID_URL: &str = "http://169.254.169.254/latest/meta-data/instance-id";

// The metadata service answers in single-digit milliseconds when present;
// anything slower means we are not on a cloud instance. Fail fast.
const METADATA_TIMEOUT: Duration = Duration::from_millis(250);

/// Resolves the hostname reported with submitted events.
///
/// With `use_discovery` set, probes the instance metadata service for the
/// instance id and falls back to the local hostname on any failure. Called
/// once at client construction; the result never changes afterwards.
pub async fn resolve_host(use_discovery: bool) -> String {
    if use_discovery {
        if let Some(instance_id) = discover_instance_id().await {
            debug!(host = %instance_id, "using discovered instance id as host");
            return instance_id;
        }
        debug!("instance metadata unavailable, falling back to local hostname");
    }
    local_hostname()
}

async fn discover_instance_id() -> Option<String> {
    let client = reqwest::Client::builder()
        .timeout(METADATA_TIMEOUT)
        .build()
        .ok()?;
    let response = client.get(METADATA_INSTANCE_ID_URL).send().await.ok()?;
    if !response.status().is_success() {
        return None;
    }
    let instance_id = response.text().await.ok()?;
    let instance_id = instance_id.trim().to_owned();
    (!instance_id.is_empty()).then_some(instance_id)
}

fn local_hostname() -> String {
    sysinfo::System::host_name()
        .or_else(|| env::var("HOSTNAME").ok())
        .unwrap_or_else(|| "localhost".to_owned())
}

#[cfg(test)]
mod tests {
    use super::{local_hostname, resolve_host};

    #[test]
    fn local_hostname_is_never_empty() {
        assert!(!local_hostname().is_empty());
    }

    #[tokio::test]
    async fn discovery_disabled_uses_local_hostname() {
        assert_eq!(resolve_host(false).await, local_hostname());
    }
}
