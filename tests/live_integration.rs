//! Opt-in smoke test against the real API.
//!
//! Runs only when `DATADOG_API_KEY` is set; skips silently otherwise so the
//! suite stays green offline. The stream check additionally needs
//! `DATADOG_APPLICATION_KEY`.

use std::time::{SystemTime, UNIX_EPOCH};

use datadog_http::{ClientConfig, DatadogClient, Event, EventQuery};

fn live_config() -> Option<ClientConfig> {
    let api_key = std::env::var("DATADOG_API_KEY")
        .ok()
        .filter(|key| !key.trim().is_empty())?;
    let mut config = ClientConfig::default()
        .with_api_key(api_key)
        .with_swallow(false);
    if let Some(application_key) = std::env::var("DATADOG_APPLICATION_KEY")
        .ok()
        .filter(|key| !key.trim().is_empty())
    {
        config = config.with_application_key(application_key);
    }
    Some(config)
}

fn unix_now() -> i64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .expect("clock must be past the epoch")
        .as_secs() as i64
}

#[tokio::test]
async fn post_and_stream_events_live() {
    let Some(config) = live_config() else {
        eprintln!("skipping live test: DATADOG_API_KEY is not set");
        return;
    };
    let has_application_key = config.application_key.is_some();
    let client = DatadogClient::new(config).await;
    let started = unix_now();

    let response = client
        .post_event(Event::new(
            "datadog-http live test",
            "posted by tests/live_integration.rs",
        ))
        .await
        .expect("post must succeed")
        .expect("response must not be swallowed");
    assert!(response.get("event").is_some() || response.get("status").is_some());

    if has_application_key {
        let stream = client
            .event_stream(&EventQuery::new(started - 600, unix_now()))
            .await
            .expect("stream must succeed")
            .expect("response must not be swallowed");
        assert!(stream.get("events").is_some());
    }
}
