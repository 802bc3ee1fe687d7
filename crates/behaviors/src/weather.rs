//! Weather report via the wttr.in JSON API.

use std::time::Duration;

use mochi_engine::{Behavior, BehaviorContext, BehaviorError, RunFuture};
use serde::Deserialize;

const DEFAULT_ENDPOINT: &str = "https://wttr.in";
const REQUEST_TIMEOUT: Duration = Duration::from_secs(10);

#[derive(Debug, Deserialize)]
pub(crate) struct WttrReply {
    current_condition: Vec<CurrentCondition>,
}

#[derive(Debug, Deserialize)]
struct CurrentCondition {
    #[serde(rename = "temp_C")]
    temp_c: String,
    #[serde(rename = "weatherDesc")]
    desc: Vec<DescEntry>,
}

#[derive(Debug, Deserialize)]
struct DescEntry {
    value: String,
}

/// One speech-bubble line from a weather reply, or `None` if the payload
/// carried no current condition.
pub(crate) fn summarize(reply: &WttrReply) -> Option<String> {
    let current = reply.current_condition.first()?;
    let desc = current
        .desc
        .first()
        .map(|d| d.value.trim().to_lowercase())
        .unwrap_or_else(|| "something unclassifiable".to_owned());
    Some(format!(
        "It's {} degrees outside, {}.",
        current.temp_c, desc
    ))
}

/// Looks up the current weather and reports it. Network-bound, so it carries
/// a tight watchdog override on top of the request timeout.
pub struct WeatherReport {
    client: reqwest::Client,
    endpoint: String,
}

impl WeatherReport {
    pub fn new() -> Self {
        Self::with_endpoint(DEFAULT_ENDPOINT)
    }

    /// Point at a different wttr-compatible endpoint (tests, mirrors).
    pub fn with_endpoint(endpoint: impl Into<String>) -> Self {
        Self {
            client: reqwest::Client::new(),
            endpoint: endpoint.into(),
        }
    }
}

impl Default for WeatherReport {
    fn default() -> Self {
        Self::new()
    }
}

impl Behavior for WeatherReport {
    fn id(&self) -> &str {
        "weather"
    }

    fn display_name(&self) -> &str {
        "Check the weather"
    }

    fn cooldown_secs(&self) -> u64 {
        1800
    }

    fn max_duration_secs(&self) -> Option<u64> {
        Some(20)
    }

    fn can_run(&self, _ctx: &BehaviorContext) -> bool {
        true
    }

    fn run(&self, ctx: BehaviorContext) -> RunFuture {
        let client = self.client.clone();
        let url = format!("{}/?format=j1", self.endpoint);
        Box::pin(async move {
            let reply = client
                .get(&url)
                .timeout(REQUEST_TIMEOUT)
                .send()
                .await
                .and_then(reqwest::Response::error_for_status)
                .map_err(anyhow::Error::from)?
                .json::<WttrReply>()
                .await
                .map_err(anyhow::Error::from)?;

            let line = summarize(&reply)
                .ok_or_else(|| BehaviorError::Failed("weather reply had no current condition".into()))?;
            tracing::debug!(%line, "weather summary ready");
            ctx.speech().say(&line);
            Ok(())
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = r#"{
        "current_condition": [
            {
                "temp_C": "18",
                "weatherDesc": [{ "value": "Partly cloudy" }]
            }
        ]
    }"#;

    #[test]
    fn summarize_sample_payload() {
        let reply: WttrReply = serde_json::from_str(SAMPLE).unwrap();
        assert_eq!(
            summarize(&reply).unwrap(),
            "It's 18 degrees outside, partly cloudy."
        );
    }

    #[test]
    fn summarize_empty_payload() {
        let reply: WttrReply = serde_json::from_str(r#"{"current_condition": []}"#).unwrap();
        assert!(summarize(&reply).is_none());
    }

    #[test]
    fn metadata() {
        let weather = WeatherReport::new();
        assert_eq!(weather.id(), "weather");
        assert_eq!(weather.cooldown_secs(), 1800);
        assert_eq!(weather.max_duration_secs(), Some(20));
    }
}
