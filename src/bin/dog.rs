use std::fmt;
use std::io::Read;
use std::time::Duration;

use anyhow::{bail, Context, Result};
use chrono::{DateTime, Utc};
use clap::{Args, Parser, Subcommand, ValueEnum};
use datadog_http::{ClientConfig, DatadogClient, Event, EventPriority, EventQuery};
use serde::Deserialize;
use serde_json::Value;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "dog", version, about = "Command-line client for the Datadog events API")]
struct Cli {
    /// API key used to authenticate requests.
    #[arg(long, env = "DATADOG_API_KEY", hide_env_values = true, global = true)]
    api_key: Option<String>,

    /// Application key sent alongside the API key.
    #[arg(long, env = "DATADOG_APPLICATION_KEY", hide_env_values = true, global = true)]
    application_key: Option<String>,

    /// API host, with or without a scheme prefix.
    #[arg(long, env = "DATADOG_HOST", global = true)]
    api_host: Option<String>,

    /// Per-request timeout in seconds.
    #[arg(long, global = true)]
    timeout: Option<u64>,

    /// Output format.
    #[arg(long, value_enum, default_value_t = OutputFormat::Plain, global = true)]
    format: OutputFormat,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Post events, show event details, and view the event stream.
    Event {
        #[command(subcommand)]
        command: EventCommand,
    },
}

#[derive(Subcommand)]
enum EventCommand {
    /// Post an event.
    Post(PostArgs),

    /// Show one event's details.
    Show {
        /// Event to show.
        event_id: u64,
    },

    /// View the event stream.
    Stream(StreamArgs),
}

#[derive(Args)]
struct PostArgs {
    /// Event title.
    title: String,

    /// Event message body. Read from stdin when omitted.
    message: Option<String>,

    /// POSIX timestamp of when the event occurred. Defaults to the current time.
    #[arg(long)]
    date_happened: Option<i64>,

    /// User to post as. If unset, submits as the generic API user.
    #[arg(long)]
    handle: Option<String>,

    /// "normal" or "low". Defaults to "normal".
    #[arg(long)]
    priority: Option<EventPriority>,

    /// Event to post as a child of. If unset, posts a top-level event.
    #[arg(long)]
    related_event_id: Option<u64>,

    /// Comma-separated list of tags.
    #[arg(long)]
    tags: Option<String>,
}

#[derive(Args)]
struct StreamArgs {
    /// Start of the stream window: a POSIX timestamp (e.g. the output of
    /// `date +%s`) or a period in the past such as "5m", "6h", "3d".
    start: String,

    /// End of the stream window, same formats. Defaults to now.
    end: Option<String>,

    /// Filter by priority, "normal" or "low".
    #[arg(long)]
    priority: Option<EventPriority>,

    /// Comma-separated list of sources to filter by.
    #[arg(long)]
    sources: Option<String>,

    /// Comma-separated list of tags to filter by.
    #[arg(long)]
    tags: Option<String>,
}

#[derive(Clone, Copy, PartialEq, Eq, ValueEnum)]
enum OutputFormat {
    Pretty,
    Raw,
    Plain,
}

impl fmt::Display for OutputFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Pretty => f.write_str("pretty"),
            Self::Raw => f.write_str("raw"),
            Self::Plain => f.write_str("plain"),
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .with_writer(std::io::stderr)
        .init();

    let client = build_client(&cli).await?;
    match cli.command {
        Commands::Event { command } => run_event(&client, command, cli.format).await,
    }
}

async fn build_client(cli: &Cli) -> Result<DatadogClient> {
    let api_key = cli
        .api_key
        .clone()
        .context("an API key is required; pass --api-key or set DATADOG_API_KEY")?;

    // Propagate failures: a transient timeout should abort the invocation
    // with a non-zero exit instead of being logged away.
    let mut config = ClientConfig::default()
        .with_api_key(api_key)
        .with_swallow(false);
    if let Some(application_key) = &cli.application_key {
        config = config.with_application_key(application_key);
    }
    if let Some(api_host) = &cli.api_host {
        config = config.with_api_host(api_host);
    }
    if let Some(timeout) = cli.timeout {
        config = config.with_timeout(Duration::from_secs(timeout));
    }
    Ok(DatadogClient::new(config).await)
}

async fn run_event(
    client: &DatadogClient,
    command: EventCommand,
    format: OutputFormat,
) -> Result<()> {
    match command {
        EventCommand::Post(args) => {
            let message = match args.message {
                Some(message) => message,
                None => read_stdin()?,
            };
            let mut event = Event::new(args.title, message);
            if let Some(date_happened) = args.date_happened {
                event = event.with_date_happened(date_happened);
            }
            if let Some(handle) = args.handle {
                event = event.with_handle(handle);
            }
            if let Some(priority) = args.priority {
                event = event.with_priority(priority);
            }
            if let Some(related_event_id) = args.related_event_id {
                event = event.with_related_event_id(related_event_id);
            }
            if let Some(tags) = args.tags {
                event = event.with_tags(split_list(&tags));
            }

            let response = require_response(client.post_event(event).await?)?;
            report_warnings(&response);
            print_event_response(&response, format)
        }
        EventCommand::Show { event_id } => {
            let response = require_response(client.get_event(event_id).await?)?;
            report_warnings(&response);
            print_event_response(&response, format)
        }
        EventCommand::Stream(args) => {
            let start = parse_time(Some(&args.start))?;
            let end = parse_time(args.end.as_deref())?;
            let mut query = EventQuery::new(start, end);
            if let Some(priority) = args.priority {
                query = query.with_priority(priority);
            }
            if let Some(sources) = args.sources {
                query = query.with_sources(split_list(&sources));
            }
            if let Some(tags) = args.tags {
                query = query.with_tags(split_list(&tags));
            }

            let response = require_response(client.event_stream(&query).await?)?;
            report_warnings(&response);
            print_stream_response(&response, format)
        }
    }
}

/// Fields of an API event payload the human-readable formats print.
#[derive(Debug, Default, Deserialize)]
struct EventView {
    #[serde(default)]
    title: Option<String>,
    #[serde(default)]
    handle: Option<String>,
    #[serde(default)]
    date_happened: Option<i64>,
    #[serde(default)]
    url: Option<String>,
}

fn print_event_response(response: &Value, format: OutputFormat) -> Result<()> {
    if format == OutputFormat::Raw {
        println!("{}", serde_json::to_string(response)?);
        return Ok(());
    }
    let view = event_view(response.get("event").cloned().unwrap_or_default())?;
    println!("{}", format_event(&view));
    Ok(())
}

fn print_stream_response(response: &Value, format: OutputFormat) -> Result<()> {
    if format == OutputFormat::Raw {
        println!("{}", serde_json::to_string(response)?);
        return Ok(());
    }
    let events = response
        .get("events")
        .and_then(Value::as_array)
        .cloned()
        .unwrap_or_default();
    for event in events {
        println!("{}\n", format_event(&event_view(event)?));
    }
    Ok(())
}

fn event_view(value: Value) -> Result<EventView> {
    serde_json::from_value(value).context("response event payload has an unexpected shape")
}

fn format_event(event: &EventView) -> String {
    let title = event.title.as_deref().unwrap_or("");
    let handle = event.handle.as_deref().unwrap_or("");
    let header = format!("{title} ({handle})");
    let timestamp = event
        .date_happened
        .and_then(|secs| DateTime::<Utc>::from_timestamp(secs, 0))
        .map(|date| date.format("%Y-%m-%d %H:%M:%S").to_string())
        .unwrap_or_default();
    let url = event.url.as_deref().unwrap_or("");
    format!("{}\n{timestamp} | {url}", header.trim())
}

fn report_warnings(response: &Value) {
    let Some(warnings) = response.get("warnings").and_then(Value::as_array) else {
        return;
    };
    for warning in warnings {
        match warning.as_str() {
            Some(text) => eprintln!("WARNING: {text}"),
            None => eprintln!("WARNING: {warning}"),
        }
    }
}

fn require_response(response: Option<Value>) -> Result<Value> {
    // Unreachable with swallow disabled, but the type says otherwise.
    response.context("request produced no response")
}

fn read_stdin() -> Result<String> {
    let mut message = String::new();
    std::io::stdin()
        .read_to_string(&mut message)
        .context("could not read the event message from stdin")?;
    Ok(message)
}

fn split_list(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(|item| item.trim().to_owned())
        .filter(|item| !item.is_empty())
        .collect()
}

fn parse_time(input: Option<&str>) -> Result<i64> {
    parse_time_at(input, Utc::now().timestamp())
}

/// Parses a POSIX timestamp or a relative period ("5m", "6h", "3d") counted
/// back from `now`.
fn parse_time_at(input: Option<&str>, now: i64) -> Result<i64> {
    let Some(raw) = input else {
        return Ok(now);
    };
    let raw = raw.trim();
    if let Ok(timestamp) = raw.parse::<i64>() {
        return Ok(timestamp);
    }
    let unit_secs = match raw.chars().last() {
        Some('m') => 60.0,
        Some('h') => 3600.0,
        Some('d') => 86400.0,
        _ => bail!("invalid time '{raw}': expected a POSIX timestamp or a period like '5m'"),
    };
    let magnitude: f64 = raw[..raw.len() - 1]
        .parse()
        .with_context(|| format!("invalid time '{raw}'"))?;
    Ok(now - (magnitude * unit_secs) as i64)
}

#[cfg(test)]
mod tests {
    use super::{format_event, parse_time_at, split_list, EventView};

    #[test]
    fn parse_time_defaults_to_now() {
        assert_eq!(parse_time_at(None, 1_700_000_000).expect("must parse"), 1_700_000_000);
    }

    #[test]
    fn parse_time_accepts_posix_timestamps() {
        assert_eq!(
            parse_time_at(Some("1699999999"), 1_700_000_000).expect("must parse"),
            1_699_999_999
        );
    }

    #[test]
    fn parse_time_accepts_relative_periods() {
        let now = 1_700_000_000;
        assert_eq!(parse_time_at(Some("5m"), now).expect("must parse"), now - 300);
        assert_eq!(parse_time_at(Some("6h"), now).expect("must parse"), now - 21_600);
        assert_eq!(parse_time_at(Some("3d"), now).expect("must parse"), now - 259_200);
        assert_eq!(parse_time_at(Some("0.5h"), now).expect("must parse"), now - 1_800);
    }

    #[test]
    fn parse_time_rejects_unknown_units() {
        assert!(parse_time_at(Some("5w"), 1_700_000_000).is_err());
        assert!(parse_time_at(Some("m"), 1_700_000_000).is_err());
    }

    #[test]
    fn format_event_prints_header_and_link_lines() {
        let view = EventView {
            title: Some("deploy".to_owned()),
            handle: Some("release-bot".to_owned()),
            date_happened: Some(0),
            url: Some("https://app.datadoghq.com/event/1".to_owned()),
        };
        assert_eq!(
            format_event(&view),
            "deploy (release-bot)\n1970-01-01 00:00:00 | https://app.datadoghq.com/event/1"
        );
    }

    #[test]
    fn format_event_trims_missing_handle() {
        let view = EventView {
            title: Some("deploy".to_owned()),
            ..EventView::default()
        };
        assert!(format_event(&view).starts_with("deploy ()"));
    }

    #[test]
    fn split_list_trims_and_drops_empties() {
        assert_eq!(
            split_list("env:prod, service:api ,"),
            vec!["env:prod".to_owned(), "service:api".to_owned()]
        );
    }
}
