use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Priority of a posted event.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EventPriority {
    Normal,
    Low,
}

impl fmt::Display for EventPriority {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Normal => f.write_str("normal"),
            Self::Low => f.write_str("low"),
        }
    }
}

impl FromStr for EventPriority {
    type Err = String;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "normal" => Ok(Self::Normal),
            "low" => Ok(Self::Low),
            other => Err(format!("unknown priority '{other}', expected 'normal' or 'low'")),
        }
    }
}

/// Body of a `POST events` request.
///
/// Optional fields are omitted from the JSON payload entirely; the API fills
/// in its own defaults (current time, generic handle, normal priority).
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct Event {
    /// Event title.
    pub title: String,
    /// Event message body.
    pub text: String,
    /// POSIX timestamp of when the event happened.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub date_happened: Option<i64>,
    /// User handle to post as.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub handle: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub priority: Option<EventPriority>,
    /// Parent event id, for posting a child event.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub related_event_id: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tags: Option<Vec<String>>,
    /// Host the event is attributed to. Left unset, the client fills in its
    /// resolved default host before posting.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub host: Option<String>,
}

impl Event {
    /// Creates an event with a title and message body.
    pub fn new(title: impl Into<String>, text: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            text: text.into(),
            date_happened: None,
            handle: None,
            priority: None,
            related_event_id: None,
            tags: None,
            host: None,
        }
    }

    /// Sets the occurrence timestamp.
    pub fn with_date_happened(mut self, date_happened: i64) -> Self {
        self.date_happened = Some(date_happened);
        self
    }

    /// Sets the posting handle.
    pub fn with_handle(mut self, handle: impl Into<String>) -> Self {
        self.handle = Some(handle.into());
        self
    }

    /// Sets the priority.
    pub fn with_priority(mut self, priority: EventPriority) -> Self {
        self.priority = Some(priority);
        self
    }

    /// Posts the event as a child of another event.
    pub fn with_related_event_id(mut self, related_event_id: u64) -> Self {
        self.related_event_id = Some(related_event_id);
        self
    }

    /// Sets the tag list.
    pub fn with_tags<I, T>(mut self, tags: I) -> Self
    where
        I: IntoIterator<Item = T>,
        T: Into<String>,
    {
        self.tags = Some(tags.into_iter().map(Into::into).collect());
        self
    }

    /// Attributes the event to a specific host.
    pub fn with_host(mut self, host: impl Into<String>) -> Self {
        self.host = Some(host.into());
        self
    }
}

/// Time window and filters for a `GET events` stream request.
#[derive(Clone, Debug, PartialEq)]
pub struct EventQuery {
    /// Window start, POSIX seconds.
    pub start: i64,
    /// Window end, POSIX seconds.
    pub end: i64,
    pub priority: Option<EventPriority>,
    pub sources: Option<Vec<String>>,
    pub tags: Option<Vec<String>>,
}

impl EventQuery {
    /// Creates an unfiltered query over `[start, end]`.
    pub fn new(start: i64, end: i64) -> Self {
        Self {
            start,
            end,
            priority: None,
            sources: None,
            tags: None,
        }
    }

    /// Filters by priority.
    pub fn with_priority(mut self, priority: EventPriority) -> Self {
        self.priority = Some(priority);
        self
    }

    /// Filters by event sources.
    pub fn with_sources<I, T>(mut self, sources: I) -> Self
    where
        I: IntoIterator<Item = T>,
        T: Into<String>,
    {
        self.sources = Some(sources.into_iter().map(Into::into).collect());
        self
    }

    /// Filters by tags.
    pub fn with_tags<I, T>(mut self, tags: I) -> Self
    where
        I: IntoIterator<Item = T>,
        T: Into<String>,
    {
        self.tags = Some(tags.into_iter().map(Into::into).collect());
        self
    }

    /// Flattens the query into URL parameters. List filters are comma-joined.
    pub(crate) fn query_params(&self) -> Vec<(String, String)> {
        let mut params = vec![
            ("start".to_owned(), self.start.to_string()),
            ("end".to_owned(), self.end.to_string()),
        ];
        if let Some(priority) = self.priority {
            params.push(("priority".to_owned(), priority.to_string()));
        }
        if let Some(sources) = &self.sources {
            params.push(("sources".to_owned(), sources.join(",")));
        }
        if let Some(tags) = &self.tags {
            params.push(("tags".to_owned(), tags.join(",")));
        }
        params
    }
}
