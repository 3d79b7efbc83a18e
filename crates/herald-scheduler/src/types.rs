use chrono::{DateTime, Local};
use serde::{Deserialize, Serialize};

/// What a scheduled send delivers. Decided once at creation time and
/// consumed uniformly by the execute path.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum SendPayload {
    /// Plain text message.
    Text { body: String },

    /// Attachment referenced by an opaque path/handle, with `body` as caption.
    /// The caption may be empty.
    Media { body: String, path: String },
}

impl SendPayload {
    /// Build the payload variant from raw request fields. A present,
    /// non-empty media path wins; otherwise the send is plain text.
    pub fn new(body: String, media_path: Option<String>) -> Self {
        match media_path.filter(|p| !p.is_empty()) {
            Some(path) => SendPayload::Media { body, path },
            None => SendPayload::Text { body },
        }
    }

    pub fn body(&self) -> &str {
        match self {
            SendPayload::Text { body } | SendPayload::Media { body, .. } => body,
        }
    }
}

/// Lifecycle state of a scheduled send.
///
/// `Sent` and `Failed` are terminal for one-time sends. A recurring send
/// stays `Pending` across successful fires; only cancellation, an invalid
/// cron expression, or (in the default configuration) a delivery failure
/// moves it to `Failed`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SendStatus {
    /// Waiting for its fire time; the only status eligible for arming.
    Pending,
    /// Delivered (one-time sends only).
    Sent,
    /// Rejected before arming, or delivery failed.
    Failed,
}

impl std::fmt::Display for SendStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            SendStatus::Pending => "pending",
            SendStatus::Sent => "sent",
            SendStatus::Failed => "failed",
        };
        write!(f, "{s}")
    }
}

impl std::str::FromStr for SendStatus {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s {
            "pending" => Ok(SendStatus::Pending),
            "sent" => Ok(SendStatus::Sent),
            "failed" => Ok(SendStatus::Failed),
            other => Err(format!("unknown send status: {other}")),
        }
    }
}

/// A persisted scheduled send.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScheduledSend {
    /// UUID v4 string — primary key, assigned by the store at insert.
    pub id: String,
    /// Platform-specific recipient identifier (chat/contact id).
    pub destination: String,
    /// Text or media payload, fixed at creation.
    pub payload: SendPayload,
    /// When a one-time send fires, in the process-local time zone.
    /// Required for every record; once a cron expression is present it is
    /// not consulted again.
    pub scheduled_time: DateTime<Local>,
    /// Recurrence rule; required (and validated) when `repeat` is true.
    pub cron_expression: Option<String>,
    /// True for cron-driven recurring sends.
    pub repeat: bool,
    /// Current lifecycle state.
    pub status: SendStatus,
    /// Mirror of `status == Sent`, refreshed on every status write.
    pub sent: bool,
    /// Explanatory note recorded on failure.
    pub error: Option<String>,
    /// Most recent successful fire, updated on every fire of a recurring send.
    pub last_sent_at: Option<DateTime<Local>>,
    /// Set once at insert, immutable.
    pub created_at: DateTime<Local>,
}

/// Caller-facing request accepted by `SchedulerEngine::schedule_new`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScheduleRequest {
    pub destination: String,
    pub body: String,
    #[serde(default)]
    pub media_path: Option<String>,
    pub scheduled_time: DateTime<Local>,
    #[serde(default)]
    pub repeat: bool,
    #[serde(default)]
    pub cron_expression: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_round_trips_through_strings() {
        for status in [SendStatus::Pending, SendStatus::Sent, SendStatus::Failed] {
            let parsed: SendStatus = status.to_string().parse().unwrap();
            assert_eq!(parsed, status);
        }
        assert!("delivered".parse::<SendStatus>().is_err());
    }

    #[test]
    fn payload_picks_media_when_path_present() {
        let p = SendPayload::new("hi".into(), Some("/tmp/cat.png".into()));
        assert_eq!(
            p,
            SendPayload::Media {
                body: "hi".into(),
                path: "/tmp/cat.png".into()
            }
        );
    }

    #[test]
    fn payload_empty_media_path_is_text() {
        let p = SendPayload::new("hi".into(), Some(String::new()));
        assert_eq!(p, SendPayload::Text { body: "hi".into() });
    }

    #[test]
    fn payload_json_is_tagged() {
        let json = serde_json::to_string(&SendPayload::Text { body: "x".into() }).unwrap();
        assert!(json.contains(r#""kind":"text""#));
    }
}
