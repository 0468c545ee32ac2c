use chrono::{DateTime, NaiveDateTime, Utc};
use serde::{Deserialize, Serialize};

/// A single notification as exchanged with the notification service
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Notification {
    /// Server-assigned identifier, stable across fetch and push
    pub id: i64,
    /// Owning user, implied by channel scoping
    #[serde(default, alias = "recipient_id", skip_serializing_if = "Option::is_none")]
    pub recipient_id: Option<i64>,
    pub title: String,
    #[serde(default)]
    pub message: String,
    /// ISO 8601 timestamp, kept verbatim for display
    #[serde(default, alias = "created_at")]
    pub created_at: String,
    #[serde(rename = "type", default)]
    pub kind: NotificationKind,
    #[serde(default)]
    pub read: bool,
}

/// Closed set of notification categories
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum NotificationKind {
    #[default]
    Info,
    Success,
    Warning,
    Error,
    NewApplication,
    ShiftReminder,
    ReportDue,
    InterviewScheduled,
}

/// Display level a notification kind renders as
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Severity {
    Info,
    Success,
    Warning,
    Error,
}

impl NotificationKind {
    /// Domain subtypes display like `info`
    pub fn severity(&self) -> Severity {
        match self {
            NotificationKind::Success => Severity::Success,
            NotificationKind::Warning => Severity::Warning,
            NotificationKind::Error => Severity::Error,
            NotificationKind::Info
            | NotificationKind::NewApplication
            | NotificationKind::ShiftReminder
            | NotificationKind::ReportDue
            | NotificationKind::InterviewScheduled => Severity::Info,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            NotificationKind::Info => "info",
            NotificationKind::Success => "success",
            NotificationKind::Warning => "warning",
            NotificationKind::Error => "error",
            NotificationKind::NewApplication => "new_application",
            NotificationKind::ShiftReminder => "shift_reminder",
            NotificationKind::ReportDue => "report_due",
            NotificationKind::InterviewScheduled => "interview_scheduled",
        }
    }
}

impl Notification {
    pub fn new(id: i64, title: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            id,
            recipient_id: None,
            title: title.into(),
            message: message.into(),
            created_at: String::new(),
            kind: NotificationKind::default(),
            read: false,
        }
    }

    pub fn with_kind(mut self, kind: NotificationKind) -> Self {
        self.kind = kind;
        self
    }

    pub fn with_read(mut self, read: bool) -> Self {
        self.read = read;
        self
    }

    pub fn with_created_at(mut self, created_at: impl Into<String>) -> Self {
        self.created_at = created_at.into();
        self
    }

    /// Parse `created_at` as RFC 3339, or as a naive timestamp taken to be UTC
    pub fn created_at_utc(&self) -> Option<DateTime<Utc>> {
        let raw = self.created_at.trim();
        if raw.is_empty() {
            return None;
        }

        if let Ok(ts) = DateTime::parse_from_rfc3339(raw) {
            return Some(ts.with_timezone(&Utc));
        }

        NaiveDateTime::parse_from_str(raw, "%Y-%m-%dT%H:%M:%S%.f")
            .ok()
            .map(|naive| naive.and_utc())
    }
}
