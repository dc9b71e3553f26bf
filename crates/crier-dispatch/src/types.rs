//! Dispatcher domain types.

use chrono::NaiveDateTime;

/// Timestamp format used in schedule cells, e.g. `14.02.2025 09:30`.
pub const SCHEDULE_FORMAT: &str = "%d.%m.%Y %H:%M";

/// One scheduled post, read from a single ledger row.
///
/// Immutable within a pass.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScheduledPost {
    /// 1-based row number in the schedule sheet, stable across a pass.
    pub row_index: u32,
    /// When the post becomes due (sheet-local time).
    pub scheduled_at: NaiveDateTime,
    /// Link to the document holding the post text.
    pub document_ref: Option<String>,
    /// URL of an image to attach.
    pub media_url: Option<String>,
    /// Destination names, in dispatch order.
    pub destination_names: Vec<String>,
}

/// A publish destination resolved from the directory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Destination {
    /// Unique name the schedule rows refer to.
    pub name: String,
    pub kind: DestinationKind,
    /// Destination-side id: chat id, wall owner id or group id.
    pub external_id: String,
}

/// Closed set of destination kinds.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DestinationKind {
    Telegram,
    Vk,
    Ok,
}

impl DestinationKind {
    /// Parse a directory kind tag. Both the short (`TG`/`VK`/`OK`) and the
    /// long (`Telegram`/`ВКонтакте`/`Одноклассники`) dialects appear in
    /// real sheets.
    pub fn parse(tag: &str) -> Option<Self> {
        match tag.trim() {
            "TG" | "Telegram" => Some(Self::Telegram),
            "VK" | "ВКонтакте" => Some(Self::Vk),
            "OK" | "Одноклассники" => Some(Self::Ok),
            _ => None,
        }
    }
}

/// Result of one publish attempt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeliveryOutcome {
    /// External id of the destination (or its unresolved name when the
    /// directory lookup failed).
    pub destination_id: String,
    pub status: DeliveryStatus,
    /// Canonical link to the published post, on success.
    pub link: Option<String>,
}

/// Success or failure of a publish attempt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DeliveryStatus {
    Success,
    Error(String),
}

impl DeliveryStatus {
    pub fn is_success(&self) -> bool {
        matches!(self, Self::Success)
    }

    /// Cell value written to the status column.
    pub fn as_cell(&self) -> String {
        match self {
            Self::Success => "Success".to_string(),
            Self::Error(message) => format!("Error: {}", message),
        }
    }
}
