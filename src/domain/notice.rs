use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use time::{Date, Time};
use uuid::Uuid;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Notice {
    pub id: Uuid,
    pub title: String,
    pub description: String,
    pub category: NoticeCategory,
    pub post_date: Date,
    pub event_date: Option<Date>,
    pub event_start_time: Option<Time>,
    pub event_end_time: Option<Time>,
}

/// Mutable portion of a notice; `post_date` is stamped at creation and never
/// replaced on update.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NoticeFields {
    pub title: String,
    pub description: String,
    pub category: NoticeCategory,
    pub event_date: Option<Date>,
    pub event_start_time: Option<Time>,
    pub event_end_time: Option<Time>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum NoticeCategory {
    #[serde(rename = "Maintenance")]
    Maintenance,
    #[serde(rename = "Rent/Sell")]
    RentSell,
    #[serde(rename = "Meeting")]
    Meeting,
    #[serde(rename = "Event")]
    Event,
    #[serde(rename = "Lost & Found")]
    LostFound,
    #[serde(rename = "General Announcement")]
    Announcement,
    #[serde(rename = "Security Alert")]
    Security,
    #[serde(rename = "Visitor Information")]
    Visitor,
    #[serde(rename = "Payment Reminder")]
    Payment,
    #[serde(rename = "Service")]
    Service,
    #[serde(rename = "Emergency")]
    Emergency,
    #[serde(rename = "Other")]
    Other,
}

impl NoticeCategory {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Maintenance => "Maintenance",
            Self::RentSell => "Rent/Sell",
            Self::Meeting => "Meeting",
            Self::Event => "Event",
            Self::LostFound => "Lost & Found",
            Self::Announcement => "General Announcement",
            Self::Security => "Security Alert",
            Self::Visitor => "Visitor Information",
            Self::Payment => "Payment Reminder",
            Self::Service => "Service",
            Self::Emergency => "Emergency",
            Self::Other => "Other",
        }
    }
}

impl fmt::Display for NoticeCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for NoticeCategory {
    type Err = UnknownCategory;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "Maintenance" => Ok(Self::Maintenance),
            "Rent/Sell" => Ok(Self::RentSell),
            "Meeting" => Ok(Self::Meeting),
            "Event" => Ok(Self::Event),
            "Lost & Found" => Ok(Self::LostFound),
            "General Announcement" => Ok(Self::Announcement),
            "Security Alert" => Ok(Self::Security),
            "Visitor Information" => Ok(Self::Visitor),
            "Payment Reminder" => Ok(Self::Payment),
            "Service" => Ok(Self::Service),
            "Emergency" => Ok(Self::Emergency),
            "Other" => Ok(Self::Other),
            other => Err(UnknownCategory(other.to_string())),
        }
    }
}

#[derive(Debug, thiserror::Error)]
#[error("unknown notice category: {0}")]
pub struct UnknownCategory(pub String);
