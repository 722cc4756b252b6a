// src/models/notification.rs
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::timestamp;

/// What a notification is about. Newer backends send it as `kind`; for older
/// ones it is derived from the title while the notification is parsed.
#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum NotificationKind {
    RequestApproved,
    RequestDenied,
    ReturnRequest,
    ReturnConfirmed,
    OverdueReturn,
    ReturnDueSoon,
    #[serde(other)]
    Other,
}

impl NotificationKind {
    pub fn from_title(title: &str) -> Self {
        match title.trim() {
            "Request Approved" => NotificationKind::RequestApproved,
            "Request Denied" => NotificationKind::RequestDenied,
            "Return Request" => NotificationKind::ReturnRequest,
            "Return Confirmed" => NotificationKind::ReturnConfirmed,
            "Overdue Return" | "Overdue Alert" => NotificationKind::OverdueReturn,
            "Return Due Soon" => NotificationKind::ReturnDueSoon,
            _ => NotificationKind::Other,
        }
    }
}

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
#[serde(rename_all = "camelCase", from = "NotificationRecord")]
pub struct Notification {
    #[serde(rename = "_id")]
    pub id: String,
    pub title: String,
    pub message: String,
    pub read: bool,
    pub kind: NotificationKind,
    #[serde(with = "timestamp::option")]
    pub created_at: Option<DateTime<Utc>>,
}

/// Wire shape; `kind` is optional here and resolved on conversion.
#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct NotificationRecord {
    #[serde(rename = "_id", alias = "id")]
    id: String,
    title: String,
    #[serde(default)]
    message: String,
    #[serde(default)]
    read: bool,
    #[serde(default)]
    kind: Option<NotificationKind>,
    #[serde(default, with = "timestamp::option")]
    created_at: Option<DateTime<Utc>>,
}

impl From<NotificationRecord> for Notification {
    fn from(record: NotificationRecord) -> Self {
        let kind = record
            .kind
            .unwrap_or_else(|| NotificationKind::from_title(&record.title));
        Self {
            id: record.id,
            title: record.title,
            message: record.message,
            read: record.read,
            kind,
            created_at: record.created_at,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct MarkRead {
    pub read: bool,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn derives_kind_from_legacy_titles() {
        assert_eq!(NotificationKind::from_title("Overdue Alert"), NotificationKind::OverdueReturn);
        assert_eq!(NotificationKind::from_title("Overdue Return"), NotificationKind::OverdueReturn);
        assert_eq!(NotificationKind::from_title("Return Due Soon"), NotificationKind::ReturnDueSoon);
        assert_eq!(NotificationKind::from_title("Welcome!"), NotificationKind::Other);
    }

    #[test]
    fn server_tag_wins_over_title() {
        let n: Notification = serde_json::from_value(json!({
            "_id": "n1",
            "title": "Your request was approved",
            "message": "Oscilloscope x1",
            "kind": "request_approved"
        }))
        .unwrap();
        assert_eq!(n.kind, NotificationKind::RequestApproved);
        assert!(!n.read);

        let n: Notification = serde_json::from_value(json!({
            "_id": "n2", "title": "Request Denied", "read": true, "kind": "brand_new_kind"
        }))
        .unwrap();
        assert_eq!(n.kind, NotificationKind::Other);
    }

    #[test]
    fn legacy_title_is_resolved_when_parsed() {
        let n: Notification = serde_json::from_value(json!({
            "id": "n3",
            "title": "Overdue Alert",
            "createdAt": "2024-01-02T03:04:05Z"
        }))
        .unwrap();
        assert_eq!(n.kind, NotificationKind::OverdueReturn);
        assert!(n.created_at.is_some());

        // the resolved kind travels with the value from here on
        let echoed = serde_json::to_value(&n).unwrap();
        assert_eq!(echoed["kind"], "overdue_return");
        let back: Notification = serde_json::from_value(echoed).unwrap();
        assert_eq!(back, n);
    }
}
