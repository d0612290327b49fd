//! HTTP response shapes.
//!
//! Entities serialize with RFC-3339 UTC timestamps; nullable fields are
//! omitted entirely when absent.

use chrono::{DateTime, SecondsFormat, Utc};
use serde::Serialize;

use subtrack_types::{Subscription, SubscriptionType};

fn rfc3339(value: &DateTime<Utc>) -> String {
    value.to_rfc3339_opts(SecondsFormat::Secs, true)
}

/// Subscription as it appears in every HTTP response
#[derive(Debug, Serialize)]
pub struct SubscriptionDto {
    pub id: u64,
    pub subscription_type_id: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub user_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    pub status: i32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub start_at: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub end_at: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub renew_at: Option<String>,
    pub auto_renew: bool,
    pub created_at: String,
    pub updated_at: String,
}

impl From<&Subscription> for SubscriptionDto {
    fn from(sub: &Subscription) -> Self {
        Self {
            id: sub.id,
            subscription_type_id: sub.subscription_type_id,
            user_id: sub.user_id.clone(),
            email: sub.email.clone(),
            status: sub.status.code(),
            start_at: sub.start_at.as_ref().map(rfc3339),
            end_at: sub.end_at.as_ref().map(rfc3339),
            renew_at: sub.renew_at.as_ref().map(rfc3339),
            auto_renew: sub.auto_renew,
            created_at: rfc3339(&sub.created_at),
            updated_at: rfc3339(&sub.updated_at),
        }
    }
}

/// Catalog entry as it appears in HTTP responses
#[derive(Debug, Serialize)]
pub struct SubscriptionTypeDto {
    pub id: u64,
    #[serde(rename = "type")]
    pub type_code: String,
    pub display_name: String,
    pub status: i32,
    pub created_at: String,
    pub updated_at: String,
}

impl From<&SubscriptionType> for SubscriptionTypeDto {
    fn from(item: &SubscriptionType) -> Self {
        Self {
            id: item.id,
            type_code: item.type_code.clone(),
            display_name: item.display_name.clone(),
            status: item.status,
            created_at: rfc3339(&item.created_at),
            updated_at: rfc3339(&item.updated_at),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use subtrack_types::SubscriptionStatus;

    fn sample() -> Subscription {
        Subscription {
            id: 3,
            subscription_type_id: 1,
            user_id: Some("u1".to_string()),
            email: None,
            status: SubscriptionStatus::Active,
            start_at: None,
            end_at: None,
            renew_at: None,
            auto_renew: false,
            created_at: Utc.with_ymd_and_hms(2026, 1, 1, 0, 0, 0).unwrap(),
            updated_at: Utc.with_ymd_and_hms(2026, 1, 2, 12, 30, 0).unwrap(),
        }
    }

    #[test]
    fn absent_optional_fields_are_omitted() {
        let json = serde_json::to_value(SubscriptionDto::from(&sample())).unwrap();
        let obj = json.as_object().unwrap();
        assert!(obj.contains_key("user_id"));
        assert!(!obj.contains_key("email"));
        assert!(!obj.contains_key("start_at"));
        assert!(!obj.contains_key("end_at"));
        assert!(!obj.contains_key("renew_at"));
    }

    #[test]
    fn timestamps_serialize_as_rfc3339_utc() {
        let json = serde_json::to_value(SubscriptionDto::from(&sample())).unwrap();
        assert_eq!(json["created_at"], "2026-01-01T00:00:00Z");
        assert_eq!(json["updated_at"], "2026-01-02T12:30:00Z");
        assert_eq!(json["status"], 10);
    }
}
