//! Payment records written to the watched log.

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Severity of a record, ordered from least to most severe.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RecordLevel {
    /// Normal operation
    Info,
    /// Something needs attention
    Warn,
    /// Something failed
    Error,
}

impl RecordLevel {
    /// All levels, in severity order.
    pub const ALL: [Self; 3] = [Self::Info, Self::Warn, Self::Error];

    /// Returns the lowercase name.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Info => "info",
            Self::Warn => "warn",
            Self::Error => "error",
        }
    }
}

impl fmt::Display for RecordLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// How the customer paid.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum PaymentMode {
    /// Unified Payments Interface
    #[serde(rename = "UPI")]
    Upi,
    /// Credit card
    CreditCard,
    /// Net banking
    NetBanking,
}

impl PaymentMode {
    /// All payment modes.
    pub const ALL: [Self; 3] = [Self::Upi, Self::CreditCard, Self::NetBanking];
}

/// Outcome of a payment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum PaymentStatus {
    /// Processed
    Success,
    /// Awaiting verification
    Pending,
    /// Rejected
    Error,
}

/// One payment event as written to the log.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PaymentRecord {
    /// Emitting service
    pub service_name: String,
    /// Unique transaction identifier
    pub transaction_id: Uuid,
    /// Customer, `USR-<n>`
    pub user_id: String,
    /// Order, `ORD-<n>`
    pub order_id: String,
    /// Amount with two decimals
    pub amount: String,
    /// Payment method
    pub payment_mode: PaymentMode,
    /// When the event happened
    pub timestamp: DateTime<Utc>,
    /// Severity
    pub level: RecordLevel,
    /// Human-readable summary
    pub message: String,
    /// Outcome
    pub status: PaymentStatus,
    /// Present on warnings
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub warning_detail: Option<String>,
    /// Present on errors
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error_detail: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use test_case::test_case;

    #[test_case(RecordLevel::Info, "\"info\"")]
    #[test_case(RecordLevel::Warn, "\"warn\"")]
    #[test_case(RecordLevel::Error, "\"error\"")]
    fn level_serialization(level: RecordLevel, expected: &str) {
        assert_eq!(serde_json::to_string(&level).unwrap(), expected);
        assert_eq!(level.to_string(), expected.trim_matches('"'));
    }

    #[test_case(PaymentMode::Upi, "\"UPI\"")]
    #[test_case(PaymentMode::CreditCard, "\"CreditCard\"")]
    #[test_case(PaymentMode::NetBanking, "\"NetBanking\"")]
    fn payment_mode_serialization(mode: PaymentMode, expected: &str) {
        assert_eq!(serde_json::to_string(&mode).unwrap(), expected);
    }

    #[test]
    fn levels_are_ordered() {
        assert!(RecordLevel::Info < RecordLevel::Warn);
        assert!(RecordLevel::Warn < RecordLevel::Error);
    }

    #[test]
    fn record_uses_camel_case_and_skips_empty_details() {
        let record = PaymentRecord {
            service_name: "PaymentService".to_string(),
            transaction_id: Uuid::nil(),
            user_id: "USR-1".to_string(),
            order_id: "ORD-2".to_string(),
            amount: "100.00".to_string(),
            payment_mode: PaymentMode::Upi,
            timestamp: Utc::now(),
            level: RecordLevel::Info,
            message: "ok".to_string(),
            status: PaymentStatus::Success,
            warning_detail: None,
            error_detail: None,
        };

        let json = serde_json::to_value(&record).unwrap();
        assert_eq!(json["serviceName"], "PaymentService");
        assert_eq!(json["paymentMode"], "UPI");
        assert_eq!(json["status"], "SUCCESS");
        assert!(json.get("warningDetail").is_none());
        assert!(json.get("errorDetail").is_none());
    }
}
