//! Synthetic payment events.

use chrono::Utc;
use parking_lot::Mutex;
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::{Rng, SeedableRng};

use crate::record::{PaymentMode, PaymentRecord, PaymentStatus, RecordLevel};

/// Service name stamped on generated records.
pub const SERVICE_NAME: &str = "PaymentService";

/// Produces random payment records.
#[derive(Debug)]
pub struct EventGenerator {
    rng: Mutex<StdRng>,
}

impl Default for EventGenerator {
    fn default() -> Self {
        Self::new()
    }
}

impl EventGenerator {
    /// Creates a generator seeded from the OS.
    #[must_use]
    pub fn new() -> Self {
        Self {
            rng: Mutex::new(StdRng::from_entropy()),
        }
    }

    /// Creates a deterministic generator.
    #[must_use]
    pub fn seeded(seed: u64) -> Self {
        Self {
            rng: Mutex::new(StdRng::seed_from_u64(seed)),
        }
    }

    /// Generates one record at a uniformly random level.
    pub fn generate(&self) -> PaymentRecord {
        let level = {
            let mut rng = self.rng.lock();
            RecordLevel::ALL
                .choose(&mut *rng)
                .copied()
                .unwrap_or(RecordLevel::Info)
        };
        self.generate_with_level(level)
    }

    /// Generates one record at the given level.
    pub fn generate_with_level(&self, level: RecordLevel) -> PaymentRecord {
        let mut rng = self.rng.lock();

        let mut bytes = [0u8; 16];
        rng.fill(&mut bytes);
        let amount: f64 = rng.gen_range(100.0..5100.0);
        let payment_mode = PaymentMode::ALL
            .choose(&mut *rng)
            .copied()
            .unwrap_or(PaymentMode::Upi);

        let (message, status, warning_detail, error_detail) = match level {
            RecordLevel::Info => (
                "User purchase processed successfully",
                PaymentStatus::Success,
                None,
                None,
            ),
            RecordLevel::Warn => (
                "User purchase processed with warnings: verification delayed",
                PaymentStatus::Pending,
                Some("Transaction verification is taking longer than expected".to_string()),
                None,
            ),
            RecordLevel::Error => (
                "User purchase failed due to payment gateway error",
                PaymentStatus::Error,
                None,
                Some("Gateway timeout or rejected transaction".to_string()),
            ),
        };

        PaymentRecord {
            service_name: SERVICE_NAME.to_string(),
            transaction_id: uuid::Builder::from_random_bytes(bytes).into_uuid(),
            user_id: format!("USR-{}", rng.gen_range(0..10_000)),
            order_id: format!("ORD-{}", rng.gen_range(0..100_000)),
            amount: format!("{amount:.2}"),
            payment_mode,
            timestamp: Utc::now(),
            level,
            message: message.to_string(),
            status,
            warning_detail,
            error_detail,
        }
    }
}
