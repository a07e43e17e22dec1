use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use rust_decimal::prelude::ToPrimitive;

use crate::error::{ChartError, ChartResult};

pub fn decimal_to_f64(value: Decimal, field_name: &str) -> ChartResult<f64> {
    value.to_f64().ok_or_else(|| {
        ChartError::InvalidArgument(format!("{field_name} cannot be represented as f64"))
    })
}

/// Domain values for wall-clock series are Unix epoch milliseconds, matching
/// [`crate::core::TimeUnit::ms`].
#[must_use]
pub fn datetime_to_unix_millis(time: DateTime<Utc>) -> f64 {
    time.timestamp_millis() as f64
}

/// Rejects NaN and infinities with a message naming `field_name`.
pub fn ensure_finite(value: f64, field_name: &str) -> ChartResult<f64> {
    if value.is_finite() {
        Ok(value)
    } else {
        Err(ChartError::InvalidArgument(format!(
            "{field_name} must be finite"
        )))
    }
}
