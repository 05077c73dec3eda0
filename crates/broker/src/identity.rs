//! Client identity

use chrono::Utc;
use contracts::CLIENT_ID_PREFIX;

/// `mqtt-ibsms-<unix nanos>`, unique per process start
pub fn generate_client_id() -> String {
    let nanos = Utc::now()
        .timestamp_nanos_opt()
        .unwrap_or_else(|| Utc::now().timestamp_micros() * 1000);
    format!("{CLIENT_ID_PREFIX}{nanos}")
}
