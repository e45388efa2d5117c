use chrono::Duration;

/// Runtime settings shared by every request.
#[derive(Debug, Clone)]
pub struct Config {
    pub session_ttl: Duration,
    pub reset_code_ttl: Duration,
    pub cookie_secure: bool,
    pub mileage_rate_cents_per_km: i32,
    pub report_rows_per_page: usize,
}

impl Config {
    /// Sessions are extended once less than half of their lifetime is left.
    pub fn refresh_window(&self) -> Duration {
        self.session_ttl / 2
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            session_ttl: Duration::hours(8),
            reset_code_ttl: Duration::minutes(30),
            cookie_secure: false,
            mileage_rate_cents_per_km: 90,
            report_rows_per_page: 40,
        }
    }
}
