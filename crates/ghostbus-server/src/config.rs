//! Server configuration

use ghostbus_detector::DetectorConfig;

fn env_parse<T: std::str::FromStr>(key: &str, default: T) -> T {
    std::env::var(key)
        .ok()
        .and_then(|s| s.parse().ok())
        .unwrap_or(default)
}

/// Server configuration
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// WebSocket port for the live detection stream
    pub ws_port: u16,
    /// Seconds between feed poll cycles
    pub feed_interval_seconds: u64,
    /// Per-subscriber outbound buffer, in messages
    pub broadcast_buffer: usize,
    /// Vehicles in the built-in simulated feed
    pub simulated_vehicles: usize,
    /// Detection engine tunables
    pub detector: DetectorConfig,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            ws_port: 9090,
            feed_interval_seconds: 10,
            broadcast_buffer: 64,
            simulated_vehicles: 8,
            detector: DetectorConfig::default(),
        }
    }
}

impl ServerConfig {
    /// Load configuration from environment variables
    pub fn from_env() -> Self {
        dotenvy::dotenv().ok();

        let defaults = DetectorConfig::default();
        let detector = DetectorConfig {
            stale_threshold_seconds: env_parse(
                "STALE_THRESHOLD_SECONDS",
                defaults.stale_threshold_seconds,
            ),
            stationary_threshold_seconds: env_parse(
                "STATIONARY_THRESHOLD_SECONDS",
                defaults.stationary_threshold_seconds,
            ),
            stationary_radius_km: env_parse("STATIONARY_RADIUS_KM", defaults.stationary_radius_km),
            off_route_threshold_km: env_parse(
                "OFF_ROUTE_THRESHOLD_KM",
                defaults.off_route_threshold_km,
            ),
            history_ttl_seconds: env_parse("HISTORY_TTL_SECONDS", defaults.history_ttl_seconds),
            history_window_size: env_parse("HISTORY_WINDOW_SIZE", defaults.history_window_size),
            recurring_flag_threshold: env_parse(
                "RECURRING_FLAG_THRESHOLD",
                defaults.recurring_flag_threshold,
            ),
            recurring_lookback_days: env_parse(
                "RECURRING_LOOKBACK_DAYS",
                defaults.recurring_lookback_days,
            ),
        };

        Self {
            ws_port: env_parse("WS_PORT", 9090),
            feed_interval_seconds: env_parse("FEED_INTERVAL_SECONDS", 10),
            broadcast_buffer: env_parse("BROADCAST_BUFFER", 64),
            simulated_vehicles: env_parse("SIMULATED_VEHICLES", 8),
            detector,
        }
    }
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = ServerConfig::default();
        assert_eq!(config.ws_port, 9090);
        assert_eq!(config.detector.stale_threshold_seconds, 300.0);
        assert_eq!(config.detector.history_window_size, 50);
        assert_eq!(config.detector.recurring_flag_threshold, 5);
    }

    #[test]
    fn test_env_parse_fallback() {
        // Unset or garbage values fall back to the default
        assert_eq!(env_parse("GHOSTBUS_TEST_UNSET_KEY", 42_u16), 42);
    }
}
