use std::env;
use std::net::{IpAddr, Ipv4Addr, Ipv6Addr, SocketAddr};

use tracing::{info, warn};

use crate::footprint::FootprintOptions;
use crate::mesh::DEFAULT_EDGE_THRESHOLD_DEG;
use crate::ordering::{DoorDirection, OrderingConfig, SortOrder};

/// Complete application configuration, loaded from environment variables or default values.
#[derive(Clone, Debug)]
pub struct AppConfig {
    pub api: ApiConfig,
    pub geometry: GeometryConfig,
    pub scene: SceneConfig,
    pub ordering: OrderingDefaults,
}

impl AppConfig {
    /// Creates a configuration from the currently available environment variables.
    pub fn from_env() -> Self {
        Self {
            api: ApiConfig::from_env(),
            geometry: GeometryConfig::from_env(),
            scene: SceneConfig::from_env(),
            ordering: OrderingDefaults::from_env(),
        }
    }
}

/// Configuration for the API server.
#[derive(Clone, Debug)]
pub struct ApiConfig {
    bind_ip: IpAddr,
    display_host: String,
    port: u16,
}

impl ApiConfig {
    const DEFAULT_HOST: &'static str = "0.0.0.0";
    const DEFAULT_PORT: u16 = 8080;
    const HOST_VAR: &'static str = "PACK_PLANNER_API_HOST";
    const PORT_VAR: &'static str = "PACK_PLANNER_API_PORT";

    fn from_env() -> Self {
        let host_value =
            env_string(Self::HOST_VAR).unwrap_or_else(|| Self::DEFAULT_HOST.to_string());
        let (bind_ip, effective_host) = match host_value.parse::<IpAddr>() {
            Ok(ip) => (ip, host_value),
            Err(err) => {
                warn!(
                    "Could not parse {} ('{}'): {}. Using {}.",
                    Self::HOST_VAR,
                    host_value,
                    err,
                    Self::DEFAULT_HOST
                );
                (
                    IpAddr::V4(Ipv4Addr::UNSPECIFIED),
                    Self::DEFAULT_HOST.to_string(),
                )
            }
        };

        let port = match env_string(Self::PORT_VAR) {
            Some(raw) => match raw.parse::<u16>() {
                Ok(value) if value != 0 => value,
                Ok(_) => {
                    warn!(
                        "{} must not be 0. Using {}.",
                        Self::PORT_VAR,
                        Self::DEFAULT_PORT
                    );
                    Self::DEFAULT_PORT
                }
                Err(err) => {
                    warn!(
                        "Could not parse {} ('{}'): {}. Using {}.",
                        Self::PORT_VAR,
                        raw,
                        err,
                        Self::DEFAULT_PORT
                    );
                    Self::DEFAULT_PORT
                }
            },
            None => Self::DEFAULT_PORT,
        };

        Self {
            bind_ip,
            display_host: effective_host,
            port,
        }
    }

    /// Socket address to bind the server to.
    pub fn socket_addr(&self) -> SocketAddr {
        SocketAddr::new(self.bind_ip, self.port)
    }

    /// Visible hostname for logging and hints.
    pub fn display_host(&self) -> &str {
        &self.display_host
    }

    /// Configured port.
    pub fn port(&self) -> u16 {
        self.port
    }

    /// Indicates whether binding to all interfaces.
    pub fn binds_to_all_interfaces(&self) -> bool {
        match self.bind_ip {
            IpAddr::V4(addr) => addr == Ipv4Addr::UNSPECIFIED,
            IpAddr::V6(addr) => addr == Ipv6Addr::UNSPECIFIED,
        }
    }
}

/// Defaults for footprint construction.
#[derive(Clone, Copy, Debug, Default)]
pub struct GeometryConfig {
    footprint: FootprintOptions,
}

impl GeometryConfig {
    const EDGE_THRESHOLD_VAR: &'static str = "PACK_PLANNER_EDGE_THRESHOLD_DEG";

    fn from_env() -> Self {
        let edge_threshold_deg = load_f64_with_warning(
            Self::EDGE_THRESHOLD_VAR,
            DEFAULT_EDGE_THRESHOLD_DEG,
            |value| (0.0..180.0).contains(&value),
            "must be at least 0 and below 180",
            "Adjusted outline threshold changes which container edges are drawn",
        );

        Self {
            footprint: FootprintOptions::default().with_edge_threshold(edge_threshold_deg),
        }
    }

    /// Returns the configured footprint options.
    pub fn footprint_options(&self) -> FootprintOptions {
        self.footprint
    }
}

/// Defaults for scene serialization.
#[derive(Clone, Copy, Debug)]
pub struct SceneConfig {
    boundary_size: f64,
}

impl SceneConfig {
    pub const DEFAULT_BOUNDARY_SIZE: f64 = 100.0;
    const BOUNDARY_SIZE_VAR: &'static str = "PACK_PLANNER_BOUNDARY_SIZE";

    fn from_env() -> Self {
        Self {
            boundary_size: load_f64_with_warning(
                Self::BOUNDARY_SIZE_VAR,
                Self::DEFAULT_BOUNDARY_SIZE,
                |value| value > 0.0,
                "must be greater than 0",
                "Adjusted scene boundary is sent with every payload",
            ),
        }
    }

    /// Boundary size used when a request does not name one.
    pub fn boundary_size(&self) -> f64 {
        self.boundary_size
    }
}

impl Default for SceneConfig {
    fn default() -> Self {
        Self {
            boundary_size: Self::DEFAULT_BOUNDARY_SIZE,
        }
    }
}

/// Ordering configuration used when a request omits it.
#[derive(Clone, Copy, Debug, Default)]
pub struct OrderingDefaults {
    config: OrderingConfig,
}

impl OrderingDefaults {
    const SORT_ORDER_VAR: &'static str = "PACK_PLANNER_SORT_ORDER";
    const DOOR_DIRECTION_VAR: &'static str = "PACK_PLANNER_DOOR_DIRECTION";
    const LIFO_VAR: &'static str = "PACK_PLANNER_LIFO";

    fn from_env() -> Self {
        let defaults = OrderingConfig::default();

        let sort_order = env_string(Self::SORT_ORDER_VAR)
            .map(|raw| SortOrder::parse_lenient(&raw))
            .unwrap_or(defaults.sort_order);
        let door_direction = env_string(Self::DOOR_DIRECTION_VAR)
            .map(|raw| DoorDirection::parse_lenient(&raw))
            .unwrap_or(defaults.door_direction);
        let lifo_enabled = env_string(Self::LIFO_VAR)
            .and_then(|raw| parse_bool(&raw, Self::LIFO_VAR))
            .unwrap_or(defaults.lifo_enabled);

        let config = OrderingConfig::builder()
            .sort_order(sort_order)
            .door_direction(door_direction)
            .lifo_enabled(lifo_enabled)
            .build();

        Self { config }
    }

    /// Returns the configured OrderingConfig.
    pub fn ordering_config(&self) -> OrderingConfig {
        self.config
    }
}

fn env_string(name: &str) -> Option<String> {
    match env::var(name) {
        Ok(value) => {
            let trimmed = value.trim();
            if trimmed.is_empty() {
                None
            } else {
                Some(trimmed.to_owned())
            }
        }
        Err(env::VarError::NotPresent) => None,
        Err(err) => {
            warn!("Access to {} failed: {}. Using default value.", name, err);
            None
        }
    }
}

fn parse_bool(raw: &str, var_name: &str) -> Option<bool> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "y" | "on" => Some(true),
        "0" | "false" | "no" | "n" | "off" => Some(false),
        other => {
            warn!(
                "Could not interpret {} ('{}') as boolean value. Using default value.",
                var_name, other
            );
            None
        }
    }
}

fn load_f64_with_warning(
    var_name: &str,
    default: f64,
    validator: impl Fn(f64) -> bool,
    invalid_hint: &str,
    notice: &str,
) -> f64 {
    match env_string(var_name) {
        Some(raw) => parse_f64_with_warning(var_name, &raw, default, validator, invalid_hint, notice),
        None => default,
    }
}

fn parse_f64_with_warning(
    var_name: &str,
    raw: &str,
    default: f64,
    validator: impl Fn(f64) -> bool,
    invalid_hint: &str,
    notice: &str,
) -> f64 {
    match raw.parse::<f64>() {
        Ok(value) if value.is_finite() && validator(value) => {
            let tolerance = (default.abs().max(1.0)) * 1e-9;
            if (value - default).abs() > tolerance {
                info!("{} ({} = {}).", notice, var_name, value);
            }
            value
        }
        Ok(_) => {
            warn!(
                "{} contains invalid value '{}': {}. Using {}.",
                var_name, raw, invalid_hint, default
            );
            default
        }
        Err(err) => {
            warn!(
                "Could not parse {} ('{}') as number: {}. Using {}.",
                var_name, raw, err, default
            );
            default
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_bool_true_values() {
        assert_eq!(parse_bool("1", "TEST_VAR"), Some(true));
        assert_eq!(parse_bool("true", "TEST_VAR"), Some(true));
        assert_eq!(parse_bool("yes", "TEST_VAR"), Some(true));
        assert_eq!(parse_bool("y", "TEST_VAR"), Some(true));
        assert_eq!(parse_bool("on", "TEST_VAR"), Some(true));

        // Case insensitive
        assert_eq!(parse_bool("TRUE", "TEST_VAR"), Some(true));
        assert_eq!(parse_bool("Yes", "TEST_VAR"), Some(true));

        assert_eq!(parse_bool("  1  ", "TEST_VAR"), Some(true));
    }

    #[test]
    fn test_parse_bool_false_values() {
        assert_eq!(parse_bool("0", "TEST_VAR"), Some(false));
        assert_eq!(parse_bool("false", "TEST_VAR"), Some(false));
        assert_eq!(parse_bool("no", "TEST_VAR"), Some(false));
        assert_eq!(parse_bool("n", "TEST_VAR"), Some(false));
        assert_eq!(parse_bool("OFF", "TEST_VAR"), Some(false));
        assert_eq!(parse_bool(" false ", "TEST_VAR"), Some(false));
    }

    #[test]
    fn test_parse_bool_invalid_values() {
        assert_eq!(parse_bool("invalid", "TEST_VAR"), None);
        assert_eq!(parse_bool("2", "TEST_VAR"), None);
        assert_eq!(parse_bool("", "TEST_VAR"), None);
    }

    #[test]
    fn test_edge_threshold_range() {
        let in_range = |value: f64| (0.0..180.0).contains(&value);
        let parse = |raw: &str| {
            parse_f64_with_warning("TEST_VAR", raw, 0.001, in_range, "range", "changed")
        };
        assert_eq!(parse("15"), 15.0);
        assert_eq!(parse("0"), 0.0);
        assert_eq!(parse("180"), 0.001);
        assert_eq!(parse("-1"), 0.001);
        assert_eq!(parse("NaN"), 0.001);
        assert_eq!(parse("steep"), 0.001);
    }

    #[test]
    fn test_boundary_size_must_be_positive() {
        let parse = |raw: &str| {
            parse_f64_with_warning("TEST_VAR", raw, 100.0, |v| v > 0.0, "positive", "changed")
        };
        assert_eq!(parse("250"), 250.0);
        assert_eq!(parse("0"), 100.0);
        assert_eq!(parse("inf"), 100.0);
    }
}
