use std::env;
use std::net::{IpAddr, Ipv4Addr, Ipv6Addr, SocketAddr};

use crate::optimizer::SolveOptions;

/// Complete application configuration, loaded from environment variables or default values.
#[derive(Clone, Debug)]
pub struct AppConfig {
    pub api: ApiConfig,
    pub solver: SolverConfig,
}

impl AppConfig {
    /// Creates a configuration from the currently available environment variables.
    pub fn from_env() -> Self {
        Self {
            api: ApiConfig::from_env(),
            solver: SolverConfig::from_env(),
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
    const DEFAULT_BIND_IP: IpAddr = IpAddr::V4(Ipv4Addr::UNSPECIFIED);
    const DEFAULT_PORT: u16 = 8080;
    const HOST_VAR: &'static str = "STRIP_STACK_API_HOST";
    const PORT_VAR: &'static str = "STRIP_STACK_API_PORT";

    fn from_env() -> Self {
        let host_value =
            env_string(Self::HOST_VAR).unwrap_or_else(|| Self::DEFAULT_HOST.to_string());
        let (bind_ip, effective_host) = match host_value.parse::<IpAddr>() {
            Ok(ip) => (ip, host_value),
            Err(err) => {
                eprintln!(
                    "⚠️ Could not parse {} ('{}'): {}. Using {}.",
                    Self::HOST_VAR,
                    host_value,
                    err,
                    Self::DEFAULT_HOST
                );
                (Self::DEFAULT_BIND_IP, Self::DEFAULT_HOST.to_string())
            }
        };

        let port = match env_string(Self::PORT_VAR) {
            Some(raw) => match raw.parse::<u16>() {
                Ok(value) if value != 0 => value,
                Ok(_) => {
                    eprintln!(
                        "⚠️ {} must not be 0. Using {}.",
                        Self::PORT_VAR,
                        Self::DEFAULT_PORT
                    );
                    Self::DEFAULT_PORT
                }
                Err(err) => {
                    eprintln!(
                        "⚠️ Could not parse {} ('{}'): {}. Using {}.",
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

/// Default annealing parameters. Each request may override them.
#[derive(Clone, Debug)]
pub struct SolverConfig {
    options: SolveOptions,
    seed: Option<u64>,
}

impl SolverConfig {
    const MAX_ITERATIONS_VAR: &'static str = "STRIP_STACK_MAX_ITERATIONS";
    const TEMPERATURE_VAR: &'static str = "STRIP_STACK_TEMPERATURE";
    const ALLOW_ROTATION_VAR: &'static str = "STRIP_STACK_ALLOW_ROTATION";
    const SEED_VAR: &'static str = "STRIP_STACK_SEED";

    fn from_env() -> Self {
        let max_iterations = load_u64_with_warning(
            Self::MAX_ITERATIONS_VAR,
            SolveOptions::DEFAULT_MAX_ITERATIONS as u64,
            |value| value > 0,
            "must be greater than 0",
        );

        let temperature = load_f64_with_warning(
            Self::TEMPERATURE_VAR,
            SolveOptions::DEFAULT_TEMPERATURE,
            |value| value.is_finite() && value >= 0.0,
            "must be a finite number >= 0",
            "Warning: Adjusted temperature changes how often worse packings are accepted",
        );

        let allow_rotation = env_string(Self::ALLOW_ROTATION_VAR)
            .and_then(|raw| parse_bool(&raw, Self::ALLOW_ROTATION_VAR))
            .unwrap_or(SolveOptions::DEFAULT_ALLOW_ROTATION);

        let seed = env_string(Self::SEED_VAR).and_then(|raw| match raw.parse::<u64>() {
            Ok(seed) => Some(seed),
            Err(err) => {
                eprintln!(
                    "⚠️ Could not parse {} ('{}'): {}. Seeding from entropy.",
                    Self::SEED_VAR,
                    raw,
                    err
                );
                None
            }
        });

        let options = SolveOptions::builder()
            .max_iterations(usize::try_from(max_iterations).unwrap_or(usize::MAX))
            .temperature(temperature)
            .allow_rotation(allow_rotation)
            .build();

        Self { options, seed }
    }

    /// Returns the configured default options.
    pub fn solve_options(&self) -> SolveOptions {
        self.options
    }

    /// Fixed seed for every request, if configured.
    pub fn seed(&self) -> Option<u64> {
        self.seed
    }
}

impl Default for SolverConfig {
    fn default() -> Self {
        Self {
            options: SolveOptions::default(),
            seed: None,
        }
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
            eprintln!(
                "⚠️ Access to {} failed: {}. Using default value.",
                name, err
            );
            None
        }
    }
}

fn parse_bool(raw: &str, var_name: &str) -> Option<bool> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "y" | "on" => Some(true),
        "0" | "false" | "no" | "n" | "off" => Some(false),
        other => {
            eprintln!(
                "⚠️ Could not interpret {} ('{}') as boolean value. Using default value.",
                var_name, other
            );
            None
        }
    }
}

fn parse_with_warning<T>(
    var_name: &str,
    raw: &str,
    default: T,
    validator: impl Fn(T) -> bool,
    invalid_hint: &str,
) -> T
where
    T: std::str::FromStr + Copy + std::fmt::Display,
    T::Err: std::fmt::Display,
{
    match raw.parse::<T>() {
        Ok(value) if validator(value) => value,
        Ok(_) => {
            eprintln!(
                "⚠️ {} contains invalid value '{}': {}. Using {}.",
                var_name, raw, invalid_hint, default
            );
            default
        }
        Err(err) => {
            eprintln!(
                "⚠️ Could not parse {} ('{}') as number: {}. Using {}.",
                var_name, raw, err, default
            );
            default
        }
    }
}

fn load_u64_with_warning(
    var_name: &str,
    default: u64,
    validator: impl Fn(u64) -> bool,
    invalid_hint: &str,
) -> u64 {
    match env_string(var_name) {
        Some(raw) => parse_with_warning(var_name, &raw, default, validator, invalid_hint),
        None => default,
    }
}

fn load_f64_with_warning(
    var_name: &str,
    default: f64,
    validator: impl Fn(f64) -> bool,
    invalid_hint: &str,
    warning: &str,
) -> f64 {
    match env_string(var_name) {
        Some(raw) => {
            let value = parse_with_warning(var_name, &raw, default, validator, invalid_hint);
            let tolerance = (default.abs().max(1.0)) * 1e-9;
            if (value - default).abs() > tolerance {
                println!("⚠️ {} ({} = {}).", warning, var_name, value);
            }
            value
        }
        None => default,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_bool_true_values() {
        assert_eq!(parse_bool("1", "TEST_VAR"), Some(true));
        assert_eq!(parse_bool("yes", "TEST_VAR"), Some(true));
        assert_eq!(parse_bool("y", "TEST_VAR"), Some(true));
        assert_eq!(parse_bool("On", "TEST_VAR"), Some(true));
        assert_eq!(parse_bool(" TRUE ", "TEST_VAR"), Some(true));
    }

    #[test]
    fn test_parse_bool_false_values() {
        assert_eq!(parse_bool("0", "TEST_VAR"), Some(false));
        assert_eq!(parse_bool("no", "TEST_VAR"), Some(false));
        assert_eq!(parse_bool("n", "TEST_VAR"), Some(false));
        assert_eq!(parse_bool("OFF", "TEST_VAR"), Some(false));
        assert_eq!(parse_bool("  false  ", "TEST_VAR"), Some(false));
    }

    #[test]
    fn test_parse_bool_invalid_values() {
        assert_eq!(parse_bool("maybe", "TEST_VAR"), None);
        assert_eq!(parse_bool("2", "TEST_VAR"), None);
        assert_eq!(parse_bool("", "TEST_VAR"), None);
    }

    #[test]
    fn test_parse_with_warning_falls_back() {
        assert_eq!(parse_with_warning("TEST_VAR", "250", 1000u64, |v| v > 0, "hint"), 250);
        assert_eq!(parse_with_warning("TEST_VAR", "0", 1000u64, |v| v > 0, "hint"), 1000);
        assert_eq!(parse_with_warning("TEST_VAR", "abc", 1000u64, |v| v > 0, "hint"), 1000);
        assert_eq!(
            parse_with_warning("TEST_VAR", "-0.5", 1.0f64, |v| v >= 0.0, "hint"),
            1.0
        );
        assert_eq!(parse_with_warning("TEST_VAR", "2.5", 1.0f64, |v| v >= 0.0, "hint"), 2.5);
    }

    #[test]
    fn test_unset_variables_use_defaults() {
        // Variable names no test sets.
        assert_eq!(
            load_u64_with_warning("STRIP_STACK_TEST_UNSET_U64", 7, |_| true, "hint"),
            7
        );
        assert_eq!(
            load_f64_with_warning("STRIP_STACK_TEST_UNSET_F64", 1.5, |_| true, "hint", "warn"),
            1.5
        );
        let defaults = SolverConfig::default();
        assert_eq!(defaults.solve_options(), SolveOptions::default());
        assert_eq!(defaults.seed(), None);
    }
}
