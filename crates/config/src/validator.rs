use std::net::IpAddr;

use log::{error, info};

use crate::config::Config;

pub const MAX_BACKENDS: usize = 1000;

pub const VALID_LOG_LEVELS: &[&str] = &["trace", "debug", "info", "warn", "error", "off"];

pub const VALID_LB_TYPES: &[&str] = &["roundrobin", "round-robin", "round_robin", "rr", "random"];

pub fn validate(config: &Config) -> bool {
    info!("Starting configuration validation...");

    // --- Validate listen address ---
    if config.listen.address.parse::<IpAddr>().is_err() {
        error!("Invalid listen address: '{}'", config.listen.address);
        return false;
    }

    // --- Validate backend count ---
    if config.backends.count == 0 || config.backends.count > MAX_BACKENDS {
        error!(
            "Invalid backend count: {} (must be between 1 and {})",
            config.backends.count, MAX_BACKENDS
        );
        return false;
    }

    // --- Validate backend bind address ---
    if config.backends.address.parse::<IpAddr>().is_err() {
        error!("Invalid backend address: '{}'", config.backends.address);
        return false;
    }

    // --- Validate load balancing type ---
    if !VALID_LB_TYPES
        .iter()
        .any(|lb| lb.eq_ignore_ascii_case(config.load_balancing.lb_type.trim()))
    {
        error!(
            "Invalid load balancing type: {}",
            config.load_balancing.lb_type
        );
        return false;
    }

    // --- Validate bootstrap retries ---
    if config.bootstrap.max_attempts == 0 {
        error!("Bootstrap max_attempts must be at least 1");
        return false;
    }

    // --- Validate Log level ---
    if !VALID_LOG_LEVELS
        .iter()
        .any(|lvl| lvl.eq_ignore_ascii_case(config.log.level.trim()))
    {
        error!("Invalid log level: {}", config.log.level);
        return false;
    }

    info!("Configuration validation passed successfully");

    true
}
