use serde::{Deserialize, Serialize};

use crate::default::{
    get_default_backend_address, get_default_backends, get_default_bootstrap, get_default_count,
    get_default_lb_type, get_default_listen, get_default_listen_address,
    get_default_load_balancing, get_default_log, get_default_log_level, get_default_max_attempts,
    get_default_port, get_default_retry_delay_ms,
};

#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
pub struct Config {
    #[serde(default = "get_default_listen")]
    pub listen: Listen,

    #[serde(default = "get_default_backends")]
    pub backends: Backends,

    #[serde(default = "get_default_load_balancing")]
    pub load_balancing: LoadBalancing,

    #[serde(default = "get_default_bootstrap")]
    pub bootstrap: Bootstrap,

    #[serde(default = "get_default_log")]
    pub log: Log,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            listen: get_default_listen(),
            backends: get_default_backends(),
            load_balancing: get_default_load_balancing(),
            bootstrap: get_default_bootstrap(),
            log: get_default_log(),
        }
    }
}

#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
pub struct Listen {
    #[serde(default = "get_default_listen_address")]
    pub address: String, // "127.0.0.1"

    #[serde(default = "get_default_port")]
    pub port: u16, // 0 = let the OS pick
}

#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
pub struct Backends {
    #[serde(default = "get_default_count")]
    pub count: usize, // 1..=1000

    // interface the backend listeners bind on, port is always OS-assigned
    #[serde(default = "get_default_backend_address")]
    pub address: String,
}

#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
pub struct LoadBalancing {
    #[serde(rename = "type", default = "get_default_lb_type")]
    pub lb_type: String, // "roundrobin" | "random"
}

#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
pub struct Bootstrap {
    #[serde(default = "get_default_max_attempts")]
    pub max_attempts: u32,

    #[serde(default = "get_default_retry_delay_ms")]
    pub retry_delay_ms: u64,
}

#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
pub struct Log {
    #[serde(default = "get_default_log_level")]
    pub level: String, // "trace, debug, info, warn, error, off"

    #[serde(default)]
    pub file: Option<String>,
}
