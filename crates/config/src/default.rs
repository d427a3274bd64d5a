use crate::config::{Backends, Bootstrap, Listen, LoadBalancing, Log};

// default values
pub fn get_default_listen_address() -> String {
    String::from("127.0.0.1")
}

pub fn get_default_port() -> u16 {
    0
}

pub fn get_default_count() -> usize {
    3
}

pub fn get_default_backend_address() -> String {
    String::from("127.0.0.1")
}

pub fn get_default_max_attempts() -> u32 {
    3
}

pub fn get_default_retry_delay_ms() -> u64 {
    1000
}

pub fn get_default_lb_type() -> String {
    String::from("roundrobin")
}

pub fn get_default_log_level() -> String {
    String::from("info")
}

pub fn get_default_listen() -> Listen {
    Listen {
        address: get_default_listen_address(),
        port: get_default_port(),
    }
}

pub fn get_default_backends() -> Backends {
    Backends {
        count: get_default_count(),
        address: get_default_backend_address(),
    }
}

pub fn get_default_load_balancing() -> LoadBalancing {
    LoadBalancing {
        lb_type: get_default_lb_type(),
    }
}

pub fn get_default_bootstrap() -> Bootstrap {
    Bootstrap {
        max_attempts: get_default_max_attempts(),
        retry_delay_ms: get_default_retry_delay_ms(),
    }
}

pub fn get_default_log() -> Log {
    Log {
        level: get_default_log_level(),
        file: None,
    }
}
