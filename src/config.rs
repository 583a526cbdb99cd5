use log::warn;
use std::net::SocketAddr;
use std::str::FromStr;
use std::time::Duration;

use crate::router::DEFAULT_PAGE_SIZE;
use crate::store::SESSION_DURATION;

/// Runtime settings of the dashboard server
#[derive(Clone, Debug, PartialEq)]
pub struct Config {
    pub addr: SocketAddr,
    /// Rows per page of the raw table view
    pub page_size: usize,
    pub session_ttl: Duration,
    pub max_upload_bytes: usize,
    /// Keep the previous table when a new upload fails to decode
    pub retain_on_failed_upload: bool,
}

impl Default for Config {
    fn default() -> Self {
        Config {
            addr: SocketAddr::from(([127, 0, 0, 1], 3000)),
            page_size: DEFAULT_PAGE_SIZE,
            session_ttl: SESSION_DURATION,
            max_upload_bytes: 16 * 1024 * 1024,
            retain_on_failed_upload: false,
        }
    }
}

impl Config {
    /// Defaults, overridden by `DASHBOARD_*` variables, then by `[addr] [page_size]` arguments
    pub fn load() -> Self {
        let env = |key: &str| std::env::var(key).ok();
        let args: Vec<String> = std::env::args().skip(1).collect();
        Config::default().with_env(env).with_args(&args)
    }

    pub fn with_env(mut self, lookup: impl Fn(&str) -> Option<String>) -> Self {
        if let Some(v) = lookup("DASHBOARD_ADDR") {
            self.addr = parse_or("DASHBOARD_ADDR", &v, self.addr);
        }
        if let Some(v) = lookup("DASHBOARD_PAGE_SIZE") {
            self.page_size = parse_or("DASHBOARD_PAGE_SIZE", &v, self.page_size).max(1);
        }
        if let Some(v) = lookup("DASHBOARD_SESSION_TTL_SECS") {
            let secs = parse_or("DASHBOARD_SESSION_TTL_SECS", &v, self.session_ttl.as_secs());
            self.session_ttl = Duration::from_secs(secs);
        }
        if let Some(v) = lookup("DASHBOARD_MAX_UPLOAD_BYTES") {
            self.max_upload_bytes = parse_or("DASHBOARD_MAX_UPLOAD_BYTES", &v, self.max_upload_bytes);
        }
        if let Some(v) = lookup("DASHBOARD_RETAIN_ON_FAILED_UPLOAD") {
            self.retain_on_failed_upload = parse_or(
                "DASHBOARD_RETAIN_ON_FAILED_UPLOAD",
                &v,
                self.retain_on_failed_upload,
            );
        }
        self
    }

    pub fn with_args(mut self, args: &[String]) -> Self {
        if let Some(addr) = args.first() {
            self.addr = parse_or("address argument", addr, self.addr);
        }
        if let Some(page_size) = args.get(1) {
            self.page_size = parse_or("page size argument", page_size, self.page_size).max(1);
        }
        self
    }
}

fn parse_or<T: FromStr + Copy>(what: &str, raw: &str, fallback: T) -> T {
    raw.trim().parse().unwrap_or_else(|_| {
        warn!("Ignoring invalid {} value {:?}", what, raw);
        fallback
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn env(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn defaults() {
        let config = Config::default();
        assert_eq!(config.page_size, 15);
        assert_eq!(config.addr.port(), 3000);
        assert!(!config.retain_on_failed_upload);
    }

    #[test]
    fn environment_overrides_defaults() {
        let config = Config::default().with_env(env(&[
            ("DASHBOARD_ADDR", "0.0.0.0:8080"),
            ("DASHBOARD_SESSION_TTL_SECS", "60"),
            ("DASHBOARD_RETAIN_ON_FAILED_UPLOAD", "true"),
        ]));
        assert_eq!(config.addr.port(), 8080);
        assert_eq!(config.session_ttl, Duration::from_secs(60));
        assert!(config.retain_on_failed_upload);
    }

    #[test]
    fn arguments_override_environment() {
        let config = Config::default()
            .with_env(env(&[("DASHBOARD_PAGE_SIZE", "20")]))
            .with_args(&["127.0.0.1:4000".to_string(), "25".to_string()]);
        assert_eq!(config.addr.port(), 4000);
        assert_eq!(config.page_size, 25);
    }

    #[test]
    fn invalid_values_fall_back() {
        let config = Config::default()
            .with_env(env(&[("DASHBOARD_PAGE_SIZE", "lots"), ("DASHBOARD_ADDR", "nowhere")]))
            .with_args(&["also nowhere".to_string(), "0".to_string()]);
        assert_eq!(config.page_size, 1);
        assert_eq!(config.addr, Config::default().addr);
    }
}
