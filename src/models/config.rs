use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::path::PathBuf;

pub const DEFAULT_PORT: u16 = 3000;

/// Service configuration read from the environment at startup
#[derive(Debug, Clone, PartialEq)]
pub struct ServiceConfig {
    /// Listening port (`PORT`)
    pub port: u16,
    /// Listening address (`BIND_HOST`)
    pub host: IpAddr,
    /// Chrome/Chromium executable (`CHROME_PATH`); discovered when unset
    pub chrome_path: Option<PathBuf>,
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            port: DEFAULT_PORT,
            host: IpAddr::V4(Ipv4Addr::UNSPECIFIED),
            chrome_path: None,
        }
    }
}

impl ServiceConfig {
    /// Load configuration from process environment variables
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Load configuration through an arbitrary variable lookup.
    ///
    /// Unparseable values are logged and replaced by their defaults.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let defaults = Self::default();

        let port = match lookup("PORT").filter(|v| !v.trim().is_empty()) {
            Some(raw) => raw.trim().parse().unwrap_or_else(|e| {
                tracing::warn!(value = %raw, %e, "Invalid PORT, using default");
                defaults.port
            }),
            None => defaults.port,
        };

        let host = match lookup("BIND_HOST").filter(|v| !v.trim().is_empty()) {
            Some(raw) => raw.trim().parse().unwrap_or_else(|e| {
                tracing::warn!(value = %raw, %e, "Invalid BIND_HOST, using default");
                defaults.host
            }),
            None => defaults.host,
        };

        let chrome_path = lookup("CHROME_PATH")
            .filter(|v| !v.trim().is_empty())
            .map(PathBuf::from);

        Self {
            port,
            host,
            chrome_path,
        }
    }

    pub fn bind_addr(&self) -> SocketAddr {
        SocketAddr::new(self.host, self.port)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn test_defaults() {
        let config = ServiceConfig::from_lookup(lookup(&[]));
        assert_eq!(config, ServiceConfig::default());
        assert_eq!(config.bind_addr().to_string(), "0.0.0.0:3000");
    }

    #[test]
    fn test_port_from_env() {
        let config = ServiceConfig::from_lookup(lookup(&[("PORT", "8080")]));
        assert_eq!(config.port, 8080);
    }

    #[test]
    fn test_invalid_port_falls_back() {
        let config = ServiceConfig::from_lookup(lookup(&[("PORT", "eighty")]));
        assert_eq!(config.port, DEFAULT_PORT);

        let config = ServiceConfig::from_lookup(lookup(&[("PORT", "70000")]));
        assert_eq!(config.port, DEFAULT_PORT);
    }

    #[test]
    fn test_host_and_chrome_path() {
        let config = ServiceConfig::from_lookup(lookup(&[
            ("BIND_HOST", "127.0.0.1"),
            ("CHROME_PATH", "/usr/bin/chromium"),
        ]));
        assert_eq!(config.bind_addr().to_string(), "127.0.0.1:3000");
        assert_eq!(config.chrome_path, Some(PathBuf::from("/usr/bin/chromium")));
    }

    #[test]
    fn test_blank_chrome_path_ignored() {
        let config = ServiceConfig::from_lookup(lookup(&[("CHROME_PATH", " ")]));
        assert_eq!(config.chrome_path, None);
    }
}
