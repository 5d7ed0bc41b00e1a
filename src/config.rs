//! Environment-driven configuration for the auth service.

use std::time::Duration;

use crate::security::OriginPolicy;

/// Effective service configuration, collected once at startup.
#[derive(Debug, Clone)]
pub struct Config {
    pub http_port: u16,
    /// Comma-separated allow-list of exact origins; `*` allows any origin.
    pub origins: OriginPolicy,
    /// Lifetime of an access token inside the session store.
    pub access_ttl: Duration,
    /// Lifetime of the session row itself (the refresh window).
    pub refresh_ttl: Duration,
}

fn env_or(name: &str, default: &str) -> String {
    std::env::var(name).unwrap_or_else(|_| default.to_string())
}

impl Config {
    pub fn from_env() -> Self {
        let http_port = env_or("PLENARIO_HTTP_PORT", "7878").parse().unwrap_or(7878);
        let origins = OriginPolicy::from_csv(&env_or("PLENARIO_ALLOWED_ORIGINS", "*"));
        let access_secs: u64 = env_or("PLENARIO_ACCESS_TTL_SECS", "900").parse().unwrap_or(900);
        let refresh_secs: u64 =
            env_or("PLENARIO_REFRESH_TTL_SECS", "604800").parse().unwrap_or(604_800);
        Self {
            http_port,
            origins,
            access_ttl: Duration::from_secs(access_secs),
            refresh_ttl: Duration::from_secs(refresh_secs),
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            http_port: 7878,
            origins: OriginPolicy::allow_any(),
            access_ttl: Duration::from_secs(900),
            refresh_ttl: Duration::from_secs(604_800),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_sane() {
        let cfg = Config::default();
        assert_eq!(cfg.http_port, 7878);
        assert!(cfg.access_ttl < cfg.refresh_ttl);
    }
}
