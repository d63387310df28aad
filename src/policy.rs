//! Immutable enforcement policy.
//!
//! The policy is derived from [`AppConfig`] once at startup. Each gate receives only
//! the slice it needs: the rate gate gets a [`RatePolicy`], the identity gate an
//! [`IdentityPolicy`], and the verification handlers a [`VerifyPolicy`]. None of the
//! scalar fields change at runtime; only authority table contents are reloadable.

use std::time::Duration;

use crate::config::AppConfig;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RatePolicy {
    pub enable: bool,
    pub max_requests: u64,
    pub window: Duration,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IdentityPolicy {
    pub enforce_ip: bool,
    pub enforce_key: bool,
    pub key: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct VerifyPolicy {
    pub enforce_ban: bool,
    pub enforce_map: bool,
    pub enforce_sc: bool,
    pub sc_hash: u32,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Policy {
    pub rate: RatePolicy,
    pub identity: IdentityPolicy,
    pub verify: VerifyPolicy,
}

impl Policy {
    pub fn from_config(cfg: &AppConfig) -> Self {
        Self {
            rate: RatePolicy {
                enable: cfg.rate_limit.enable,
                max_requests: cfg.rate_limit.max_requests,
                window: Duration::from_secs(cfg.rate_limit.window_secs),
            },
            identity: IdentityPolicy {
                enforce_ip: cfg.api_auth.enforce_ip,
                enforce_key: cfg.api_auth.enforce_key,
                key: cfg.api_auth.key.clone(),
            },
            verify: VerifyPolicy {
                enforce_ban: cfg.verify.enforce_ban,
                enforce_map: cfg.verify.enforce_map,
                enforce_sc: cfg.verify.enforce_sc,
                sc_hash: cfg.verify.sc_hash,
            },
        }
    }
}
