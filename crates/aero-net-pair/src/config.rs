use crate::error::ConfigError;
use crate::interface::{validate_mtu, MAX_MTU};
use crate::pool::{DEFAULT_POOL_SIZE, MAX_POOL_SIZE};

/// Construction-time settings shared by both interfaces of a pair.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PairConfig {
    /// Frames preallocated in each interface's transmit pool. Fixed for the pair's lifetime.
    pub pool_size: usize,
    /// Whether receive interrupts start enabled. When disabled, frames wait in the receive queue
    /// until [`crate::InterfacePair::poll_rx`] drains them.
    pub rx_interrupts: bool,
    /// Initial MTU of both interfaces.
    pub mtu: usize,
}

impl Default for PairConfig {
    fn default() -> Self {
        Self {
            pool_size: DEFAULT_POOL_SIZE,
            rx_interrupts: true,
            mtu: MAX_MTU,
        }
    }
}

impl PairConfig {
    pub const POOL_SIZE_ENV: &'static str = "AERO_NET_PAIR_POOL_SIZE";
    pub const RX_INTERRUPTS_ENV: &'static str = "AERO_NET_PAIR_RX_INTERRUPTS";
    pub const MTU_ENV: &'static str = "AERO_NET_PAIR_MTU";

    /// Defaults overridden by any of the `AERO_NET_PAIR_*` environment variables that are set.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|var| std::env::var(var).ok())
    }

    fn from_lookup(lookup: impl Fn(&'static str) -> Option<String>) -> Result<Self, ConfigError> {
        let mut cfg = Self::default();

        if let Some(raw) = lookup(Self::POOL_SIZE_ENV) {
            cfg.pool_size = parse_env(Self::POOL_SIZE_ENV, &raw, |s| s.parse().ok())?;
        }
        if let Some(raw) = lookup(Self::RX_INTERRUPTS_ENV) {
            cfg.rx_interrupts = parse_env(Self::RX_INTERRUPTS_ENV, &raw, parse_bool)?;
        }
        if let Some(raw) = lookup(Self::MTU_ENV) {
            cfg.mtu = parse_env(Self::MTU_ENV, &raw, |s| s.parse().ok())?;
        }

        cfg.validate()?;
        Ok(cfg)
    }

    pub fn with_pool_size(mut self, pool_size: usize) -> Self {
        self.pool_size = pool_size;
        self
    }

    pub fn with_rx_interrupts(mut self, enabled: bool) -> Self {
        self.rx_interrupts = enabled;
        self
    }

    pub fn with_mtu(mut self, mtu: usize) -> Self {
        self.mtu = mtu;
        self
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.pool_size == 0 || self.pool_size > MAX_POOL_SIZE {
            return Err(ConfigError::InvalidPoolSize {
                size: self.pool_size,
                max: MAX_POOL_SIZE,
            });
        }
        validate_mtu(self.mtu)?;
        Ok(())
    }
}

fn parse_env<T>(
    var: &'static str,
    raw: &str,
    parse: impl Fn(&str) -> Option<T>,
) -> Result<T, ConfigError> {
    parse(raw.trim()).ok_or_else(|| ConfigError::InvalidEnv {
        var,
        value: raw.to_owned(),
    })
}

fn parse_bool(raw: &str) -> Option<bool> {
    match raw.to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}
