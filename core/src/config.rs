//! config.rs
//! Server and client settings.
//!
//! Design notes:
//! - Every field has a protocol default, so a partial JSON document is valid.
//! - `validate()` is explicit; `from_json_str` calls it before returning.

use std::net::{Ipv4Addr, SocketAddr, SocketAddrV4};
use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::constants::{
    DEFAULT_DATA_RATE_HZ, DEFAULT_INFO_RATE_HZ, DEFAULT_MULTICAST_GROUP, DEFAULT_PORT, MAX_PACKET_LEN,
    PSN_VERSION_HIGH, PSN_VERSION_LOW,
};
use crate::fragment::{info_packet_overhead, DATA_PACKET_OVERHEAD};

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("{field} must be greater than zero")]
    ZeroRate { field: &'static str },

    #[error("max_packet_len {value} outside [{min}, {max}]")]
    MaxPacketLen { value: usize, min: usize, max: usize },

    #[error("system name needs {overhead} bytes of packet overhead, limit is {max_packet_len}")]
    SystemNameTooLong { overhead: usize, max_packet_len: usize },

    #[error("{0} is not a multicast address")]
    NotMulticast(Ipv4Addr),

    #[error("{field} must be greater than zero")]
    ZeroSize { field: &'static str },

    #[error("invalid config json: {0}")]
    Json(#[from] serde_json::Error),
}

/// Send-side settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub multicast_group: Ipv4Addr,
    pub port: u16,
    /// Local interface for outgoing multicast. Unspecified lets the OS pick.
    pub interface: Ipv4Addr,
    pub ttl: u32,
    pub multicast_loop: bool,
    pub data_rate_hz: u32,
    pub info_rate_hz: u32,
    pub max_packet_len: usize,
    pub system_name: String,
    pub version_high: u8,
    pub version_low: u8,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            multicast_group: DEFAULT_MULTICAST_GROUP,
            port: DEFAULT_PORT,
            interface: Ipv4Addr::UNSPECIFIED,
            ttl: 1,
            multicast_loop: true,
            data_rate_hz: DEFAULT_DATA_RATE_HZ,
            info_rate_hz: DEFAULT_INFO_RATE_HZ,
            max_packet_len: MAX_PACKET_LEN,
            system_name: String::from("psn-server"),
            version_high: PSN_VERSION_HIGH,
            version_low: PSN_VERSION_LOW,
        }
    }
}

impl ServerConfig {
    pub fn from_json_str(s: &str) -> Result<Self, ConfigError> {
        let cfg: Self = serde_json::from_str(s)?;
        cfg.validate()?;
        Ok(cfg)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.data_rate_hz == 0 {
            return Err(ConfigError::ZeroRate { field: "data_rate_hz" });
        }
        if self.info_rate_hz == 0 {
            return Err(ConfigError::ZeroRate { field: "info_rate_hz" });
        }
        if !self.multicast_group.is_multicast() {
            return Err(ConfigError::NotMulticast(self.multicast_group));
        }
        // room for the fixed chunks plus one empty tracker
        let min = DATA_PACKET_OVERHEAD + crate::constants::CHUNK_HEADER_LEN;
        if self.max_packet_len < min || self.max_packet_len > MAX_PACKET_LEN {
            return Err(ConfigError::MaxPacketLen { value: self.max_packet_len, min, max: MAX_PACKET_LEN });
        }
        let overhead = info_packet_overhead(&self.system_name);
        if overhead >= self.max_packet_len {
            return Err(ConfigError::SystemNameTooLong { overhead, max_packet_len: self.max_packet_len });
        }
        Ok(())
    }

    pub fn destination(&self) -> SocketAddr {
        SocketAddr::V4(SocketAddrV4::new(self.multicast_group, self.port))
    }

    pub fn data_period(&self) -> Duration {
        period(self.data_rate_hz)
    }

    pub fn info_period(&self) -> Duration {
        period(self.info_rate_hz)
    }
}

/// Receive-side settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ClientConfig {
    pub multicast_group: Ipv4Addr,
    pub port: u16,
    pub interface: Ipv4Addr,
    /// Upper bound on one blocking receive, so the loop can observe `stop`.
    pub recv_timeout_ms: u64,
    pub max_datagram_len: usize,
    /// Capacity of the notification channel. Notifications that do not fit
    /// are dropped and counted.
    pub event_capacity: usize,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            multicast_group: DEFAULT_MULTICAST_GROUP,
            port: DEFAULT_PORT,
            interface: Ipv4Addr::UNSPECIFIED,
            recv_timeout_ms: 100,
            max_datagram_len: MAX_PACKET_LEN,
            event_capacity: 256,
        }
    }
}

impl ClientConfig {
    pub fn from_json_str(s: &str) -> Result<Self, ConfigError> {
        let cfg: Self = serde_json::from_str(s)?;
        cfg.validate()?;
        Ok(cfg)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if !self.multicast_group.is_multicast() {
            return Err(ConfigError::NotMulticast(self.multicast_group));
        }
        if self.recv_timeout_ms == 0 {
            return Err(ConfigError::ZeroSize { field: "recv_timeout_ms" });
        }
        if self.max_datagram_len == 0 {
            return Err(ConfigError::ZeroSize { field: "max_datagram_len" });
        }
        if self.event_capacity == 0 {
            return Err(ConfigError::ZeroSize { field: "event_capacity" });
        }
        Ok(())
    }

    pub fn recv_timeout(&self) -> Duration {
        Duration::from_millis(self.recv_timeout_ms)
    }

    pub fn bind_addr(&self) -> SocketAddr {
        SocketAddr::V4(SocketAddrV4::new(Ipv4Addr::UNSPECIFIED, self.port))
    }
}

fn period(rate_hz: u32) -> Duration {
    Duration::from_nanos(1_000_000_000 / u64::from(rate_hz.max(1)))
}
