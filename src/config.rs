//! Link configuration.
//!
//! [`LinkConfig`] gathers the serial parameters and the timing knobs of the
//! transmit path. Defaults match the firmware: 57600 baud on a 16 MHz
//! clock with 100 ms between transmissions.
//!
//! The struct deserializes with every field optional:
//!
//! ```ignore
//! let config: LinkConfig = serde_json::from_str(r#"{ "baud": 9600 }"#)?;
//! assert_eq!(config.min_tx_interval, Duration::from_millis(100));
//! ```

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::{LinkbusError, Result};
use crate::protocol::{DeviceId, MIN_TX_INTERVAL};

/// Default line rate.
pub const DEFAULT_BAUD: u32 = 57_600;

/// Default UART clock.
pub const DEFAULT_CLOCK_HZ: u32 = 16_000_000;

/// Default number of attempts a waiting send makes before giving up.
pub const DEFAULT_SEND_SPIN_LIMIT: u32 = 10_000;

/// Default idle poll interval of the host transmit task.
pub const DEFAULT_TX_POLL_INTERVAL: Duration = Duration::from_millis(5);

/// Default timeout for async sends waiting on a transmit slot.
pub const DEFAULT_SEND_TIMEOUT: Duration = Duration::from_secs(5);

/// Configuration for a link.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LinkConfig {
    /// Line rate in baud.
    pub baud: u32,
    /// UART clock in Hz.
    pub clock_hz: u32,
    /// Minimum time between the starts of two transmissions.
    #[serde(rename = "min_tx_interval_ms", with = "millis")]
    pub min_tx_interval: Duration,
    /// Attempts made by [`SendMode::Wait`](crate::SendMode::Wait) sends.
    pub send_spin_limit: u32,
    /// How often the host transmit task polls an idle queue.
    #[serde(rename = "tx_poll_interval_ms", with = "millis")]
    pub tx_poll_interval: Duration,
    /// How long async sends wait for a transmit slot.
    #[serde(rename = "send_timeout_ms", with = "millis")]
    pub send_timeout: Duration,
    /// Role of this station on the link.
    pub device: DeviceId,
}

impl LinkConfig {
    /// UART baud divisor, `clock / 16 / baud - 1`.
    pub fn divisor(&self) -> Result<u32> {
        let invalid = LinkbusError::InvalidBaud {
            baud: self.baud,
            clock_hz: self.clock_hz,
        };
        if self.baud == 0 {
            return Err(invalid);
        }
        match self.clock_hz / 16 / self.baud {
            0 => Err(invalid),
            n => Ok(n - 1),
        }
    }

    /// Check the configuration for values the link cannot run with.
    pub fn validate(&self) -> Result<()> {
        self.divisor()?;
        if self.tx_poll_interval.is_zero() {
            return Err(LinkbusError::InvalidConfig(
                "tx_poll_interval must be non-zero".into(),
            ));
        }
        Ok(())
    }
}

impl Default for LinkConfig {
    fn default() -> Self {
        Self {
            baud: DEFAULT_BAUD,
            clock_hz: DEFAULT_CLOCK_HZ,
            min_tx_interval: MIN_TX_INTERVAL,
            send_spin_limit: DEFAULT_SEND_SPIN_LIMIT,
            tx_poll_interval: DEFAULT_TX_POLL_INTERVAL,
            send_timeout: DEFAULT_SEND_TIMEOUT,
            device: DeviceId::None,
        }
    }
}

mod millis {
    use std::time::Duration;

    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(value: &Duration, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_u64(value.as_millis() as u64)
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Duration, D::Error> {
        u64::deserialize(deserializer).map(Duration::from_millis)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = LinkConfig::default();
        assert_eq!(config.baud, 57_600);
        assert_eq!(config.clock_hz, 16_000_000);
        assert_eq!(config.min_tx_interval, Duration::from_millis(100));
        assert_eq!(config.device, DeviceId::None);
    }

    #[test]
    fn test_divisor() {
        let config = LinkConfig::default();
        // 16 MHz / 16 / 57600 = 17
        assert_eq!(config.divisor().unwrap(), 16);

        let config = LinkConfig {
            baud: 9600,
            ..Default::default()
        };
        assert_eq!(config.divisor().unwrap(), 103);
    }

    #[test]
    fn test_invalid_baud() {
        for baud in [0, 2_000_000] {
            let config = LinkConfig {
                baud,
                ..Default::default()
            };
            assert!(matches!(
                config.validate(),
                Err(LinkbusError::InvalidBaud { .. })
            ));
        }
    }

    #[test]
    fn test_zero_poll_interval_rejected() {
        let config = LinkConfig {
            tx_poll_interval: Duration::ZERO,
            ..Default::default()
        };
        assert!(config.divisor().is_ok());
        assert!(matches!(
            config.validate(),
            Err(LinkbusError::InvalidConfig(_))
        ));
    }

    #[test]
    fn test_deserialize_partial() {
        let config: LinkConfig =
            serde_json::from_str(r#"{ "baud": 9600, "device": "receiver" }"#).unwrap();
        assert_eq!(config.baud, 9600);
        assert_eq!(config.device, DeviceId::Receiver);
        assert_eq!(config.clock_hz, DEFAULT_CLOCK_HZ);
        assert_eq!(config.send_timeout, DEFAULT_SEND_TIMEOUT);
    }

    #[test]
    fn test_serialize_millis() {
        let config = LinkConfig {
            min_tx_interval: Duration::from_millis(250),
            ..Default::default()
        };
        let json = serde_json::to_value(&config).unwrap();
        assert_eq!(json["min_tx_interval_ms"], 250);

        let back: LinkConfig = serde_json::from_value(json).unwrap();
        assert_eq!(back, config);
    }
}
