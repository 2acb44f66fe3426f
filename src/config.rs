use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LinkConfig {
    pub spi: SpiConfig,
    pub pins: PinConfig,
    pub timing: TimingConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SpiConfig {
    /// Kernel SPI bus index (0 for /dev/spidev0.*).
    pub bus: u8,
    /// Slave-select index claimed from the kernel. The protocol's chip
    /// select is GPIO-driven, so this hardware CS goes unused.
    pub slave_select: u8,
    pub clock_hz: u32,
    pub mode: u8,
}

/// BCM pin numbers for the five control lines.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PinConfig {
    pub handshake: u8,
    pub reset: u8,
    pub enable: u8,
    pub power: u8,
    pub chip_select: u8,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TimingConfig {
    pub handshake_timeout_ms: u64,
    pub poll_interval_us: u64,
}

impl Default for LinkConfig {
    fn default() -> Self {
        Self {
            spi: SpiConfig {
                bus: 0,
                slave_select: 0,
                clock_hz: 200_000,
                mode: 0,
            },
            pins: PinConfig {
                handshake: 22,
                reset: 27,
                enable: 17,
                power: 23,
                chip_select: 8,
            },
            timing: TimingConfig {
                handshake_timeout_ms: 2_000,
                poll_interval_us: 500,
            },
        }
    }
}
