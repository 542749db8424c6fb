//! Modbus RTU transport.

use std::time::Duration;

use async_trait::async_trait;
use tokio_modbus::client::Context;
use tokio_modbus::prelude::*;
use tracing::debug;

use crate::classify::FaultFlags;
use crate::config::SerialConfig;

/// Raw 16-bit registers returned by one transaction.
pub type RegisterBlock = Vec<u16>;

/// Error type for a single transaction.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum TransportError {
    #[error("Read timed out")]
    Timeout,
    #[error("Exception response: code {code}")]
    Exception { code: u8 },
    #[error("Transport error: {0}")]
    Io(String),
}

/// A non-reentrant Modbus master able to read holding registers.
///
/// `&mut self` keeps at most one transaction in flight.
#[async_trait]
pub trait Transport: Send {
    /// Read `count` holding registers from `slave` starting at `start`.
    async fn read_holding_registers(
        &mut self,
        slave: u8,
        start: u16,
        count: u16,
    ) -> Result<RegisterBlock, TransportError>;

    /// Fault state left by failed transactions.
    fn fault_flags(&mut self) -> &mut FaultFlags;
}

/// RTU master over a serial port.
pub struct RtuTransport {
    ctx: Context,
    timeout: Duration,
    flags: FaultFlags,
}

impl RtuTransport {
    /// Open the configured serial port.
    pub fn open(config: &SerialConfig) -> Result<Self, TransportError> {
        let builder = tokio_serial::new(&config.port, config.baud_rate)
            .parity(config.parity())
            .stop_bits(config.stop_bits())
            .data_bits(config.data_bits());

        let serial = tokio_serial::SerialStream::open(&builder)
            .map_err(|e| TransportError::Io(format!("Serial open failed: {}", e)))?;

        debug!(port = %config.port, baud_rate = config.baud_rate, "Opened serial port");

        Ok(Self {
            ctx: rtu::attach_slave(serial, Slave(1)),
            timeout: Duration::from_millis(config.timeout_ms),
            flags: FaultFlags::default(),
        })
    }
}

#[async_trait]
impl Transport for RtuTransport {
    async fn read_holding_registers(
        &mut self,
        slave: u8,
        start: u16,
        count: u16,
    ) -> Result<RegisterBlock, TransportError> {
        self.ctx.set_slave(Slave(slave));

        let result =
            match tokio::time::timeout(self.timeout, self.ctx.read_holding_registers(start, count))
                .await
            {
                Err(_) => Err(TransportError::Timeout),
                Ok(Err(e)) => Err(TransportError::Io(e.to_string())),
                Ok(Ok(Err(code))) => Err(TransportError::Exception {
                    code: u8::from(code),
                }),
                Ok(Ok(Ok(registers))) => Ok(registers),
            };

        if let Err(e) = &result {
            self.flags.record(e);
        }
        result
    }

    fn fault_flags(&mut self) -> &mut FaultFlags {
        &mut self.flags
    }
}
