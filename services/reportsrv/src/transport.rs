//! Modbus TCP transport adapter
//!
//! One connection per (site, category) run. The connection is stateful:
//! selecting a unit is a connection-wide mutation, so it happens
//! immediately before the matching read and reads are never issued
//! concurrently.

use crate::error::{ReportSrvError, Result};
use async_trait::async_trait;
use std::net::SocketAddr;
use std::time::Duration;
use tokio::time::timeout;
use tokio_modbus::client::{tcp, Context};
use tokio_modbus::prelude::{Client, Reader, SlaveContext};
use tokio_modbus::Slave;
use tracing::debug;
use trackscan_core::{CoreError, RegisterSource};

/// Register source backed by one tokio-modbus TCP context
pub struct ModbusTcpSource {
    ctx: Context,
    read_timeout: Duration,
}

impl ModbusTcpSource {
    /// Establish the connection; failure here aborts the category run
    pub async fn connect(
        host: &str,
        port: u16,
        connect_timeout: Duration,
        read_timeout: Duration,
    ) -> Result<Self> {
        let addr: SocketAddr = format!("{}:{}", host, port).parse().map_err(|_| {
            ReportSrvError::connection(format!("invalid address {}:{}", host, port))
        })?;
        let ctx = match timeout(connect_timeout, tcp::connect(addr)).await {
            Ok(Ok(ctx)) => ctx,
            Ok(Err(err)) => {
                return Err(ReportSrvError::connection(format!("{}: {}", addr, err)));
            }
            Err(_) => {
                return Err(ReportSrvError::connection(format!(
                    "{}: connect timed out after {}ms",
                    addr,
                    connect_timeout.as_millis()
                )));
            }
        };
        debug!(%addr, "modbus connection established");
        Ok(Self { ctx, read_timeout })
    }

    pub async fn disconnect(mut self) {
        let _ = self.ctx.disconnect().await;
    }
}

/// Narrow engine-level unit/address to the Modbus wire types
fn to_wire(unit_id: u16, address: u32) -> std::result::Result<(u8, u16), CoreError> {
    let unit = u8::try_from(unit_id)
        .map_err(|_| CoreError::transport(format!("unit id {} exceeds the wire range", unit_id)))?;
    let address = u16::try_from(address).map_err(|_| {
        CoreError::transport(format!("register address {} exceeds the wire range", address))
    })?;
    Ok((unit, address))
}

#[async_trait]
impl RegisterSource for ModbusTcpSource {
    async fn read_registers(
        &mut self,
        unit_id: u16,
        address: u32,
        count: u16,
    ) -> std::result::Result<Vec<i32>, CoreError> {
        let (unit, address) = to_wire(unit_id, address)?;
        // Unit selection must directly precede the matching read.
        self.ctx.set_slave(Slave(unit));
        let response = timeout(
            self.read_timeout,
            self.ctx.read_holding_registers(address, count),
        )
        .await
        .map_err(|_| {
            CoreError::transport(format!(
                "read timed out after {}ms",
                self.read_timeout.as_millis()
            ))
        })?;
        let words = match response {
            Ok(Ok(words)) => words,
            Ok(Err(exception)) => {
                return Err(CoreError::transport(format!("modbus exception: {exception}")));
            }
            Err(err) => return Err(CoreError::transport(err.to_string())),
        };
        Ok(words.into_iter().map(i32::from).collect())
    }
}
