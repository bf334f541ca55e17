//! Register-level access to the sensor over Modbus RTU.
//!
//! `RegisterChannel` is the seam the rest of the crate talks through;
//! `SerialChannel` is the real implementation over a serial port, with
//! request framing and response validation done by `rmodbus`.

use anyhow::{anyhow, Context, Result};
use rmodbus::{client::ModbusRequest, ModbusProto};
use std::{
    io::{Read, Write},
    thread,
    time::Duration,
};

use crate::config::DeviceEndpoint;

pub trait RegisterChannel {
    /// Read `count` consecutive holding registers starting at `addr`.
    fn read_registers(&mut self, addr: u16, count: u16) -> Result<Vec<u16>>;

    /// Write a single holding register (function 0x06).
    fn write_register(&mut self, addr: u16, value: u16) -> Result<()>;

    /// Write consecutive holding registers (function 0x10).
    fn write_registers(&mut self, addr: u16, words: &[u16]) -> Result<()>;
}

/// Open a serial port with the requested timeout, enabling exclusive access
/// on Unix systems.
pub fn open_serial_port(
    endpoint: &DeviceEndpoint,
    timeout: Duration,
) -> Result<Box<dyn serialport::SerialPort>> {
    let builder = serialport::new(endpoint.port_name.as_str(), endpoint.baud)
        .parity(endpoint.parity)
        .data_bits(endpoint.data_bits)
        .stop_bits(endpoint.stop_bits)
        .timeout(timeout);

    #[cfg(unix)]
    {
        let mut handle = builder
            .open_native()
            .map_err(|err| anyhow!("Failed to open port {}: {err}", endpoint.port_name))?;
        handle.set_exclusive(true).map_err(|err| {
            anyhow!(
                "Failed to acquire exclusive access to {}: {err}",
                endpoint.port_name
            )
        })?;
        Ok(Box::new(handle))
    }

    #[cfg(not(unix))]
    {
        builder
            .open()
            .map_err(|err| anyhow!("Failed to open port {}: {err}", endpoint.port_name))
    }
}

/// A live connection to the sensor: the open port plus the device unit id.
/// Dropping the channel closes the port.
pub struct SerialChannel {
    port: Box<dyn serialport::SerialPort>,
    unit_id: u8,
}

impl SerialChannel {
    pub fn open(endpoint: &DeviceEndpoint, timeout: Duration) -> Result<Self> {
        let port = open_serial_port(endpoint, timeout)?;
        Ok(Self {
            port,
            unit_id: endpoint.unit_id,
        })
    }

    /// Send one request frame and collect the response. Modbus RTU frames
    /// may arrive fragmented, so a short response gets one top-up read
    /// after an inter-frame delay.
    fn transact(&mut self, frame: &[u8], expected_len: usize) -> Result<Vec<u8>> {
        self.port
            .write_all(frame)
            .context("Failed to send request frame")?;
        self.port
            .flush()
            .context("Failed to flush request frame")?;

        let mut buffer = vec![0u8; 256];
        let mut total_bytes = self
            .port
            .read(&mut buffer)
            .context("No response received")?;
        if total_bytes == 0 {
            return Err(anyhow!("No response received"));
        }

        if total_bytes < expected_len {
            thread::sleep(Duration::from_millis(20));
            if let Ok(additional) = self.port.read(&mut buffer[total_bytes..]) {
                total_bytes += additional;
            }
        }

        buffer.truncate(total_bytes);
        Ok(buffer)
    }
}

impl RegisterChannel for SerialChannel {
    fn read_registers(&mut self, addr: u16, count: u16) -> Result<Vec<u16>> {
        let mut request = ModbusRequest::new(self.unit_id, ModbusProto::Rtu);
        let mut frame = Vec::new();
        request.generate_get_holdings(addr, count, &mut frame)?;

        // addr + func + byte count, payload, CRC
        let expected_len = 3 + count as usize * 2 + 2;
        let response = self.transact(&frame, expected_len)?;
        request
            .parse_ok(&response)
            .map_err(|err| anyhow!("Invalid response reading register {addr}: {err}"))?;
        if response.len() < expected_len {
            return Err(anyhow!(
                "Short response reading register {addr}: {} bytes",
                response.len()
            ));
        }

        let values = response[3..3 + count as usize * 2]
            .chunks_exact(2)
            .map(|chunk| u16::from_be_bytes([chunk[0], chunk[1]]))
            .collect();
        Ok(values)
    }

    fn write_register(&mut self, addr: u16, value: u16) -> Result<()> {
        let mut request = ModbusRequest::new(self.unit_id, ModbusProto::Rtu);
        let mut frame = Vec::new();
        request.generate_set_holding(addr, value, &mut frame)?;

        let response = self.transact(&frame, 8)?;
        request
            .parse_ok(&response)
            .map_err(|err| anyhow!("Write to register {addr} not confirmed: {err}"))?;
        Ok(())
    }

    fn write_registers(&mut self, addr: u16, words: &[u16]) -> Result<()> {
        let mut request = ModbusRequest::new(self.unit_id, ModbusProto::Rtu);
        let mut frame = Vec::new();
        request.generate_set_holdings_bulk(addr, words, &mut frame)?;

        let response = self.transact(&frame, 8)?;
        request
            .parse_ok(&response)
            .map_err(|err| anyhow!("Bulk write to register {addr} not confirmed: {err}"))?;
        Ok(())
    }
}
