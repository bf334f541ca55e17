use serialport::{DataBits, Parity, StopBits};

/// Device unit id on the RS-485 bus. The sensor ships preconfigured as 4.
pub const DEFAULT_UNIT_ID: u8 = 4;

/// Serial link parameters shared by every connection to the sensor.
#[derive(Debug, Clone, Copy)]
pub struct LinkParams {
    pub baud: u32,
    pub parity: Parity,
    pub data_bits: DataBits,
    pub stop_bits: StopBits,
}

impl Default for LinkParams {
    fn default() -> Self {
        Self {
            baud: 9600,
            parity: Parity::None,
            data_bits: DataBits::Eight,
            stop_bits: StopBits::One,
        }
    }
}

impl LinkParams {
    pub fn endpoint(&self, port_name: impl Into<String>, unit_id: u8) -> DeviceEndpoint {
        DeviceEndpoint {
            port_name: port_name.into(),
            baud: self.baud,
            parity: self.parity,
            data_bits: self.data_bits,
            stop_bits: self.stop_bits,
            unit_id,
        }
    }
}

/// Immutable descriptor of one sensor endpoint: where it is and how to talk to it.
#[derive(Debug, Clone)]
pub struct DeviceEndpoint {
    pub port_name: String,
    pub baud: u32,
    pub parity: Parity,
    pub data_bits: DataBits,
    pub stop_bits: StopBits,
    pub unit_id: u8,
}
