use crate::prelude::*;
use crate::goodwe::checksum::{additive_checksum16, append_additive_checksum, append_modbus_crc, modbus_crc16};
use crate::goodwe::transport::{self, Transport, UdpTransport};

use {
    bytes::BufMut,
    enum_dispatch::*,
    num_enum::{IntoPrimitive, TryFromPrimitive},
};

const AA55_REQUEST_HEADER: [u8; 4] = [0xAA, 0x55, 0xC0, 0x7F];
const RESPONSE_MARKER: [u8; 2] = [0xAA, 0x55];

#[derive(Clone, Copy, Debug, Eq, PartialEq, IntoPrimitive, TryFromPrimitive)]
#[repr(u8)]
pub enum ModbusFunction {
    Read = 0x03,
    WriteSingle = 0x06,
    WriteMulti = 0x10,
}

#[enum_dispatch]
pub trait CommandCommon {
    /// Exact bytes put on the wire.
    fn request(&self) -> &[u8];

    /// Decides from the response bytes alone whether the exchange is done.
    fn is_valid(&self, response: &[u8]) -> bool;

    /// Response with framing stripped. Only meaningful for valid responses.
    fn payload<'a>(&self, response: &'a [u8]) -> &'a [u8];
}

#[enum_dispatch(CommandCommon)]
#[derive(Clone, Debug, Eq, PartialEq)]
pub enum ProtocolCommand {
    Aa55(Aa55Command),
    Modbus(ModbusCommand),
    Raw(RawCommand),
}

impl ProtocolCommand {
    /// Run one exchange on a fresh UDP session to `host:port`.
    ///
    /// The session is dropped on return, or when the returned future is
    /// dropped, which closes the socket.
    pub async fn execute(
        &self,
        host: &str,
        port: u16,
        timeout: Duration,
        retries: u32,
    ) -> Result<Vec<u8>, InverterError> {
        let mut session = UdpTransport::connect(host, port).await?;
        self.execute_on(&mut session, timeout, retries).await
    }

    /// Run one exchange over a caller supplied transport.
    pub async fn execute_on<T: Transport + ?Sized>(
        &self,
        transport: &mut T,
        timeout: Duration,
        retries: u32,
    ) -> Result<Vec<u8>, InverterError> {
        transport::exchange(transport, self, timeout, retries).await
    }

    pub fn describe(&self) -> String {
        format!("request {}", Utils::hex(self.request()))
    }
}

// AA55 {{{
/// Checksum framed request: `AA55C07F | payload | sum16`.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct Aa55Command {
    request: Vec<u8>,
    response_type: u16,
}

impl Aa55Command {
    pub fn new(payload: &[u8], response_type: u16) -> Self {
        let mut request = Vec::with_capacity(payload.len() + 6);
        request.put_slice(&AA55_REQUEST_HEADER);
        request.put_slice(payload);
        append_additive_checksum(&mut request);

        Self {
            request,
            response_type,
        }
    }

    pub fn response_type(&self) -> u16 {
        self.response_type
    }
}

impl CommandCommon for Aa55Command {
    fn request(&self) -> &[u8] {
        &self.request
    }

    // AA 55 7F C0 | type(2) | len(1) | payload(len) | sum16
    fn is_valid(&self, data: &[u8]) -> bool {
        let len = data.len();
        if len <= 8 || data[0..2] != RESPONSE_MARKER {
            return false;
        }
        if len != data[6] as usize + 9 {
            return false;
        }
        if u16::from_be_bytes([data[4], data[5]]) != self.response_type {
            return false;
        }

        additive_checksum16(&data[..len - 2]) == u16::from_be_bytes([data[len - 2], data[len - 1]])
    }

    fn payload<'a>(&self, data: &'a [u8]) -> &'a [u8] {
        if data.len() < 9 {
            return &[];
        }
        &data[7..data.len() - 2]
    }
} // }}}

// Modbus {{{
/// Modbus RTU request: `addr | function | offset | count or value | crc16`.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct ModbusCommand {
    request: Vec<u8>,
    function: ModbusFunction,
    offset: u16,
    /// register count for reads and multi writes, register value for single writes
    value: u16,
}

impl ModbusCommand {
    fn build(comm_addr: u8, function: ModbusFunction, offset: u16, value: u16, data: &[u8]) -> Self {
        let mut request = Vec::with_capacity(9 + data.len());
        request.put_u8(comm_addr);
        request.put_u8(function.into());
        request.put_u16(offset);
        request.put_u16(value);
        if function == ModbusFunction::WriteMulti {
            request.put_u8(data.len() as u8);
            request.put_slice(data);
        }
        append_modbus_crc(&mut request);

        Self {
            request,
            function,
            offset,
            value,
        }
    }

    pub fn read(comm_addr: u8, offset: u16, count: u16) -> Self {
        Self::build(comm_addr, ModbusFunction::Read, offset, count, &[])
    }

    pub fn write(comm_addr: u8, offset: u16, value: u16) -> Self {
        Self::build(comm_addr, ModbusFunction::WriteSingle, offset, value, &[])
    }

    /// Write consecutive registers starting at `offset`. `values` holds whole
    /// big-endian registers.
    pub fn write_multi(comm_addr: u8, offset: u16, values: &[u8]) -> Result<Self, InverterError> {
        if values.is_empty() || values.len() % 2 != 0 || values.len() > 246 {
            return Err(InverterError::InvalidValue {
                id: format!("register {}", offset),
                reason: format!("{} bytes is not a whole number of registers", values.len()),
            });
        }
        let count = (values.len() / 2) as u16;
        Ok(Self::build(comm_addr, ModbusFunction::WriteMulti, offset, count, values))
    }

    pub fn function(&self) -> ModbusFunction {
        self.function
    }

    pub fn offset(&self) -> u16 {
        self.offset
    }

    pub fn value(&self) -> u16 {
        self.value
    }
}

impl CommandCommon for ModbusCommand {
    fn request(&self) -> &[u8] {
        &self.request
    }

    // AA 55 | addr | function | [len] | payload | crc16 (over addr..payload)
    fn is_valid(&self, data: &[u8]) -> bool {
        let len = data.len();
        if len < 7 || data[0..2] != RESPONSE_MARKER {
            return false;
        }
        if data[3] != u8::from(self.function) {
            if data[3] & 0x80 != 0 {
                debug!("modbus exception {:#04x} for function {:?}", data[4], self.function);
            }
            return false;
        }

        match self.function {
            ModbusFunction::Read => {
                if data[4] as usize != 2 * self.value as usize || len != data[4] as usize + 7 {
                    return false;
                }
            }
            ModbusFunction::WriteSingle | ModbusFunction::WriteMulti => {
                if len != 10
                    || data[4..6] != self.offset.to_be_bytes()
                    || data[6..8] != self.value.to_be_bytes()
                {
                    return false;
                }
            }
        }

        modbus_crc16(&data[2..len - 2]) == u16::from_le_bytes([data[len - 2], data[len - 1]])
    }

    fn payload<'a>(&self, data: &'a [u8]) -> &'a [u8] {
        let start = match self.function {
            ModbusFunction::Read => 5,
            _ => 4,
        };
        if data.len() < start + 2 {
            return &[];
        }
        &data[start..data.len() - 2]
    }
} // }}}

// Raw {{{
/// Arbitrary request whose first response is accepted as is.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct RawCommand {
    request: Vec<u8>,
}

impl RawCommand {
    pub fn new(request: Vec<u8>) -> Self {
        Self { request }
    }
}

impl CommandCommon for RawCommand {
    fn request(&self) -> &[u8] {
        &self.request
    }

    fn is_valid(&self, _data: &[u8]) -> bool {
        true
    }

    fn payload<'a>(&self, data: &'a [u8]) -> &'a [u8] {
        data
    }
} // }}}
