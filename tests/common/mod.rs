#![allow(dead_code)]

use goodwe_bridge::goodwe::checksum::{additive_checksum16, modbus_crc16};
use goodwe_bridge::goodwe::transport::Transport;

use {
    async_trait::async_trait,
    std::collections::VecDeque,
    std::io,
    std::sync::{Arc, Mutex},
};

pub fn common_setup() {
    let _ = env_logger::builder().is_test(true).try_init();
}

/// What the stub does in answer to one sent datagram.
#[derive(Clone, Debug)]
pub enum Reply {
    Frame(Vec<u8>),
    Error(io::ErrorKind),
    /// nothing ever arrives
    Silence,
}

pub type Responder = Box<dyn FnMut(&[u8]) -> Reply + Send>;

/// Transport stub: records every sent datagram and answers from a script.
pub struct ScriptedTransport {
    sent: Arc<Mutex<Vec<Vec<u8>>>>,
    responder: Responder,
    pending: VecDeque<Reply>,
}

impl ScriptedTransport {
    pub fn new<F>(responder: F) -> (Self, Arc<Mutex<Vec<Vec<u8>>>>)
    where
        F: FnMut(&[u8]) -> Reply + Send + 'static,
    {
        let sent = Arc::new(Mutex::new(Vec::new()));
        let transport = Self {
            sent: sent.clone(),
            responder: Box::new(responder),
            pending: VecDeque::new(),
        };
        (transport, sent)
    }

    /// Answers the n-th request with the n-th reply, then stays silent.
    pub fn script(replies: Vec<Reply>) -> (Self, Arc<Mutex<Vec<Vec<u8>>>>) {
        let mut replies = VecDeque::from(replies);
        Self::new(move |_| replies.pop_front().unwrap_or(Reply::Silence))
    }

    pub fn silent() -> (Self, Arc<Mutex<Vec<Vec<u8>>>>) {
        Self::new(|_| Reply::Silence)
    }
}

#[async_trait]
impl Transport for ScriptedTransport {
    async fn send(&mut self, frame: &[u8]) -> io::Result<()> {
        self.sent.lock().unwrap().push(frame.to_vec());
        let reply = (self.responder)(frame);
        self.pending.push_back(reply);
        Ok(())
    }

    async fn recv(&mut self) -> io::Result<Vec<u8>> {
        match self.pending.pop_front() {
            Some(Reply::Frame(frame)) => Ok(frame),
            Some(Reply::Error(kind)) => Err(io::Error::new(kind, "scripted failure")),
            Some(Reply::Silence) | None => futures::future::pending().await,
        }
    }
}

pub fn sent_frames(sent: &Arc<Mutex<Vec<Vec<u8>>>>) -> Vec<Vec<u8>> {
    sent.lock().unwrap().clone()
}

pub fn hex(s: &str) -> Vec<u8> {
    goodwe_bridge::utils::Utils::from_hex(s).unwrap()
}

// frame factories {{{
/// `AA55 | addr | 03 | len | payload | crc`
pub fn modbus_read_response(addr: u8, payload: &[u8]) -> Vec<u8> {
    let mut frame = vec![0xAA, 0x55, addr, 0x03, payload.len() as u8];
    frame.extend_from_slice(payload);
    let crc = modbus_crc16(&frame[2..]);
    frame.extend_from_slice(&crc.to_le_bytes());
    frame
}

/// Echo of a single (0x06) or multi (0x10) register write.
pub fn modbus_write_response(addr: u8, function: u8, offset: u16, value: u16) -> Vec<u8> {
    let mut frame = vec![0xAA, 0x55, addr, function];
    frame.extend_from_slice(&offset.to_be_bytes());
    frame.extend_from_slice(&value.to_be_bytes());
    let crc = modbus_crc16(&frame[2..]);
    frame.extend_from_slice(&crc.to_le_bytes());
    frame
}

/// `AA55 7FC0 | type | len | payload | sum16`
pub fn aa55_response(response_type: u16, payload: &[u8]) -> Vec<u8> {
    let mut frame = vec![0xAA, 0x55, 0x7F, 0xC0];
    frame.extend_from_slice(&response_type.to_be_bytes());
    frame.push(payload.len() as u8);
    frame.extend_from_slice(payload);
    let sum = additive_checksum16(&frame);
    frame.extend_from_slice(&sum.to_be_bytes());
    frame
}

/// Answers modbus reads with `registers(offset, count)` and echoes writes.
pub fn modbus_device<F>(mut registers: F) -> impl FnMut(&[u8]) -> Reply + Send + 'static
where
    F: FnMut(u16, u16) -> Vec<u8> + Send + 'static,
{
    move |frame: &[u8]| {
        let offset = u16::from_be_bytes([frame[2], frame[3]]);
        let value = u16::from_be_bytes([frame[4], frame[5]]);
        match frame[1] {
            0x03 => Reply::Frame(modbus_read_response(frame[0], &registers(offset, value))),
            function => Reply::Frame(modbus_write_response(frame[0], function, offset, value)),
        }
    }
}

/// Modbus device whose registers all read as zero.
pub fn zeroed_modbus_device() -> impl FnMut(&[u8]) -> Reply + Send + 'static {
    modbus_device(|_, count| vec![0u8; count as usize * 2])
}

/// Modbus request the driver is expected to send.
pub fn modbus_request(addr: u8, function: u8, offset: u16, value: u16) -> Vec<u8> {
    let mut frame = vec![addr, function];
    frame.extend_from_slice(&offset.to_be_bytes());
    frame.extend_from_slice(&value.to_be_bytes());
    let crc = modbus_crc16(&frame);
    frame.extend_from_slice(&crc.to_le_bytes());
    frame
}

fn padded(text: &str, width: usize) -> Vec<u8> {
    let mut field = text.as_bytes().to_vec();
    field.resize(width, b' ');
    field
}

/// ET version info payload (33 registers).
pub fn et_version_info(serial: &str, model: &str) -> Vec<u8> {
    let mut payload = Vec::new();
    payload.extend_from_slice(&1u16.to_be_bytes()); // modbus version
    payload.extend_from_slice(&10000u16.to_be_bytes()); // rated power
    payload.extend_from_slice(&1u16.to_be_bytes()); // ac output type
    payload.extend(padded(serial, 16));
    payload.extend(padded(model, 10));
    for v in [4u16, 5, 6, 7, 8] {
        payload.extend_from_slice(&v.to_be_bytes());
    }
    payload.extend(padded("04029-08-S10", 12));
    payload.extend(padded("02041-06-S00", 12));
    payload
}

/// DT version info payload (40 registers).
pub fn dt_version_info(serial: &str, model: &str) -> Vec<u8> {
    let mut payload = vec![0u8; 6];
    payload.extend(padded(serial, 16));
    payload.extend(padded(model, 10));
    payload.extend(vec![0u8; 34]);
    for v in [1u16, 2, 0x1a] {
        payload.extend_from_slice(&v.to_be_bytes());
    }
    payload.resize(80, 0);
    payload
}

/// ES identity payload as carried by the 0182 response.
pub fn es_version_info(serial: &str, model: &str) -> Vec<u8> {
    let mut payload = vec![0u8; 5];
    payload.extend(padded(model, 10));
    payload.extend(vec![0u8; 16]);
    payload.extend(padded(serial, 16));
    payload.extend(vec![0u8; 4]);
    payload.extend(padded("EM-236-10", 12));
    payload
} // }}}
