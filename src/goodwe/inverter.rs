use crate::prelude::*;
use crate::goodwe::codec::Value;
use crate::goodwe::command::{Aa55Command, CommandCommon, ModbusCommand, ProtocolCommand, RawCommand};
use crate::goodwe::family::{dt, es, DeviceInfo, Family, FamilyId, Settings};
use crate::goodwe::sensor::{self, map_response, Sensor, Snapshot};
use crate::goodwe::transport::Transport;

use {std::fmt, std::sync::Arc, tokio::sync::Mutex};

pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(2);
pub const DEFAULT_RETRIES: u32 = 3;

// Link {{{
/// Where exchanges for one inverter go.
#[derive(Clone)]
pub enum Link {
    /// Fresh UDP session per exchange.
    Udp { host: String, port: u16 },
    /// One caller supplied association reused for every exchange.
    Shared(Arc<Mutex<Box<dyn Transport>>>),
}

impl Link {
    pub fn udp(host: &str, port: u16) -> Self {
        Link::Udp {
            host: host.to_string(),
            port,
        }
    }

    pub fn shared<T: Transport + 'static>(transport: T) -> Self {
        Link::Shared(Arc::new(Mutex::new(Box::new(transport))))
    }

    pub async fn execute(
        &self,
        command: &ProtocolCommand,
        timeout: Duration,
        retries: u32,
    ) -> Result<Vec<u8>, InverterError> {
        match self {
            Link::Udp { host, port } => command.execute(host, *port, timeout, retries).await,
            Link::Shared(transport) => {
                // held for the whole exchange, so requests never interleave
                let mut transport = transport.lock().await;
                command.execute_on(&mut **transport, timeout, retries).await
            }
        }
    }
}

impl fmt::Display for Link {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Link::Udp { host, port } => write!(f, "{}:{}", host, port),
            Link::Shared(_) => write!(f, "shared transport"),
        }
    }
}

impl fmt::Debug for Link {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Link({})", self)
    }
} // }}}

/// Generic driver for one inverter, parameterised by its family tables.
#[derive(Debug)]
pub struct Inverter {
    family: &'static Family,
    link: Link,
    comm_addr: u8,
    timeout: Duration,
    retries: u32,
    info: Option<DeviceInfo>,
}

impl Inverter {
    pub fn new(
        family: &'static Family,
        link: Link,
        comm_addr: Option<u8>,
        timeout: Duration,
        retries: u32,
    ) -> Self {
        Self {
            family,
            link,
            comm_addr: comm_addr.unwrap_or(family.default_comm_addr),
            timeout,
            retries,
            info: None,
        }
    }

    pub fn family(&self) -> &'static Family {
        self.family
    }

    pub fn comm_addr(&self) -> u8 {
        self.comm_addr
    }

    pub fn info(&self) -> Option<&DeviceInfo> {
        self.info.as_ref()
    }

    pub fn model_name(&self) -> Option<&str> {
        self.info.as_ref().map(|i| i.model_name.as_str())
    }

    pub fn serial_number(&self) -> Option<&str> {
        self.info.as_ref().map(|i| i.serial_number.as_str())
    }

    pub fn sensors(&self) -> impl Iterator<Item = &'static Sensor> {
        self.family.sensors()
    }

    pub fn settings(&self) -> &'static [Sensor] {
        self.family.settings.sensors()
    }

    async fn execute(&self, command: &ProtocolCommand) -> Result<Vec<u8>, InverterError> {
        self.link.execute(command, self.timeout, self.retries).await
    }

    /// Read identity from the device. Only the first successful call talks to
    /// the inverter; later calls return the stored identity.
    pub async fn read_device_info(&mut self) -> Result<DeviceInfo, InverterError> {
        if let Some(info) = &self.info {
            return Ok(info.clone());
        }

        let command = self.family.device_info.command(self.comm_addr);
        let response = self.execute(&command).await?;
        let info = (self.family.parse_device_info)(command.payload(&response))?;

        info!(
            "{} inverter {} at {}, serial {}, firmware {}",
            self.family.name, info.model_name, self.link, info.serial_number, info.software_version
        );

        self.info = Some(info.clone());
        Ok(info)
    }

    /// Read every runtime block in order and decode it.
    pub async fn read_runtime_data(&self, include_unknown: bool) -> Result<Snapshot, InverterError> {
        let mut snapshot = Snapshot::new();

        for block in self.family.runtime {
            let command = block.request.command(self.comm_addr);
            let response = self.execute(&command).await?;
            snapshot.extend(map_response(command.payload(&response), block.sensors, include_unknown));
        }

        Ok(snapshot)
    }

    fn find_setting(&self, id: &str) -> Result<&'static Sensor, InverterError> {
        sensor::find(self.settings(), id).ok_or_else(|| InverterError::UnknownSetting(id.to_string()))
    }

    pub async fn read_setting(&self, id: &str) -> Result<Value, InverterError> {
        let setting = self.find_setting(id)?;

        let (command, payload_offset) = match self.family.settings {
            Settings::Registers(_) => {
                let count = std::cmp::max(1, setting.codec.width() / 2) as u16;
                let command: ProtocolCommand =
                    ModbusCommand::read(self.comm_addr, setting.offset as u16, count).into();
                (command, 0)
            }
            Settings::Block(block) => (block.request.command(self.comm_addr), setting.offset),
            Settings::None => return Err(InverterError::UnknownSetting(id.to_string())),
        };

        let response = self.execute(&command).await?;
        setting
            .codec
            .decode(command.payload(&response), payload_offset)
            .map_err(|e| InverterError::Processing(format!("setting {}: {}", id, e)))
    }

    /// Encode and write one setting register.
    ///
    /// Unknown and read-only ids, and values the codec cannot represent, are
    /// rejected before anything is sent.
    pub async fn write_setting(&self, id: &str, value: &Value) -> Result<(), InverterError> {
        let setting = self.find_setting(id)?;
        if !setting.writable {
            return Err(InverterError::ReadOnlySetting(id.to_string()));
        }

        let raw = setting.codec.encode(value).map_err(|e| InverterError::InvalidValue {
            id: id.to_string(),
            reason: e.to_string(),
        })?;

        let offset = setting.offset as u16;
        let command: ProtocolCommand = match raw.as_slice() {
            [b] => ModbusCommand::write(self.comm_addr, offset, (*b as i8) as i16 as u16).into(),
            [hi, lo] => ModbusCommand::write(self.comm_addr, offset, u16::from_be_bytes([*hi, *lo])).into(),
            _ => ModbusCommand::write_multi(self.comm_addr, offset, &raw)?.into(),
        };

        info!("writing {}={} to {} {}", id, value, self.family.name, self.link);
        self.execute(&command).await?;
        Ok(())
    }

    /// All settings in one snapshot.
    pub async fn read_settings_data(&self) -> Result<Snapshot, InverterError> {
        match self.family.settings {
            Settings::None => Ok(Snapshot::new()),
            Settings::Block(block) => {
                let command = block.request.command(self.comm_addr);
                let response = self.execute(&command).await?;
                Ok(map_response(command.payload(&response), block.sensors, true))
            }
            Settings::Registers(settings) => {
                let mut snapshot = Snapshot::new();
                for setting in settings {
                    match self.read_setting(setting.id).await {
                        Ok(value) => {
                            snapshot.insert(setting.id.to_string(), value);
                        }
                        Err(InverterError::Processing(msg)) => warn!("skipping {}", msg),
                        Err(err) => return Err(err),
                    }
                }
                Ok(snapshot)
            }
        }
    }

    /// Send raw bytes and return whatever comes back first.
    pub async fn send_command(&self, request: Vec<u8>) -> Result<Vec<u8>, InverterError> {
        let command: ProtocolCommand = RawCommand::new(request).into();
        self.execute(&command).await
    }

    // convenience operations {{{
    /// 0 general, 1 off-grid, 2 backup (ET/ES); 0 general, 3 export off (DT).
    pub async fn set_work_mode(&self, mode: i64) -> Result<(), InverterError> {
        let invalid = || InverterError::InvalidValue {
            id: "work_mode".to_string(),
            reason: format!("unsupported work mode {}", mode),
        };

        match self.family.id {
            FamilyId::Et => {
                if !(0..=2).contains(&mode) {
                    return Err(invalid());
                }
                self.write_setting("work_mode", &Value::Integer(mode)).await
            }
            FamilyId::Es => {
                if !(0..=2).contains(&mode) {
                    return Err(invalid());
                }
                let mut payload = es::WORK_MODE_PREFIX.to_vec();
                payload.push(mode as u8);
                let command: ProtocolCommand = Aa55Command::new(&payload, es::WORK_MODE_RESPONSE).into();
                self.execute(&command).await.map(|_| ())
            }
            FamilyId::Dt => {
                let register = match mode {
                    0 => dt::REG_WORK_MODE_GENERAL,
                    3 => dt::REG_WORK_MODE_EXPORT_OFF,
                    _ => return Err(invalid()),
                };
                let command: ProtocolCommand = ModbusCommand::write(self.comm_addr, register, 0).into();
                self.execute(&command).await.map(|_| ())
            }
        }
    }

    /// Grid export limit in W, 0 to 10000.
    pub async fn set_grid_export_limit(&self, limit: i64) -> Result<(), InverterError> {
        if self.family.id != FamilyId::Et {
            return Err(InverterError::Unsupported("grid export limit".to_string()));
        }
        if !(0..=10000).contains(&limit) {
            return Err(InverterError::InvalidValue {
                id: "grid_export_limit".to_string(),
                reason: format!("{} W outside 0..=10000", limit),
            });
        }

        self.write_setting("grid_export_limit", &Value::Integer(limit)).await
    }

    /// On-grid battery depth of discharge in %, 0 to 89.
    pub async fn set_ongrid_battery_dod(&self, dod: i64) -> Result<(), InverterError> {
        if self.family.id == FamilyId::Dt {
            return Err(InverterError::Unsupported("battery depth of discharge".to_string()));
        }
        if !(0..=89).contains(&dod) {
            return Err(InverterError::InvalidValue {
                id: "battery_discharge_depth".to_string(),
                reason: format!("{}% outside 0..=89", dod),
            });
        }

        match self.family.id {
            FamilyId::Es => {
                let mut payload = es::DOD_PREFIX.to_vec();
                payload.extend_from_slice(&((100 - dod) as u16).to_be_bytes());
                let command: ProtocolCommand = Aa55Command::new(&payload, es::DOD_RESPONSE).into();
                self.execute(&command).await.map(|_| ())
            }
            _ => {
                self.write_setting("battery_discharge_depth", &Value::Integer(100 - dod))
                    .await
            }
        }
    } // }}}
}
