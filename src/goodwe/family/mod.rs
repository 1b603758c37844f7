pub mod dt;
pub mod es;
pub mod et;

use crate::prelude::*;
use crate::goodwe::command::{Aa55Command, ModbusCommand, ProtocolCommand};
use crate::goodwe::sensor::{Sensor, SensorKind};

use serde::Serialize;

pub(crate) const PV: Option<SensorKind> = Some(SensorKind::Pv);
pub(crate) const AC: Option<SensorKind> = Some(SensorKind::Ac);
pub(crate) const UPS: Option<SensorKind> = Some(SensorKind::Ups);
pub(crate) const BAT: Option<SensorKind> = Some(SensorKind::Bat);
pub(crate) const GRID: Option<SensorKind> = Some(SensorKind::Grid);
pub(crate) const NONE: Option<SensorKind> = None;

#[derive(Clone, Copy, Debug, Eq, PartialEq, Serialize)]
pub enum FamilyId {
    Et,
    Es,
    Dt,
}

/// Request template; the communication address is filled in per driver.
#[derive(Clone, Copy, Debug)]
pub enum Request {
    Aa55 {
        payload: &'static [u8],
        response_type: u16,
    },
    ModbusRead {
        offset: u16,
        count: u16,
    },
}

impl Request {
    pub fn command(&self, comm_addr: u8) -> ProtocolCommand {
        match *self {
            Request::Aa55 {
                payload,
                response_type,
            } => Aa55Command::new(payload, response_type).into(),
            Request::ModbusRead { offset, count } => {
                ModbusCommand::read(comm_addr, offset, count).into()
            }
        }
    }
}

/// One request and the layout of its response payload.
#[derive(Clone, Copy, Debug)]
pub struct Block {
    pub request: Request,
    pub sensors: &'static [Sensor],
}

#[derive(Clone, Copy, Debug)]
pub enum Settings {
    None,
    /// Each setting is one holding register, offset is its address.
    Registers(&'static [Sensor]),
    /// All settings come back in one response.
    Block(Block),
}

impl Settings {
    pub fn sensors(&self) -> &'static [Sensor] {
        match self {
            Settings::None => &[],
            Settings::Registers(sensors) => sensors,
            Settings::Block(block) => block.sensors,
        }
    }
}

/// Identity read once at connect time.
#[derive(Clone, Debug, Default, PartialEq, Serialize)]
pub struct DeviceInfo {
    pub model_name: String,
    pub serial_number: String,
    pub software_version: String,
    pub rated_power: Option<u16>,
    pub modbus_version: Option<u16>,
    pub ac_output_type: Option<u16>,
    pub dsp1_sw_version: Option<u16>,
    pub dsp2_sw_version: Option<u16>,
    pub dsp_spn_version: Option<u16>,
    pub arm_sw_version: Option<u16>,
    pub arm_svn_version: Option<u16>,
    pub arm_version: Option<String>,
}

/// Everything that differs between inverter families.
pub struct Family {
    pub id: FamilyId,
    pub name: &'static str,
    /// model family names accepted as a connect hint
    pub aliases: &'static [&'static str],
    /// serial number substrings identifying the family; empty accepts any
    pub model_tags: &'static [&'static str],
    pub default_comm_addr: u8,
    pub device_info: Request,
    pub parse_device_info: fn(&[u8]) -> Result<DeviceInfo, InverterError>,
    /// runtime blocks, read strictly in order
    pub runtime: &'static [Block],
    pub settings: Settings,
}

impl Family {
    pub fn sensors(&self) -> impl Iterator<Item = &'static Sensor> {
        let runtime: &'static [Block] = self.runtime;
        runtime.iter().flat_map(|b| b.sensors.iter())
    }

    pub fn matches_serial(&self, serial: &str) -> bool {
        self.model_tags.is_empty() || self.model_tags.iter().any(|tag| serial.contains(tag))
    }
}

impl std::fmt::Debug for Family {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.name)
    }
}

/// Discovery probe order.
pub static FAMILIES: [&Family; 3] = [&et::ET, &dt::DT, &es::ES];

pub fn by_name(name: &str) -> Option<&'static Family> {
    let name = name.to_ascii_uppercase();
    FAMILIES
        .iter()
        .copied()
        .find(|f| f.aliases.iter().any(|a| *a == name))
}

pub(crate) fn processing_error<E: std::fmt::Debug>(family: &str, err: E) -> InverterError {
    InverterError::Processing(format!("{} device info: {:?}", family, err))
}
