//! DT, D-NS and XS grid-tie inverters, modbus framing.

use crate::prelude::*;
use crate::goodwe::codec::*;
use crate::goodwe::family::*;
use crate::goodwe::labels::*;
use crate::goodwe::sensor::Sensor;

use nom_derive::{Nom, Parse};

pub const DEFAULT_COMM_ADDR: u8 = 0x7F;

pub const REG_WORK_MODE_GENERAL: u16 = 0x9D8B;
pub const REG_WORK_MODE_EXPORT_OFF: u16 = 0x9D8A;

pub static DT: Family = Family {
    id: FamilyId::Dt,
    name: "DT",
    aliases: &["DT", "NS", "XS"],
    model_tags: &[],
    default_comm_addr: DEFAULT_COMM_ADDR,
    device_info: Request::ModbusRead { offset: 0x7531, count: 0x0028 },
    parse_device_info,
    runtime: &[Block { request: Request::ModbusRead { offset: 0x7594, count: 0x0049 }, sensors: RUNNING }],
    settings: Settings::None,
};

#[derive(Debug, Nom)]
#[nom(BigEndian)]
struct VersionInfo<'a> {
    #[nom(SkipBefore(6))]
    #[nom(Take = "16")]
    serial_number: &'a [u8],
    #[nom(Take = "10")]
    model_name: &'a [u8],
    #[nom(SkipBefore(34))]
    major: u16,
    minor: u16,
    build: u16,
}

fn parse_device_info(payload: &[u8]) -> Result<DeviceInfo, InverterError> {
    let (_, r) = VersionInfo::parse(payload).map_err(|e| processing_error("DT", e))?;

    Ok(DeviceInfo {
        model_name: Utils::ascii(r.model_name),
        serial_number: Utils::ascii(r.serial_number),
        software_version: format!("{}.{}.{:02x}", r.major, r.minor, r.build),
        ..Default::default()
    })
}

fn power(data: &[u8], voltage: usize, current: usize) -> Result<Value, CodecError> {
    Ok(Value::Integer(read_vi_power(data, voltage, current)?))
}

fn ppv1(data: &[u8]) -> Result<Value, CodecError> {
    power(data, 6, 8)
}

fn ppv2(data: &[u8]) -> Result<Value, CodecError> {
    power(data, 10, 12)
}

fn pgrid1(data: &[u8]) -> Result<Value, CodecError> {
    power(data, 36, 42)
}

fn pgrid2(data: &[u8]) -> Result<Value, CodecError> {
    power(data, 38, 44)
}

fn pgrid3(data: &[u8]) -> Result<Value, CodecError> {
    power(data, 40, 46)
}

// registers from 0x7594, count 0x49
pub static RUNNING: &[Sensor] = &[
    Sensor::timestamp("timestamp", 0, "Timestamp"),
    Sensor::voltage("vpv1", 6, "PV1 Voltage", PV),
    Sensor::current("ipv1", 8, "PV1 Current", PV),
    Sensor::calculated("ppv1", ppv1, "PV1 Power", "W", PV),
    Sensor::voltage("vpv2", 10, "PV2 Voltage", PV),
    Sensor::current("ipv2", 12, "PV2 Current", PV),
    Sensor::calculated("ppv2", ppv2, "PV2 Power", "W", PV),
    Sensor::integer("xx14", 14, "Unknown sensor@14", "", NONE),
    Sensor::integer("xx16", 16, "Unknown sensor@16", "", NONE),
    Sensor::integer("xx18", 18, "Unknown sensor@18", "", NONE),
    Sensor::integer("xx20", 20, "Unknown sensor@20", "", NONE),
    Sensor::integer("xx22", 22, "Unknown sensor@22", "", NONE),
    Sensor::integer("xx24", 24, "Unknown sensor@24", "", NONE),
    Sensor::integer("xx26", 26, "Unknown sensor@26", "", NONE),
    Sensor::integer("xx28", 28, "Unknown sensor@28", "", NONE),
    Sensor::voltage("vline1", 30, "On-grid L1-L2 Voltage", AC),
    Sensor::voltage("vline2", 32, "On-grid L2-L3 Voltage", AC),
    Sensor::voltage("vline3", 34, "On-grid L3-L1 Voltage", AC),
    Sensor::voltage("vgrid1", 36, "On-grid L1 Voltage", AC),
    Sensor::voltage("vgrid2", 38, "On-grid L2 Voltage", AC),
    Sensor::voltage("vgrid3", 40, "On-grid L3 Voltage", AC),
    Sensor::current("igrid1", 42, "On-grid L1 Current", AC),
    Sensor::current("igrid2", 44, "On-grid L2 Current", AC),
    Sensor::current("igrid3", 46, "On-grid L3 Current", AC),
    Sensor::frequency("fgrid1", 48, "On-grid L1 Frequency", AC),
    Sensor::frequency("fgrid2", 50, "On-grid L2 Frequency", AC),
    Sensor::frequency("fgrid3", 52, "On-grid L3 Frequency", AC),
    Sensor::calculated("pgrid1", pgrid1, "On-grid L1 Power", "W", AC),
    Sensor::calculated("pgrid2", pgrid2, "On-grid L2 Power", "W", AC),
    Sensor::calculated("pgrid3", pgrid3, "On-grid L3 Power", "W", AC),
    Sensor::integer("xx54", 54, "Unknown sensor@54", "", NONE),
    Sensor::power("ppv", 56, "PV Power", PV),
    Sensor::integer("work_mode", 58, "Work Mode code", "", NONE),
    Sensor::enum2("work_mode_label", 58, WORK_MODES_DT, "Work Mode", NONE),
    Sensor::integer("xx60", 60, "Unknown sensor@60", "", NONE),
    Sensor::integer("xx62", 62, "Unknown sensor@62", "", NONE),
    Sensor::integer("xx64", 64, "Unknown sensor@64", "", NONE),
    Sensor::integer("xx66", 66, "Unknown sensor@66", "", NONE),
    Sensor::integer("xx68", 68, "Unknown sensor@68", "", NONE),
    Sensor::integer("xx70", 70, "Unknown sensor@70", "", NONE),
    Sensor::integer("xx72", 72, "Unknown sensor@72", "", NONE),
    Sensor::integer("xx74", 74, "Unknown sensor@74", "", NONE),
    Sensor::integer("xx76", 76, "Unknown sensor@76", "", NONE),
    Sensor::integer("xx78", 78, "Unknown sensor@78", "", NONE),
    Sensor::integer("xx80", 80, "Unknown sensor@80", "", NONE),
    Sensor::temp("temperature", 82, "Inverter Temperature", AC),
    Sensor::integer("xx84", 84, "Unknown sensor@84", "", NONE),
    Sensor::integer("xx86", 86, "Unknown sensor@86", "", NONE),
    Sensor::energy("e_day", 88, "Today's PV Generation", PV),
    Sensor::integer("xx90", 90, "Unknown sensor@90", "", NONE),
    Sensor::energy("e_total", 92, "Total PV Generation", PV),
    Sensor::integer("xx94", 94, "Unknown sensor@94", "", NONE),
    Sensor::integer("h_total", 96, "Hours Total", "", PV),
    Sensor::integer("safety_country", 98, "Safety Country code", "", AC),
    Sensor::enum2("safety_country_label", 98, SAFETY_COUNTRIES, "Safety Country", AC),
    Sensor::integer("xx100", 100, "Unknown sensor@100", "", NONE),
    Sensor::integer("xx102", 102, "Unknown sensor@102", "", NONE),
    Sensor::integer("xx104", 104, "Unknown sensor@104", "", NONE),
    Sensor::integer("xx106", 106, "Unknown sensor@106", "", NONE),
    Sensor::integer("xx108", 108, "Unknown sensor@108", "", NONE),
    Sensor::integer("xx110", 110, "Unknown sensor@110", "", NONE),
    Sensor::integer("xx112", 112, "Unknown sensor@112", "", NONE),
    Sensor::integer("xx114", 114, "Unknown sensor@114", "", NONE),
    Sensor::integer("xx116", 116, "Unknown sensor@116", "", NONE),
    Sensor::integer("xx118", 118, "Unknown sensor@118", "", NONE),
    Sensor::integer("xx120", 120, "Unknown sensor@120", "", NONE),
    Sensor::integer("xx122", 122, "Unknown sensor@122", "", NONE),
    Sensor::integer("funbit", 124, "FunBit", "", PV),
    Sensor::voltage("vbus", 126, "Bus Voltage", PV),
    Sensor::voltage("vnbus", 128, "NBus Voltage", PV),
    Sensor::integer("xx130", 130, "Unknown sensor@130", "", NONE),
    Sensor::integer("xx132", 132, "Unknown sensor@132", "", NONE),
    Sensor::integer("xx134", 134, "Unknown sensor@134", "", NONE),
    Sensor::integer("xx136", 136, "Unknown sensor@136", "", NONE),
    Sensor::integer("xx138", 138, "Unknown sensor@138", "", NONE),
    Sensor::integer("xx140", 140, "Unknown sensor@140", "", NONE),
    Sensor::integer("xx142", 142, "Unknown sensor@142", "", NONE),
    Sensor::integer("xx144", 144, "Unknown sensor@144", "", NONE),
];
