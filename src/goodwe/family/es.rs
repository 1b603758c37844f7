//! ES/EM/BP hybrid inverters, AA55 framing.

use crate::prelude::*;
use crate::goodwe::codec::*;
use crate::goodwe::family::*;
use crate::goodwe::labels::*;
use crate::goodwe::sensor::Sensor;

use nom_derive::{Nom, Parse};

pub const WORK_MODE_PREFIX: [u8; 3] = [0x03, 0x59, 0x01];
pub const WORK_MODE_RESPONSE: u16 = 0x03D9;
pub const DOD_PREFIX: [u8; 6] = [0x02, 0x39, 0x05, 0x05, 0x60, 0x01];
pub const DOD_RESPONSE: u16 = 0x02B9;

pub static ES: Family = Family {
    id: FamilyId::Es,
    name: "ES",
    aliases: &["ES", "EM", "BP"],
    model_tags: &["ESU", "EMU", "BPU", "BPS"],
    default_comm_addr: 0,
    device_info: Request::Aa55 { payload: &[0x01, 0x02, 0x00], response_type: 0x0182 },
    parse_device_info,
    runtime: &[Block {
        request: Request::Aa55 { payload: &[0x01, 0x06, 0x00], response_type: 0x0186 },
        sensors: RUNNING,
    }],
    settings: Settings::Block(Block {
        request: Request::Aa55 { payload: &[0x01, 0x09, 0x00], response_type: 0x0189 },
        sensors: SETTINGS,
    }),
};

#[derive(Debug, Nom)]
struct VersionInfo<'a> {
    #[nom(SkipBefore(5))]
    #[nom(Take = "10")]
    model_name: &'a [u8],
    #[nom(SkipBefore(16))]
    #[nom(Take = "16")]
    serial_number: &'a [u8],
    #[nom(SkipBefore(4))]
    #[nom(Take = "12")]
    software_version: &'a [u8],
}

fn parse_device_info(payload: &[u8]) -> Result<DeviceInfo, InverterError> {
    let (_, r) = VersionInfo::parse(payload).map_err(|e| processing_error("ES", e))?;

    Ok(DeviceInfo {
        model_name: Utils::ascii(r.model_name),
        serial_number: Utils::ascii(r.serial_number),
        software_version: Utils::ascii(r.software_version),
        ..Default::default()
    })
}

// derived values {{{
fn pv_power(data: &[u8]) -> Result<(i64, i64), CodecError> {
    Ok((read_vi_power(data, 0, 2)?, read_vi_power(data, 5, 7)?))
}

fn battery_sign(data: &[u8]) -> Result<i64, CodecError> {
    // battery mode 3 is charging
    Ok(if read_byte(data, 30)? == 3 { -1 } else { 1 })
}

fn grid_power(data: &[u8]) -> Result<i64, CodecError> {
    // grid mode 2 is importing
    let sign = if read_byte(data, 80)? == 2 { -1 } else { 1 };
    Ok(read_power2(data, 38)?.abs() * sign)
}

fn battery_power(data: &[u8]) -> Result<i64, CodecError> {
    Ok(read_vi_power(data, 10, 18)?.abs() * battery_sign(data)?)
}

fn ppv1(data: &[u8]) -> Result<Value, CodecError> {
    Ok(Value::Integer(pv_power(data)?.0))
}

fn ppv2(data: &[u8]) -> Result<Value, CodecError> {
    Ok(Value::Integer(pv_power(data)?.1))
}

fn ppv(data: &[u8]) -> Result<Value, CodecError> {
    let (p1, p2) = pv_power(data)?;
    Ok(Value::Integer(p1 + p2))
}

fn ibattery1(data: &[u8]) -> Result<Value, CodecError> {
    Ok(Value::Float(read_current(data, 18)?.abs() * battery_sign(data)? as f64))
}

fn pbattery1(data: &[u8]) -> Result<Value, CodecError> {
    Ok(Value::Integer(battery_power(data)?))
}

fn pgrid(data: &[u8]) -> Result<Value, CodecError> {
    Ok(Value::Integer(grid_power(data)?))
}

fn grid_in_out_label(data: &[u8]) -> Result<Value, CodecError> {
    Ok(lookup(GRID_MODES, read_byte(data, 80)?).into())
}

// pload + pback_up
fn plant_power(data: &[u8]) -> Result<Value, CodecError> {
    Ok(Value::Integer(read_power2(data, 47)? + read_power2(data, 81)?))
}

// ppv1 + ppv2 + pbattery - pgrid
fn house_consumption(data: &[u8]) -> Result<Value, CodecError> {
    let (p1, p2) = pv_power(data)?;
    Ok(Value::Integer(p1 + p2 + battery_power(data)? - grid_power(data)?))
}

fn dod(data: &[u8]) -> Result<Value, CodecError> {
    Ok(Value::Integer(100 - read_bytes2(data, 32)?))
} // }}}

pub static RUNNING: &[Sensor] = &[
    Sensor::voltage("vpv1", 0, "PV1 Voltage", PV),
    Sensor::current("ipv1", 2, "PV1 Current", PV),
    Sensor::calculated("ppv1", ppv1, "PV1 Power", "W", PV),
    Sensor::byte("pv1_mode", 4, "PV1 Mode code", "", PV),
    Sensor::enum1("pv1_mode_label", 4, PV_MODES, "PV1 Mode", PV),
    Sensor::voltage("vpv2", 5, "PV2 Voltage", PV),
    Sensor::current("ipv2", 7, "PV2 Current", PV),
    Sensor::calculated("ppv2", ppv2, "PV2 Power", "W", PV),
    Sensor::byte("pv2_mode", 9, "PV2 Mode code", "", PV),
    Sensor::enum1("pv2_mode_label", 9, PV_MODES, "PV2 Mode", PV),
    Sensor::calculated("ppv", ppv, "PV Power", "W", PV),
    Sensor::voltage("vbattery1", 10, "Battery Voltage", BAT),
    Sensor::temp("battery_temperature", 16, "Battery Temperature", BAT),
    Sensor::calculated("ibattery1", ibattery1, "Battery Current", "A", BAT),
    Sensor::calculated("pbattery1", pbattery1, "Battery Power", "W", BAT),
    Sensor::integer("battery_charge_limit", 20, "Battery Charge Limit", "A", BAT),
    Sensor::integer("battery_discharge_limit", 22, "Battery Discharge Limit", "A", BAT),
    Sensor::integer("battery_status", 24, "Battery Status", "", BAT),
    Sensor::byte("battery_soc", 26, "Battery State of Charge", "%", BAT),
    Sensor::byte("battery_soh", 29, "Battery State of Health", "%", BAT),
    Sensor::byte("battery_mode", 30, "Battery Mode code", "", BAT),
    Sensor::enum1("battery_mode_label", 30, BATTERY_MODES_ET, "Battery Mode", BAT),
    Sensor::integer("battery_warning", 31, "Battery Warning", "", BAT),
    Sensor::byte("meter_status", 33, "Meter Status code", "", AC),
    Sensor::voltage("vgrid", 34, "On-grid Voltage", AC),
    Sensor::current("igrid", 36, "On-grid Current", AC),
    Sensor::calculated("pgrid", pgrid, "On-grid Export Power", "W", AC),
    Sensor::frequency("fgrid", 40, "On-grid Frequency", AC),
    Sensor::byte("grid_mode", 42, "Work Mode code", "", AC),
    Sensor::enum1("grid_mode_label", 42, WORK_MODES_ES, "Work Mode", AC),
    Sensor::voltage("vload", 43, "Back-up Voltage", UPS),
    Sensor::current("iload", 45, "Back-up Current", UPS),
    Sensor::power("pload", 47, "On-grid Power", AC),
    Sensor::frequency("fload", 49, "Back-up Frequency", UPS),
    Sensor::byte("load_mode", 51, "Load Mode code", "", AC),
    Sensor::enum1("load_mode_label", 51, LOAD_MODES, "Load Mode", AC),
    Sensor::byte("work_mode", 52, "Energy Mode code", "", AC),
    Sensor::enum1("work_mode_label", 52, ENERGY_MODES, "Energy Mode", AC),
    Sensor::temp("temperature", 53, "Inverter Temperature", NONE),
    Sensor::long("error_codes", 55, "Error Codes", "", NONE),
    Sensor::energy4("e_total", 59, "Total PV Generation", PV),
    Sensor::long("h_total", 63, "Hours Total", "h", PV),
    Sensor::energy("e_day", 67, "Today's PV Generation", PV),
    Sensor::energy("e_load_day", 69, "Today's Load", NONE),
    Sensor::energy4("e_load_total", 71, "Total Load", NONE),
    Sensor::power("total_power", 75, "Total Power", NONE),
    Sensor::byte("effective_work_mode", 77, "Effective Work Mode code", "", NONE),
    Sensor::byte("grid_in_out", 80, "On-grid Mode code", "", AC),
    Sensor::calculated("grid_in_out_label", grid_in_out_label, "On-grid Mode", "", AC),
    Sensor::power("pback_up", 81, "Back-up Power", UPS),
    Sensor::calculated("plant_power", plant_power, "Plant Power", "W", AC),
    Sensor::long("diagnose_result", 89, "Diag Status", "", NONE),
    Sensor::calculated("house_consumption", house_consumption, "House Consumption", "W", AC),
];

// offsets within the settings block
pub static SETTINGS: &[Sensor] = &[
    Sensor::integer("charge_power_limit", 4, "Charge Power Limit Value", "", NONE),
    Sensor::integer("discharge_power_limit", 10, "Discharge Power Limit Value", "", NONE),
    Sensor::byte("relay_control", 13, "Relay Control", "", NONE),
    Sensor::byte("off-grid_charge", 15, "Off-grid Charge", "", NONE),
    Sensor::byte("shadow_scan", 17, "Shadow Scan", "", NONE),
    Sensor::integer("backflow_state", 18, "Backflow State", "", NONE),
    Sensor::integer("capacity", 22, "Capacity", "", NONE),
    Sensor::integer("charge_v", 24, "Charge Voltage", "V", NONE),
    Sensor::integer("charge_i", 26, "Charge Current", "A", NONE),
    Sensor::integer("discharge_i", 28, "Discharge Current", "A", NONE),
    Sensor::integer("discharge_v", 30, "Discharge Voltage", "V", NONE),
    Sensor::calculated("dod", dod, "Depth of Discharge", "%", NONE),
    Sensor::integer("battery_activated", 34, "Battery Activated", "", NONE),
    Sensor::integer("bp_off_grid_charge", 36, "BP Off-grid Charge", "", NONE),
    Sensor::integer("bp_pv_discharge", 38, "BP PV Discharge", "", NONE),
    Sensor::integer("bp_bms_protocol", 40, "BP BMS Protocol", "", NONE),
    Sensor::integer("power_factor", 42, "Power Factor", "", NONE),
    Sensor::integer("grid_up_limit", 52, "Grid Up Limit", "", NONE),
    Sensor::integer("soc_protect", 56, "SoC Protect", "", NONE),
    Sensor::integer("work_mode", 66, "Work Mode", "", NONE),
    Sensor::integer("grid_quality_check", 68, "Grid Quality Check", "", NONE),
];
