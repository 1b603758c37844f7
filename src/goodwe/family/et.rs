//! ET/EH/BT/BH hybrid inverters, modbus framing.

use crate::prelude::*;
use crate::goodwe::codec::*;
use crate::goodwe::family::*;
use crate::goodwe::labels::*;
use crate::goodwe::sensor::Sensor;

use nom_derive::{Nom, Parse};

pub const DEFAULT_COMM_ADDR: u8 = 0xF7;

pub const REG_WORK_MODE: u16 = 47000;
pub const REG_GRID_EXPORT_LIMIT: u16 = 47510;
pub const REG_DISCHARGE_DEPTH: u16 = 45356;

pub static ET: Family = Family {
    id: FamilyId::Et,
    name: "ET",
    aliases: &["ET", "EH", "BT", "BH"],
    model_tags: &["ETU", "EHU", "BTU", "BHU"],
    default_comm_addr: DEFAULT_COMM_ADDR,
    device_info: Request::ModbusRead { offset: 0x88b8, count: 0x0021 },
    parse_device_info,
    runtime: &[
        Block { request: Request::ModbusRead { offset: 0x891c, count: 0x007d }, sensors: RUNNING },
        Block { request: Request::ModbusRead { offset: 0x9088, count: 0x0019 }, sensors: BATTERY },
        Block { request: Request::ModbusRead { offset: 0x8ca0, count: 0x002d }, sensors: METER },
    ],
    settings: Settings::Registers(SETTINGS),
};

// version info, registers from 35000
#[derive(Debug, Nom)]
#[nom(BigEndian)]
struct VersionInfo<'a> {
    modbus_version: u16,
    rated_power: u16,
    ac_output_type: u16, // 0: 1-phase, 1: 3-phase 4 wire, 2: 3-phase 3 wire
    #[nom(Take = "16")]
    serial_number: &'a [u8],
    #[nom(Take = "10")]
    model_name: &'a [u8],
    dsp1_sw_version: u16,
    dsp2_sw_version: u16,
    dsp_spn_version: u16,
    arm_sw_version: u16,
    arm_svn_version: u16,
    #[nom(Take = "12")]
    software_version: &'a [u8],
    #[nom(Take = "12")]
    arm_version: &'a [u8],
}

fn parse_device_info(payload: &[u8]) -> Result<DeviceInfo, InverterError> {
    let (_, r) = VersionInfo::parse(payload).map_err(|e| processing_error("ET", e))?;

    Ok(DeviceInfo {
        model_name: Utils::ascii(r.model_name),
        serial_number: Utils::ascii(r.serial_number),
        software_version: Utils::ascii(r.software_version),
        rated_power: Some(r.rated_power),
        modbus_version: Some(r.modbus_version),
        ac_output_type: Some(r.ac_output_type),
        dsp1_sw_version: Some(r.dsp1_sw_version),
        dsp2_sw_version: Some(r.dsp2_sw_version),
        dsp_spn_version: Some(r.dsp_spn_version),
        arm_sw_version: Some(r.arm_sw_version),
        arm_svn_version: Some(r.arm_svn_version),
        arm_version: Some(Utils::ascii(r.arm_version)),
    })
}

// derived values {{{
fn ppv(data: &[u8]) -> Result<Value, CodecError> {
    Ok(Value::Integer(read_power4(data, 10)? + read_power4(data, 18)?))
}

fn grid_in_out(data: &[u8]) -> Result<Value, CodecError> {
    Ok(Value::Integer(read_grid_mode(data, 78)?))
}

fn grid_in_out_label(data: &[u8]) -> Result<Value, CodecError> {
    Ok(lookup(GRID_MODES, read_grid_mode(data, 78)?).into())
}

fn load_ptotal(data: &[u8]) -> Result<Value, CodecError> {
    Ok(Value::Integer(
        read_power4(data, 126)? + read_power4(data, 130)? + read_power4(data, 134)?,
    ))
}

fn pbattery1(data: &[u8]) -> Result<Value, CodecError> {
    Ok(Value::Integer(read_vi_power(data, 160, 162)?))
}

// ppv1 + ppv2 + pbattery - active_power
fn house_consumption(data: &[u8]) -> Result<Value, CodecError> {
    Ok(Value::Integer(
        read_power4(data, 10)? + read_power4(data, 18)? + read_vi_power(data, 160, 162)?
            - read_power4(data, 78)?,
    ))
} // }}}

// registers from 0x891c (35100), count 0x7d
pub static RUNNING: &[Sensor] = &[
    Sensor::timestamp("timestamp", 0, "Timestamp"),
    Sensor::voltage("vpv1", 6, "PV1 Voltage", PV),
    Sensor::current("ipv1", 8, "PV1 Current", PV),
    Sensor::power4("ppv1", 10, "PV1 Power", PV),
    Sensor::voltage("vpv2", 14, "PV2 Voltage", PV),
    Sensor::current("ipv2", 16, "PV2 Current", PV),
    Sensor::power4("ppv2", 18, "PV2 Power", PV),
    Sensor::calculated("ppv", ppv, "PV Power", "W", PV),
    Sensor::integer("xx38", 38, "Unknown sensor@38", "", NONE),
    Sensor::integer("xx40", 40, "Unknown sensor@40", "", NONE),
    Sensor::voltage("vgrid", 42, "On-grid L1 Voltage", AC),
    Sensor::current("igrid", 44, "On-grid L1 Current", AC),
    Sensor::frequency("fgrid", 46, "On-grid L1 Frequency", AC),
    Sensor::power4("pgrid", 48, "On-grid L1 Power", AC),
    Sensor::voltage("vgrid2", 52, "On-grid L2 Voltage", AC),
    Sensor::current("igrid2", 54, "On-grid L2 Current", AC),
    Sensor::frequency("fgrid2", 56, "On-grid L2 Frequency", AC),
    Sensor::power4("pgrid2", 58, "On-grid L2 Power", AC),
    Sensor::voltage("vgrid3", 62, "On-grid L3 Voltage", AC),
    Sensor::current("igrid3", 64, "On-grid L3 Current", AC),
    Sensor::frequency("fgrid3", 66, "On-grid L3 Frequency", AC),
    Sensor::power4("pgrid3", 68, "On-grid L3 Power", AC),
    Sensor::integer("xx72", 72, "Unknown sensor@72", "", NONE),
    Sensor::power4("total_inverter_power", 74, "Total Power", AC),
    Sensor::power4("active_power", 78, "Active Power", AC),
    Sensor::calculated("grid_in_out", grid_in_out, "On-grid Mode code", "", AC),
    Sensor::calculated("grid_in_out_label", grid_in_out_label, "On-grid Mode", "", AC),
    Sensor::power4("reactive_power", 82, "Reactive Power", AC),
    Sensor::power4("apparent_power", 86, "Apparent Power", AC),
    Sensor::voltage("backup_v1", 90, "Back-up L1 Voltage", UPS),
    Sensor::current("backup_i1", 92, "Back-up L1 Current", UPS),
    Sensor::frequency("backup_f1", 94, "Back-up L1 Frequency", UPS),
    Sensor::integer("load_mode1", 96, "Load Mode L1", "", NONE),
    Sensor::power4("backup_p1", 98, "Back-up L1 Power", UPS),
    Sensor::voltage("backup_v2", 102, "Back-up L2 Voltage", UPS),
    Sensor::current("backup_i2", 104, "Back-up L2 Current", UPS),
    Sensor::frequency("backup_f2", 106, "Back-up L2 Frequency", UPS),
    Sensor::integer("load_mode2", 108, "Load Mode L2", "", NONE),
    Sensor::power4("backup_p2", 110, "Back-up L2 Power", UPS),
    Sensor::voltage("backup_v3", 114, "Back-up L3 Voltage", UPS),
    Sensor::current("backup_i3", 116, "Back-up L3 Current", UPS),
    Sensor::frequency("backup_f3", 118, "Back-up L3 Frequency", UPS),
    Sensor::integer("load_mode3", 120, "Load Mode L3", "", NONE),
    Sensor::power4("backup_p3", 122, "Back-up L3 Power", UPS),
    Sensor::power4("load_p1", 126, "Load L1", AC),
    Sensor::power4("load_p2", 130, "Load L2", AC),
    Sensor::power4("load_p3", 134, "Load L3", AC),
    Sensor::calculated("load_ptotal", load_ptotal, "Load Total", "W", AC),
    Sensor::power4("backup_ptotal", 138, "Back-up Power", UPS),
    Sensor::power4("pload", 142, "Load", AC),
    Sensor::integer("ups_load", 146, "Ups Load", "%", UPS),
    Sensor::temp("temperature_air", 148, "Inverter Temperature (Air)", AC),
    Sensor::temp("temperature_module", 150, "Inverter Temperature (Module)", NONE),
    Sensor::temp("temperature", 152, "Inverter Temperature (Radiator)", AC),
    Sensor::integer("xx154", 154, "Unknown sensor@154", "", NONE),
    Sensor::voltage("bus_voltage", 156, "Bus Voltage", NONE),
    Sensor::voltage("nbus_voltage", 158, "NBus Voltage", NONE),
    Sensor::voltage("vbattery1", 160, "Battery Voltage", BAT),
    Sensor::current("ibattery1", 162, "Battery Current", BAT),
    Sensor::calculated("pbattery1", pbattery1, "Battery Power", "W", BAT),
    Sensor::integer("battery_mode", 168, "Battery Mode code", "", BAT),
    Sensor::enum2("battery_mode_label", 168, BATTERY_MODES_ET, "Battery Mode", BAT),
    Sensor::integer("warning_code", 170, "Warning code", "", NONE),
    Sensor::integer("safety_country", 172, "Safety Country code", "", AC),
    Sensor::enum2("safety_country_label", 172, SAFETY_COUNTRIES, "Safety Country", AC),
    Sensor::integer("work_mode", 174, "Work Mode code", "", NONE),
    Sensor::enum2("work_mode_label", 174, WORK_MODES_ET, "Work Mode", NONE),
    Sensor::integer("operation_mode", 176, "Operation Mode code", "", NONE),
    Sensor::long("error_codes", 178, "Error Codes", "", NONE),
    Sensor::energy4("e_total", 182, "Total PV Generation", PV),
    Sensor::energy4("e_day", 186, "Today's PV Generation", PV),
    Sensor::energy4("e_total_exp", 190, "Total Energy (export)", AC),
    Sensor::long("h_total", 194, "Hours Total", "h", PV),
    Sensor::energy("e_day_exp", 198, "Today Energy (export)", AC),
    Sensor::energy4("e_total_imp", 200, "Total Energy (import)", AC),
    Sensor::energy("e_day_imp", 204, "Today Energy (import)", AC),
    Sensor::energy4("e_load_total", 206, "Total Load", AC),
    Sensor::energy("e_load_day", 210, "Today Load", AC),
    Sensor::energy4("e_bat_charge_total", 212, "Total Battery Charge", BAT),
    Sensor::energy("e_bat_charge_day", 216, "Today Battery Charge", BAT),
    Sensor::energy4("e_bat_discharge_total", 218, "Total Battery Discharge", BAT),
    Sensor::energy("e_bat_discharge_day", 222, "Today Battery Discharge", BAT),
    Sensor::long("diagnose_result", 240, "Diag Status", "", NONE),
    Sensor::calculated("house_consumption", house_consumption, "House Consumption", "W", AC),
];

// registers from 0x9088 (37000)
pub static BATTERY: &[Sensor] = &[
    Sensor::integer("battery_bms", 0, "Battery BMS", "", BAT),
    Sensor::integer("battery_index", 2, "Battery Index", "", BAT),
    Sensor::integer("battery_status", 4, "Battery Status", "", BAT),
    Sensor::temp("battery_temperature", 6, "Battery Temperature", BAT),
    Sensor::integer("battery_charge_limit", 8, "Battery Charge Limit", "A", BAT),
    Sensor::integer("battery_discharge_limit", 10, "Battery Discharge Limit", "A", BAT),
    Sensor::integer("battery_error_l", 12, "Battery Error L", "", BAT),
    Sensor::integer("battery_soc", 14, "Battery State of Charge", "%", BAT),
    Sensor::integer("battery_soh", 16, "Battery State of Health", "%", BAT),
    Sensor::integer("battery_modules", 18, "Battery Modules", "", BAT),
    Sensor::integer("battery_warning_l", 20, "Battery Warning L", "", BAT),
    Sensor::integer("battery_protocol", 22, "Battery Protocol", "", BAT),
    Sensor::integer("battery_error_h", 24, "Battery Error H", "", BAT),
    Sensor::integer("battery_warning_h", 28, "Battery Warning H", "", BAT),
    Sensor::integer("battery_sw_version", 30, "Battery Software Version", "", BAT),
    Sensor::integer("battery_hw_version", 32, "Battery Hardware Version", "", BAT),
    Sensor::integer("battery_max_cell_temp_id", 34, "Battery Max Cell Temperature ID", "", BAT),
    Sensor::integer("battery_min_cell_temp_id", 36, "Battery Min Cell Temperature ID", "", BAT),
    Sensor::integer("battery_max_cell_voltage_id", 38, "Battery Max Cell Voltage ID", "", BAT),
    Sensor::integer("battery_min_cell_voltage_id", 40, "Battery Min Cell Voltage ID", "", BAT),
    Sensor::temp("battery_max_cell_temp", 42, "Battery Max Cell Temperature", BAT),
    Sensor::temp("battery_min_cell_temp", 44, "Battery Min Cell Temperature", BAT),
    Sensor::voltage("battery_max_cell_voltage", 46, "Battery Max Cell Voltage", BAT),
    Sensor::voltage("battery_min_cell_voltage", 48, "Battery Min Cell Voltage", BAT),
];

// registers from 0x8ca0 (36000)
pub static METER: &[Sensor] = &[
    Sensor::integer("commode", 0, "Commode", "", NONE),
    Sensor::integer("rssi", 2, "RSSI", "", NONE),
    Sensor::integer("manufacture_code", 4, "Manufacture Code", "", NONE),
    Sensor::integer("meter_test_status", 6, "Meter Test Status", "", NONE), // 1 correct, 2 reverse, 3 incorrect, 0 not checked
    Sensor::integer("meter_comm_status", 8, "Meter Communication Status", "", NONE),
    Sensor::power("active_power1", 10, "Active Power L1", AC),
    Sensor::power("active_power2", 12, "Active Power L2", AC),
    Sensor::power("active_power3", 14, "Active Power L3", AC),
    Sensor::integer("active_power_total", 16, "Active Power Total", "", NONE),
    Sensor::integer("reactive_power_total", 18, "Reactive Power Total", "", NONE),
    Sensor::decimal("meter_power_factor1", 20, 100, "Meter Power Factor L1", NONE),
    Sensor::decimal("meter_power_factor2", 22, 100, "Meter Power Factor L2", NONE),
    Sensor::decimal("meter_power_factor3", 24, 100, "Meter Power Factor L3", NONE),
    Sensor::decimal("meter_power_factor", 26, 100, "Meter Power Factor", NONE),
    Sensor::frequency("meter_freq", 28, "Meter Frequency", GRID),
    Sensor::float("meter_e_total_exp", 30, 1000, "Meter Total Energy (export)", "kWh", GRID),
    Sensor::float("meter_e_total_imp", 34, 1000, "Meter Total Energy (import)", "kWh", GRID),
    Sensor::long("meter_active_power1", 38, "Meter Active Power L1", "W", GRID),
    Sensor::long("meter_active_power2", 42, "Meter Active Power L2", "W", GRID),
    Sensor::long("meter_active_power3", 46, "Meter Active Power L3", "W", GRID),
    Sensor::long("meter_active_power_total", 50, "Meter Active Power Total", "W", GRID),
    Sensor::long("meter_reactive_power1", 54, "Meter Reactive Power L1", "W", GRID),
    Sensor::long("meter_reactive_power2", 58, "Meter Reactive Power L2", "W", GRID),
    Sensor::long("meter_reactive_power3", 62, "Meter Reactive Power L3", "W", GRID),
    Sensor::long("meter_reactive_power_total", 66, "Meter Reactive Power Total", "W", GRID),
    Sensor::long("meter_apparent_power1", 70, "Meter Apparent Power L1", "", GRID),
    Sensor::long("meter_apparent_power2", 74, "Meter Apparent Power L2", "", GRID),
    Sensor::long("meter_apparent_power3", 78, "Meter Apparent Power L3", "", GRID),
    Sensor::long("meter_apparent_power_total", 82, "Meter Apparent Power Total", "", GRID),
    Sensor::integer("meter_type", 86, "Meter Type", "", GRID),
    Sensor::integer("meter_sw_version", 88, "Meter Software Version", "", GRID),
];

// offsets are holding register addresses
pub static SETTINGS: &[Sensor] = &[
    Sensor::integer("cold_start", 45248, "Cold Start", "", AC).writable(),
    Sensor::integer("shadow_scan", 45251, "Shadow Scan", "", PV).writable(),
    Sensor::integer("backup_supply", 45252, "Backup Supply", "", UPS).writable(),
    Sensor::integer("sensitivity_check", 45246, "Sensitivity Check Mode", "", AC).writable(),
    Sensor::integer("battery_capacity", 45350, "Battery Capacity", "Ah", BAT).writable(),
    Sensor::integer("battery_modules", 45351, "Battery Modules", "", BAT).writable(),
    Sensor::voltage("battery_charge_voltage", 45352, "Battery Charge Voltage", BAT).writable(),
    Sensor::current("battery_charge_current", 45353, "Battery Charge Current", BAT).writable(),
    Sensor::voltage("battery_discharge_voltage", 45354, "Battery Discharge Voltage", BAT).writable(),
    Sensor::current("battery_discharge_current", 45355, "Battery Discharge Current", BAT).writable(),
    Sensor::integer("battery_discharge_depth", REG_DISCHARGE_DEPTH as usize, "Battery Discharge Depth", "%", BAT).writable(),
    Sensor::voltage("battery_discharge_voltage_offline", 45357, "Battery Discharge Voltage (off-line)", BAT).writable(),
    Sensor::integer("battery_discharge_depth_offline", 45358, "Battery Discharge Depth (off-line)", "%", BAT).writable(),
    Sensor::decimal("power_factor", 45482, 100, "Power Factor", NONE).writable(),
    Sensor::integer("work_mode", REG_WORK_MODE as usize, "Work Mode", "", AC).writable(),
    Sensor::integer("battery_soc_protection", 47500, "Battery SoC Protection", "", BAT).writable(),
    Sensor::integer("grid_export", 47509, "Grid Export Enabled", "", AC).writable(),
    Sensor::integer("grid_export_limit", REG_GRID_EXPORT_LIMIT as usize, "Grid Export Limit", "W", AC).writable(),
];
