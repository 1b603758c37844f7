mod common;
use common::*;

use goodwe_bridge::goodwe::family::{dt, es, et};
use goodwe_bridge::goodwe::{Inverter, Link, Value};
use goodwe_bridge::prelude::*;

const TIMEOUT: Duration = Duration::from_secs(2);

fn inverter(family: &'static goodwe_bridge::goodwe::Family, transport: ScriptedTransport) -> Inverter {
    Inverter::new(family, Link::shared(transport), None, TIMEOUT, 3)
}

fn dt_running_payload() -> Vec<u8> {
    let mut payload = vec![0u8; 0x49 * 2];
    payload[..6].copy_from_slice(&hex("170A13080F2D"));
    payload[6..8].copy_from_slice(&hex("0901")); // vpv1 230.5 V
    payload[8..10].copy_from_slice(&hex("0014")); // ipv1 2.0 A
    payload
}

#[tokio::test]
async fn runtime_data_hides_unknown_sensors() -> Result<()> {
    common_setup();

    let payload = dt_running_payload();
    let (transport, sent) = ScriptedTransport::new(modbus_device(move |_, _| payload.clone()));
    let inverter = inverter(&dt::DT, transport);

    let known = inverter.read_runtime_data(false).await?;
    assert!(known.keys().all(|k| !k.starts_with("xx")));
    assert_eq!(known.len(), 78 - 44);
    assert_eq!(known["vpv1"], Value::Float(230.5));
    assert_eq!(known["ppv1"], Value::Integer(461));

    let everything = inverter.read_runtime_data(true).await?;
    assert_eq!(everything.len(), 78);
    assert!(known.keys().all(|k| everything.contains_key(k)));

    assert_eq!(sent_frames(&sent)[0], modbus_request(0x7F, 0x03, 0x7594, 0x0049));
    Ok(())
}

#[tokio::test]
async fn runtime_blocks_are_read_in_order() -> Result<()> {
    common_setup();

    let (transport, sent) = ScriptedTransport::new(zeroed_modbus_device());
    let inverter = inverter(&et::ET, transport);

    let snapshot = inverter.read_runtime_data(false).await?;

    assert_eq!(
        sent_frames(&sent),
        vec![
            modbus_request(0xF7, 0x03, 0x891C, 0x007D),
            modbus_request(0xF7, 0x03, 0x9088, 0x0019),
            modbus_request(0xF7, 0x03, 0x8CA0, 0x002D),
        ]
    );

    // an all-zero timestamp is not a date, everything else still decodes
    assert!(!snapshot.contains_key("timestamp"));
    assert_eq!(snapshot["vpv1"], Value::Float(0.0));
    assert_eq!(snapshot["grid_in_out_label"], Value::Text("Idle".to_string()));
    Ok(())
}

#[tokio::test]
async fn et_battery_block_covers_min_cell_voltage() -> Result<()> {
    let (transport, _) = ScriptedTransport::new(modbus_device(|offset, count| {
        let mut payload = vec![0u8; count as usize * 2];
        if offset == 0x9088 {
            payload[48..50].copy_from_slice(&hex("0CE4"));
        }
        payload
    }));
    let inverter = inverter(&et::ET, transport);

    let snapshot = inverter.read_runtime_data(false).await?;

    assert_eq!(snapshot["battery_min_cell_voltage"], Value::Float(330.0));
    Ok(())
}

#[tokio::test]
async fn runtime_read_fails_when_a_block_is_unanswered() {
    let (transport, _) = ScriptedTransport::script(vec![Reply::Error(std::io::ErrorKind::ConnectionRefused)]);
    let inverter = inverter(&et::ET, transport);

    let err = inverter.read_runtime_data(false).await.unwrap_err();
    assert!(matches!(err, InverterError::NoResponse { .. }));
}

#[tokio::test]
async fn device_info_is_read_once() -> Result<()> {
    let info = et_version_info("9010KETU000W0000", "GW10K-ET");
    let (transport, sent) = ScriptedTransport::new(modbus_device(move |_, _| info.clone()));
    let mut inverter = inverter(&et::ET, transport);
    assert!(inverter.info().is_none());

    let first = inverter.read_device_info().await?;
    let second = inverter.read_device_info().await?;

    assert_eq!(first, second);
    assert_eq!(first.serial_number, "9010KETU000W0000");
    assert_eq!(first.model_name, "GW10K-ET");
    assert_eq!(first.software_version, "04029-08-S10");
    assert_eq!(first.rated_power, Some(10000));
    assert_eq!(first.arm_version.as_deref(), Some("02041-06-S00"));
    assert_eq!(inverter.serial_number(), Some("9010KETU000W0000"));
    assert_eq!(inverter.info(), Some(&first));
    assert_eq!(sent_frames(&sent), vec![hex("F70388B800213AC1")]);
    Ok(())
}

#[tokio::test]
async fn dt_firmware_version_string() -> Result<()> {
    let info = dt_version_info("5010KDTU00000000", "GW10K-DT");
    let (transport, _) = ScriptedTransport::new(modbus_device(move |_, _| info.clone()));
    let mut inverter = inverter(&dt::DT, transport);

    let info = inverter.read_device_info().await?;
    assert_eq!(info.software_version, "1.2.1a");
    assert_eq!(info.model_name, "GW10K-DT");
    Ok(())
}

#[tokio::test]
async fn caller_errors_send_nothing() {
    let (transport, sent) = ScriptedTransport::new(zeroed_modbus_device());
    let et_inverter = inverter(&et::ET, transport);

    let err = et_inverter.write_setting("no_such_setting", &Value::Integer(1)).await.unwrap_err();
    assert!(matches!(err, InverterError::UnknownSetting(_)));

    let err = et_inverter.read_setting("no_such_setting").await.unwrap_err();
    assert!(matches!(err, InverterError::UnknownSetting(_)));

    let err = et_inverter.write_setting("work_mode", &Value::Integer(40000)).await.unwrap_err();
    assert!(matches!(err, InverterError::InvalidValue { .. }));
    assert!(err.is_caller_error());

    let err = et_inverter.set_work_mode(5).await.unwrap_err();
    assert!(matches!(err, InverterError::InvalidValue { .. }));

    let err = et_inverter.set_grid_export_limit(10001).await.unwrap_err();
    assert!(matches!(err, InverterError::InvalidValue { .. }));

    let err = et_inverter.set_ongrid_battery_dod(90).await.unwrap_err();
    assert!(matches!(err, InverterError::InvalidValue { .. }));

    assert!(sent_frames(&sent).is_empty());

    let (transport, sent) = ScriptedTransport::silent();
    let es_inverter = inverter(&es::ES, transport);

    let err = es_inverter.write_setting("work_mode", &Value::Integer(1)).await.unwrap_err();
    assert!(matches!(err, InverterError::ReadOnlySetting(_)));

    let err = es_inverter.set_grid_export_limit(1000).await.unwrap_err();
    assert!(matches!(err, InverterError::Unsupported(_)));

    assert!(sent_frames(&sent).is_empty());

    let (transport, sent) = ScriptedTransport::silent();
    let dt_inverter = inverter(&dt::DT, transport);

    assert!(matches!(dt_inverter.set_work_mode(1).await, Err(InverterError::InvalidValue { .. })));
    assert!(matches!(dt_inverter.set_ongrid_battery_dod(50).await, Err(InverterError::Unsupported(_))));
    assert!(matches!(dt_inverter.read_setting("work_mode").await, Err(InverterError::UnknownSetting(_))));
    assert!(sent_frames(&sent).is_empty());
}

#[tokio::test]
async fn write_setting_request() -> Result<()> {
    let (transport, sent) = ScriptedTransport::new(zeroed_modbus_device());
    let inverter = inverter(&et::ET, transport);

    inverter.write_setting("work_mode", &Value::Integer(1)).await?;
    inverter.write_setting("battery_charge_voltage", &Value::Float(53.5)).await?;

    assert_eq!(
        sent_frames(&sent),
        vec![
            hex("F706B7980001FAC7"),
            modbus_request(0xF7, 0x06, 45352, 535),
        ]
    );
    Ok(())
}

#[tokio::test]
async fn read_setting_request() -> Result<()> {
    let (transport, sent) = ScriptedTransport::new(modbus_device(|_, _| hex("0901")));
    let inverter = inverter(&et::ET, transport);

    let value = inverter.read_setting("battery_charge_voltage").await?;

    assert_eq!(value, Value::Float(230.5));
    assert_eq!(sent_frames(&sent), vec![modbus_request(0xF7, 0x03, 45352, 1)]);
    Ok(())
}

#[tokio::test]
async fn settings_snapshot() -> Result<()> {
    let (transport, sent) = ScriptedTransport::new(zeroed_modbus_device());
    let inverter = inverter(&et::ET, transport);

    let settings = inverter.read_settings_data().await?;

    assert_eq!(settings.len(), inverter.settings().len());
    assert_eq!(sent_frames(&sent).len(), inverter.settings().len());
    assert_eq!(settings["grid_export_limit"], Value::Integer(0));
    Ok(())
}

#[tokio::test]
async fn es_settings_come_from_one_block() -> Result<()> {
    let mut block = vec![0u8; 70];
    block[32..34].copy_from_slice(&hex("0046"));
    let reply = aa55_response(0x0189, &block);
    let (transport, sent) = ScriptedTransport::new(move |_| Reply::Frame(reply.clone()));
    let inverter = inverter(&es::ES, transport);

    let settings = inverter.read_settings_data().await?;
    assert_eq!(settings["dod"], Value::Integer(30));

    let discharge_v = inverter.read_setting("discharge_v").await?;
    assert_eq!(discharge_v, Value::Integer(0));

    let frames = sent_frames(&sent);
    assert_eq!(frames.len(), 2);
    assert!(frames.iter().all(|f| f[..7] == hex("AA55C07F010900")[..]));
    Ok(())
}

#[tokio::test]
async fn convenience_operations() -> Result<()> {
    // DT export off
    let (transport, sent) = ScriptedTransport::new(zeroed_modbus_device());
    inverter(&dt::DT, transport).set_work_mode(3).await?;
    assert_eq!(sent_frames(&sent), vec![modbus_request(0x7F, 0x06, 0x9D8A, 0)]);

    // ET export limit and depth of discharge
    let (transport, sent) = ScriptedTransport::new(zeroed_modbus_device());
    let et_inverter = inverter(&et::ET, transport);
    et_inverter.set_grid_export_limit(4000).await?;
    et_inverter.set_ongrid_battery_dod(30).await?;
    assert_eq!(
        sent_frames(&sent),
        vec![
            modbus_request(0xF7, 0x06, 47510, 4000),
            modbus_request(0xF7, 0x06, 45356, 70),
        ]
    );

    // ES depth of discharge and work mode go out as AA55 commands
    let (transport, sent) = ScriptedTransport::new(|frame: &[u8]| match frame[4] {
        0x02 => Reply::Frame(aa55_response(0x02B9, &[])),
        _ => Reply::Frame(aa55_response(0x03D9, &[])),
    });
    let es_inverter = inverter(&es::ES, transport);
    es_inverter.set_ongrid_battery_dod(30).await?;
    es_inverter.set_work_mode(2).await?;

    let frames = sent_frames(&sent);
    assert_eq!(frames[0][..12], hex("AA55C07F0239050560010046")[..]);
    assert_eq!(frames[1][..7], hex("AA55C07F035901")[..]);
    assert_eq!(frames[1][7], 2);
    Ok(())
}

#[tokio::test]
async fn send_command_returns_raw_response() -> Result<()> {
    let (transport, _) = ScriptedTransport::script(vec![Reply::Frame(b"garbage".to_vec())]);
    let inverter = inverter(&et::ET, transport);

    let response = inverter.send_command(hex("F70388B80021")).await?;
    assert_eq!(response, b"garbage");
    Ok(())
}
