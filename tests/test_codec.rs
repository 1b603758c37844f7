mod common;
use common::*;

use goodwe_bridge::goodwe::codec::*;
use goodwe_bridge::goodwe::labels::*;
use goodwe_bridge::prelude::*;

use chrono::NaiveDate;

const FAULTS: Labels = &[(0, "OverTemp"), (3, "Unused"), (5, "GridFault")];

#[test]
fn scaled_readers() {
    common_setup();

    let data = hex("0901FFF6138800FA");
    assert_eq!(read_voltage(&data, 0).unwrap(), 230.5);
    assert_eq!(read_current(&data, 2).unwrap(), -1.0);
    assert_eq!(read_freq(&data, 4).unwrap(), 50.0);
    assert_eq!(read_temp(&data, 6).unwrap(), 25.0);
    assert_eq!(read_unsigned2(&data, 2).unwrap(), 0xFFF6);
}

#[test]
fn signed_power_and_energy() {
    let data = hex("FFFFFF9C000186A0");
    assert_eq!(read_power4(&data, 0).unwrap(), -100);
    assert_eq!(read_energy4(&data, 4).unwrap(), 10000.0);
    assert_eq!(read_power2(&data, 2).unwrap(), -100);
}

#[test]
fn voltage_round_trip() {
    let encoded = encode_voltage(230.5).unwrap();
    assert_eq!(encoded, [0x09, 0x01]);
    assert_eq!(read_voltage(&encoded, 0).unwrap(), 230.5);

    let codec = Codec::Voltage;
    let bytes = codec.encode(&Value::Float(-12.3)).unwrap();
    assert_eq!(codec.decode(&bytes, 0).unwrap(), Value::Float(-12.3));
}

#[test]
fn encoders_reject_out_of_range() {
    assert!(matches!(encode_voltage(4000.0), Err(CodecError::Unencodable { .. })));
    assert!(matches!(encode_current(-3276.9), Err(CodecError::Unencodable { .. })));
    assert!(Codec::Integer.encode(&Value::Integer(40000)).is_err());
    assert!(Codec::Byte.encode(&Value::Integer(128)).is_err());
    assert!(Codec::Integer.encode(&Value::Float(1.5)).is_err());
    assert!(Codec::Integer.encode(&Value::Text("on".to_string())).is_err());
    assert!(Codec::Timestamp.encode(&Value::Integer(1)).is_err());
}

#[test]
fn integer_encodings() {
    assert_eq!(Codec::Integer.encode(&Value::Integer(-2)).unwrap(), vec![0xFF, 0xFE]);
    assert_eq!(Codec::Long.encode(&Value::Integer(70000)).unwrap(), hex("00011170"));
    assert_eq!(
        Codec::Decimal { scale: 100, width: 2 }.encode(&Value::Float(0.99)).unwrap(),
        vec![0x00, 0x63]
    );
}

#[test]
fn float_is_scaled_and_rounded() {
    // 1.0f32
    let data = hex("3F800000");
    assert_eq!(read_float4(&data, 0, 1000).unwrap(), 0.001);
    assert_eq!(Codec::Float { scale: 1 }.decode(&data, 0).unwrap(), Value::Float(1.0));
}

#[test]
fn bitmap_lists_set_bits_in_order() {
    let value = (1 << 0) | (1 << 5);
    assert_eq!(decode_bitmap(value, FAULTS), "OverTemp, GridFault");

    // bit 1 has no label and is skipped
    assert_eq!(decode_bitmap(0b10, FAULTS), "");
    assert_eq!(
        Codec::Bitmap(FAULTS).decode(&hex("00000021"), 0).unwrap(),
        Value::Text("OverTemp, GridFault".to_string())
    );
}

#[test]
fn enum_lookup() {
    let data = [0x02, 0x00, 0x07];
    assert_eq!(
        Codec::Enum(GRID_MODES).decode(&data, 0).unwrap(),
        Value::Text("Importing".to_string())
    );
    assert_eq!(Codec::Enum2(WORK_MODES_DT).decode(&data, 1).unwrap(), Value::Empty);
    assert_eq!(lookup(GRID_MODES, 9), None);
}

#[test]
fn grid_mode_thresholds() {
    assert_eq!(grid_mode(-91), 2);
    assert_eq!(grid_mode(-90), 0);
    assert_eq!(grid_mode(89), 0);
    assert_eq!(grid_mode(90), 1);
}

#[test]
fn timestamp() {
    let data = hex("170A13080F2D");
    assert_eq!(
        read_timestamp(&data, 0).unwrap(),
        NaiveDate::from_ymd_opt(2023, 10, 19).unwrap().and_hms_opt(8, 15, 45).unwrap()
    );

    let zeroed = [0u8; 6];
    assert_eq!(read_timestamp(&zeroed, 0), Err(CodecError::InvalidTimestamp(zeroed)));
}

#[test]
fn out_of_bounds_is_an_error() {
    let data = [0x01, 0x02, 0x03];
    assert_eq!(
        read_bytes4(&data, 0),
        Err(CodecError::OutOfBounds { offset: 0, width: 4, len: 3 })
    );
    assert!(read_bytes2(&data, 2).is_err());
    assert!(read_byte(&data, usize::MAX).is_err());
    assert!(Codec::Timestamp.decode(&data, 0).is_err());
}

#[test]
fn decoding_is_repeatable() {
    let data = hex("0901FFF6138800FA3F800000");
    for codec in [Codec::Voltage, Codec::Integer, Codec::Long, Codec::Energy, Codec::Float { scale: 10 }] {
        assert_eq!(codec.decode(&data, 0), codec.decode(&data, 0));
    }
}

#[test]
fn value_parsing() {
    assert_eq!("42".parse::<Value>().unwrap(), Value::Integer(42));
    assert_eq!(" 230.5 ".parse::<Value>().unwrap(), Value::Float(230.5));
    assert!("on".parse::<Value>().is_err());
}

#[test]
fn value_accessors() {
    assert_eq!(Value::Integer(-7).as_i64(), Some(-7));
    assert_eq!(Value::Float(30.0).as_i64(), Some(30));
    assert_eq!(Value::Float(30.5).as_i64(), None);
    assert_eq!(Value::Text("Idle".to_string()).as_i64(), None);

    assert_eq!(Value::Integer(3).as_f64(), Some(3.0));
    assert_eq!(Value::Empty.as_f64(), None);
}
