use crate::error::CodecError;
use crate::utils::Utils;

use {
    chrono::{NaiveDate, NaiveDateTime},
    serde::Serialize,
    std::fmt,
    std::str::FromStr,
};

/// Integer code to label lookup table.
pub type Labels = &'static [(i64, &'static str)];

/// Function of the whole payload, for derived sensors.
pub type Calculation = fn(&[u8]) -> Result<Value, CodecError>;

/// A decoded field value.
#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(untagged)]
pub enum Value {
    Integer(i64),
    Float(f64),
    Text(String),
    Timestamp(NaiveDateTime),
    /// Enum code with no label.
    Empty,
}

impl Value {
    pub fn as_i64(&self) -> Option<i64> {
        match self {
            Value::Integer(i) => Some(*i),
            Value::Float(f) if f.fract() == 0.0 => Some(*f as i64),
            _ => None,
        }
    }

    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Value::Integer(i) => Some(*i as f64),
            Value::Float(f) => Some(*f),
            _ => None,
        }
    }
}

impl From<i64> for Value {
    fn from(v: i64) -> Self {
        Value::Integer(v)
    }
}

impl From<f64> for Value {
    fn from(v: f64) -> Self {
        Value::Float(v)
    }
}

impl From<Option<&str>> for Value {
    fn from(v: Option<&str>) -> Self {
        v.map(|s| Value::Text(s.to_string())).unwrap_or(Value::Empty)
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Integer(i) => write!(f, "{}", i),
            Value::Float(v) => write!(f, "{}", v),
            Value::Text(s) => write!(f, "{}", s),
            Value::Timestamp(t) => write!(f, "{}", t),
            Value::Empty => Ok(()),
        }
    }
}

impl FromStr for Value {
    type Err = std::num::ParseFloatError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().parse::<i64>() {
            Ok(i) => Ok(Value::Integer(i)),
            Err(_) => s.trim().parse::<f64>().map(Value::Float),
        }
    }
}

/// How the bytes of one field are interpreted.
#[derive(Clone, Copy, Debug)]
pub enum Codec {
    Byte,
    Integer,
    Long,
    Voltage,
    Current,
    Frequency,
    Temp,
    Power,
    Power4,
    Energy,
    Energy4,
    Decimal { scale: u32, width: usize },
    Float { scale: u32 },
    Timestamp,
    Enum(Labels),
    Enum2(Labels),
    Bitmap(Labels),
    Calculated(Calculation),
}

impl Codec {
    pub fn name(&self) -> &'static str {
        use Codec::*;

        match self {
            Byte => "byte",
            Integer => "integer",
            Long => "long",
            Voltage => "voltage",
            Current => "current",
            Frequency => "frequency",
            Temp => "temperature",
            Power => "power",
            Power4 => "power4",
            Energy => "energy",
            Energy4 => "energy4",
            Decimal { .. } => "decimal",
            Float { .. } => "float",
            Timestamp => "timestamp",
            Enum(_) => "enum",
            Enum2(_) => "enum2",
            Bitmap(_) => "bitmap",
            Calculated(_) => "calculated",
        }
    }

    /// Bytes consumed at the field offset. Zero for calculated fields.
    pub fn width(&self) -> usize {
        use Codec::*;

        match self {
            Byte | Enum(_) => 1,
            Integer | Voltage | Current | Frequency | Temp | Power | Energy | Enum2(_) => 2,
            Long | Power4 | Energy4 | Float { .. } | Bitmap(_) => 4,
            Decimal { width, .. } => *width,
            Timestamp => 6,
            Calculated(_) => 0,
        }
    }

    pub fn unit(&self) -> &'static str {
        use Codec::*;

        match self {
            Voltage => "V",
            Current => "A",
            Frequency => "Hz",
            Temp => "C",
            Power | Power4 => "W",
            Energy | Energy4 => "kWh",
            _ => "",
        }
    }

    pub fn decode(&self, data: &[u8], offset: usize) -> Result<Value, CodecError> {
        use Codec::*;

        Ok(match self {
            Byte => Value::Integer(read_byte(data, offset)?),
            Integer => Value::Integer(read_bytes2(data, offset)?),
            Long => Value::Integer(read_bytes4(data, offset)?),
            Voltage => Value::Float(read_voltage(data, offset)?),
            Current => Value::Float(read_current(data, offset)?),
            Frequency => Value::Float(read_freq(data, offset)?),
            Temp => Value::Float(read_temp(data, offset)?),
            Power => Value::Integer(read_power2(data, offset)?),
            Power4 => Value::Integer(read_power4(data, offset)?),
            Energy => Value::Float(read_energy2(data, offset)?),
            Energy4 => Value::Float(read_energy4(data, offset)?),
            Decimal { scale, width } => Value::Float(read_decimal(data, offset, *scale, *width)?),
            Float { scale } => Value::Float(read_float4(data, offset, *scale)?),
            Timestamp => Value::Timestamp(read_timestamp(data, offset)?),
            Enum(labels) => lookup(labels, read_byte(data, offset)?).into(),
            Enum2(labels) => lookup(labels, read_bytes2(data, offset)?).into(),
            Bitmap(labels) => Value::Text(decode_bitmap(read_bytes4(data, offset)? as u32, labels)),
            Calculated(f) => f(data)?,
        })
    }

    /// Inverse transform for settings writes.
    pub fn encode(&self, value: &Value) -> Result<Vec<u8>, CodecError> {
        use Codec::*;

        let unencodable = || CodecError::Unencodable {
            value: value.to_string(),
            codec: self.name(),
        };
        let number = value.as_f64().ok_or_else(unencodable)?;

        match self {
            Byte => Ok(encode_int(number, 1).ok_or_else(unencodable)?),
            Integer | Power => Ok(encode_int(number, 2).ok_or_else(unencodable)?),
            Long | Power4 => Ok(encode_int(number, 4).ok_or_else(unencodable)?),
            Voltage => Ok(encode_voltage(number)?.to_vec()),
            Current => Ok(encode_current(number)?.to_vec()),
            Decimal { scale, width } => encode_decimal(number, *scale, *width),
            _ => Err(unencodable()),
        }
    }
}

fn span<const N: usize>(data: &[u8], offset: usize) -> Result<[u8; N], CodecError> {
    offset
        .checked_add(N)
        .and_then(|end| data.get(offset..end))
        .and_then(|s| s.try_into().ok())
        .ok_or(CodecError::OutOfBounds {
            offset,
            width: N,
            len: data.len(),
        })
}

pub fn read_byte(data: &[u8], offset: usize) -> Result<i64, CodecError> {
    Ok(i8::from_be_bytes(span(data, offset)?) as i64)
}

pub fn read_bytes2(data: &[u8], offset: usize) -> Result<i64, CodecError> {
    Ok(i16::from_be_bytes(span(data, offset)?) as i64)
}

pub fn read_bytes4(data: &[u8], offset: usize) -> Result<i64, CodecError> {
    Ok(i32::from_be_bytes(span(data, offset)?) as i64)
}

pub fn read_unsigned2(data: &[u8], offset: usize) -> Result<u16, CodecError> {
    Ok(u16::from_be_bytes(span(data, offset)?))
}

pub fn read_voltage(data: &[u8], offset: usize) -> Result<f64, CodecError> {
    Ok(read_bytes2(data, offset)? as f64 / 10.0)
}

pub fn read_current(data: &[u8], offset: usize) -> Result<f64, CodecError> {
    Ok(read_bytes2(data, offset)? as f64 / 10.0)
}

pub fn read_freq(data: &[u8], offset: usize) -> Result<f64, CodecError> {
    Ok(read_bytes2(data, offset)? as f64 / 100.0)
}

pub fn read_temp(data: &[u8], offset: usize) -> Result<f64, CodecError> {
    Ok(read_bytes2(data, offset)? as f64 / 10.0)
}

pub fn read_power2(data: &[u8], offset: usize) -> Result<i64, CodecError> {
    read_bytes2(data, offset)
}

pub fn read_power4(data: &[u8], offset: usize) -> Result<i64, CodecError> {
    read_bytes4(data, offset)
}

pub fn read_energy2(data: &[u8], offset: usize) -> Result<f64, CodecError> {
    Ok(read_bytes2(data, offset)? as f64 / 10.0)
}

pub fn read_energy4(data: &[u8], offset: usize) -> Result<f64, CodecError> {
    Ok(read_bytes4(data, offset)? as f64 / 10.0)
}

pub fn read_decimal(
    data: &[u8],
    offset: usize,
    scale: u32,
    width: usize,
) -> Result<f64, CodecError> {
    let raw = match width {
        4 => read_bytes4(data, offset)?,
        _ => read_bytes2(data, offset)?,
    };
    Ok(raw as f64 / scale as f64)
}

/// IEEE-754 single precision, scaled and rounded to 3 places.
pub fn read_float4(data: &[u8], offset: usize, scale: u32) -> Result<f64, CodecError> {
    let raw = f32::from_be_bytes(span(data, offset)?) as f64;
    Ok(Utils::round(raw / scale as f64, 3))
}

pub fn read_timestamp(data: &[u8], offset: usize) -> Result<NaiveDateTime, CodecError> {
    let b: [u8; 6] = span(data, offset)?;
    NaiveDate::from_ymd_opt(2000 + b[0] as i32, b[1] as u32, b[2] as u32)
        .and_then(|d| d.and_hms_opt(b[3] as u32, b[4] as u32, b[5] as u32))
        .ok_or(CodecError::InvalidTimestamp(b))
}

/// Power from voltage and current registers, rounded to whole watts.
pub fn read_vi_power(data: &[u8], voltage: usize, current: usize) -> Result<i64, CodecError> {
    Ok((read_voltage(data, voltage)? * read_current(data, current)?).round() as i64)
}

/// Direction of grid power flow: 2 importing, 1 exporting, 0 idle.
pub fn read_grid_mode(data: &[u8], offset: usize) -> Result<i64, CodecError> {
    Ok(grid_mode(read_power4(data, offset)?))
}

pub fn grid_mode(power: i64) -> i64 {
    if power < -90 {
        2
    } else if power >= 90 {
        1
    } else {
        0
    }
}

pub fn lookup(labels: Labels, code: i64) -> Option<&'static str> {
    labels.iter().find(|(k, _)| *k == code).map(|(_, v)| *v)
}

/// Labels of all set bits, lowest bit first. Bits without a label are skipped.
pub fn decode_bitmap(value: u32, labels: Labels) -> String {
    (0..32)
        .filter(|bit| value & (1 << bit) != 0)
        .filter_map(|bit| lookup(labels, bit as i64))
        .collect::<Vec<_>>()
        .join(", ")
}

fn encode_int(value: f64, width: usize) -> Option<Vec<u8>> {
    if value.fract() != 0.0 {
        return None;
    }

    match width {
        1 if value >= i8::MIN as f64 && value <= i8::MAX as f64 => {
            Some((value as i8).to_be_bytes().to_vec())
        }
        2 if value >= i16::MIN as f64 && value <= i16::MAX as f64 => {
            Some((value as i16).to_be_bytes().to_vec())
        }
        4 if value >= i32::MIN as f64 && value <= i32::MAX as f64 => {
            Some((value as i32).to_be_bytes().to_vec())
        }
        _ => None,
    }
}

fn encode_scaled2(value: f64, scale: f64, codec: &'static str) -> Result<[u8; 2], CodecError> {
    let raw = (value * scale).round();
    if !raw.is_finite() || raw < i16::MIN as f64 || raw > i16::MAX as f64 {
        return Err(CodecError::Unencodable {
            value: value.to_string(),
            codec,
        });
    }
    Ok((raw as i16).to_be_bytes())
}

pub fn encode_voltage(value: f64) -> Result<[u8; 2], CodecError> {
    encode_scaled2(value, 10.0, "voltage")
}

pub fn encode_current(value: f64) -> Result<[u8; 2], CodecError> {
    encode_scaled2(value, 10.0, "current")
}

pub fn encode_decimal(value: f64, scale: u32, width: usize) -> Result<Vec<u8>, CodecError> {
    if width == 4 {
        let raw = (value * scale as f64).round();
        return encode_int(raw, 4).ok_or(CodecError::Unencodable {
            value: value.to_string(),
            codec: "decimal",
        });
    }
    Ok(encode_scaled2(value, scale as f64, "decimal")?.to_vec())
}
