use crate::prelude::*;
use crate::goodwe::codec::{Calculation, Codec, Labels, Value};

use {num_enum::{IntoPrimitive, TryFromPrimitive}, serde::Serialize, std::collections::BTreeMap};

/// Decoded values keyed by sensor id.
pub type Snapshot = BTreeMap<String, Value>;

#[derive(Clone, Copy, Debug, Eq, PartialEq, Serialize, IntoPrimitive, TryFromPrimitive)]
#[repr(u8)]
pub enum SensorKind {
    /// photo-voltaic strings
    Pv = 1,
    /// grid connected output
    Ac = 2,
    /// backup/off-grid output
    Ups = 3,
    Bat = 4,
    /// smart meter
    Grid = 5,
}

/// One named field of a response payload (or one setting register).
#[derive(Clone, Copy, Debug)]
pub struct Sensor {
    pub id: &'static str,
    /// byte offset in the stripped payload, or register address for settings
    pub offset: usize,
    pub codec: Codec,
    pub name: &'static str,
    pub unit: &'static str,
    pub kind: Option<SensorKind>,
    pub writable: bool,
}

impl Sensor {
    pub const fn new(
        id: &'static str,
        offset: usize,
        codec: Codec,
        name: &'static str,
        unit: &'static str,
        kind: Option<SensorKind>,
    ) -> Self {
        Self {
            id,
            offset,
            codec,
            name,
            unit,
            kind,
            writable: false,
        }
    }

    pub const fn writable(self) -> Self {
        Self {
            writable: true,
            ..self
        }
    }

    // shorthand constructors for the family tables {{{
    pub const fn byte(id: &'static str, offset: usize, name: &'static str, unit: &'static str, kind: Option<SensorKind>) -> Self {
        Self::new(id, offset, Codec::Byte, name, unit, kind)
    }

    pub const fn integer(id: &'static str, offset: usize, name: &'static str, unit: &'static str, kind: Option<SensorKind>) -> Self {
        Self::new(id, offset, Codec::Integer, name, unit, kind)
    }

    pub const fn long(id: &'static str, offset: usize, name: &'static str, unit: &'static str, kind: Option<SensorKind>) -> Self {
        Self::new(id, offset, Codec::Long, name, unit, kind)
    }

    pub const fn voltage(id: &'static str, offset: usize, name: &'static str, kind: Option<SensorKind>) -> Self {
        Self::new(id, offset, Codec::Voltage, name, "V", kind)
    }

    pub const fn current(id: &'static str, offset: usize, name: &'static str, kind: Option<SensorKind>) -> Self {
        Self::new(id, offset, Codec::Current, name, "A", kind)
    }

    pub const fn frequency(id: &'static str, offset: usize, name: &'static str, kind: Option<SensorKind>) -> Self {
        Self::new(id, offset, Codec::Frequency, name, "Hz", kind)
    }

    pub const fn temp(id: &'static str, offset: usize, name: &'static str, kind: Option<SensorKind>) -> Self {
        Self::new(id, offset, Codec::Temp, name, "C", kind)
    }

    pub const fn power(id: &'static str, offset: usize, name: &'static str, kind: Option<SensorKind>) -> Self {
        Self::new(id, offset, Codec::Power, name, "W", kind)
    }

    pub const fn power4(id: &'static str, offset: usize, name: &'static str, kind: Option<SensorKind>) -> Self {
        Self::new(id, offset, Codec::Power4, name, "W", kind)
    }

    pub const fn energy(id: &'static str, offset: usize, name: &'static str, kind: Option<SensorKind>) -> Self {
        Self::new(id, offset, Codec::Energy, name, "kWh", kind)
    }

    pub const fn energy4(id: &'static str, offset: usize, name: &'static str, kind: Option<SensorKind>) -> Self {
        Self::new(id, offset, Codec::Energy4, name, "kWh", kind)
    }

    pub const fn decimal(id: &'static str, offset: usize, scale: u32, name: &'static str, kind: Option<SensorKind>) -> Self {
        Self::new(id, offset, Codec::Decimal { scale, width: 2 }, name, "", kind)
    }

    pub const fn float(id: &'static str, offset: usize, scale: u32, name: &'static str, unit: &'static str, kind: Option<SensorKind>) -> Self {
        Self::new(id, offset, Codec::Float { scale }, name, unit, kind)
    }

    pub const fn timestamp(id: &'static str, offset: usize, name: &'static str) -> Self {
        Self::new(id, offset, Codec::Timestamp, name, "", None)
    }

    pub const fn enum1(id: &'static str, offset: usize, labels: Labels, name: &'static str, kind: Option<SensorKind>) -> Self {
        Self::new(id, offset, Codec::Enum(labels), name, "", kind)
    }

    pub const fn enum2(id: &'static str, offset: usize, labels: Labels, name: &'static str, kind: Option<SensorKind>) -> Self {
        Self::new(id, offset, Codec::Enum2(labels), name, "", kind)
    }

    pub const fn calculated(id: &'static str, f: Calculation, name: &'static str, unit: &'static str, kind: Option<SensorKind>) -> Self {
        Self::new(id, 0, Codec::Calculated(f), name, unit, kind)
    } // }}}

    /// Placeholder fields whose meaning is not known yet ("xx123").
    pub fn is_unknown(&self) -> bool {
        self.id.starts_with("xx")
    }

    pub fn read(&self, data: &[u8]) -> Result<Value, CodecError> {
        self.codec.decode(data, self.offset)
    }
}

/// Decode every descriptor against `data`.
///
/// A field that fails to decode is logged and left out; the rest of the
/// snapshot is still produced.
pub fn map_response(data: &[u8], sensors: &[Sensor], include_unknown: bool) -> Snapshot {
    let mut result = Snapshot::new();

    for sensor in sensors {
        if sensor.is_unknown() && !include_unknown {
            continue;
        }

        match sensor.read(data) {
            Ok(value) => {
                result.insert(sensor.id.to_string(), value);
            }
            Err(err) => warn!("skipping sensor {}: {}", sensor.id, err),
        }
    }

    result
}

pub fn find<'a>(sensors: &'a [Sensor], id: &str) -> Option<&'a Sensor> {
    sensors.iter().find(|s| s.id == id)
}
