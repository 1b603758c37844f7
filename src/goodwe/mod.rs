pub mod checksum;  // CRC16 and additive checksums
pub mod codec;     // field decoders and encoders
pub mod command;   // request framing and response validation
pub mod discovery; // family detection and broadcast search
pub mod family;    // per-family tables
pub mod inverter;  // generic driver
pub mod labels;    // code to text tables
pub mod sensor;    // field descriptors and snapshots
pub mod transport; // datagram sessions and the retry loop

pub use codec::Value;
pub use discovery::{connect, discover, parse_search_reply, search, search_inverters, SearchReply};
pub use family::{DeviceInfo, Family, FamilyId};
pub use inverter::{Inverter, Link, DEFAULT_RETRIES, DEFAULT_TIMEOUT};
pub use sensor::{Sensor, SensorKind, Snapshot};
pub use transport::{Transport, DEFAULT_PORT};
