use crate::prelude::*;
use crate::goodwe::command::{ProtocolCommand, RawCommand};
use crate::goodwe::family::{self, Family, FAMILIES};
use crate::goodwe::inverter::{Inverter, Link};
use crate::goodwe::transport::{self, BroadcastTransport};

use {
    nom::{bytes::complete::take_till, character::complete::char, combinator::rest, sequence::tuple, IResult},
    serde::Serialize,
    std::net::{Ipv4Addr, SocketAddr},
};

const SEARCH_REQUEST: &[u8] = b"WIFIKIT-214028-READ";

/// Build a driver for the inverter behind `link`.
///
/// With a family hint the named family is used directly. Without one every
/// known family is probed in turn.
pub async fn connect(
    link: Link,
    family: Option<&str>,
    comm_addr: Option<u8>,
    timeout: Duration,
    retries: u32,
) -> Result<Inverter, InverterError> {
    match family {
        Some(name) => {
            let family = family::by_name(name)
                .ok_or_else(|| InverterError::Unsupported(format!("inverter family {}", name)))?;
            let mut inverter = Inverter::new(family, link, comm_addr, timeout, retries);
            inverter.read_device_info().await?;
            Ok(inverter)
        }
        None => discover(link, comm_addr, timeout, retries).await,
    }
}

/// Probe ET, then DT, then ES; the first family whose identity read succeeds
/// and whose serial number matches wins.
pub async fn discover(
    link: Link,
    comm_addr: Option<u8>,
    timeout: Duration,
    retries: u32,
) -> Result<Inverter, InverterError> {
    let mut failures = Vec::new();

    for family in FAMILIES.iter().copied() {
        debug!("probing {} for a {} inverter", link, family.name);

        let mut inverter = Inverter::new(family, link.clone(), comm_addr, timeout, retries);
        match inverter.read_device_info().await {
            Ok(info) if family.matches_serial(&info.serial_number) => return Ok(inverter),
            Ok(info) => {
                debug!("{} identity answered but serial {} is not a {} model", link, info.serial_number, family.name);
                failures.push((family.name, mismatch(family, &info.serial_number)));
            }
            Err(err) => {
                debug!("{} probe of {} failed: {}", family.name, link, err);
                failures.push((family.name, err));
            }
        }
    }

    Err(InverterError::NotDetected {
        target: link.to_string(),
        failures,
    })
}

fn mismatch(family: &Family, serial: &str) -> InverterError {
    InverterError::Processing(format!("serial {} does not identify a {} model", serial, family.name))
}

/// Broadcast the module search request and return the first raw reply.
pub async fn search_inverters(timeout: Duration, retries: u32) -> Result<Vec<u8>, InverterError> {
    search((Ipv4Addr::BROADCAST, transport::BROADCAST_PORT).into(), timeout, retries).await
}

/// Send the module search request to `target`, which may be a directed
/// broadcast or a single module.
pub async fn search(target: SocketAddr, timeout: Duration, retries: u32) -> Result<Vec<u8>, InverterError> {
    let mut socket = BroadcastTransport::bind(target).await?;
    let command: ProtocolCommand = RawCommand::new(SEARCH_REQUEST.to_vec()).into();

    let response = command.execute_on(&mut socket, timeout, retries).await?;
    info!("search reply {}", String::from_utf8_lossy(&response));
    Ok(response)
}

/// A wifi module answering the search broadcast.
#[derive(Clone, Debug, Eq, PartialEq, Serialize)]
pub struct SearchReply {
    pub ip: String,
    pub mac: String,
    pub name: String,
}

fn search_fields(input: &[u8]) -> IResult<&[u8], (&[u8], char, &[u8], char, &[u8])> {
    tuple((
        take_till(|c: u8| c == b','),
        char(','),
        take_till(|c: u8| c == b','),
        char(','),
        rest,
    ))(input)
}

/// Split an `ip,mac,name` search reply.
pub fn parse_search_reply(data: &[u8]) -> Result<SearchReply, InverterError> {
    let (_, (ip, _, mac, _, name)) = search_fields(data)
        .map_err(|_| InverterError::Processing(format!("malformed search reply {}", Utils::hex(data))))?;

    let reply = SearchReply {
        ip: Utils::ascii(ip),
        mac: Utils::ascii(mac),
        name: Utils::ascii(name),
    };
    if reply.ip.is_empty() {
        return Err(InverterError::Processing("search reply without an address".to_string()));
    }

    Ok(reply)
}
