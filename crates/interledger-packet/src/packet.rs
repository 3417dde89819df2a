//! ILPv4 Prepare, Fulfill and Reject packets.
//!
//! Every packet is a type byte followed by its fields wrapped in one
//! var-octet-string. Bytes after that envelope are ignored.

use std::convert::TryFrom;
use std::fmt;
use std::io::Read;
use std::str;
use std::time::{Duration, SystemTime, UNIX_EPOCH};

use byteorder::{BigEndian, ReadBytesExt};
use bytes::{BufMut, BytesMut};
use chrono::{DateTime, NaiveDateTime, TimeZone, Utc};

use super::oer::{self, BufOerExt, MutBufOerExt};
use super::{Address, ErrorCode, ParseError};

const AMOUNT_LEN: usize = 8;
const EXPIRY_LEN: usize = 17;
const CONDITION_LEN: usize = 32;
const FULFILLMENT_LEN: usize = 32;
const ERROR_CODE_LEN: usize = 3;

static TIMESTAMP_FORMAT: &str = "%Y%m%d%H%M%S%3f";

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[repr(u8)]
pub enum PacketType {
    Prepare = 12,
    Fulfill = 13,
    Reject = 14,
}

impl TryFrom<u8> for PacketType {
    type Error = ParseError;

    fn try_from(byte: u8) -> Result<Self, Self::Error> {
        [PacketType::Prepare, PacketType::Fulfill, PacketType::Reject]
            .iter()
            .copied()
            .find(|packet_type| *packet_type as u8 == byte)
            .ok_or_else(|| ParseError::InvalidPacket(format!("Unknown packet type: {}", byte)))
    }
}

impl TryFrom<&[u8]> for PacketType {
    type Error = ParseError;

    /// Reads the type byte of a serialized packet.
    fn try_from(bytes: &[u8]) -> Result<Self, Self::Error> {
        let byte = bytes
            .first()
            .ok_or_else(|| ParseError::InvalidPacket("Empty packet".to_string()))?;
        PacketType::try_from(*byte)
    }
}

#[derive(Debug, PartialEq, Clone)]
pub enum Packet {
    Prepare(Prepare),
    Fulfill(Fulfill),
    Reject(Reject),
}

impl Packet {
    pub fn packet_type(&self) -> PacketType {
        match self {
            Packet::Prepare(_) => PacketType::Prepare,
            Packet::Fulfill(_) => PacketType::Fulfill,
            Packet::Reject(_) => PacketType::Reject,
        }
    }
}

impl TryFrom<&[u8]> for Packet {
    type Error = ParseError;

    fn try_from(buffer: &[u8]) -> Result<Self, Self::Error> {
        Ok(match PacketType::try_from(buffer)? {
            PacketType::Prepare => Prepare::try_from(buffer)?.into(),
            PacketType::Fulfill => Fulfill::try_from(buffer)?.into(),
            PacketType::Reject => Reject::try_from(buffer)?.into(),
        })
    }
}

impl From<Packet> for BytesMut {
    fn from(packet: Packet) -> Self {
        match packet {
            Packet::Prepare(prepare) => prepare.into(),
            Packet::Fulfill(fulfill) => fulfill.into(),
            Packet::Reject(reject) => reject.into(),
        }
    }
}

// Owned-buffer parsing for every packet, plus the `Packet` wrappers.
macro_rules! packet_conversions {
    ($($variant:ident),+) => {
        $(
            impl TryFrom<BytesMut> for $variant {
                type Error = ParseError;

                fn try_from(buffer: BytesMut) -> Result<Self, Self::Error> {
                    $variant::try_from(&buffer[..])
                }
            }

            impl From<$variant> for Packet {
                fn from(packet: $variant) -> Self {
                    Packet::$variant(packet)
                }
            }
        )+
    };
}

packet_conversions!(Prepare, Fulfill, Reject);

impl TryFrom<BytesMut> for Packet {
    type Error = ParseError;

    fn try_from(buffer: BytesMut) -> Result<Self, Self::Error> {
        Packet::try_from(&buffer[..])
    }
}

#[derive(PartialEq, Clone)]
pub struct Prepare {
    amount: u64,
    expires_at: SystemTime,
    execution_condition: [u8; CONDITION_LEN],
    destination: Address,
    data: BytesMut,
}

#[derive(Clone, Debug, PartialEq)]
pub struct PrepareBuilder<'a> {
    pub amount: u64,
    pub expires_at: SystemTime,
    pub execution_condition: &'a [u8; 32],
    pub destination: Address,
    pub data: &'a [u8],
}

impl<'a> PrepareBuilder<'a> {
    /// The expiry is rounded down to whole milliseconds, the precision of the
    /// wire format.
    pub fn build(&self) -> Prepare {
        Prepare {
            amount: self.amount,
            expires_at: whole_millis(self.expires_at),
            execution_condition: *self.execution_condition,
            destination: self.destination.clone(),
            data: BytesMut::from(self.data),
        }
    }
}

impl Prepare {
    pub fn amount(&self) -> u64 {
        self.amount
    }

    pub fn expires_at(&self) -> SystemTime {
        self.expires_at
    }

    pub fn execution_condition(&self) -> &[u8; 32] {
        &self.execution_condition
    }

    pub fn destination(&self) -> &Address {
        &self.destination
    }

    pub fn data(&self) -> &[u8] {
        &self.data
    }

    pub fn into_data(self) -> BytesMut {
        self.data
    }
}

impl TryFrom<&[u8]> for Prepare {
    type Error = ParseError;

    fn try_from(buffer: &[u8]) -> Result<Self, Self::Error> {
        let mut fields = Fields::open(PacketType::Prepare, buffer)?;
        Ok(Prepare {
            amount: fields.amount()?,
            expires_at: fields.timestamp()?,
            execution_condition: fields.array()?,
            destination: fields
                .address()?
                .ok_or_else(|| ParseError::InvalidPacket("Missing destination".to_string()))?,
            data: fields.octets()?.into(),
        })
    }
}

impl From<Prepare> for BytesMut {
    fn from(prepare: Prepare) -> Self {
        let mut fields = BytesMut::with_capacity(
            AMOUNT_LEN
                + EXPIRY_LEN
                + CONDITION_LEN
                + oer::predict_var_octet_string(prepare.destination.len())
                + oer::predict_var_octet_string(prepare.data.len()),
        );
        fields.put_u64(prepare.amount);
        fields.put_slice(format_timestamp(prepare.expires_at).as_bytes());
        fields.put_slice(&prepare.execution_condition);
        fields.put_var_octet_string(prepare.destination.as_ref());
        fields.put_var_octet_string(&prepare.data);
        seal(PacketType::Prepare, &fields)
    }
}

impl fmt::Debug for Prepare {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.debug_struct("Prepare")
            .field("destination", &self.destination)
            .field("amount", &self.amount)
            .field(
                "expires_at",
                &DateTime::<Utc>::from(self.expires_at).to_rfc3339(),
            )
            .field("execution_condition", &hex(&self.execution_condition))
            .field("data_length", &self.data.len())
            .finish()
    }
}

#[derive(PartialEq, Clone)]
pub struct Fulfill {
    fulfillment: [u8; FULFILLMENT_LEN],
    data: BytesMut,
}

#[derive(Clone, Debug, PartialEq)]
pub struct FulfillBuilder<'a> {
    pub fulfillment: &'a [u8; 32],
    pub data: &'a [u8],
}

impl<'a> FulfillBuilder<'a> {
    pub fn build(&self) -> Fulfill {
        Fulfill {
            fulfillment: *self.fulfillment,
            data: BytesMut::from(self.data),
        }
    }
}

impl Fulfill {
    pub fn fulfillment(&self) -> &[u8; 32] {
        &self.fulfillment
    }

    pub fn data(&self) -> &[u8] {
        &self.data
    }

    pub fn into_data(self) -> BytesMut {
        self.data
    }
}

impl TryFrom<&[u8]> for Fulfill {
    type Error = ParseError;

    fn try_from(buffer: &[u8]) -> Result<Self, Self::Error> {
        let mut fields = Fields::open(PacketType::Fulfill, buffer)?;
        Ok(Fulfill {
            fulfillment: fields.array()?,
            data: fields.octets()?.into(),
        })
    }
}

impl From<Fulfill> for BytesMut {
    fn from(fulfill: Fulfill) -> Self {
        let mut fields = BytesMut::with_capacity(
            FULFILLMENT_LEN + oer::predict_var_octet_string(fulfill.data.len()),
        );
        fields.put_slice(&fulfill.fulfillment);
        fields.put_var_octet_string(&fulfill.data);
        seal(PacketType::Fulfill, &fields)
    }
}

impl fmt::Debug for Fulfill {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.debug_struct("Fulfill")
            .field("fulfillment", &hex(&self.fulfillment))
            .field("data_length", &self.data.len())
            .finish()
    }
}

#[derive(PartialEq, Clone)]
pub struct Reject {
    code: ErrorCode,
    triggered_by: Option<Address>,
    message: BytesMut,
    data: BytesMut,
}

#[derive(Clone, Debug, PartialEq)]
pub struct RejectBuilder<'a> {
    pub code: ErrorCode,
    pub message: &'a [u8],
    pub triggered_by: Option<&'a Address>,
    pub data: &'a [u8],
}

impl<'a> RejectBuilder<'a> {
    pub fn build(&self) -> Reject {
        Reject {
            code: self.code,
            triggered_by: self.triggered_by.cloned(),
            message: BytesMut::from(self.message),
            data: BytesMut::from(self.data),
        }
    }
}

impl Reject {
    pub fn code(&self) -> ErrorCode {
        self.code
    }

    pub fn triggered_by(&self) -> Option<&Address> {
        self.triggered_by.as_ref()
    }

    pub fn message(&self) -> &[u8] {
        &self.message
    }

    pub fn data(&self) -> &[u8] {
        &self.data
    }

    pub fn into_data(self) -> BytesMut {
        self.data
    }
}

impl TryFrom<&[u8]> for Reject {
    type Error = ParseError;

    fn try_from(buffer: &[u8]) -> Result<Self, Self::Error> {
        let mut fields = Fields::open(PacketType::Reject, buffer)?;
        Ok(Reject {
            code: ErrorCode::new(fields.array()?),
            triggered_by: fields.address()?,
            message: fields.octets()?.into(),
            data: fields.octets()?.into(),
        })
    }
}

impl From<Reject> for BytesMut {
    fn from(reject: Reject) -> Self {
        let triggered_by: &[u8] = reject
            .triggered_by
            .as_ref()
            .map(AsRef::<[u8]>::as_ref)
            .unwrap_or_default();
        let mut fields = BytesMut::with_capacity(
            ERROR_CODE_LEN
                + oer::predict_var_octet_string(triggered_by.len())
                + oer::predict_var_octet_string(reject.message.len())
                + oer::predict_var_octet_string(reject.data.len()),
        );
        fields.put_slice(&<[u8; ERROR_CODE_LEN]>::from(reject.code));
        fields.put_var_octet_string(triggered_by);
        fields.put_var_octet_string(&reject.message);
        fields.put_var_octet_string(&reject.data);
        seal(PacketType::Reject, &fields)
    }
}

impl fmt::Debug for Reject {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.debug_struct("Reject")
            .field("code", &self.code)
            .field("message", &String::from_utf8_lossy(&self.message))
            .field("triggered_by", &self.triggered_by)
            .field("data_length", &self.data.len())
            .finish()
    }
}

/// Reads the fields inside a packet envelope in order.
struct Fields<'a>(&'a [u8]);

impl<'a> Fields<'a> {
    fn open(expected: PacketType, mut packet: &'a [u8]) -> Result<Self, ParseError> {
        let found = packet.read_u8()?;
        if found != expected as u8 {
            return Err(ParseError::InvalidPacket(format!(
                "Expected packet type {}, found {}",
                expected as u8, found
            )));
        }
        Ok(Fields(packet.read_var_octet_string()?))
    }

    fn array<const N: usize>(&mut self) -> Result<[u8; N], ParseError> {
        let mut array = [0; N];
        self.0.read_exact(&mut array)?;
        Ok(array)
    }

    fn amount(&mut self) -> Result<u64, ParseError> {
        Ok(self.0.read_u64::<BigEndian>()?)
    }

    fn timestamp(&mut self) -> Result<SystemTime, ParseError> {
        let raw: [u8; EXPIRY_LEN] = self.array()?;
        let naive = NaiveDateTime::parse_from_str(str::from_utf8(&raw)?, TIMESTAMP_FORMAT)?;
        Ok(Utc.from_utc_datetime(&naive).into())
    }

    fn octets(&mut self) -> Result<&'a [u8], ParseError> {
        Ok(self.0.read_var_octet_string()?)
    }

    /// An empty address field reads as `None`.
    fn address(&mut self) -> Result<Option<Address>, ParseError> {
        match self.octets()? {
            [] => Ok(None),
            raw => Ok(Some(Address::try_from(raw)?)),
        }
    }
}

/// Prefixes `fields` with the type byte and their length.
fn seal(packet_type: PacketType, fields: &[u8]) -> BytesMut {
    let mut packet = BytesMut::with_capacity(1 + oer::predict_var_octet_string(fields.len()));
    packet.put_u8(packet_type as u8);
    packet.put_var_octet_string(fields);
    packet
}

fn format_timestamp(time: SystemTime) -> String {
    DateTime::<Utc>::from(time)
        .format(TIMESTAMP_FORMAT)
        .to_string()
}

fn whole_millis(time: SystemTime) -> SystemTime {
    time.duration_since(UNIX_EPOCH)
        .map(|elapsed| UNIX_EPOCH + Duration::from_millis(elapsed.as_millis() as u64))
        .unwrap_or(time)
}

fn hex(bytes: &[u8]) -> String {
    bytes.iter().map(|byte| format!("{:02x}", byte)).collect()
}
