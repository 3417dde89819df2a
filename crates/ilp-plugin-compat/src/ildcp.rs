//! Interledger Dynamic Configuration Protocol (ILDCP) messages.
//!
//! A peer asks for its own address and asset details by sending a zero-amount
//! prepare to [`ILDCP_DESTINATION`]; the answer travels in the data of a fulfill
//! packet.

use byteorder::ReadBytesExt;
use bytes::{BufMut, Bytes, BytesMut};
use interledger_packet::{
    oer::{predict_var_octet_string, BufOerExt, MutBufOerExt},
    Address, Fulfill, FulfillBuilder, ParseError, Prepare, PrepareBuilder,
};
use once_cell::sync::Lazy;
use std::convert::TryFrom;
use std::str;
use std::time::{Duration, SystemTime};

pub const ILDCP_DESTINATION: &str = "peer.config";

/// The fulfillment of every configuration response.
///
/// This is a sentinel: the request carries no real condition, so it must never
/// be used to settle a conditional transfer.
pub const PEER_PROTOCOL_FULFILLMENT: [u8; 32] = [0; 32];

/// SHA-256 of [`PEER_PROTOCOL_FULFILLMENT`].
pub const PEER_PROTOCOL_CONDITION: [u8; 32] = [
    102, 104, 122, 173, 248, 98, 189, 119, 108, 143, 193, 139, 142, 159, 142, 32, 8, 151, 20, 133,
    110, 226, 51, 179, 144, 42, 89, 29, 13, 95, 41, 37,
];

const ASSET_SCALE_LEN: usize = 1;
const PEER_PROTOCOL_EXPIRY_DURATION: Duration = Duration::from_secs(60);

static ILDCP_ADDRESS: Lazy<Address> = Lazy::new(|| Address::new(ILDCP_DESTINATION));

/// Whether the prepare is addressed to the configuration protocol.
///
/// Only the destination is checked: v1 ledgers do not agree on the condition
/// peers put on configuration requests.
pub fn is_ildcp_request(prepare: &Prepare) -> bool {
    prepare.destination() == &*ILDCP_ADDRESS
}

#[derive(Debug, Default)]
pub struct IldcpRequest {}

impl IldcpRequest {
    pub fn new() -> Self {
        IldcpRequest {}
    }

    pub fn to_prepare(&self) -> Prepare {
        PrepareBuilder {
            destination: ILDCP_ADDRESS.clone(),
            amount: 0,
            execution_condition: &PEER_PROTOCOL_CONDITION,
            expires_at: SystemTime::now() + PEER_PROTOCOL_EXPIRY_DURATION,
            data: &[],
        }
        .build()
    }
}

impl From<IldcpRequest> for Prepare {
    fn from(request: IldcpRequest) -> Self {
        request.to_prepare()
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct IldcpResponse {
    buffer: Bytes,
    client_address: String,
    asset_scale: u8,
    asset_code: String,
}

impl From<IldcpResponse> for Bytes {
    fn from(response: IldcpResponse) -> Self {
        response.buffer
    }
}

impl From<IldcpResponse> for Fulfill {
    fn from(response: IldcpResponse) -> Self {
        FulfillBuilder {
            fulfillment: &PEER_PROTOCOL_FULFILLMENT,
            data: &response.buffer[..],
        }
        .build()
    }
}

impl TryFrom<&[u8]> for IldcpResponse {
    type Error = ParseError;

    fn try_from(buffer: &[u8]) -> Result<Self, Self::Error> {
        let mut reader = buffer;
        let client_address = str::from_utf8(reader.read_var_octet_string()?)?.to_string();
        let asset_scale = reader.read_u8()?;
        let asset_code = str::from_utf8(reader.read_var_octet_string()?)?.to_string();

        Ok(IldcpResponse {
            buffer: Bytes::copy_from_slice(buffer),
            client_address,
            asset_scale,
            asset_code,
        })
    }
}

impl TryFrom<&Fulfill> for IldcpResponse {
    type Error = ParseError;

    fn try_from(fulfill: &Fulfill) -> Result<Self, Self::Error> {
        IldcpResponse::try_from(fulfill.data())
    }
}

impl IldcpResponse {
    pub fn client_address(&self) -> &str {
        &self.client_address
    }

    pub fn asset_scale(&self) -> u8 {
        self.asset_scale
    }

    pub fn asset_code(&self) -> &str {
        &self.asset_code
    }
}

#[derive(Debug, PartialEq)]
pub struct IldcpResponseBuilder<'a> {
    pub client_address: &'a str,
    pub asset_scale: u8,
    pub asset_code: &'a str,
}

impl<'a> IldcpResponseBuilder<'a> {
    pub fn build(&self) -> IldcpResponse {
        let address_size = predict_var_octet_string(self.client_address.len());
        let asset_code_size = predict_var_octet_string(self.asset_code.len());
        let mut buffer = BytesMut::with_capacity(address_size + ASSET_SCALE_LEN + asset_code_size);

        buffer.put_var_octet_string(self.client_address.as_bytes());
        buffer.put_u8(self.asset_scale);
        buffer.put_var_octet_string(self.asset_code.as_bytes());

        IldcpResponse {
            buffer: buffer.freeze(),
            client_address: self.client_address.to_string(),
            asset_scale: self.asset_scale,
            asset_code: self.asset_code.to_string(),
        }
    }
}
