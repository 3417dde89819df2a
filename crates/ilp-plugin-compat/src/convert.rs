//! Conversions between v1 records and ILP packets.

use crate::errors::{DecodeError, PluginError};
use crate::plugin::{Message, Transfer};
use bytes::BytesMut;
use chrono::{DateTime, SecondsFormat, Utc};
use interledger_packet::{Fulfill, FulfillBuilder, Packet, Prepare, PrepareBuilder};
use std::convert::TryFrom;
use std::time::SystemTime;

/// Base64url without padding, the encoding of every binary field in v1 records.
pub fn base64url(bytes: &[u8]) -> String {
    base64::encode_config(bytes, base64::URL_SAFE_NO_PAD)
}

/// Decodes base64url, also accepting the standard alphabet and padding.
pub fn decode_base64(encoded: &str) -> Result<Vec<u8>, DecodeError> {
    let normalized: String = encoded
        .trim_end_matches('=')
        .chars()
        .map(|c| match c {
            '+' => '-',
            '/' => '_',
            c => c,
        })
        .collect();
    Ok(base64::decode_config(&normalized, base64::URL_SAFE_NO_PAD)?)
}

fn decode_32(field: &'static str, encoded: &str) -> Result<[u8; 32], DecodeError> {
    let bytes = decode_base64(encoded)?;
    <[u8; 32]>::try_from(&bytes[..]).map_err(|_| DecodeError::Length {
        field,
        expected: 32,
        actual: bytes.len(),
    })
}

fn format_expiry(expires_at: SystemTime) -> String {
    DateTime::<Utc>::from(expires_at).to_rfc3339_opts(SecondsFormat::Millis, true)
}

fn parse_expiry(expires_at: &str) -> Result<SystemTime, DecodeError> {
    DateTime::parse_from_rfc3339(expires_at)
        .map(SystemTime::from)
        .map_err(|err| DecodeError::Timestamp(expires_at.to_string(), err))
}

/// Builds the v1 transfer carrying `prepare`. Routing fields are left for the
/// caller to fill in.
pub fn prepare_to_transfer(id: String, prepare: &Prepare) -> Transfer {
    Transfer {
        id,
        amount: prepare.amount().to_string(),
        execution_condition: Some(base64url(prepare.execution_condition())),
        expires_at: Some(format_expiry(prepare.expires_at())),
        ilp: Some(base64url(&BytesMut::from(prepare.clone()))),
        ..Transfer::default()
    }
}

/// Rebuilds the prepare for an incoming transfer.
///
/// Amount, condition and expiry come from the transfer itself since that is
/// what the ledger escrowed; destination and data come from the embedded packet.
pub fn transfer_to_prepare(transfer: &Transfer) -> Result<Prepare, DecodeError> {
    let ilp = transfer.ilp.as_deref().ok_or(DecodeError::Missing("ilp"))?;
    let embedded = Prepare::try_from(&decode_base64(ilp)?[..])?;

    let amount = transfer
        .amount
        .parse::<u64>()
        .map_err(|_| DecodeError::Amount(transfer.amount.clone()))?;
    let execution_condition = decode_32(
        "execution condition",
        transfer
            .execution_condition
            .as_deref()
            .ok_or(DecodeError::Missing("executionCondition"))?,
    )?;
    let expires_at = parse_expiry(
        transfer
            .expires_at
            .as_deref()
            .ok_or(DecodeError::Missing("expiresAt"))?,
    )?;

    Ok(PrepareBuilder {
        amount,
        expires_at,
        execution_condition: &execution_condition,
        destination: embedded.destination().clone(),
        data: embedded.data(),
    }
    .build())
}

pub fn fulfillment_to_fulfill(fulfillment: &str, data: Option<&str>) -> Result<Fulfill, DecodeError> {
    let fulfillment = decode_32("fulfillment", fulfillment)?;
    let data = match data {
        Some(data) => decode_base64(data)?,
        None => Vec::new(),
    };
    Ok(FulfillBuilder {
        fulfillment: &fulfillment,
        data: &data,
    }
    .build())
}

/// Returns the fulfillment and data as `fulfill_condition` expects them.
pub fn fulfill_to_fulfillment(fulfill: &Fulfill) -> (String, String) {
    (base64url(fulfill.fulfillment()), base64url(fulfill.data()))
}

/// Extracts the response bytes of a v1 message.
///
/// An embedded ILP packet wins; otherwise a non-empty `custom` payload is
/// returned as JSON; otherwise the response is empty. An empty `ilp` field
/// counts as no packet.
pub fn message_to_response(message: Message) -> Result<BytesMut, DecodeError> {
    if let Some(ilp) = message.ilp.as_deref().filter(|ilp| !ilp.is_empty()) {
        let bytes = BytesMut::from(&decode_base64(ilp)?[..]);
        Packet::try_from(&bytes[..])?;
        return Ok(bytes);
    }
    if !message.custom.is_empty() {
        return Ok(BytesMut::from(&serde_json::to_vec(&message.custom)?[..]));
    }
    Ok(BytesMut::new())
}

/// Picks the v1 account a payment to `destination` is sent to.
///
/// Destinations on the local ledger go to the account named by the first
/// segment after `prefix`; anything else goes to `default_connector`. The
/// prefix only matches whole segments, with or without its trailing `.`.
pub fn resolve_destination(
    destination: Option<&str>,
    prefix: &str,
    default_connector: Option<&str>,
) -> Result<String, PluginError> {
    let ledger = prefix.trim_end_matches('.');
    let local_account = destination
        .filter(|_| !ledger.is_empty())
        .and_then(|destination| destination.strip_prefix(ledger))
        .and_then(|rest| rest.strip_prefix('.'))
        .and_then(|rest| rest.split('.').next())
        .filter(|segment| !segment.is_empty());

    match (local_account, default_connector) {
        (Some(account), _) => Ok(format!("{}.{}", ledger, account)),
        (None, Some(connector)) if !connector.is_empty() => Ok(connector.to_string()),
        _ => Err(PluginError::Routing(format!(
            "no local account or default connector for {}",
            destination.unwrap_or("<no destination>")
        ))),
    }
}
