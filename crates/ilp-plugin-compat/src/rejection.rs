use crate::convert::{base64url, decode_base64};
use crate::errors::DecodeError;
use chrono::{DateTime, Utc};
use interledger_packet::{Address, ErrorClass, ErrorCode, Reject, RejectBuilder};
use once_cell::sync::Lazy;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::HashMap;
use std::convert::TryFrom;
use std::str::FromStr;

static ERROR_NAMES: Lazy<HashMap<&'static str, &'static str>> = Lazy::new(|| {
    [
        ("F00", "Bad Request"),
        ("F01", "Invalid Packet"),
        ("F02", "Unreachable"),
        ("F03", "Invalid Amount"),
        ("F04", "Insufficient Destination Amount"),
        ("F05", "Wrong Condition"),
        ("F06", "Unexpected Payment"),
        ("F07", "Cannot Receive"),
        ("F99", "Application Error"),
        ("T00", "Internal Error"),
        ("T01", "Ledger Unreachable"),
        ("T02", "Ledger Busy"),
        ("T03", "Connector Busy"),
        ("T04", "Insufficient Liquidity"),
        ("T05", "Rate Limited"),
        ("T99", "Application Error"),
        ("R00", "Transfer Timed Out"),
        ("R01", "Insufficient Source Amount"),
        ("R02", "Insufficient Timeout"),
        ("R99", "Application Error"),
    ]
    .iter()
    .copied()
    .collect()
});

/// Key under which the reject packet's data travels in `additional_info`.
const DATA_KEY: &str = "data";

/// Human readable name of an ILP error code, or `"Unknown"`.
///
/// Unrecognized codes are not an error so that codes introduced by newer
/// participants still pass through.
pub fn name_for_code(code: &str) -> &'static str {
    ERROR_NAMES.get(code).copied().unwrap_or("Unknown")
}

/// The v1 representation of why a transfer was rejected.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct RejectionReason {
    pub code: String,
    pub name: String,
    #[serde(default)]
    pub message: String,
    #[serde(default)]
    pub triggered_by: String,
    pub triggered_at: DateTime<Utc>,
    #[serde(default)]
    pub forwarded_by: Vec<String>,
    #[serde(default)]
    pub additional_info: Map<String, Value>,
}

impl RejectionReason {
    pub fn new(code: &str, message: &str, triggered_by: &str) -> Self {
        RejectionReason {
            code: code.to_string(),
            name: name_for_code(code).to_string(),
            message: message.to_string(),
            triggered_by: triggered_by.to_string(),
            triggered_at: Utc::now(),
            forwarded_by: Vec::new(),
            additional_info: Map::new(),
        }
    }

    pub fn class(&self) -> ErrorClass {
        match self.code.as_bytes().first() {
            Some(b'F') => ErrorClass::Final,
            Some(b'T') => ErrorClass::Temporary,
            Some(b'R') => ErrorClass::Relative,
            _ => ErrorClass::Unknown,
        }
    }

    /// Builds the reason for a reject packet. `local_address` stands in when the
    /// packet does not say who triggered it.
    pub fn from_reject(reject: &Reject, local_address: &str) -> Self {
        let code = reject.code().to_string();
        let triggered_by = reject
            .triggered_by()
            .map(Address::to_string)
            .unwrap_or_else(|| local_address.to_string());
        let mut reason = RejectionReason::new(
            &code,
            &String::from_utf8_lossy(reject.message()),
            &triggered_by,
        );
        if !reject.data().is_empty() {
            reason
                .additional_info
                .insert(DATA_KEY.to_string(), Value::String(base64url(reject.data())));
        }
        reason
    }

    pub fn to_reject(&self) -> Result<Reject, DecodeError> {
        let code = match <[u8; 3]>::try_from(self.code.as_bytes()) {
            Ok(code) if code.iter().all(u8::is_ascii_alphanumeric) => ErrorCode::new(code),
            _ => return Err(DecodeError::Code(self.code.clone())),
        };

        // v1 ledgers report prefixes such as "g.usd." as the trigger.
        let triggered_by = match self.triggered_by.trim_end_matches('.') {
            "" => None,
            address => Some(Address::from_str(address)?),
        };

        let data = match self.additional_info.get(DATA_KEY) {
            Some(Value::String(data)) => decode_base64(data)?,
            Some(_) => return Err(DecodeError::Missing("base64 data in additional_info")),
            None => Vec::new(),
        };

        Ok(RejectBuilder {
            code,
            message: self.message.as_bytes(),
            triggered_by: triggered_by.as_ref(),
            data: &data,
        }
        .build())
    }
}

impl TryFrom<&RejectionReason> for Reject {
    type Error = DecodeError;

    fn try_from(reason: &RejectionReason) -> Result<Self, Self::Error> {
        reason.to_reject()
    }
}
