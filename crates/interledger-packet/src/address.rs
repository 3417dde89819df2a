//! ILP address types.
//!
//! Reference: [ILP Addresses - v2.0.0](https://github.com/interledger/rfcs/blob/master/0015-ilp-addresses/0015-ilp-addresses.md).

// Addresses are never empty.
#![allow(clippy::len_without_is_empty)]

use std::convert::TryFrom;
use std::fmt;
use std::str::{self, FromStr};

const MAX_ADDRESS_LENGTH: usize = 1023;

static SCHEMES: &[&str] = &[
    "g", "private", "example", "peer", "self", "test", "test1", "test2", "test3", "local",
];

#[derive(Debug, thiserror::Error, PartialEq)]
#[error("Invalid ILP address: {0:?}")]
pub struct AddressError(pub String);

/// A validated ILP address such as `g.usd.bob`.
#[derive(Clone, Eq, Hash, PartialEq, PartialOrd, Ord)]
pub struct Address(String);

impl Address {
    /// Creates an address from a compile-time constant.
    ///
    /// The address is only validated in debug builds.
    pub fn new(address: &'static str) -> Self {
        debug_assert!(Address::validate(address), "invalid address: {:?}", address);
        Address(address.to_string())
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    #[inline]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// ```text
    /// scheme = "g" / "private" / "example" / "peer" / "self" /
    ///          "test" / "test1" / "test2" / "test3" / "local"
    /// ```
    pub fn scheme(&self) -> &str {
        // Validation guarantees at least two segments.
        self.segments().next().unwrap_or_default()
    }

    pub fn segments(&self) -> impl Iterator<Item = &str> {
        self.0.split('.')
    }

    pub fn with_suffix(&self, suffix: &str) -> Result<Address, AddressError> {
        Address::from_str(&format!("{}.{}", self.0, suffix))
    }

    fn validate(address: &str) -> bool {
        let mut segments = 0;
        let segments_ok = address.split('.').enumerate().all(|(i, segment)| {
            segments += 1;
            (i != 0 || SCHEMES.contains(&segment))
                && !segment.is_empty()
                && segment.bytes().all(is_segment_byte)
        });
        address.len() <= MAX_ADDRESS_LENGTH && segments_ok && segments > 1
    }
}

/// <https://github.com/interledger/rfcs/blob/master/0015-ilp-addresses/0015-ilp-addresses.md#address-requirements>
fn is_segment_byte(byte: u8) -> bool {
    byte == b'_' || byte == b'-' || byte == b'~' || byte.is_ascii_alphanumeric()
}

impl FromStr for Address {
    type Err = AddressError;

    fn from_str(src: &str) -> Result<Self, Self::Err> {
        if Address::validate(src) {
            Ok(Address(src.to_string()))
        } else {
            Err(AddressError(src.to_string()))
        }
    }
}

impl TryFrom<&[u8]> for Address {
    type Error = AddressError;

    fn try_from(bytes: &[u8]) -> Result<Self, Self::Error> {
        let string = str::from_utf8(bytes)
            .map_err(|_| AddressError(String::from_utf8_lossy(bytes).into_owned()))?;
        Address::from_str(string)
    }
}

impl AsRef<[u8]> for Address {
    #[inline]
    fn as_ref(&self) -> &[u8] {
        self.0.as_bytes()
    }
}

impl AsRef<str> for Address {
    #[inline]
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl PartialEq<str> for Address {
    fn eq(&self, other: &str) -> bool {
        self.0 == other
    }
}

impl PartialEq<&str> for Address {
    fn eq(&self, other: &&str) -> bool {
        self.0 == *other
    }
}

impl fmt::Debug for Address {
    fn fmt(&self, formatter: &mut fmt::Formatter) -> fmt::Result {
        formatter.debug_tuple("Address").field(&self.0).finish()
    }
}

impl fmt::Display for Address {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[cfg(test)]
mod test_address {
    use super::*;

    static VALID_ADDRESSES: &[&str] = &[
        "test.alice.XYZ.1234.-_~",
        "g.us-fed.ach.0.acmebank.swx0a0.acmecorp.sales.199.~ipr.cdfa5e16-e759-4ba3-88f6-8b9dc83c1868.2",
        "g.A", "private.A", "example.A", "peer.A", "self.A",
        "test.A", "test1.A", "test2.A", "test3.A", "local.A",
        "peer.config",
    ];

    static INVALID_ADDRESSES: &[&str] = &[
        "",
        "test.alice 123",
        "test.alice!123",
        "test.alice/123",
        "test",
        "what.alice",
        "test4.alice",
        "test.",
        "test.alice.",
        ".test.alice",
        "test..alice",
    ];

    #[test]
    fn parses_valid_addresses() {
        for address in VALID_ADDRESSES {
            assert_eq!(Address::from_str(address).unwrap().as_str(), *address);
        }
        let longest = make_address(1023);
        assert!(Address::from_str(&longest).is_ok());
    }

    #[test]
    fn rejects_invalid_addresses() {
        for address in INVALID_ADDRESSES {
            assert!(Address::from_str(address).is_err(), "address: {:?}", address);
        }
        assert!(Address::from_str(&make_address(1024)).is_err());
        assert!(Address::try_from(&[0xff, 0xfe][..]).is_err());
    }

    #[test]
    fn new_accepts_constants() {
        assert_eq!(Address::new("peer.config").as_str(), "peer.config");
    }

    #[test]
    fn scheme_and_segments() {
        let address = Address::from_str("g.usd.bob.invoices").unwrap();
        assert_eq!(address.scheme(), "g");
        assert_eq!(
            address.segments().collect::<Vec<_>>(),
            vec!["g", "usd", "bob", "invoices"]
        );
    }

    #[test]
    fn with_suffix() {
        let address = Address::from_str("test.alice").unwrap();
        assert_eq!(address.with_suffix("1234").unwrap(), "test.alice.1234");
        assert!(address.with_suffix("12 34").is_err());
    }

    #[test]
    fn debug_and_display() {
        let address = Address::from_str("test.alice").unwrap();
        assert_eq!(format!("{:?}", address), "Address(\"test.alice\")");
        assert_eq!(format!("{}", address), "test.alice");
    }

    fn make_address(length: usize) -> String {
        let mut addr = String::from("test.");
        while addr.len() < length {
            addr.push('_');
        }
        addr
    }
}
