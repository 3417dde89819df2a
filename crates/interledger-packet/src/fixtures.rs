use super::*;
use chrono::DateTime;
use once_cell::sync::Lazy;
use std::str::FromStr;
use std::time::SystemTime;

pub static EXPIRES_AT: Lazy<SystemTime> = Lazy::new(|| {
    SystemTime::from(DateTime::parse_from_rfc3339("2017-12-23T01:21:40.549Z").unwrap())
});

pub static EXECUTION_CONDITION: [u8; 32] = [
    251, 6, 190, 196, 68, 190, 106, 146, 124, 86, 83, 171, 226, 250, 59, 213, 77, 59, 109, 218, 25, 12, 129, 8, 125, 233, 251, 124, 91, 66, 137, 118,
];

pub static FULFILLMENT: [u8; 32] = [
    163, 242, 196, 183, 138, 172, 153, 238, 249, 27, 251, 76, 235, 255, 75, 48, 63, 192, 113, 114, 175, 37, 98, 80, 15, 200, 171, 167, 78, 224, 136, 200,
];

pub static DATA: &[u8] = b"\
        \x6c\x99\xf6\xa9\x69\x47\x30\x28\xef\x46\xe0\x9b\x47\x15\x81\xc9\
        \x15\xb6\xd5\x49\x6c\x99\xf6\xa9\x69\x47\x30\x28\xef\x46\xe0\x9b\
        \x47\x15\x81\xc9\x15\xb6\xd5\x49\x6c\x99\xf6\xa9\x69\x47\x30\x28\
        \xef\
";

pub static PREPARE_BUILDER: Lazy<PrepareBuilder<'static>> = Lazy::new(|| PrepareBuilder {
    amount: 107,
    expires_at: *EXPIRES_AT,
    execution_condition: &EXECUTION_CONDITION,
    destination: Address::from_str("example.alice").unwrap(),
    data: DATA,
});
pub static PREPARE: Lazy<Prepare> = Lazy::new(|| PREPARE_BUILDER.build());
pub static PREPARE_BYTES: &[u8] = b"\
        \x0c\x79\x00\x00\x00\x00\x00\x00\x00\x6b\x32\x30\x31\x37\x31\x32\
        \x32\x33\x30\x31\x32\x31\x34\x30\x35\x34\x39\xfb\x06\xbe\xc4\x44\
        \xbe\x6a\x92\x7c\x56\x53\xab\xe2\xfa\x3b\xd5\x4d\x3b\x6d\xda\x19\
        \x0c\x81\x08\x7d\xe9\xfb\x7c\x5b\x42\x89\x76\x0d\x65\x78\x61\x6d\
        \x70\x6c\x65\x2e\x61\x6c\x69\x63\x65\x31\x6c\x99\xf6\xa9\x69\x47\
        \x30\x28\xef\x46\xe0\x9b\x47\x15\x81\xc9\x15\xb6\xd5\x49\x6c\x99\
        \xf6\xa9\x69\x47\x30\x28\xef\x46\xe0\x9b\x47\x15\x81\xc9\x15\xb6\
        \xd5\x49\x6c\x99\xf6\xa9\x69\x47\x30\x28\xef\
";

pub static FULFILL_BUILDER: Lazy<FulfillBuilder<'static>> = Lazy::new(|| FulfillBuilder {
    fulfillment: &FULFILLMENT,
    data: DATA,
});
pub static FULFILL: Lazy<Fulfill> = Lazy::new(|| FULFILL_BUILDER.build());
pub static FULFILL_BYTES: &[u8] = b"\
        \x0d\x52\xa3\xf2\xc4\xb7\x8a\xac\x99\xee\xf9\x1b\xfb\x4c\xeb\xff\
        \x4b\x30\x3f\xc0\x71\x72\xaf\x25\x62\x50\x0f\xc8\xab\xa7\x4e\xe0\
        \x88\xc8\x31\x6c\x99\xf6\xa9\x69\x47\x30\x28\xef\x46\xe0\x9b\x47\
        \x15\x81\xc9\x15\xb6\xd5\x49\x6c\x99\xf6\xa9\x69\x47\x30\x28\xef\
        \x46\xe0\x9b\x47\x15\x81\xc9\x15\xb6\xd5\x49\x6c\x99\xf6\xa9\x69\
        \x47\x30\x28\xef\
";

static CONNECTOR: Lazy<Address> = Lazy::new(|| Address::from_str("example.connector").unwrap());

pub static REJECT_BUILDER: Lazy<RejectBuilder<'static>> = Lazy::new(|| RejectBuilder {
    code: ErrorCode::F99_APPLICATION_ERROR,
    message: b"Some error",
    triggered_by: Some(&*CONNECTOR),
    data: DATA,
});
pub static REJECT: Lazy<Reject> = Lazy::new(|| REJECT_BUILDER.build());
pub static REJECT_BYTES: &[u8] = b"\
        \x0e\x52\x46\x39\x39\x11\x65\x78\x61\x6d\x70\x6c\x65\x2e\x63\x6f\
        \x6e\x6e\x65\x63\x74\x6f\x72\x0a\x53\x6f\x6d\x65\x20\x65\x72\x72\
        \x6f\x72\x31\x6c\x99\xf6\xa9\x69\x47\x30\x28\xef\x46\xe0\x9b\x47\
        \x15\x81\xc9\x15\xb6\xd5\x49\x6c\x99\xf6\xa9\x69\x47\x30\x28\xef\
        \x46\xe0\x9b\x47\x15\x81\xc9\x15\xb6\xd5\x49\x6c\x99\xf6\xa9\x69\
        \x47\x30\x28\xef\
";
