//! Conversion helpers for protobuf types.

use crate::proto::Uuid as ProtoUuid;
use chrono::{DateTime, Utc};
use prost_types::Timestamp;
use uuid::Uuid;

/// Default type URL prefix for protocol buffer messages.
pub const TYPE_URL_PREFIX: &str = "type.googleapis.com";

/// Build a fully-qualified type URL from a message type name.
///
/// # Examples
/// ```
/// use meridian_core::convert::type_url;
/// assert_eq!(type_url("examples.OrderPlaced"), "type.googleapis.com/examples.OrderPlaced");
/// ```
pub fn type_url(type_name: &str) -> String {
    format!("{}/{}", TYPE_URL_PREFIX, type_name)
}

/// Extract the type name suffix from a type URL: the part after the last
/// `/`, or the whole string if there is no `/`.
pub fn type_name_from_url(type_url: &str) -> &str {
    type_url.rsplit('/').next().unwrap_or(type_url)
}

/// Extract the bare message name from a type URL, dropping both the host
/// and the package: `type.googleapis.com/examples.ProcessPayment` ->
/// `ProcessPayment`. This is what dispatch-key formation (compensation
/// routing) compares against, since handlers are registered by bare type
/// name, not by fully-qualified package path.
pub fn bare_type_name(type_url: &str) -> &str {
    type_name_from_url(type_url).rsplit('.').next().unwrap_or(type_url)
}

/// Check whether a type URL ends with the given discriminator suffix.
///
/// This is the authoritative dispatch comparison used throughout the
/// runtime: every handler table is keyed by suffix, never by the full URL.
pub fn type_url_matches(type_url: &str, suffix: &str) -> bool {
    type_url.ends_with(suffix)
}

/// Convert a UUID to its protobuf representation.
pub fn uuid_to_proto(uuid: Uuid) -> ProtoUuid {
    ProtoUuid {
        value: uuid.as_bytes().to_vec(),
    }
}

/// Convert a protobuf UUID to a standard UUID.
pub fn proto_to_uuid(proto: &ProtoUuid) -> Result<Uuid, uuid::Error> {
    Uuid::from_slice(&proto.value)
}

/// Parse an RFC3339 timestamp string into a protobuf Timestamp.
pub fn parse_timestamp(rfc3339: &str) -> Result<Timestamp, chrono::ParseError> {
    let dt: DateTime<Utc> = rfc3339.parse()?;
    Ok(Timestamp {
        seconds: dt.timestamp(),
        nanos: dt.timestamp_subsec_nanos() as i32,
    })
}

/// Get the current time as a protobuf Timestamp.
pub fn now() -> Timestamp {
    let now = std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .expect("system time before unix epoch");

    Timestamp {
        seconds: now.as_secs() as i64,
        nanos: now.subsec_nanos() as i32,
    }
}
