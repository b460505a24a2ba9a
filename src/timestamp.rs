//! Helpers for the well-known `google.protobuf.Timestamp` message.

use chrono::{DateTime, Utc};

use crate::descriptor::MessageRef;
use crate::value::{MessageValue, Value};

/// Qualified type name that receives Timestamp special handling.
pub const TIMESTAMP_TYPE: &str = "google.protobuf.Timestamp";

pub(crate) const SECONDS_FIELD: u32 = 1;
pub(crate) const NANOS_FIELD: u32 = 2;

/// Build a Timestamp instance (seconds + nanos since epoch) from a date.
pub fn from_datetime(schema: MessageRef, dt: DateTime<Utc>) -> MessageValue {
    let mut msg = MessageValue::empty(schema);
    msg.insert_by_number(SECONDS_FIELD, Value::I64(dt.timestamp()));
    msg.insert_by_number(NANOS_FIELD, Value::I32(dt.timestamp_subsec_nanos() as i32));
    msg
}

/// Convert a Timestamp instance back to a date. Unset fields count as zero;
/// `None` only for out-of-range seconds/nanos.
pub fn to_datetime(msg: &MessageValue) -> Option<DateTime<Utc>> {
    let seconds = msg
        .by_number(SECONDS_FIELD)
        .and_then(Value::as_i64)
        .unwrap_or(0);
    let nanos = match msg.by_number(NANOS_FIELD) {
        Some(Value::I32(n)) => *n,
        Some(_) => return None,
        None => 0,
    };
    let nanos = u32::try_from(nanos).ok()?;
    DateTime::from_timestamp(seconds, nanos)
}
