//! Recursive construction of message instances from partial initializers.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};

use crate::descriptor::{DescriptorPool, ElemKind, FieldDescriptor, FieldKind, Member, MessageRef};
use crate::timestamp;
use crate::value::{MapKey, MessageValue, Value};

/// Initializer for [`init`], resolved once at entry instead of probing shapes
/// throughout the traversal.
///
/// A `Record` mirrors the message's members: plain fields are keyed by local
/// name, and a oneof group is keyed by its group name with a [`Init::Case`]
/// discriminator selecting the active branch.
#[derive(Debug, Clone)]
pub enum Init {
    /// An already-conforming instance, returned unchanged.
    Message(MessageValue),
    /// Partial record; absent entries are left for the type's defaults.
    Record(BTreeMap<String, Init>),
    /// Active branch of a oneof group.
    Case { name: String, value: Box<Init> },
    List(Vec<Init>),
    Map(BTreeMap<MapKey, Init>),
    Scalar(Value),
    /// Native date, accepted where a Timestamp message is expected.
    Date(DateTime<Utc>),
}

impl Init {
    pub fn record<K, I>(entries: I) -> Init
    where
        K: Into<String>,
        I: IntoIterator<Item = (K, Init)>,
    {
        Init::Record(
            entries
                .into_iter()
                .map(|(k, v)| (k.into(), v))
                .collect(),
        )
    }

    pub fn case(name: impl Into<String>, value: Init) -> Init {
        Init::Case {
            name: name.into(),
            value: Box::new(value),
        }
    }

    pub fn list<I: IntoIterator<Item = Init>>(items: I) -> Init {
        Init::List(items.into_iter().collect())
    }

    pub fn map<K, I>(entries: I) -> Init
    where
        K: Into<MapKey>,
        I: IntoIterator<Item = (K, Init)>,
    {
        Init::Map(
            entries
                .into_iter()
                .map(|(k, v)| (k.into(), v))
                .collect(),
        )
    }
}

impl From<Value> for Init {
    fn from(v: Value) -> Self {
        Init::Scalar(v)
    }
}

impl From<MessageValue> for Init {
    fn from(m: MessageValue) -> Self {
        Init::Message(m)
    }
}

impl From<DateTime<Utc>> for Init {
    fn from(d: DateTime<Utc>) -> Self {
        Init::Date(d)
    }
}

impl From<&str> for Init {
    fn from(s: &str) -> Self {
        Init::Scalar(Value::String(s.to_string()))
    }
}

impl From<i32> for Init {
    fn from(v: i32) -> Self {
        Init::Scalar(Value::I32(v))
    }
}

impl From<i64> for Init {
    fn from(v: i64) -> Self {
        Init::Scalar(Value::I64(v))
    }
}

impl From<u64> for Init {
    fn from(v: u64) -> Self {
        Init::Scalar(Value::U64(v))
    }
}

impl From<bool> for Init {
    fn from(v: bool) -> Self {
        Init::Scalar(Value::Bool(v))
    }
}

/// Build a message instance of `schema` from a partial initializer.
///
/// An already-conforming instance is returned as-is (no copy, unknown fields
/// preserved); no initializer yields the zero-value instance. A native date
/// initializer against the well-known Timestamp type converts directly to the
/// seconds/nanos representation. Anything else is treated as a nested partial
/// record and normalized recursively; entries whose runtime shape does not
/// match the field's kind are dropped silently.
pub fn init(pool: &DescriptorPool, schema: MessageRef, initializer: Option<Init>) -> MessageValue {
    let initializer = match initializer {
        Some(v) => v,
        None => return MessageValue::empty(schema),
    };
    match initializer {
        Init::Message(m) if m.schema() == schema => m,
        Init::Date(dt) if pool.is_timestamp(schema) => timestamp::from_datetime(schema, dt),
        Init::Record(record) => build_record(pool, schema, record),
        _ => MessageValue::empty(schema),
    }
}

fn build_record(
    pool: &DescriptorPool,
    schema: MessageRef,
    mut record: BTreeMap<String, Init>,
) -> MessageValue {
    let desc = pool.message(schema);
    let mut out = MessageValue::empty(schema);
    for member in &desc.members {
        let (field, value) = match *member {
            Member::Field(i) => {
                let field = &desc.fields()[i];
                match record.remove(&field.name) {
                    Some(v) => (field, v),
                    None => continue,
                }
            }
            Member::Oneof(i) => {
                let oneof = &desc.oneofs()[i];
                let (case, value) = match record.remove(&oneof.name) {
                    Some(Init::Case { name, value }) => (name, value),
                    _ => continue,
                };
                let field = oneof
                    .fields
                    .iter()
                    .map(|&fi| &desc.fields()[fi])
                    .find(|f| f.name == case);
                match field {
                    Some(f) => (f, *value),
                    None => continue,
                }
            }
        };
        if let Some(v) = convert_field(pool, field, value) {
            out.set(pool, field, v);
        }
    }
    out
}

/// Normalize one initializer entry against the field's kind. `None` means a
/// shape mismatch; the field is left for the type's defaults.
fn convert_field(pool: &DescriptorPool, field: &FieldDescriptor, value: Init) -> Option<Value> {
    match field.kind {
        FieldKind::Message(m) => Some(Value::Message(init(pool, m, Some(value)))),
        FieldKind::Scalar(_) | FieldKind::Enum(_) => leaf_value(value),
        FieldKind::Map {
            value: ElemKind::Message(m),
            ..
        } => match value {
            Init::Map(entries) => Some(Value::Map(
                entries
                    .into_iter()
                    .map(|(k, v)| (k, Value::Message(init(pool, m, Some(v)))))
                    .collect(),
            )),
            _ => None,
        },
        FieldKind::Map { .. } => match value {
            Init::Map(entries) => Some(Value::Map(
                entries
                    .into_iter()
                    .filter_map(|(k, v)| leaf_value(v).map(|v| (k, v)))
                    .collect(),
            )),
            _ => None,
        },
        FieldKind::List(ElemKind::Message(m)) => match value {
            Init::List(items) => Some(Value::List(
                items
                    .into_iter()
                    .map(|v| Value::Message(init(pool, m, Some(v))))
                    .collect(),
            )),
            _ => None,
        },
        FieldKind::List(_) => match value {
            Init::List(items) => Some(Value::List(
                items.into_iter().filter_map(leaf_value).collect(),
            )),
            _ => None,
        },
    }
}

fn leaf_value(value: Init) -> Option<Value> {
    match value {
        Init::Scalar(v) => Some(v),
        _ => None,
    }
}
