//! Runtime message values and the reflective accessors over them.
//!
//! [`MessageValue`] is a dynamic instance keyed by field number. Field order is
//! deterministic (BTreeMap), and unrecognized wire fields ride along in an
//! opaque `unknown` blob that the transformation engines never touch.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};

use crate::descriptor::{DescriptorPool, FieldDescriptor, MessageRef};

/// A single field value.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    I32(i32),
    I64(i64),
    U32(u32),
    U64(u64),
    F32(f32),
    F64(f64),
    Bool(bool),
    String(String),
    Bytes(Vec<u8>),
    /// Enum value by number.
    Enum(i32),
    Message(MessageValue),
    List(Vec<Value>),
    Map(BTreeMap<MapKey, Value>),
    /// Native date, produced when populating with the `dates` option.
    Date(DateTime<Utc>),
}

impl Value {
    pub fn as_i64(&self) -> Option<i64> {
        match self {
            Value::I32(x) => Some(i64::from(*x)),
            Value::I64(x) => Some(*x),
            Value::U32(x) => Some(i64::from(*x)),
            Value::Enum(x) => Some(i64::from(*x)),
            _ => None,
        }
    }

    pub fn as_u64(&self) -> Option<u64> {
        match self {
            Value::U32(x) => Some(u64::from(*x)),
            Value::U64(x) => Some(*x),
            _ => None,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Value::Bool(b) => Some(*b),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::String(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_message(&self) -> Option<&MessageValue> {
        match self {
            Value::Message(m) => Some(m),
            _ => None,
        }
    }

    pub fn as_list(&self) -> Option<&[Value]> {
        match self {
            Value::List(v) => Some(v),
            _ => None,
        }
    }

    pub fn as_map(&self) -> Option<&BTreeMap<MapKey, Value>> {
        match self {
            Value::Map(m) => Some(m),
            _ => None,
        }
    }

    pub fn as_date(&self) -> Option<DateTime<Utc>> {
        match self {
            Value::Date(d) => Some(*d),
            _ => None,
        }
    }
}

/// Map key; protobuf map keys are integral, bool, or string.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord)]
pub enum MapKey {
    Bool(bool),
    Int(i64),
    Uint(u64),
    String(String),
}

impl From<&str> for MapKey {
    fn from(s: &str) -> Self {
        MapKey::String(s.to_string())
    }
}

impl From<i64> for MapKey {
    fn from(v: i64) -> Self {
        MapKey::Int(v)
    }
}

impl From<u64> for MapKey {
    fn from(v: u64) -> Self {
        MapKey::Uint(v)
    }
}

/// A concrete message instance conforming to a message descriptor.
///
/// Presence is membership in the field map: an absent entry is an unset field.
/// `Clone` is a deep copy with no aliasing of nested state.
#[derive(Debug, Clone, PartialEq)]
pub struct MessageValue {
    schema: MessageRef,
    fields: BTreeMap<u32, Value>,
    unknown: Vec<u8>,
}

impl MessageValue {
    /// The type's zero-value instance: no fields set.
    pub fn empty(schema: MessageRef) -> Self {
        MessageValue {
            schema,
            fields: BTreeMap::new(),
            unknown: Vec::new(),
        }
    }

    pub fn schema(&self) -> MessageRef {
        self.schema
    }

    pub fn get(&self, field: &FieldDescriptor) -> Option<&Value> {
        self.fields.get(&field.number)
    }

    pub fn get_mut(&mut self, field: &FieldDescriptor) -> Option<&mut Value> {
        self.fields.get_mut(&field.number)
    }

    pub fn is_set(&self, field: &FieldDescriptor) -> bool {
        self.fields.contains_key(&field.number)
    }

    pub fn take(&mut self, field: &FieldDescriptor) -> Option<Value> {
        self.fields.remove(&field.number)
    }

    pub fn clear(&mut self, field: &FieldDescriptor) {
        self.fields.remove(&field.number);
    }

    /// Set a field value. When the field belongs to a oneof group, the other
    /// members of the group are cleared so at most one branch stays active.
    pub fn set(&mut self, pool: &DescriptorPool, field: &FieldDescriptor, value: Value) {
        if let Some(oneof) = field.oneof {
            let desc = pool.message(self.schema);
            for &fi in &desc.oneofs()[oneof].fields {
                let sibling = &desc.fields()[fi];
                if sibling.number != field.number {
                    self.fields.remove(&sibling.number);
                }
            }
        }
        self.fields.insert(field.number, value);
    }

    /// Which member of a oneof group is active, if any.
    pub fn oneof_case<'p>(
        &self,
        pool: &'p DescriptorPool,
        oneof: usize,
    ) -> Option<&'p FieldDescriptor> {
        let desc = pool.message(self.schema);
        desc.oneofs()[oneof]
            .fields
            .iter()
            .map(|&fi| &desc.fields()[fi])
            .find(|f| self.fields.contains_key(&f.number))
    }

    /// Raw access by field number, used by the well-known-type helpers.
    pub fn by_number(&self, number: u32) -> Option<&Value> {
        self.fields.get(&number)
    }

    pub(crate) fn insert_by_number(&mut self, number: u32, value: Value) {
        self.fields.insert(number, value);
    }

    /// Unrecognized wire fields carried through untouched.
    pub fn unknown(&self) -> &[u8] {
        &self.unknown
    }

    pub fn set_unknown(&mut self, bytes: Vec<u8>) {
        self.unknown = bytes;
    }
}
