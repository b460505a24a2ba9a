//! Schema definitions and the resolved descriptor pool.
//!
//! Schemas are built from plain definition structs (`MessageDef`, `FieldDef`,
//! `EnumDef`) that reference other types **by name**, then resolved into a
//! [`DescriptorPool`] where every reference is an index. Index references keep
//! cyclic message graphs (A contains B contains A) representable without
//! reference-counted cycles, and give every field a dense id used for the
//! requiredness cache.
//!
//! The pool is immutable after [`DescriptorPool::resolve`] and safe to share
//! across threads.

use std::collections::{HashMap, HashSet};
use std::iter;

use once_cell::sync::OnceCell;
use thiserror::Error;

use crate::timestamp::TIMESTAMP_TYPE;
use crate::value::Value;

/// Index of a message descriptor within its pool.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct MessageRef(pub(crate) usize);

/// Index of an enum descriptor within its pool.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct EnumRef(pub(crate) usize);

/// Dense pool-wide field identity, assigned at resolve time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub(crate) struct FieldId(pub(crate) u32);

/// Protobuf scalar types supported by the transformation engines.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScalarType {
    Int32,
    Int64,
    Uint32,
    Uint64,
    Float,
    Double,
    Bool,
    String,
    Bytes,
}

impl ScalarType {
    /// Canonical zero value. 64-bit integers render as `"0"` when the field
    /// carries the long-as-string mode.
    pub fn zero_value(self, long_as_string: bool) -> Value {
        match self {
            ScalarType::Int32 => Value::I32(0),
            ScalarType::Int64 if long_as_string => Value::String("0".to_string()),
            ScalarType::Int64 => Value::I64(0),
            ScalarType::Uint32 => Value::U32(0),
            ScalarType::Uint64 if long_as_string => Value::String("0".to_string()),
            ScalarType::Uint64 => Value::U64(0),
            ScalarType::Float => Value::F32(0.0),
            ScalarType::Double => Value::F64(0.0),
            ScalarType::Bool => Value::Bool(false),
            ScalarType::String => Value::String(String::new()),
            ScalarType::Bytes => Value::Bytes(Vec::new()),
        }
    }
}

/// Presence semantics of a field.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldPresence {
    Explicit,
    Implicit,
    /// proto2 `required`, or an editions feature with the same meaning.
    LegacyRequired,
}

// ---------------------------------------------------------------------------
// Unresolved schema definitions (by-name references)
// ---------------------------------------------------------------------------

/// A set of message and enum definitions prior to resolution.
#[derive(Debug, Clone, Default)]
pub struct Schema {
    pub messages: Vec<MessageDef>,
    pub enums: Vec<EnumDef>,
}

impl Schema {
    pub fn new() -> Self {
        Schema::default()
    }

    pub fn message(mut self, def: MessageDef) -> Self {
        self.messages.push(def);
        self
    }

    pub fn enumeration(mut self, def: EnumDef) -> Self {
        self.enums.push(def);
        self
    }

    /// Register the well-known `google.protobuf.Timestamp` message.
    pub fn timestamp(self) -> Self {
        self.message(
            MessageDef::new(TIMESTAMP_TYPE)
                .field(FieldDef::scalar("seconds", 1, ScalarType::Int64))
                .field(FieldDef::scalar("nanos", 2, ScalarType::Int32)),
        )
    }
}

#[derive(Debug, Clone)]
pub struct MessageDef {
    pub type_name: String,
    pub members: Vec<MemberDef>,
    /// Raw wire bytes of option extensions the schema model does not interpret.
    pub unknown_options: Vec<u8>,
}

impl MessageDef {
    pub fn new(type_name: impl Into<String>) -> Self {
        MessageDef {
            type_name: type_name.into(),
            members: Vec::new(),
            unknown_options: Vec::new(),
        }
    }

    pub fn field(mut self, def: FieldDef) -> Self {
        self.members.push(MemberDef::Field(def));
        self
    }

    pub fn oneof(mut self, name: impl Into<String>, fields: Vec<FieldDef>) -> Self {
        self.members.push(MemberDef::Oneof(OneofDef {
            name: name.into(),
            fields,
        }));
        self
    }

    pub fn with_options(mut self, bytes: Vec<u8>) -> Self {
        self.unknown_options = bytes;
        self
    }
}

#[derive(Debug, Clone)]
pub enum MemberDef {
    Field(FieldDef),
    Oneof(OneofDef),
}

#[derive(Debug, Clone)]
pub struct OneofDef {
    pub name: String,
    pub fields: Vec<FieldDef>,
}

#[derive(Debug, Clone)]
pub struct FieldDef {
    pub name: String,
    pub number: u32,
    pub kind: FieldKindDef,
    pub presence: FieldPresence,
    pub long_as_string: bool,
    pub unknown_options: Vec<u8>,
}

impl FieldDef {
    fn new(name: impl Into<String>, number: u32, kind: FieldKindDef) -> Self {
        FieldDef {
            name: name.into(),
            number,
            kind,
            presence: FieldPresence::Implicit,
            long_as_string: false,
            unknown_options: Vec::new(),
        }
    }

    pub fn scalar(name: impl Into<String>, number: u32, ty: ScalarType) -> Self {
        FieldDef::new(name, number, FieldKindDef::Scalar(ty))
    }

    pub fn enumeration(name: impl Into<String>, number: u32, enum_name: impl Into<String>) -> Self {
        FieldDef::new(name, number, FieldKindDef::Enum(enum_name.into()))
    }

    pub fn message(name: impl Into<String>, number: u32, type_name: impl Into<String>) -> Self {
        let mut def = FieldDef::new(name, number, FieldKindDef::Message(type_name.into()));
        def.presence = FieldPresence::Explicit;
        def
    }

    pub fn map(name: impl Into<String>, number: u32, key: ScalarType, value: ElemDef) -> Self {
        FieldDef::new(name, number, FieldKindDef::Map { key, value })
    }

    pub fn list(name: impl Into<String>, number: u32, elem: ElemDef) -> Self {
        FieldDef::new(name, number, FieldKindDef::List(elem))
    }

    pub fn with_presence(mut self, presence: FieldPresence) -> Self {
        self.presence = presence;
        self
    }

    pub fn with_long_as_string(mut self) -> Self {
        self.long_as_string = true;
        self
    }

    pub fn with_options(mut self, bytes: Vec<u8>) -> Self {
        self.unknown_options = bytes;
        self
    }
}

#[derive(Debug, Clone)]
pub enum FieldKindDef {
    Scalar(ScalarType),
    Enum(String),
    Message(String),
    Map { key: ScalarType, value: ElemDef },
    List(ElemDef),
}

#[derive(Debug, Clone)]
pub enum ElemDef {
    Scalar(ScalarType),
    Enum(String),
    Message(String),
}

#[derive(Debug, Clone)]
pub struct EnumDef {
    pub name: String,
    /// Enumerators in declaration order; the first one is the zero value used
    /// when populating unset enum fields.
    pub values: Vec<(String, i32)>,
}

impl EnumDef {
    pub fn new(name: impl Into<String>, values: Vec<(&str, i32)>) -> Self {
        EnumDef {
            name: name.into(),
            values: values
                .into_iter()
                .map(|(n, v)| (n.to_string(), v))
                .collect(),
        }
    }
}

// ---------------------------------------------------------------------------
// Resolved descriptors
// ---------------------------------------------------------------------------

#[derive(Debug, Error)]
pub enum SchemaError {
    #[error("duplicate type name: {0}")]
    DuplicateType(String),
    #[error("field {field}: unknown type {type_name}")]
    UnknownType { field: String, type_name: String },
    #[error("duplicate field number {number} in message {message}")]
    DuplicateFieldNumber { message: String, number: u32 },
}

/// Immutable resolved schema: all type references are indices, every field has
/// a dense id, and the requiredness cache is sized to the field count.
#[derive(Debug)]
pub struct DescriptorPool {
    messages: Vec<MessageDescriptor>,
    enums: Vec<EnumDescriptor>,
    by_name: HashMap<String, MessageRef>,
    required_cache: Box<[OnceCell<bool>]>,
}

#[derive(Debug)]
pub struct MessageDescriptor {
    pub type_name: String,
    pub members: Vec<Member>,
    pub unknown_options: Vec<u8>,
    pub(crate) fields: Vec<FieldDescriptor>,
    pub(crate) oneofs: Vec<OneofDescriptor>,
}

impl MessageDescriptor {
    pub fn fields(&self) -> &[FieldDescriptor] {
        &self.fields
    }

    pub fn oneofs(&self) -> &[OneofDescriptor] {
        &self.oneofs
    }

    pub fn field_by_name(&self, name: &str) -> Option<&FieldDescriptor> {
        self.fields.iter().find(|f| f.name == name)
    }

    pub fn field_by_number(&self, number: u32) -> Option<&FieldDescriptor> {
        self.fields.iter().find(|f| f.number == number)
    }
}

/// Member of a message, in declaration order. Indices point into the owning
/// message's field/oneof vectors.
#[derive(Debug, Clone, Copy)]
pub enum Member {
    Field(usize),
    Oneof(usize),
}

#[derive(Debug)]
pub struct FieldDescriptor {
    pub name: String,
    pub number: u32,
    pub kind: FieldKind,
    pub presence: FieldPresence,
    pub long_as_string: bool,
    /// Index of the oneof group this field belongs to, if any.
    pub oneof: Option<usize>,
    pub unknown_options: Vec<u8>,
    pub(crate) id: FieldId,
    pub(crate) parent: MessageRef,
}

#[derive(Debug, Clone, Copy)]
pub enum FieldKind {
    Scalar(ScalarType),
    Enum(EnumRef),
    Message(MessageRef),
    Map { key: ScalarType, value: ElemKind },
    List(ElemKind),
}

#[derive(Debug, Clone, Copy)]
pub enum ElemKind {
    Scalar(ScalarType),
    Enum(EnumRef),
    Message(MessageRef),
}

#[derive(Debug)]
pub struct OneofDescriptor {
    pub name: String,
    /// Indices into the owning message's field vector.
    pub fields: Vec<usize>,
}

#[derive(Debug)]
pub struct EnumDescriptor {
    pub name: String,
    pub values: Vec<(String, i32)>,
}

impl DescriptorPool {
    /// Resolve a schema: index types by name, check for duplicates, and turn
    /// every by-name reference into an index.
    pub fn resolve(schema: Schema) -> Result<Self, SchemaError> {
        let mut by_name = HashMap::new();
        for (i, m) in schema.messages.iter().enumerate() {
            if by_name.insert(m.type_name.clone(), MessageRef(i)).is_some() {
                return Err(SchemaError::DuplicateType(m.type_name.clone()));
            }
        }
        let mut enums_by_name = HashMap::new();
        for (i, e) in schema.enums.iter().enumerate() {
            if enums_by_name.insert(e.name.clone(), EnumRef(i)).is_some() {
                return Err(SchemaError::DuplicateType(e.name.clone()));
            }
        }

        let mut next_id = 0u32;
        let mut messages = Vec::with_capacity(schema.messages.len());
        for (mi, def) in schema.messages.into_iter().enumerate() {
            let parent = MessageRef(mi);
            let type_name = def.type_name;
            let mut fields = Vec::new();
            let mut oneofs = Vec::new();
            let mut members = Vec::new();
            let mut numbers = HashSet::new();

            for member in def.members {
                match member {
                    MemberDef::Field(f) => {
                        members.push(Member::Field(fields.len()));
                        fields.push(resolve_field(
                            f,
                            None,
                            parent,
                            &type_name,
                            &by_name,
                            &enums_by_name,
                            &mut next_id,
                            &mut numbers,
                        )?);
                    }
                    MemberDef::Oneof(o) => {
                        let oneof_index = oneofs.len();
                        members.push(Member::Oneof(oneof_index));
                        let mut indices = Vec::with_capacity(o.fields.len());
                        for f in o.fields {
                            indices.push(fields.len());
                            fields.push(resolve_field(
                                f,
                                Some(oneof_index),
                                parent,
                                &type_name,
                                &by_name,
                                &enums_by_name,
                                &mut next_id,
                                &mut numbers,
                            )?);
                        }
                        oneofs.push(OneofDescriptor {
                            name: o.name,
                            fields: indices,
                        });
                    }
                }
            }

            messages.push(MessageDescriptor {
                type_name,
                members,
                unknown_options: def.unknown_options,
                fields,
                oneofs,
            });
        }

        let enums = schema
            .enums
            .into_iter()
            .map(|e| EnumDescriptor {
                name: e.name,
                values: e.values,
            })
            .collect();

        let required_cache = iter::repeat_with(OnceCell::new)
            .take(next_id as usize)
            .collect::<Vec<_>>()
            .into_boxed_slice();

        Ok(DescriptorPool {
            messages,
            enums,
            by_name,
            required_cache,
        })
    }

    pub fn message(&self, r: MessageRef) -> &MessageDescriptor {
        &self.messages[r.0]
    }

    pub fn message_by_name(&self, name: &str) -> Option<MessageRef> {
        self.by_name.get(name).copied()
    }

    pub fn enumeration(&self, r: EnumRef) -> &EnumDescriptor {
        &self.enums[r.0]
    }

    pub fn is_timestamp(&self, r: MessageRef) -> bool {
        self.message(r).type_name == TIMESTAMP_TYPE
    }

    /// Insert-if-absent lookup in the requiredness cache. Racing computations
    /// of the same entry produce the same value, so no further locking is
    /// needed.
    pub(crate) fn cached_required(&self, id: FieldId, compute: impl FnOnce() -> bool) -> bool {
        *self.required_cache[id.0 as usize].get_or_init(compute)
    }
}

#[allow(clippy::too_many_arguments)]
fn resolve_field(
    def: FieldDef,
    oneof: Option<usize>,
    parent: MessageRef,
    message_name: &str,
    messages: &HashMap<String, MessageRef>,
    enums: &HashMap<String, EnumRef>,
    next_id: &mut u32,
    numbers: &mut HashSet<u32>,
) -> Result<FieldDescriptor, SchemaError> {
    if !numbers.insert(def.number) {
        return Err(SchemaError::DuplicateFieldNumber {
            message: message_name.to_string(),
            number: def.number,
        });
    }
    let kind = match def.kind {
        FieldKindDef::Scalar(ty) => FieldKind::Scalar(ty),
        FieldKindDef::Enum(name) => FieldKind::Enum(lookup(enums, &name, &def.name)?),
        FieldKindDef::Message(name) => FieldKind::Message(lookup(messages, &name, &def.name)?),
        FieldKindDef::Map { key, value } => FieldKind::Map {
            key,
            value: resolve_elem(value, &def.name, messages, enums)?,
        },
        FieldKindDef::List(elem) => {
            FieldKind::List(resolve_elem(elem, &def.name, messages, enums)?)
        }
    };
    let id = FieldId(*next_id);
    *next_id += 1;
    Ok(FieldDescriptor {
        name: def.name,
        number: def.number,
        kind,
        presence: def.presence,
        long_as_string: def.long_as_string,
        oneof,
        unknown_options: def.unknown_options,
        id,
        parent,
    })
}

fn resolve_elem(
    elem: ElemDef,
    field_name: &str,
    messages: &HashMap<String, MessageRef>,
    enums: &HashMap<String, EnumRef>,
) -> Result<ElemKind, SchemaError> {
    Ok(match elem {
        ElemDef::Scalar(ty) => ElemKind::Scalar(ty),
        ElemDef::Enum(name) => ElemKind::Enum(lookup(enums, &name, field_name)?),
        ElemDef::Message(name) => ElemKind::Message(lookup(messages, &name, field_name)?),
    })
}

fn lookup<R: Copy>(
    table: &HashMap<String, R>,
    type_name: &str,
    field_name: &str,
) -> Result<R, SchemaError> {
    table
        .get(type_name)
        .copied()
        .ok_or_else(|| SchemaError::UnknownType {
            field: field_name.to_string(),
            type_name: type_name.to_string(),
        })
}
