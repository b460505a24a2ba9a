//! Policy-driven population of already-built messages.
//!
//! The traversal fills unset fields with zero values and/or converts Timestamp
//! messages into native dates, depending on [`PopulateOptions`]. It is a
//! policy layer, not a validator: values whose runtime shape does not match
//! the descriptor are skipped silently.

use crate::descriptor::{DescriptorPool, ElemKind, FieldKind, Member, MessageRef};
use crate::required::is_required;
use crate::timestamp;
use crate::value::{MessageValue, Value};

/// Population policy. The default fills only what is needed for the message to
/// satisfy its declared required-field contract.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PopulateOptions {
    /// Recursively populate fields resolved as required (default `true`).
    pub valid_types: bool,
    /// Fill unset scalar and enum fields with their zero value.
    pub scalars: bool,
    /// Recursively populate every message-kind field, required or not.
    pub messages: bool,
    /// Convert `google.protobuf.Timestamp` values, at any depth, into native
    /// dates.
    pub dates: bool,
}

impl Default for PopulateOptions {
    fn default() -> Self {
        PopulateOptions {
            valid_types: true,
            scalars: false,
            messages: false,
            dates: false,
        }
    }
}

/// Copying form: clone the message, then populate the clone. The caller's
/// original is left untouched.
pub fn populate(
    pool: &DescriptorPool,
    schema: MessageRef,
    message: &MessageValue,
    options: &PopulateOptions,
) -> Value {
    populate_in_place(pool, schema, message.clone(), options)
}

/// Mutating form: takes ownership of the message and returns the transformed
/// value. A Timestamp at the root becomes a [`Value::Date`] under `dates`;
/// everything else comes back as [`Value::Message`].
pub fn populate_in_place(
    pool: &DescriptorPool,
    schema: MessageRef,
    mut message: MessageValue,
    options: &PopulateOptions,
) -> Value {
    if pool.is_timestamp(schema) {
        if options.dates {
            if let Some(dt) = timestamp::to_datetime(&message) {
                return Value::Date(dt);
            }
        }
        // A Timestamp has every field populated by construction.
        return Value::Message(message);
    }

    let desc = pool.message(schema);
    for member in &desc.members {
        let field = match *member {
            Member::Field(i) => &desc.fields()[i],
            Member::Oneof(i) => match message.oneof_case(pool, i) {
                Some(f) => f,
                None => continue,
            },
        };
        match field.kind {
            FieldKind::Message(m) => {
                let recurse = options.messages
                    || (options.dates && message.is_set(field))
                    || (options.valid_types && is_required(pool, field));
                if !recurse {
                    continue;
                }
                let inner = match message.take(field) {
                    Some(Value::Message(v)) => v,
                    Some(other) => {
                        // Already transformed (e.g. a date) or malformed: put
                        // it back untouched.
                        message.set(pool, field, other);
                        continue;
                    }
                    None => MessageValue::empty(m),
                };
                let transformed = populate_in_place(pool, m, inner, options);
                message.set(pool, field, transformed);
            }
            FieldKind::Scalar(ty) => {
                if !message.is_set(field) && (options.scalars || is_required(pool, field)) {
                    message.set(pool, field, ty.zero_value(field.long_as_string));
                }
            }
            FieldKind::Enum(e) => {
                if !message.is_set(field) && (options.scalars || is_required(pool, field)) {
                    let number = pool
                        .enumeration(e)
                        .values
                        .first()
                        .map(|&(_, n)| n)
                        .unwrap_or(0);
                    message.set(pool, field, Value::Enum(number));
                }
            }
            FieldKind::Map {
                value: ElemKind::Message(m),
                ..
            } => {
                if options.valid_types || options.messages || options.dates {
                    if let Some(Value::Map(entries)) = message.get_mut(field) {
                        for slot in entries.values_mut() {
                            transform_entry(pool, m, slot, options);
                        }
                    }
                }
            }
            FieldKind::List(ElemKind::Message(m)) => {
                if options.valid_types || options.messages || options.dates {
                    if let Some(Value::List(items)) = message.get_mut(field) {
                        for slot in items.iter_mut() {
                            transform_entry(pool, m, slot, options);
                        }
                    }
                }
            }
            FieldKind::Map { .. } | FieldKind::List(_) => {}
        }
    }
    Value::Message(message)
}

/// Replace one map/list entry with its transformed counterpart. Entries that
/// are not messages (already converted, or malformed) stay as they are.
fn transform_entry(
    pool: &DescriptorPool,
    schema: MessageRef,
    slot: &mut Value,
    options: &PopulateOptions,
) {
    if let Value::Message(inner) = slot {
        let owned = std::mem::replace(inner, MessageValue::empty(schema));
        *slot = populate_in_place(pool, schema, owned, options);
    }
}
