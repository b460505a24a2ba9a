//! Required-field resolution from wire-encoded option extensions.
//!
//! Whether a field is required is not stored on the descriptor directly. It is
//! derived from a constraint extension encoded in the raw unknown-option bytes
//! of the field (and of its declaring message), plus the legacy `required`
//! presence marker. Results are memoized per field in the descriptor pool.

use crate::descriptor::{DescriptorPool, FieldDescriptor, FieldKind, FieldPresence};
use crate::wire::{WireError, WireReader, WireType};

/// Extension number carrying constraint rules in an options blob.
const CONSTRAINT_EXT_NUMBER: u32 = 1159;
/// `required` flag inside the field-rules extension.
const FIELD_RULES_REQUIRED: u32 = 25;
/// `ignore` mode inside the field-rules extension.
const FIELD_RULES_IGNORE: u32 = 27;
/// `disabled` flag inside the message-rules extension.
const MESSAGE_RULES_DISABLED: u32 = 1;
/// `ignore` mode meaning the constraint is always omitted.
const IGNORE_ALWAYS: i32 = 3;

const FIELD_RULES_TABLE: &[(u32, OptionType)] = &[
    (FIELD_RULES_REQUIRED, OptionType::Bool),
    (FIELD_RULES_IGNORE, OptionType::Int32),
];
const MESSAGE_RULES_TABLE: &[(u32, OptionType)] = &[(MESSAGE_RULES_DISABLED, OptionType::Bool)];

/// Scalar types the scanner knows how to read. Closed set: adding a new rule
/// type means extending this enum and the match in `read_option`.
#[derive(Debug, Clone, Copy)]
enum OptionType {
    Int32,
    Bool,
}

#[derive(Debug, Clone, Copy)]
enum OptionValue {
    Int32(i32),
    Bool(bool),
}

impl OptionValue {
    fn as_bool(self) -> Option<bool> {
        match self {
            OptionValue::Bool(b) => Some(b),
            OptionValue::Int32(_) => None,
        }
    }

    fn as_i32(self) -> Option<i32> {
        match self {
            OptionValue::Int32(v) => Some(v),
            OptionValue::Bool(_) => None,
        }
    }
}

/// Returns true if the field carries the constraint extension's `required`
/// flag (and it is not ignored or disabled message-wide), or has legacy
/// required presence.
///
/// The result for each field is cached in the pool for the pool's lifetime.
pub fn is_required(pool: &DescriptorPool, field: &FieldDescriptor) -> bool {
    pool.cached_required(field.id, || {
        constraint_required(pool, field) || legacy_required(field)
    })
}

fn constraint_required(pool: &DescriptorPool, field: &FieldDescriptor) -> bool {
    let rules = scan_extension(&field.unknown_options, FIELD_RULES_TABLE);
    let required = rules[0].and_then(OptionValue::as_bool).unwrap_or(false);
    let ignore = rules[1].and_then(OptionValue::as_i32);
    if !required || ignore == Some(IGNORE_ALWAYS) {
        return false;
    }
    let parent = pool.message(field.parent);
    let message_rules = scan_extension(&parent.unknown_options, MESSAGE_RULES_TABLE);
    if message_rules[0].and_then(OptionValue::as_bool).unwrap_or(false) {
        return false;
    }
    true
}

/// Only singular message-kind fields are eligible for legacy requiredness.
fn legacy_required(field: &FieldDescriptor) -> bool {
    matches!(field.kind, FieldKind::Message(_))
        && field.presence == FieldPresence::LegacyRequired
}

/// Scan an options blob for occurrences of the constraint extension and
/// extract the sub-fields named in `table`. A later occurrence replaces the
/// results of an earlier one. Malformed bytes stop the scan; whatever was
/// extracted up to that point stands (unresolved entries default to absent).
fn scan_extension(options: &[u8], table: &[(u32, OptionType)]) -> Vec<Option<OptionValue>> {
    let mut out = vec![None; table.len()];
    let mut reader = WireReader::new(options);
    while reader.remaining() > 0 {
        match scan_step(&mut reader, table) {
            Ok(Some(values)) => out = values,
            Ok(None) => {}
            Err(_) => break,
        }
    }
    out
}

fn scan_step(
    reader: &mut WireReader<'_>,
    table: &[(u32, OptionType)],
) -> Result<Option<Vec<Option<OptionValue>>>, WireError> {
    let (number, wire_type) = reader.read_tag()?;
    if number == CONSTRAINT_EXT_NUMBER && wire_type == WireType::Len {
        let len = reader.read_len_prefix()?;
        let payload = reader.read_bytes(len)?;
        return Ok(Some(extract_known_fields(payload, table)?));
    }
    reader.skip(wire_type)?;
    Ok(None)
}

/// Tag-by-tag scan of one extension payload against a small known-field table.
/// Unknown tags are skipped by wire type; the loop leaves early once every
/// entry in the table has been seen.
fn extract_known_fields(
    payload: &[u8],
    table: &[(u32, OptionType)],
) -> Result<Vec<Option<OptionValue>>, WireError> {
    let mut reader = WireReader::new(payload);
    let mut out = vec![None; table.len()];
    let mut seen = 0usize;
    while reader.remaining() > 0 {
        let (number, wire_type) = reader.read_tag()?;
        match table.iter().position(|&(n, _)| n == number) {
            Some(i) => {
                let value = read_option(&mut reader, table[i].1)?;
                if out[i].is_none() {
                    seen += 1;
                }
                out[i] = Some(value);
                if seen == table.len() {
                    break;
                }
            }
            None => reader.skip(wire_type)?,
        }
    }
    Ok(out)
}

fn read_option(reader: &mut WireReader<'_>, ty: OptionType) -> Result<OptionValue, WireError> {
    match ty {
        OptionType::Int32 => Ok(OptionValue::Int32(reader.read_int32()?)),
        OptionType::Bool => Ok(OptionValue::Bool(reader.read_bool()?)),
    }
}
