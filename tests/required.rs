//! Integration tests for required-field resolution: constraint extension
//! decoding out of raw option bytes, legacy presence, and scan robustness.

use protomorph::{
    is_required, DescriptorPool, FieldDef, FieldPresence, MessageDef, ScalarType, Schema,
};

fn uvarint(mut v: u64, out: &mut Vec<u8>) {
    loop {
        let byte = (v & 0x7f) as u8;
        v >>= 7;
        if v == 0 {
            out.push(byte);
            break;
        }
        out.push(byte | 0x80);
    }
}

fn tag(number: u32, wire_type: u8, out: &mut Vec<u8>) {
    uvarint((u64::from(number) << 3) | u64::from(wire_type), out);
}

fn ext(number: u32, body: &[u8]) -> Vec<u8> {
    let mut out = Vec::new();
    tag(number, 2, &mut out);
    uvarint(body.len() as u64, &mut out);
    out.extend_from_slice(body);
    out
}

/// Field-rules payload: `required` at sub-tag 25, `ignore` at sub-tag 27.
fn field_rules(required: bool, ignore: Option<i32>) -> Vec<u8> {
    let mut body = Vec::new();
    tag(25, 0, &mut body);
    uvarint(u64::from(required), &mut body);
    if let Some(mode) = ignore {
        tag(27, 0, &mut body);
        uvarint(mode as u64, &mut body);
    }
    body
}

/// Message-rules payload: `disabled` at sub-tag 1.
fn message_rules(disabled: bool) -> Vec<u8> {
    let mut body = Vec::new();
    tag(1, 0, &mut body);
    uvarint(u64::from(disabled), &mut body);
    body
}

/// One-message pool: a message field carrying `field_options`, declared in a
/// message carrying `message_options`.
fn pool_with(field_options: Vec<u8>, message_options: Vec<u8>) -> DescriptorPool {
    let schema = Schema::new()
        .message(MessageDef::new("req.Inner"))
        .message(
            MessageDef::new("req.Outer")
                .field(FieldDef::message("inner", 1, "req.Inner").with_options(field_options))
                .with_options(message_options),
        );
    DescriptorPool::resolve(schema).expect("resolve")
}

fn resolve(pool: &DescriptorPool) -> bool {
    let outer = pool.message_by_name("req.Outer").expect("req.Outer");
    let field = pool.message(outer).field_by_name("inner").expect("inner");
    is_required(pool, field)
}

#[test]
fn extension_marks_field_required() {
    let pool = pool_with(ext(1159, &field_rules(true, None)), Vec::new());
    assert!(resolve(&pool));
}

#[test]
fn absent_extension_is_not_required() {
    let pool = pool_with(Vec::new(), Vec::new());
    assert!(!resolve(&pool));
}

#[test]
fn required_false_is_not_required() {
    let pool = pool_with(ext(1159, &field_rules(false, None)), Vec::new());
    assert!(!resolve(&pool));
}

#[test]
fn ignore_always_clears_requiredness() {
    let pool = pool_with(ext(1159, &field_rules(true, Some(3))), Vec::new());
    assert!(!resolve(&pool));

    // Other ignore modes leave requiredness in force.
    let pool = pool_with(ext(1159, &field_rules(true, Some(1))), Vec::new());
    assert!(resolve(&pool));
}

#[test]
fn message_disabled_extension_clears_requiredness() {
    let field_options = ext(1159, &field_rules(true, None));

    let disabled = pool_with(field_options.clone(), ext(1159, &message_rules(true)));
    assert!(!resolve(&disabled));

    // Distinct pool without the disabled flag: requiredness is back, and the
    // first pool's cached answer did not leak across descriptors.
    let enabled = pool_with(field_options, ext(1159, &message_rules(false)));
    assert!(resolve(&enabled));
    assert!(!resolve(&disabled));
}

#[test]
fn legacy_required_applies_to_message_fields_only() {
    let schema = Schema::new()
        .message(MessageDef::new("req.Inner"))
        .message(
            MessageDef::new("req.Outer")
                .field(
                    FieldDef::message("inner", 1, "req.Inner")
                        .with_presence(FieldPresence::LegacyRequired),
                )
                .field(
                    FieldDef::scalar("name", 2, ScalarType::String)
                        .with_presence(FieldPresence::LegacyRequired),
                ),
        );
    let pool = DescriptorPool::resolve(schema).expect("resolve");
    let outer = pool.message_by_name("req.Outer").expect("req.Outer");
    let inner = pool.message(outer).field_by_name("inner").expect("inner");
    let name = pool.message(outer).field_by_name("name").expect("name");

    assert!(is_required(&pool, inner));
    assert!(!is_required(&pool, name));
}

#[test]
fn unknown_subtags_are_skipped() {
    // Unknown varint and length-delimited sub-fields around the known ones.
    let mut body = Vec::new();
    tag(99, 0, &mut body);
    uvarint(12345, &mut body);
    tag(100, 2, &mut body);
    uvarint(3, &mut body);
    body.extend_from_slice(b"xyz");
    body.extend_from_slice(&field_rules(true, None));
    tag(101, 0, &mut body);
    uvarint(7, &mut body);

    let pool = pool_with(ext(1159, &body), Vec::new());
    assert!(resolve(&pool));
}

#[test]
fn unrelated_extension_numbers_are_ignored() {
    // A different extension that itself contains a "required"-shaped payload.
    let decoy = ext(999, &field_rules(true, None));
    let pool = pool_with(decoy.clone(), Vec::new());
    assert!(!resolve(&pool));

    let mut both = decoy;
    both.extend_from_slice(&ext(1159, &field_rules(true, None)));
    let pool = pool_with(both, Vec::new());
    assert!(resolve(&pool));
}

#[test]
fn later_extension_occurrence_wins() {
    let mut options = ext(1159, &field_rules(true, None));
    options.extend_from_slice(&ext(1159, &field_rules(false, None)));
    let pool = pool_with(options, Vec::new());
    assert!(!resolve(&pool));
}

#[test]
fn truncated_extension_is_not_required() {
    let mut options = ext(1159, &field_rules(true, None));
    options.truncate(options.len() - 1);
    let pool = pool_with(options, Vec::new());
    assert!(!resolve(&pool));
}

#[test]
fn scan_leaves_early_once_known_fields_are_seen() {
    // Both known sub-fields first, then bytes that would fail to parse; the
    // early exit means they are never visited.
    let mut body = field_rules(true, Some(1));
    body.push(0x80); // dangling varint continuation
    let pool = pool_with(ext(1159, &body), Vec::new());
    assert!(resolve(&pool));
}

#[test]
fn garbage_options_never_panic() {
    for seed in 0u8..16 {
        let options: Vec<u8> = (0..64).map(|i| seed.wrapping_mul(37).wrapping_add(i)).collect();
        let pool = pool_with(options, Vec::new());
        let _ = resolve(&pool);
    }
}

#[test]
fn resolution_is_deterministic_across_calls() {
    let pool = pool_with(ext(1159, &field_rules(true, None)), Vec::new());
    assert!(resolve(&pool));
    assert!(resolve(&pool));
}
