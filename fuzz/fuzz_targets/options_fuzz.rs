//! Options-scanner fuzz target: attach arbitrary bytes as unknown options to
//! a field and its declaring message, then resolve requiredness. The scanner
//! must not panic; malformed bytes degrade to "not required".
//! Build with: cargo fuzz run options_fuzz (requires nightly and cargo fuzz).

#![cfg_attr(fuzzing, no_main)]

#[cfg(fuzzing)]
use libfuzzer_sys::fuzz_target;

#[cfg(fuzzing)]
fuzz_target!(|data: &[u8]| {
    use protomorph::{is_required, DescriptorPool, FieldDef, MessageDef, Schema};

    let (field_options, message_options) = data.split_at(data.len() / 2);
    let schema = Schema::new()
        .message(MessageDef::new("fuzz.Inner"))
        .message(
            MessageDef::new("fuzz.Outer")
                .field(
                    FieldDef::message("inner", 1, "fuzz.Inner")
                        .with_options(field_options.to_vec()),
                )
                .with_options(message_options.to_vec()),
        );
    let pool = match DescriptorPool::resolve(schema) {
        Ok(pool) => pool,
        Err(_) => return,
    };
    let outer = match pool.message_by_name("fuzz.Outer") {
        Some(r) => r,
        None => return,
    };
    if let Some(field) = pool.message(outer).field_by_name("inner") {
        let _ = is_required(&pool, field);
    }
});

#[cfg(not(fuzzing))]
fn main() {
    eprintln!("Build with: cargo fuzz run options_fuzz");
}
