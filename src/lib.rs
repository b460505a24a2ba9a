//! # protomorph — schema-driven protobuf message transformation
//!
//! Transforms dynamic protobuf messages using their descriptors:
//!
//! - **Initialization** ([`init`]): build a fully-typed message from a
//!   loosely-typed, partially-filled initializer record.
//! - **Population** ([`populate`] / [`populate_in_place`]): walk a built
//!   message and fill missing values or convert Timestamps into native dates,
//!   under caller-chosen [`PopulateOptions`].
//! - **Required-field resolution** ([`is_required`]): decode a constraint
//!   extension straight out of the wire-encoded unknown-option bytes attached
//!   to descriptors, memoized per field.
//!
//! Schemas are defined with [`Schema`] / [`MessageDef`] / [`FieldDef`] and
//! resolved into an immutable [`DescriptorPool`]; message instances are
//! dynamic [`MessageValue`]s keyed by field number.
//!
//! ## Example
//!
//! ```
//! use protomorph::{
//!     init, populate, DescriptorPool, FieldDef, Init, MessageDef, PopulateOptions,
//!     ScalarType, Schema, Value,
//! };
//!
//! let schema = Schema::new().message(
//!     MessageDef::new("demo.Greeting")
//!         .field(FieldDef::scalar("text", 1, ScalarType::String)),
//! );
//! let pool = DescriptorPool::resolve(schema).unwrap();
//! let greeting = pool.message_by_name("demo.Greeting").unwrap();
//!
//! let msg = init(&pool, greeting, Some(Init::record([("text", "hi".into())])));
//! let options = PopulateOptions { scalars: true, ..Default::default() };
//! let populated = populate(&pool, greeting, &msg, &options);
//! assert!(matches!(populated, Value::Message(_)));
//! ```

pub mod descriptor;
pub mod init;
pub mod populate;
pub mod required;
pub mod timestamp;
pub mod value;
pub mod wire;

pub use descriptor::{
    DescriptorPool, ElemDef, ElemKind, EnumDef, EnumRef, FieldDef, FieldDescriptor, FieldKind,
    FieldKindDef, FieldPresence, Member, MemberDef, MessageDef, MessageDescriptor, MessageRef,
    OneofDef, OneofDescriptor, ScalarType, Schema, SchemaError,
};
pub use init::{init, Init};
pub use populate::{populate, populate_in_place, PopulateOptions};
pub use required::is_required;
pub use timestamp::TIMESTAMP_TYPE;
pub use value::{MapKey, MessageValue, Value};
pub use wire::{WireError, WireReader, WireType};
