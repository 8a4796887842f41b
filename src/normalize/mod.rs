//! Tolerant decoding of backend tool responses.
//!
//! ```text
//! raw envelope ──► envelope::decode_envelope ──► serde_json::Value
//!                        │  (JSON / literal / content wrapper / typed)
//!                        ▼
//!                 ToolResponse {success, data}
//!                        ▼
//!                 records::decode_* ──► Column / Measure / Relationship / Table
//! ```
//!
//! Nothing in this module returns an error for a malformed payload. Failures
//! degrade to an empty list or object and are logged at `warn`.

mod envelope;
pub mod fields;
mod literal;
pub mod records;
mod response;

pub use envelope::{
    decode_envelope, decode_list, decode_object, decode_text, decode_value, json_kind, DecodeError,
    Envelope,
};
pub use literal::{parse_literal, strip_type_tag};
pub use records::TableSchema;
pub use response::ToolResponse;
