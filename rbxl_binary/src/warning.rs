use thiserror::Error;

/// A non-fatal problem noticed while encoding or decoding a file.
///
/// Warnings accumulate during an operation and are returned alongside its
/// result; the operation itself keeps going. Callers decide whether any of
/// them deserve surfacing.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum Warning {
    #[error("the reserved bytes in the file header were not zero")]
    NonZeroReserved,

    #[error("unknown chunk {name:?} was skipped")]
    UnknownChunk { name: String },

    #[error("chunk {chunk_index} ({name:?}) could not be parsed and was skipped: {message}")]
    InvalidChunk {
        chunk_index: usize,
        name: String,
        message: String,
        /// The chunk's decompressed payload, retained for diagnostics.
        payload: Vec<u8>,
    },

    #[error("the END chunk was compressed")]
    CompressedEnd,

    #[error("the END chunk did not contain the closing file marker")]
    UnexpectedEndContents,

    #[error("{length} bytes of data were present after the END chunk")]
    TrailingData { length: usize },

    #[error("parent link referenced unknown referent {referent} as a child")]
    UnknownChildReferent { referent: i32 },

    #[error(
        "referent {referent} named unknown referent {parent} as its parent \
         and was left unattached"
    )]
    UnknownParentReferent { referent: i32, parent: i32 },

    #[error("property {prop_name:?} referenced unknown referent {referent}")]
    UnknownPropReferent { prop_name: String, referent: i32 },

    #[error(
        "shared string index {index} is out of range (the table holds \
         {count} entries)"
    )]
    SharedStringOutOfRange { index: u32, count: u32 },

    #[error(
        "property {class_name}.{prop_name} has conflicting value types \
         across instances and was dropped"
    )]
    PropTypeConflict {
        class_name: String,
        prop_name: String,
    },

    #[error(
        "property {class_name}.{prop_name} of type {type_name} cannot be \
         represented in the binary format and was skipped"
    )]
    UnsupportedPropType {
        class_name: String,
        prop_name: String,
        type_name: String,
    },
}
