//! Implementation of Roblox's binary place (`rbxl`) and model (`rbxm`)
//! formats: a chunked, LZ4-compressed container holding columnar arrays of
//! typed property values.
//!
//! Decoding produces a [`Dom`][rbxl_dom::Dom] plus a list of non-fatal
//! [`Warning`]s; encoding is the exact reverse. Files that turn out to be in
//! the XML sibling format can be delegated to an external XML decoder
//! through [`DecodeOptions::xml_decoder`].
//!
//! ```
//! use rbxl_dom::{Dom, InstanceBuilder};
//! use rbxl_dom::types::Ref;
//!
//! let mut dom = Dom::new();
//! dom.insert(
//!     Ref::none(),
//!     InstanceBuilder::new("IntValue").with_property("Value", 42),
//! );
//!
//! let mut buffer = Vec::new();
//! rbxl_binary::encode_model(&dom, &mut buffer).unwrap();
//!
//! let decoded = rbxl_binary::decode_model(buffer.as_slice()).unwrap();
//! assert_eq!(decoded.dom.root_refs().len(), 1);
//! assert!(decoded.warnings.is_empty());
//! ```

mod cframe;
mod chunk;
mod core;
mod deserializer;
mod serializer;
mod text_deserializer;
mod types;
mod warning;

use std::io::{Read, Write};

use rbxl_dom::Dom;

use crate::{
    chunk::{Chunk, ChunkBuilder, ChunkCompression},
    core::{RbxWriteExt, FILE_FOOTER, FILE_MAGIC_HEADER, FILE_SIGNATURE, FILE_VERSION},
    deserializer::FileHeader,
};

pub use crate::{
    deserializer::{DecodeOptions, Decoded, Error as DecodeError, XmlDecodeError},
    serializer::{EncodeOptions, Error as EncodeError},
    text_deserializer::{
        DecodedChunk, DecodedModel, DecodedPropType, DecodedSharedString, DecodedValues,
        RobloxString,
    },
    types::Type,
    warning::Warning,
};

/// Whether a file is treated as a place or as a model. The only difference
/// is how service markers on top-level instances are handled.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mode {
    Place,
    Model,
}

/// Decode a binary place file from `reader`. Top-level service containers
/// keep their service markers.
pub fn decode_place<R: Read>(reader: R) -> Result<Decoded, DecodeError> {
    DecodeOptions::place().decode(reader)
}

/// Decode a binary model file from `reader`, ignoring service semantics.
pub fn decode_model<R: Read>(reader: R) -> Result<Decoded, DecodeError> {
    DecodeOptions::model().decode(reader)
}

/// Encode the forest held by `dom` into `writer` as a place file.
pub fn encode_place<W: Write>(dom: &Dom, writer: W) -> Result<Vec<Warning>, EncodeError> {
    EncodeOptions::place().encode(dom, writer)
}

/// Encode the forest held by `dom` into `writer` as a model file.
pub fn encode_model<W: Write>(dom: &Dom, writer: W) -> Result<Vec<Warning>, EncodeError> {
    EncodeOptions::model().encode(dom, writer)
}

/// Re-emit the file from `reader` into `writer` chunk by chunk with
/// compression disabled. The instance data is passed through untouched.
pub fn decompress<R: Read, W: Write>(reader: R, writer: W) -> Result<Vec<Warning>, DecodeError> {
    let mut warnings = Vec::new();

    match try_decompress(reader, writer, &mut warnings) {
        Ok(()) => Ok(warnings),
        Err(source) => Err(DecodeError::with_warnings(warnings, source)),
    }
}

fn try_decompress<R: Read, W: Write>(
    mut reader: R,
    mut writer: W,
    warnings: &mut Vec<Warning>,
) -> Result<(), deserializer::InnerError> {
    let header = FileHeader::decode(&mut reader)?;

    if header.reserved != [0; 8] {
        warnings.push(Warning::NonZeroReserved);
    }

    writer.write_all(FILE_MAGIC_HEADER)?;
    writer.write_all(FILE_SIGNATURE)?;
    writer.write_le_u16(FILE_VERSION)?;
    writer.write_le_u32(header.num_types)?;
    writer.write_le_u32(header.num_instances)?;
    writer.write_all(&header.reserved)?;

    loop {
        let chunk = Chunk::decode(&mut reader)?;

        let mut repacked = ChunkBuilder::new(&chunk.name, ChunkCompression::Uncompressed);
        repacked.write_all(&chunk.data)?;
        repacked.dump(&mut writer)?;

        if &chunk.name == b"END\0" {
            if chunk.compression == ChunkCompression::Compressed {
                warnings.push(Warning::CompressedEnd);
            }

            if chunk.data != FILE_FOOTER {
                warnings.push(Warning::UnexpectedEndContents);
            }

            let mut trailing = Vec::new();
            reader.read_to_end(&mut trailing)?;

            if !trailing.is_empty() {
                warnings.push(Warning::TrailingData {
                    length: trailing.len(),
                });
                writer.write_all(&trailing)?;
            }

            break;
        }
    }

    Ok(())
}

/// Write a human-readable dump of the file from `reader` into `writer`,
/// with every chunk parsed down to individual values where possible.
pub fn dump<R: Read, W: Write>(reader: R, writer: W) -> Result<Vec<Warning>, DecodeError> {
    let model = DecodedModel::from_reader(reader)?;
    let warnings = model.warnings();

    serde_json::to_writer_pretty(writer, &model)
        .map_err(|err| std::io::Error::new(std::io::ErrorKind::Other, err))
        .map_err(|err| {
            DecodeError::with_warnings(warnings.clone(), deserializer::InnerError::from(err))
        })?;

    Ok(warnings)
}
