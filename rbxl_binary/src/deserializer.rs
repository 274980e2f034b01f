use std::{
    collections::{BTreeMap, HashMap},
    convert::TryInto,
    fmt,
    io::{self, Read},
};

use byteorder::ReadBytesExt;
use rbxl_dom::{Dom, InstanceBuilder};
use rbxl_types::{
    Axes, BrickColor, CFrame, Color3, Color3uint8, ColorSequence, ColorSequenceKeypoint, EnumValue,
    Faces, Matrix3, NumberRange, NumberSequence, NumberSequenceKeypoint, PhysicalProperties,
    CustomPhysicalProperties, Ray, Rect, Ref, SharedString, UDim, UDim2, Variant, Vector2,
    Vector2int16, Vector3, Vector3int16,
};
use thiserror::Error;

use crate::{
    cframe,
    chunk::{Chunk, ChunkCompression},
    core::{
        CountingReader, RbxReadExt, FILE_FOOTER, FILE_MAGIC_HEADER, FILE_SIGNATURE, FILE_VERSION,
    },
    types::Type,
    warning::Warning,
    Mode,
};

/// The signature of an injected XML decoder. The reader handed to the
/// decoder yields the complete stream, including the already-sniffed first
/// eight bytes.
pub type XmlDecodeError = Box<dyn std::error::Error + Send + Sync>;
type XmlDecoder<'dec> = Box<dyn FnMut(&mut dyn Read) -> Result<Dom, XmlDecodeError> + 'dec>;

/// Represents an error that occurred during deserialization.
#[derive(Debug, Error)]
#[error("{source}")]
pub struct Error {
    warnings: Vec<Warning>,
    source: Box<InnerError>,
}

impl Error {
    /// The warnings accumulated before the fatal error was hit.
    pub fn warnings(&self) -> &[Warning] {
        &self.warnings
    }

    pub(crate) fn with_warnings(warnings: Vec<Warning>, source: InnerError) -> Self {
        Self {
            warnings,
            source: Box::new(source),
        }
    }
}

impl From<InnerError> for Error {
    fn from(inner: InnerError) -> Self {
        Self {
            warnings: Vec::new(),
            source: Box::new(inner),
        }
    }
}

#[derive(Debug, Error)]
pub(crate) enum InnerError {
    #[error(transparent)]
    Io {
        #[from]
        source: io::Error,
    },

    #[error("invalid file signature: this does not appear to be a Roblox binary file")]
    InvalidSignature,

    #[error("the file header is corrupt")]
    CorruptHeader,

    #[error("unrecognized file version {version}; only version 0 is supported")]
    UnknownVersion { version: u16 },

    #[error("the file appears to be an XML document, but no XML decoder was installed")]
    XmlNotSupported,

    #[error("the delegated XML decoder failed: {source}")]
    Xml { source: XmlDecodeError },

    #[error("chunk {chunk_index} starting at byte {offset} could not be read: {source}")]
    ChunkFraming {
        chunk_index: usize,
        offset: u64,
        source: io::Error,
    },

    #[error(
        "chunk {chunk_index} ({name:?}, starting at byte {offset}) could not \
         be parsed: {source}"
    )]
    InvalidChunk {
        chunk_index: usize,
        name: String,
        offset: u64,
        source: Box<InnerError>,
    },

    #[error("referent {referent} was declared more than once")]
    DuplicateReferent { referent: i32 },

    #[error(
        "referent {referent} is out of bounds of the file's declared \
         instance count {num_instances}"
    )]
    ReferentOutOfBounds { referent: i32, num_instances: u32 },

    #[error("a PROP chunk named type id {type_id} before any INST chunk declared it")]
    UnknownTypeId { type_id: u32 },

    #[error("property {prop_name:?} has unknown binary type {type_byte:#04x}")]
    UnknownPropType { prop_name: String, type_byte: u8 },

    #[error("PRNT chunk version {version} is not supported")]
    UnknownParentVersion { version: u8 },
}

/// The result of a successful decode: the instance tree plus any warnings
/// that came up on the way.
#[derive(Debug)]
pub struct Decoded {
    pub dom: Dom,
    pub warnings: Vec<Warning>,
}

/// Options available for deserializing a binary place or model file.
pub struct DecodeOptions<'dec> {
    mode: Mode,
    no_xml: bool,
    strict: bool,
    xml_decoder: Option<XmlDecoder<'dec>>,
}

impl<'dec> DecodeOptions<'dec> {
    /// Options for decoding a place file: top-level service containers keep
    /// their service markers.
    pub fn place() -> Self {
        DecodeOptions {
            mode: Mode::Place,
            no_xml: false,
            strict: false,
            xml_decoder: None,
        }
    }

    /// Options for decoding a model file: service semantics are ignored.
    pub fn model() -> Self {
        DecodeOptions {
            mode: Mode::Model,
            ..DecodeOptions::place()
        }
    }

    /// When set, a file that sniffs as XML is rejected with an invalid
    /// signature error instead of being delegated.
    pub fn no_xml(self, no_xml: bool) -> Self {
        DecodeOptions { no_xml, ..self }
    }

    /// When set, chunks whose bodies fail to parse abort the decode instead
    /// of being skipped with a warning.
    pub fn strict(self, strict: bool) -> Self {
        DecodeOptions { strict, ..self }
    }

    /// Install the XML decoder to delegate to when the file turns out to be
    /// in the XML sibling format.
    pub fn xml_decoder<F>(self, decoder: F) -> Self
    where
        F: FnMut(&mut dyn Read) -> Result<Dom, XmlDecodeError> + 'dec,
    {
        DecodeOptions {
            xml_decoder: Some(Box::new(decoder)),
            ..self
        }
    }

    /// Decode a file from `reader` using these options.
    pub fn decode<R: Read>(self, reader: R) -> Result<Decoded, Error> {
        decode_internal(reader, self)
    }
}

impl<'dec> fmt::Debug for DecodeOptions<'dec> {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        formatter
            .debug_struct("DecodeOptions")
            .field("mode", &self.mode)
            .field("no_xml", &self.no_xml)
            .field("strict", &self.strict)
            .field("xml_decoder", &self.xml_decoder.is_some())
            .finish()
    }
}

/// The fixed prologue of every binary file.
#[derive(Debug)]
pub struct FileHeader {
    pub num_types: u32,
    pub num_instances: u32,
    pub reserved: [u8; 8],
}

impl FileHeader {
    /// Decode the full header, including the leading signature bytes.
    pub(crate) fn decode<R: Read>(mut source: R) -> Result<Self, InnerError> {
        let mut signature = [0; 8];
        source.read_exact(&mut signature)?;

        if signature != FILE_MAGIC_HEADER {
            return Err(InnerError::InvalidSignature);
        }

        Self::decode_after_signature(source)
    }

    /// Decode everything after the 8-byte signature, which the caller has
    /// already consumed to sniff the file format.
    pub(crate) fn decode_after_signature<R: Read>(mut source: R) -> Result<Self, InnerError> {
        let mut magic = [0; 6];
        source.read_exact(&mut magic)?;

        if magic != FILE_SIGNATURE {
            return Err(InnerError::CorruptHeader);
        }

        let version = source.read_le_u16()?;
        if version != FILE_VERSION {
            return Err(InnerError::UnknownVersion { version });
        }

        let num_types = source.read_le_u32()?;
        let num_instances = source.read_le_u32()?;

        let mut reserved = [0; 8];
        source.read_exact(&mut reserved)?;

        Ok(FileHeader {
            num_types,
            num_instances,
            reserved,
        })
    }
}

pub(crate) fn decode_internal<R: Read>(
    reader: R,
    options: DecodeOptions<'_>,
) -> Result<Decoded, Error> {
    let mut warnings = Vec::new();

    match try_decode(reader, options, &mut warnings) {
        Ok(dom) => Ok(Decoded { dom, warnings }),
        Err(source) => Err(Error {
            warnings,
            source: Box::new(source),
        }),
    }
}

fn try_decode<R: Read>(
    reader: R,
    mut options: DecodeOptions<'_>,
    warnings: &mut Vec<Warning>,
) -> Result<Dom, InnerError> {
    let mut reader = CountingReader::new(reader);

    let mut signature = [0; 8];
    reader.read_exact(&mut signature)?;

    if signature[..7] != FILE_MAGIC_HEADER[..7] {
        return Err(InnerError::InvalidSignature);
    }

    if signature[7] != b'!' {
        // `<roblox ` or `<roblox>`: the XML sibling format.
        if options.no_xml {
            return Err(InnerError::InvalidSignature);
        }

        log::debug!("File sniffed as XML; delegating");

        let mut full_stream = io::Cursor::new(signature.to_vec()).chain(reader);

        return match options.xml_decoder.as_mut() {
            Some(decode_xml) => {
                decode_xml(&mut full_stream).map_err(|source| InnerError::Xml { source })
            }
            None => Err(InnerError::XmlNotSupported),
        };
    }

    let header = FileHeader::decode_after_signature(&mut reader)?;

    if header.reserved != [0; 8] {
        warnings.push(Warning::NonZeroReserved);
    }

    log::trace!(
        "Decoding file with {} types and {} instances",
        header.num_types,
        header.num_instances
    );

    let mut state = DeserializerState::new(options.mode, header.num_instances, warnings);
    let mut chunk_index = 0;

    loop {
        let offset = reader.bytes_read();

        let chunk = Chunk::decode(&mut reader).map_err(|source| InnerError::ChunkFraming {
            chunk_index,
            offset,
            source,
        })?;

        let result = match &chunk.name {
            b"META" => state.decode_meta_chunk(chunk.data.as_slice()),
            b"SSTR" => state.decode_sstr_chunk(chunk.data.as_slice()),
            b"INST" => state.decode_inst_chunk(chunk.data.as_slice()),
            b"PROP" => state.decode_prop_chunk(chunk.data.as_slice()),
            b"PRNT" => state.decode_prnt_chunk(chunk.data.as_slice()),
            b"END\0" => {
                if chunk.compression == ChunkCompression::Compressed {
                    state.warnings.push(Warning::CompressedEnd);
                }

                if chunk.data != FILE_FOOTER {
                    state.warnings.push(Warning::UnexpectedEndContents);
                }

                break;
            }
            unknown => {
                state.warnings.push(Warning::UnknownChunk {
                    name: String::from_utf8_lossy(unknown).into_owned(),
                });
                Ok(())
            }
        };

        if let Err(source) = result {
            let name = String::from_utf8_lossy(&chunk.name).into_owned();

            if options.strict || chunk_error_is_fatal(&source) {
                return Err(InnerError::InvalidChunk {
                    chunk_index,
                    name,
                    offset,
                    source: Box::new(source),
                });
            }

            state.warnings.push(Warning::InvalidChunk {
                chunk_index,
                name,
                message: source.to_string(),
                payload: chunk.data,
            });
        }

        chunk_index += 1;
    }

    state.finish()
}

/// Some chunk-body failures point at a file too broken to keep going even
/// in lenient mode.
fn chunk_error_is_fatal(error: &InnerError) -> bool {
    matches!(
        error,
        InnerError::DuplicateReferent { .. } | InnerError::ReferentOutOfBounds { .. }
    )
}

struct TypeInfo {
    type_name: String,
    referents: Vec<i32>,
}

struct Instance {
    builder: InstanceBuilder,
    children: Vec<i32>,
}

struct PropRefRewrite {
    subject: i32,
    prop_name: String,
    target: i32,
}

struct SharedStringRewrite {
    subject: i32,
    prop_name: String,
    index: u32,
}

struct DeserializerState<'w> {
    mode: Mode,
    num_instances: u32,
    metadata: BTreeMap<String, String>,
    shared_strings: Vec<SharedString>,
    type_infos: HashMap<u32, TypeInfo>,
    instances_by_ref: HashMap<i32, Instance>,
    root_refs: Vec<i32>,
    prop_ref_rewrites: Vec<PropRefRewrite>,
    shared_string_rewrites: Vec<SharedStringRewrite>,
    warnings: &'w mut Vec<Warning>,
}

impl<'w> DeserializerState<'w> {
    fn new(mode: Mode, num_instances: u32, warnings: &'w mut Vec<Warning>) -> Self {
        DeserializerState {
            mode,
            num_instances,
            metadata: BTreeMap::new(),
            shared_strings: Vec::new(),
            type_infos: HashMap::new(),
            instances_by_ref: HashMap::new(),
            root_refs: Vec::new(),
            prop_ref_rewrites: Vec::new(),
            shared_string_rewrites: Vec::new(),
            warnings,
        }
    }

    fn decode_meta_chunk<R: Read>(&mut self, mut reader: R) -> Result<(), InnerError> {
        let num_entries = reader.read_le_u32()?;

        for _ in 0..num_entries {
            let key = reader.read_string()?;
            let value = reader.read_string()?;

            self.metadata.insert(key, value);
        }

        log::trace!("META chunk ({} entries)", num_entries);

        Ok(())
    }

    fn decode_sstr_chunk<R: Read>(&mut self, mut reader: R) -> Result<(), InnerError> {
        let version = reader.read_le_u32()?;
        let num_entries = reader.read_le_u32()?;

        log::trace!("SSTR chunk (version {}, {} entries)", version, num_entries);

        let mut entries = Vec::with_capacity(num_entries as usize);

        for _ in 0..num_entries {
            // The stored hash is producer-internal; entries are re-hashed
            // from their contents on this side.
            let mut hash = [0; 16];
            reader.read_exact(&mut hash)?;

            let data = reader.read_binary_string()?;
            entries.push(SharedString::new(data));
        }

        // A later SSTR chunk replaces an earlier one wholesale.
        self.shared_strings = entries;

        Ok(())
    }

    fn decode_inst_chunk<R: Read>(&mut self, mut reader: R) -> Result<(), InnerError> {
        let type_id = reader.read_le_u32()?;
        let type_name = reader.read_string()?;
        let is_service = reader.read_bool()?;
        let num_instances = reader.read_le_u32()?;

        log::trace!(
            "INST chunk ({} instances of type ID {} ({}))",
            num_instances,
            type_id,
            type_name
        );

        let mut referents = vec![0; num_instances as usize];
        reader.read_referent_array(&mut referents)?;

        let service_flags = if is_service {
            let mut flags = vec![0; num_instances as usize];
            reader.read_exact(&mut flags)?;
            Some(flags)
        } else {
            None
        };

        for (index, referent) in referents.iter().enumerate() {
            self.check_referent(*referent)?;

            if self.instances_by_ref.contains_key(referent) {
                return Err(InnerError::DuplicateReferent {
                    referent: *referent,
                });
            }

            let mut builder = InstanceBuilder::new(&type_name);

            if self.mode == Mode::Place {
                if let Some(flags) = &service_flags {
                    builder.set_service(flags[index] != 0);
                }
            }

            self.instances_by_ref.insert(
                *referent,
                Instance {
                    builder,
                    children: Vec::new(),
                },
            );
        }

        self.type_infos.insert(
            type_id,
            TypeInfo {
                type_name,
                referents,
            },
        );

        Ok(())
    }

    fn decode_prnt_chunk<R: Read>(&mut self, mut reader: R) -> Result<(), InnerError> {
        let version = reader.read_u8()?;

        if version != 0 {
            return Err(InnerError::UnknownParentVersion { version });
        }

        let num_referents = reader.read_le_u32()?;

        log::trace!("PRNT chunk ({} links)", num_referents);

        let mut subjects = vec![0; num_referents as usize];
        let mut parents = vec![0; num_referents as usize];

        reader.read_referent_array(&mut subjects)?;
        reader.read_referent_array(&mut parents)?;

        for (child, parent) in subjects.iter().copied().zip(parents.iter().copied()) {
            self.check_referent(child)?;

            if parent != -1 {
                self.check_referent(parent)?;
            }

            if !self.instances_by_ref.contains_key(&child) {
                self.warnings
                    .push(Warning::UnknownChildReferent { referent: child });
                continue;
            }

            if parent == -1 {
                self.root_refs.push(child);
            } else if let Some(parent_instance) = self.instances_by_ref.get_mut(&parent) {
                parent_instance.children.push(child);
            } else {
                self.warnings.push(Warning::UnknownParentReferent {
                    referent: child,
                    parent,
                });
            }
        }

        Ok(())
    }

    fn decode_prop_chunk<R: Read>(&mut self, mut reader: R) -> Result<(), InnerError> {
        let type_id = reader.read_le_u32()?;
        let prop_name = reader.read_string()?;

        let type_byte = reader.read_u8()?;
        let binary_type: Type = type_byte.try_into().map_err(|_| InnerError::UnknownPropType {
            prop_name: prop_name.clone(),
            type_byte,
        })?;

        let referents = match self.type_infos.get(&type_id) {
            Some(type_info) => type_info.referents.clone(),
            None => return Err(InnerError::UnknownTypeId { type_id }),
        };

        log::trace!(
            "PROP chunk ({}.{}, type {:?}, {} values)",
            type_id,
            prop_name,
            binary_type,
            referents.len()
        );

        let count = referents.len();

        match binary_type {
            Type::String => {
                for referent in &referents {
                    let buffer = reader.read_binary_string()?;

                    // The format has one string type; whether the bytes are
                    // text is only discoverable by looking.
                    let value = match String::from_utf8(buffer) {
                        Ok(string) => Variant::String(string),
                        Err(err) => Variant::BinaryString(err.into_bytes().into()),
                    };

                    self.set_property(*referent, &prop_name, value);
                }
            }
            Type::Bool => {
                for referent in &referents {
                    let value = reader.read_bool()?;
                    self.set_property(*referent, &prop_name, Variant::Bool(value));
                }
            }
            Type::Int32 => {
                let mut values = vec![0; count];
                reader.read_interleaved_i32_array(&mut values)?;

                for (referent, value) in referents.iter().zip(values) {
                    self.set_property(*referent, &prop_name, Variant::Int32(value));
                }
            }
            Type::Float32 => {
                let mut values = vec![0.0; count];
                reader.read_interleaved_f32_array(&mut values)?;

                for (referent, value) in referents.iter().zip(values) {
                    self.set_property(*referent, &prop_name, Variant::Float32(value));
                }
            }
            Type::Float64 => {
                for referent in &referents {
                    let value = reader.read_le_f64()?;
                    self.set_property(*referent, &prop_name, Variant::Float64(value));
                }
            }
            Type::UDim => {
                let mut scales = vec![0.0; count];
                let mut offsets = vec![0; count];

                reader.read_interleaved_f32_array(&mut scales)?;
                reader.read_interleaved_i32_array(&mut offsets)?;

                for ((referent, scale), offset) in referents.iter().zip(scales).zip(offsets) {
                    self.set_property(
                        *referent,
                        &prop_name,
                        Variant::UDim(UDim::new(scale, offset)),
                    );
                }
            }
            Type::UDim2 => {
                let mut scales_x = vec![0.0; count];
                let mut scales_y = vec![0.0; count];
                let mut offsets_x = vec![0; count];
                let mut offsets_y = vec![0; count];

                reader.read_interleaved_f32_array(&mut scales_x)?;
                reader.read_interleaved_f32_array(&mut scales_y)?;
                reader.read_interleaved_i32_array(&mut offsets_x)?;
                reader.read_interleaved_i32_array(&mut offsets_y)?;

                for (index, referent) in referents.iter().enumerate() {
                    let value = UDim2::new(
                        UDim::new(scales_x[index], offsets_x[index]),
                        UDim::new(scales_y[index], offsets_y[index]),
                    );

                    self.set_property(*referent, &prop_name, Variant::UDim2(value));
                }
            }
            Type::Ray => {
                for referent in &referents {
                    let origin = Vector3::new(
                        reader.read_le_f32()?,
                        reader.read_le_f32()?,
                        reader.read_le_f32()?,
                    );
                    let direction = Vector3::new(
                        reader.read_le_f32()?,
                        reader.read_le_f32()?,
                        reader.read_le_f32()?,
                    );

                    self.set_property(
                        *referent,
                        &prop_name,
                        Variant::Ray(Ray::new(origin, direction)),
                    );
                }
            }
            Type::Faces => {
                for referent in &referents {
                    let value = Faces::from_bits_truncate(reader.read_u8()?);
                    self.set_property(*referent, &prop_name, Variant::Faces(value));
                }
            }
            Type::Axes => {
                for referent in &referents {
                    let value = Axes::from_bits_truncate(reader.read_u8()?);
                    self.set_property(*referent, &prop_name, Variant::Axes(value));
                }
            }
            Type::BrickColor => {
                let mut values = vec![0; count];
                reader.read_interleaved_u32_array(&mut values)?;

                for (referent, value) in referents.iter().zip(values) {
                    self.set_property(
                        *referent,
                        &prop_name,
                        Variant::BrickColor(BrickColor::from_number(value)),
                    );
                }
            }
            Type::Color3 => {
                let mut r = vec![0.0; count];
                let mut g = vec![0.0; count];
                let mut b = vec![0.0; count];

                reader.read_interleaved_f32_array(&mut r)?;
                reader.read_interleaved_f32_array(&mut g)?;
                reader.read_interleaved_f32_array(&mut b)?;

                for (index, referent) in referents.iter().enumerate() {
                    self.set_property(
                        *referent,
                        &prop_name,
                        Variant::Color3(Color3::new(r[index], g[index], b[index])),
                    );
                }
            }
            Type::Vector2 => {
                let mut x = vec![0.0; count];
                let mut y = vec![0.0; count];

                reader.read_interleaved_f32_array(&mut x)?;
                reader.read_interleaved_f32_array(&mut y)?;

                for (index, referent) in referents.iter().enumerate() {
                    self.set_property(
                        *referent,
                        &prop_name,
                        Variant::Vector2(Vector2::new(x[index], y[index])),
                    );
                }
            }
            Type::Vector3 => {
                let mut x = vec![0.0; count];
                let mut y = vec![0.0; count];
                let mut z = vec![0.0; count];

                reader.read_interleaved_f32_array(&mut x)?;
                reader.read_interleaved_f32_array(&mut y)?;
                reader.read_interleaved_f32_array(&mut z)?;

                for (index, referent) in referents.iter().enumerate() {
                    self.set_property(
                        *referent,
                        &prop_name,
                        Variant::Vector3(Vector3::new(x[index], y[index], z[index])),
                    );
                }
            }
            Type::Vector2int16 => {
                for referent in &referents {
                    let value = Vector2int16::new(reader.read_le_i16()?, reader.read_le_i16()?);
                    self.set_property(*referent, &prop_name, Variant::Vector2int16(value));
                }
            }
            Type::Vector3int16 => {
                for referent in &referents {
                    let value = Vector3int16::new(
                        reader.read_le_i16()?,
                        reader.read_le_i16()?,
                        reader.read_le_i16()?,
                    );
                    self.set_property(*referent, &prop_name, Variant::Vector3int16(value));
                }
            }
            Type::CFrame | Type::CFrameQuat => {
                let mut rotations = Vec::with_capacity(count);

                for _ in 0..count {
                    let id = reader.read_u8()?;

                    let rotation = if id != 0 {
                        cframe::rotation_from_id(id)
                    } else if binary_type == Type::CFrameQuat {
                        let x = reader.read_le_f32()?;
                        let y = reader.read_le_f32()?;
                        let z = reader.read_le_f32()?;
                        let w = reader.read_le_f32()?;

                        cframe::rotation_from_quaternion(x, y, z, w)
                    } else {
                        Matrix3::new(
                            Vector3::new(
                                reader.read_le_f32()?,
                                reader.read_le_f32()?,
                                reader.read_le_f32()?,
                            ),
                            Vector3::new(
                                reader.read_le_f32()?,
                                reader.read_le_f32()?,
                                reader.read_le_f32()?,
                            ),
                            Vector3::new(
                                reader.read_le_f32()?,
                                reader.read_le_f32()?,
                                reader.read_le_f32()?,
                            ),
                        )
                    };

                    rotations.push(rotation);
                }

                let mut x = vec![0.0; count];
                let mut y = vec![0.0; count];
                let mut z = vec![0.0; count];

                reader.read_interleaved_f32_array(&mut x)?;
                reader.read_interleaved_f32_array(&mut y)?;
                reader.read_interleaved_f32_array(&mut z)?;

                for (index, referent) in referents.iter().enumerate() {
                    let position = Vector3::new(x[index], y[index], z[index]);

                    self.set_property(
                        *referent,
                        &prop_name,
                        Variant::CFrame(CFrame::new(position, rotations[index])),
                    );
                }
            }
            Type::Enum => {
                let mut values = vec![0; count];
                reader.read_interleaved_u32_array(&mut values)?;

                for (referent, value) in referents.iter().zip(values) {
                    self.set_property(
                        *referent,
                        &prop_name,
                        Variant::EnumValue(EnumValue::from_u32(value)),
                    );
                }
            }
            Type::Ref => {
                let mut targets = vec![0; count];
                reader.read_referent_array(&mut targets)?;

                for (referent, target) in referents.iter().zip(targets) {
                    if target == -1 {
                        self.set_property(*referent, &prop_name, Variant::Ref(Ref::none()));
                    } else {
                        self.check_referent(target)?;

                        // Pointers can refer forward to instances that
                        // haven't been declared yet, so they resolve after
                        // every chunk has been read.
                        self.prop_ref_rewrites.push(PropRefRewrite {
                            subject: *referent,
                            prop_name: prop_name.clone(),
                            target,
                        });
                    }
                }
            }
            Type::NumberSequence => {
                for referent in &referents {
                    let keypoint_count = reader.read_le_u32()?;
                    let mut keypoints = Vec::with_capacity(keypoint_count as usize);

                    for _ in 0..keypoint_count {
                        keypoints.push(NumberSequenceKeypoint::new(
                            reader.read_le_f32()?,
                            reader.read_le_f32()?,
                            reader.read_le_f32()?,
                        ));
                    }

                    self.set_property(
                        *referent,
                        &prop_name,
                        Variant::NumberSequence(NumberSequence { keypoints }),
                    );
                }
            }
            Type::ColorSequence => {
                for referent in &referents {
                    let keypoint_count = reader.read_le_u32()?;
                    let mut keypoints = Vec::with_capacity(keypoint_count as usize);

                    for _ in 0..keypoint_count {
                        let time = reader.read_le_f32()?;
                        let color = Color3::new(
                            reader.read_le_f32()?,
                            reader.read_le_f32()?,
                            reader.read_le_f32()?,
                        );

                        // The envelope is serialized but always zero.
                        let _envelope = reader.read_le_f32()?;

                        keypoints.push(ColorSequenceKeypoint::new(time, color));
                    }

                    self.set_property(
                        *referent,
                        &prop_name,
                        Variant::ColorSequence(ColorSequence { keypoints }),
                    );
                }
            }
            Type::NumberRange => {
                for referent in &referents {
                    let value = NumberRange::new(reader.read_le_f32()?, reader.read_le_f32()?);
                    self.set_property(*referent, &prop_name, Variant::NumberRange(value));
                }
            }
            Type::Rect => {
                let mut min_x = vec![0.0; count];
                let mut min_y = vec![0.0; count];
                let mut max_x = vec![0.0; count];
                let mut max_y = vec![0.0; count];

                reader.read_interleaved_f32_array(&mut min_x)?;
                reader.read_interleaved_f32_array(&mut min_y)?;
                reader.read_interleaved_f32_array(&mut max_x)?;
                reader.read_interleaved_f32_array(&mut max_y)?;

                for (index, referent) in referents.iter().enumerate() {
                    let value = Rect::new(
                        Vector2::new(min_x[index], min_y[index]),
                        Vector2::new(max_x[index], max_y[index]),
                    );

                    self.set_property(*referent, &prop_name, Variant::Rect(value));
                }
            }
            Type::PhysicalProperties => {
                for referent in &referents {
                    let custom = reader.read_bool()?;

                    let value = if custom {
                        PhysicalProperties::Custom(CustomPhysicalProperties {
                            density: reader.read_le_f32()?,
                            friction: reader.read_le_f32()?,
                            elasticity: reader.read_le_f32()?,
                            friction_weight: reader.read_le_f32()?,
                            elasticity_weight: reader.read_le_f32()?,
                        })
                    } else {
                        PhysicalProperties::Default
                    };

                    self.set_property(*referent, &prop_name, Variant::PhysicalProperties(value));
                }
            }
            Type::Color3uint8 => {
                let mut r = vec![0; count];
                let mut g = vec![0; count];
                let mut b = vec![0; count];

                reader.read_exact(&mut r)?;
                reader.read_exact(&mut g)?;
                reader.read_exact(&mut b)?;

                for (index, referent) in referents.iter().enumerate() {
                    self.set_property(
                        *referent,
                        &prop_name,
                        Variant::Color3uint8(Color3uint8::new(r[index], g[index], b[index])),
                    );
                }
            }
            Type::Int64 => {
                let mut values = vec![0; count];
                reader.read_interleaved_i64_array(&mut values)?;

                for (referent, value) in referents.iter().zip(values) {
                    self.set_property(*referent, &prop_name, Variant::Int64(value));
                }
            }
            Type::SharedString => {
                let mut indices = vec![0; count];
                reader.read_interleaved_u32_array(&mut indices)?;

                for (referent, index) in referents.iter().zip(indices) {
                    // The SSTR chunk usually comes first, but the format
                    // doesn't promise it, so indices resolve at the end.
                    self.shared_string_rewrites.push(SharedStringRewrite {
                        subject: *referent,
                        prop_name: prop_name.clone(),
                        index,
                    });
                }
            }
        }

        Ok(())
    }

    /// Referents index into the instance space the header declared, so a
    /// value outside it can only come from a corrupt file. The null `-1`
    /// is the caller's job to allow where it is meaningful.
    fn check_referent(&self, referent: i32) -> Result<(), InnerError> {
        if referent < 0 || referent as u32 >= self.num_instances {
            return Err(InnerError::ReferentOutOfBounds {
                referent,
                num_instances: self.num_instances,
            });
        }

        Ok(())
    }

    /// Attach a decoded property value to the instance with the given
    /// referent. `Name` is bridged onto the instance itself.
    fn set_property(&mut self, referent: i32, prop_name: &str, value: Variant) {
        let instance = match self.instances_by_ref.get_mut(&referent) {
            Some(instance) => instance,
            // Unreachable for well-formed files; a partially-applied INST
            // chunk in lenient mode can leave holes.
            None => return,
        };

        if prop_name == "Name" {
            match value {
                Variant::String(name) => instance.builder.set_name(name),
                other => instance.builder.add_property(prop_name, other),
            }
            return;
        }

        instance.builder.add_property(prop_name, value);
    }

    /// Resolve the deferred rewrites and assemble the final `Dom`.
    fn finish(mut self) -> Result<Dom, InnerError> {
        log::trace!("Constructing tree from deserialized chunks");

        let referent_to_ref: HashMap<i32, Ref> = self
            .instances_by_ref
            .iter()
            .map(|(referent, instance)| (*referent, instance.builder.referent()))
            .collect();

        let ref_rewrites = std::mem::replace(&mut self.prop_ref_rewrites, Vec::new());
        for rewrite in ref_rewrites {
            let target = match referent_to_ref.get(&rewrite.target) {
                Some(target) => *target,
                None => {
                    self.warnings.push(Warning::UnknownPropReferent {
                        prop_name: rewrite.prop_name.clone(),
                        referent: rewrite.target,
                    });
                    Ref::none()
                }
            };

            if let Some(instance) = self.instances_by_ref.get_mut(&rewrite.subject) {
                instance
                    .builder
                    .add_property(rewrite.prop_name, Variant::Ref(target));
            }
        }

        let shared_string_rewrites = std::mem::replace(&mut self.shared_string_rewrites, Vec::new());
        for rewrite in shared_string_rewrites {
            let value = match self.shared_strings.get(rewrite.index as usize) {
                Some(shared) => shared.clone(),
                None => {
                    self.warnings.push(Warning::SharedStringOutOfRange {
                        index: rewrite.index,
                        count: self.shared_strings.len() as u32,
                    });
                    SharedString::new(Vec::new())
                }
            };

            if let Some(instance) = self.instances_by_ref.get_mut(&rewrite.subject) {
                instance
                    .builder
                    .add_property(rewrite.prop_name, Variant::SharedString(value));
            }
        }

        let mut dom = Dom::new();
        *dom.metadata_mut() = std::mem::replace(&mut self.metadata, BTreeMap::new());

        let root_refs = std::mem::replace(&mut self.root_refs, Vec::new());
        for root in root_refs {
            if let Some(builder) = self.take_builder(root) {
                dom.insert(Ref::none(), builder);
            }
        }

        Ok(dom)
    }

    /// Remove an instance from the working set and fold its children into
    /// its builder, recursively.
    fn take_builder(&mut self, referent: i32) -> Option<InstanceBuilder> {
        let instance = self.instances_by_ref.remove(&referent)?;
        let mut builder = instance.builder;

        for child in instance.children {
            if let Some(child_builder) = self.take_builder(child) {
                builder.add_child(child_builder);
            }
        }

        Some(builder)
    }
}
