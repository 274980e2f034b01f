//! Deserializer that reads a file and creates a debug representation of it.
//! It's used to power the textual `dump` operation and to test the binary
//! serializer without suffering from same-inverse-bug problems.

#![allow(missing_docs)]

use std::{collections::HashMap, convert::TryInto, io::Read};

use byteorder::ReadBytesExt;
use rbxl_types::{
    Axes, BrickColor, CFrame, Color3, Color3uint8, ColorSequence, ColorSequenceKeypoint, EnumValue,
    Faces, Matrix3, NumberRange, NumberSequence, NumberSequenceKeypoint, PhysicalProperties,
    CustomPhysicalProperties, Ray, Rect, UDim, UDim2, Vector2, Vector2int16, Vector3, Vector3int16,
};
use serde::{Deserialize, Serialize};

use crate::{
    cframe,
    chunk::{Chunk, ChunkCompression},
    core::{RbxReadExt, FILE_FOOTER},
    deserializer::{Error, FileHeader},
    types::Type,
    warning::Warning,
};

/// A container-level view of one whole file: the header, every chunk in
/// order, and whatever bytes trailed the END chunk.
#[derive(Debug, Serialize, Deserialize)]
pub struct DecodedModel {
    pub num_types: u32,
    pub num_instances: u32,
    pub reserved: [u8; 8],
    pub chunks: Vec<DecodedChunk>,

    #[serde(with = "unknown_buffer", default, skip_serializing_if = "Vec::is_empty")]
    pub trailing: Vec<u8>,
}

impl DecodedModel {
    pub fn from_reader<R: Read>(mut reader: R) -> Result<Self, Error> {
        let header = FileHeader::decode(&mut reader)?;
        let mut chunks = Vec::new();

        // The number of instances with a given type ID. Used to correctly
        // decode lists of properties from the PROP chunk.
        let mut count_by_type_id = HashMap::new();

        let trailing = loop {
            let chunk = Chunk::decode(&mut reader)
                .map_err(crate::deserializer::InnerError::from)?;
            let compressed = chunk.compression == ChunkCompression::Compressed;

            let decoded = match &chunk.name {
                b"META" => decode_meta_chunk(chunk.data.as_slice()),
                b"SSTR" => decode_sstr_chunk(chunk.data.as_slice()),
                b"INST" => decode_inst_chunk(chunk.data.as_slice(), &mut count_by_type_id),
                b"PROP" => decode_prop_chunk(chunk.data.as_slice(), &count_by_type_id),
                b"PRNT" => decode_prnt_chunk(chunk.data.as_slice()),
                b"END\0" => {
                    chunks.push(DecodedChunk::End {
                        compressed,
                        contents: chunk.data,
                    });

                    let mut trailing = Vec::new();
                    reader
                        .read_to_end(&mut trailing)
                        .map_err(crate::deserializer::InnerError::from)?;
                    break trailing;
                }
                unknown => {
                    chunks.push(DecodedChunk::Unknown {
                        name: String::from_utf8_lossy(unknown).into_owned(),
                        contents: chunk.data,
                    });
                    continue;
                }
            };

            match decoded {
                Ok(decoded_chunk) => chunks.push(decoded_chunk),
                Err(err) => chunks.push(DecodedChunk::Invalid {
                    name: String::from_utf8_lossy(&chunk.name).into_owned(),
                    error: err.to_string(),
                    contents: chunk.data,
                }),
            }
        };

        Ok(DecodedModel {
            num_types: header.num_types,
            num_instances: header.num_instances,
            reserved: header.reserved,
            chunks,
            trailing,
        })
    }

    /// Derive the non-fatal observations a decoder would have made about
    /// this file's container layer.
    pub fn warnings(&self) -> Vec<Warning> {
        let mut warnings = Vec::new();

        if self.reserved != [0; 8] {
            warnings.push(Warning::NonZeroReserved);
        }

        for (chunk_index, chunk) in self.chunks.iter().enumerate() {
            match chunk {
                DecodedChunk::Unknown { name, .. } => {
                    warnings.push(Warning::UnknownChunk { name: name.clone() });
                }
                DecodedChunk::Invalid {
                    name,
                    error,
                    contents,
                } => {
                    warnings.push(Warning::InvalidChunk {
                        chunk_index,
                        name: name.clone(),
                        message: error.clone(),
                        payload: contents.clone(),
                    });
                }
                DecodedChunk::End {
                    compressed,
                    contents,
                } => {
                    if *compressed {
                        warnings.push(Warning::CompressedEnd);
                    }

                    if contents != FILE_FOOTER {
                        warnings.push(Warning::UnexpectedEndContents);
                    }
                }
                _ => {}
            }
        }

        if !self.trailing.is_empty() {
            warnings.push(Warning::TrailingData {
                length: self.trailing.len(),
            });
        }

        warnings
    }
}

fn decode_meta_chunk<R: Read>(mut reader: R) -> Result<DecodedChunk, std::io::Error> {
    let num_entries = reader.read_le_u32()?;
    let mut entries = Vec::with_capacity(num_entries as usize);

    for _ in 0..num_entries {
        let key = reader.read_string()?;
        let value = reader.read_string()?;
        entries.push((key, value));
    }

    let mut remaining = Vec::new();
    reader.read_to_end(&mut remaining)?;

    Ok(DecodedChunk::Meta { entries, remaining })
}

fn decode_sstr_chunk<R: Read>(mut reader: R) -> Result<DecodedChunk, std::io::Error> {
    let version = reader.read_le_u32()?;
    let num_entries = reader.read_le_u32()?;
    let mut entries = Vec::with_capacity(num_entries as usize);

    for _ in 0..num_entries {
        let mut hash = vec![0; 16];
        reader.read_exact(&mut hash)?;

        let data = reader.read_binary_string()?;

        entries.push(DecodedSharedString {
            hash,
            data: data.into(),
        });
    }

    let mut remaining = Vec::new();
    reader.read_to_end(&mut remaining)?;

    Ok(DecodedChunk::Sstr {
        version,
        entries,
        remaining,
    })
}

fn decode_inst_chunk<R: Read>(
    mut reader: R,
    count_by_type_id: &mut HashMap<u32, usize>,
) -> Result<DecodedChunk, std::io::Error> {
    let type_id = reader.read_le_u32()?;
    let type_name = reader.read_string()?;
    let is_service = reader.read_bool()?;
    let num_instances = reader.read_le_u32()?;

    count_by_type_id.insert(type_id, num_instances as usize);

    let mut referents = vec![0; num_instances as usize];
    reader.read_referent_array(&mut referents)?;

    let mut service_flags = Vec::new();
    if is_service {
        service_flags = vec![0; num_instances as usize];
        reader.read_exact(&mut service_flags)?;
    }

    let mut remaining = Vec::new();
    reader.read_to_end(&mut remaining)?;

    Ok(DecodedChunk::Inst {
        type_id,
        type_name,
        is_service,
        referents,
        service_flags,
        remaining,
    })
}

fn decode_prop_chunk<R: Read>(
    mut reader: R,
    count_by_type_id: &HashMap<u32, usize>,
) -> Result<DecodedChunk, std::io::Error> {
    let type_id = reader.read_le_u32()?;
    let prop_name = reader.read_string()?;

    let prop_type_value = reader.read_u8()?;
    let (prop_type, values) = match prop_type_value.try_into() {
        Ok(prop_type) => {
            // If this type ID is unknown, we'll default to assuming that
            // type has no members and thus has no values of this property.
            let values = match count_by_type_id.get(&type_id) {
                Some(&prop_count) => Some(DecodedValues::decode(&mut reader, prop_count, prop_type)?),
                None => None,
            };

            (DecodedPropType::Known(prop_type), values)
        }
        Err(_) => (DecodedPropType::Unknown(prop_type_value), None),
    };

    let mut remaining = Vec::new();
    reader.read_to_end(&mut remaining)?;

    Ok(DecodedChunk::Prop {
        type_id,
        prop_name,
        prop_type,
        values,
        remaining,
    })
}

fn decode_prnt_chunk<R: Read>(mut reader: R) -> Result<DecodedChunk, std::io::Error> {
    let version = reader.read_u8()?;
    let num_referents = reader.read_le_u32()?;

    let mut subjects = vec![0; num_referents as usize];
    let mut parents = vec![0; num_referents as usize];

    reader.read_referent_array(&mut subjects)?;
    reader.read_referent_array(&mut parents)?;

    let links = subjects
        .iter()
        .copied()
        .zip(parents.iter().copied())
        .collect();

    let mut remaining = Vec::new();
    reader.read_to_end(&mut remaining)?;

    Ok(DecodedChunk::Prnt {
        version,
        links,
        remaining,
    })
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(untagged)]
pub enum DecodedValues {
    String(Vec<RobloxString>),
    Bool(Vec<bool>),
    Int32(Vec<i32>),
    Float32(Vec<f32>),
    Float64(Vec<f64>),
    UDim(Vec<UDim>),
    UDim2(Vec<UDim2>),
    Ray(Vec<Ray>),
    Faces(Vec<Faces>),
    Axes(Vec<Axes>),
    BrickColor(Vec<BrickColor>),
    Color3(Vec<Color3>),
    Vector2(Vec<Vector2>),
    Vector3(Vec<Vector3>),
    Vector2int16(Vec<Vector2int16>),
    Vector3int16(Vec<Vector3int16>),
    CFrame(Vec<CFrame>),
    Enum(Vec<EnumValue>),
    Ref(Vec<i32>),
    NumberSequence(Vec<NumberSequence>),
    ColorSequence(Vec<ColorSequence>),
    NumberRange(Vec<NumberRange>),
    Rect(Vec<Rect>),
    PhysicalProperties(Vec<PhysicalProperties>),
    Color3uint8(Vec<Color3uint8>),
    Int64(Vec<i64>),
    SharedString(Vec<u32>),
}

impl DecodedValues {
    fn decode<R: Read>(
        mut reader: R,
        prop_count: usize,
        prop_type: Type,
    ) -> Result<Self, std::io::Error> {
        match prop_type {
            Type::String => {
                let mut values = Vec::with_capacity(prop_count);

                for _ in 0..prop_count {
                    values.push(reader.read_binary_string()?.into());
                }

                Ok(DecodedValues::String(values))
            }
            Type::Bool => {
                let mut values = Vec::with_capacity(prop_count);

                for _ in 0..prop_count {
                    values.push(reader.read_bool()?);
                }

                Ok(DecodedValues::Bool(values))
            }
            Type::Int32 => {
                let mut values = vec![0; prop_count];
                reader.read_interleaved_i32_array(&mut values)?;

                Ok(DecodedValues::Int32(values))
            }
            Type::Float32 => {
                let mut values = vec![0.0; prop_count];
                reader.read_interleaved_f32_array(&mut values)?;

                Ok(DecodedValues::Float32(values))
            }
            Type::Float64 => {
                let mut values = Vec::with_capacity(prop_count);

                for _ in 0..prop_count {
                    values.push(reader.read_le_f64()?);
                }

                Ok(DecodedValues::Float64(values))
            }
            Type::UDim => {
                let mut scales = vec![0.0; prop_count];
                let mut offsets = vec![0; prop_count];

                reader.read_interleaved_f32_array(&mut scales)?;
                reader.read_interleaved_i32_array(&mut offsets)?;

                let values = scales
                    .into_iter()
                    .zip(offsets)
                    .map(|(scale, offset)| UDim::new(scale, offset))
                    .collect();

                Ok(DecodedValues::UDim(values))
            }
            Type::UDim2 => {
                let mut scales_x = vec![0.0; prop_count];
                let mut scales_y = vec![0.0; prop_count];
                let mut offsets_x = vec![0; prop_count];
                let mut offsets_y = vec![0; prop_count];

                reader.read_interleaved_f32_array(&mut scales_x)?;
                reader.read_interleaved_f32_array(&mut scales_y)?;
                reader.read_interleaved_i32_array(&mut offsets_x)?;
                reader.read_interleaved_i32_array(&mut offsets_y)?;

                let x_values = scales_x
                    .into_iter()
                    .zip(offsets_x)
                    .map(|(scale, offset)| UDim::new(scale, offset));
                let y_values = scales_y
                    .into_iter()
                    .zip(offsets_y)
                    .map(|(scale, offset)| UDim::new(scale, offset));

                let values = x_values
                    .zip(y_values)
                    .map(|(x, y)| UDim2::new(x, y))
                    .collect();

                Ok(DecodedValues::UDim2(values))
            }
            Type::Ray => {
                let mut values = Vec::with_capacity(prop_count);

                for _ in 0..prop_count {
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

                    values.push(Ray::new(origin, direction));
                }

                Ok(DecodedValues::Ray(values))
            }
            Type::Faces => {
                let mut values = Vec::with_capacity(prop_count);

                for _ in 0..prop_count {
                    values.push(Faces::from_bits_truncate(reader.read_u8()?));
                }

                Ok(DecodedValues::Faces(values))
            }
            Type::Axes => {
                let mut values = Vec::with_capacity(prop_count);

                for _ in 0..prop_count {
                    values.push(Axes::from_bits_truncate(reader.read_u8()?));
                }

                Ok(DecodedValues::Axes(values))
            }
            Type::BrickColor => {
                let mut values = vec![0; prop_count];
                reader.read_interleaved_u32_array(&mut values)?;

                Ok(DecodedValues::BrickColor(
                    values.into_iter().map(BrickColor::from_number).collect(),
                ))
            }
            Type::Color3 => {
                let mut r = vec![0.0; prop_count];
                let mut g = vec![0.0; prop_count];
                let mut b = vec![0.0; prop_count];

                reader.read_interleaved_f32_array(&mut r)?;
                reader.read_interleaved_f32_array(&mut g)?;
                reader.read_interleaved_f32_array(&mut b)?;

                let values = r
                    .into_iter()
                    .zip(g)
                    .zip(b)
                    .map(|((r, g), b)| Color3::new(r, g, b))
                    .collect();

                Ok(DecodedValues::Color3(values))
            }
            Type::Vector2 => {
                let mut x = vec![0.0; prop_count];
                let mut y = vec![0.0; prop_count];

                reader.read_interleaved_f32_array(&mut x)?;
                reader.read_interleaved_f32_array(&mut y)?;

                let values = x
                    .into_iter()
                    .zip(y)
                    .map(|(x, y)| Vector2::new(x, y))
                    .collect();

                Ok(DecodedValues::Vector2(values))
            }
            Type::Vector3 => {
                let mut x = vec![0.0; prop_count];
                let mut y = vec![0.0; prop_count];
                let mut z = vec![0.0; prop_count];

                reader.read_interleaved_f32_array(&mut x)?;
                reader.read_interleaved_f32_array(&mut y)?;
                reader.read_interleaved_f32_array(&mut z)?;

                let values = x
                    .into_iter()
                    .zip(y)
                    .zip(z)
                    .map(|((x, y), z)| Vector3::new(x, y, z))
                    .collect();

                Ok(DecodedValues::Vector3(values))
            }
            Type::Vector2int16 => {
                let mut values = Vec::with_capacity(prop_count);

                for _ in 0..prop_count {
                    values.push(Vector2int16::new(
                        reader.read_le_i16()?,
                        reader.read_le_i16()?,
                    ));
                }

                Ok(DecodedValues::Vector2int16(values))
            }
            Type::Vector3int16 => {
                let mut values = Vec::with_capacity(prop_count);

                for _ in 0..prop_count {
                    values.push(Vector3int16::new(
                        reader.read_le_i16()?,
                        reader.read_le_i16()?,
                        reader.read_le_i16()?,
                    ));
                }

                Ok(DecodedValues::Vector3int16(values))
            }
            Type::CFrame | Type::CFrameQuat => {
                let mut rotations = Vec::with_capacity(prop_count);

                for _ in 0..prop_count {
                    let id = reader.read_u8()?;

                    let rotation = if id != 0 {
                        cframe::rotation_from_id(id)
                    } else if prop_type == Type::CFrameQuat {
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

                let mut x = vec![0.0; prop_count];
                let mut y = vec![0.0; prop_count];
                let mut z = vec![0.0; prop_count];

                reader.read_interleaved_f32_array(&mut x)?;
                reader.read_interleaved_f32_array(&mut y)?;
                reader.read_interleaved_f32_array(&mut z)?;

                let values = rotations
                    .into_iter()
                    .enumerate()
                    .map(|(index, rotation)| {
                        CFrame::new(Vector3::new(x[index], y[index], z[index]), rotation)
                    })
                    .collect();

                Ok(DecodedValues::CFrame(values))
            }
            Type::Enum => {
                let mut values = vec![0; prop_count];
                reader.read_interleaved_u32_array(&mut values)?;

                Ok(DecodedValues::Enum(
                    values.into_iter().map(EnumValue::from_u32).collect(),
                ))
            }
            Type::Ref => {
                let mut values = vec![0; prop_count];
                reader.read_referent_array(&mut values)?;

                Ok(DecodedValues::Ref(values))
            }
            Type::NumberSequence => {
                let mut values = Vec::with_capacity(prop_count);

                for _ in 0..prop_count {
                    let keypoint_count = reader.read_le_u32()?;
                    let mut keypoints = Vec::with_capacity(keypoint_count as usize);

                    for _ in 0..keypoint_count {
                        keypoints.push(NumberSequenceKeypoint::new(
                            reader.read_le_f32()?,
                            reader.read_le_f32()?,
                            reader.read_le_f32()?,
                        ));
                    }

                    values.push(NumberSequence { keypoints });
                }

                Ok(DecodedValues::NumberSequence(values))
            }
            Type::ColorSequence => {
                let mut values = Vec::with_capacity(prop_count);

                for _ in 0..prop_count {
                    let keypoint_count = reader.read_le_u32()?;
                    let mut keypoints = Vec::with_capacity(keypoint_count as usize);

                    for _ in 0..keypoint_count {
                        let time = reader.read_le_f32()?;
                        let color = Color3::new(
                            reader.read_le_f32()?,
                            reader.read_le_f32()?,
                            reader.read_le_f32()?,
                        );
                        let _envelope = reader.read_le_f32()?;

                        keypoints.push(ColorSequenceKeypoint::new(time, color));
                    }

                    values.push(ColorSequence { keypoints });
                }

                Ok(DecodedValues::ColorSequence(values))
            }
            Type::NumberRange => {
                let mut values = Vec::with_capacity(prop_count);

                for _ in 0..prop_count {
                    values.push(NumberRange::new(
                        reader.read_le_f32()?,
                        reader.read_le_f32()?,
                    ));
                }

                Ok(DecodedValues::NumberRange(values))
            }
            Type::Rect => {
                let mut min_x = vec![0.0; prop_count];
                let mut min_y = vec![0.0; prop_count];
                let mut max_x = vec![0.0; prop_count];
                let mut max_y = vec![0.0; prop_count];

                reader.read_interleaved_f32_array(&mut min_x)?;
                reader.read_interleaved_f32_array(&mut min_y)?;
                reader.read_interleaved_f32_array(&mut max_x)?;
                reader.read_interleaved_f32_array(&mut max_y)?;

                let values = (0..prop_count)
                    .map(|index| {
                        Rect::new(
                            Vector2::new(min_x[index], min_y[index]),
                            Vector2::new(max_x[index], max_y[index]),
                        )
                    })
                    .collect();

                Ok(DecodedValues::Rect(values))
            }
            Type::PhysicalProperties => {
                let mut values = Vec::with_capacity(prop_count);

                for _ in 0..prop_count {
                    let custom = reader.read_bool()?;

                    values.push(if custom {
                        PhysicalProperties::Custom(CustomPhysicalProperties {
                            density: reader.read_le_f32()?,
                            friction: reader.read_le_f32()?,
                            elasticity: reader.read_le_f32()?,
                            friction_weight: reader.read_le_f32()?,
                            elasticity_weight: reader.read_le_f32()?,
                        })
                    } else {
                        PhysicalProperties::Default
                    });
                }

                Ok(DecodedValues::PhysicalProperties(values))
            }
            Type::Color3uint8 => {
                let mut r = vec![0; prop_count];
                let mut g = vec![0; prop_count];
                let mut b = vec![0; prop_count];

                reader.read_exact(&mut r)?;
                reader.read_exact(&mut g)?;
                reader.read_exact(&mut b)?;

                let values = (0..prop_count)
                    .map(|index| Color3uint8::new(r[index], g[index], b[index]))
                    .collect();

                Ok(DecodedValues::Color3uint8(values))
            }
            Type::Int64 => {
                let mut values = vec![0; prop_count];
                reader.read_interleaved_i64_array(&mut values)?;

                Ok(DecodedValues::Int64(values))
            }
            Type::SharedString => {
                let mut values = vec![0; prop_count];
                reader.read_interleaved_u32_array(&mut values)?;

                Ok(DecodedValues::SharedString(values))
            }
        }
    }
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(untagged)]
pub enum DecodedPropType {
    Known(Type),
    Unknown(u8),
}

/// One entry of the shared-string table.
#[derive(Debug, Serialize, Deserialize)]
pub struct DecodedSharedString {
    #[serde(with = "unknown_buffer")]
    pub hash: Vec<u8>,
    pub data: RobloxString,
}

/// Holds a string with the same semantics as Roblox does. It can be UTF-8,
/// but might not be.
#[derive(Debug, Serialize, Deserialize)]
#[serde(untagged)]
pub enum RobloxString {
    String(String),
    BinaryString(#[serde(with = "unknown_buffer")] Vec<u8>),
}

impl From<Vec<u8>> for RobloxString {
    fn from(value: Vec<u8>) -> Self {
        match String::from_utf8(value) {
            Ok(string) => RobloxString::String(string),
            Err(err) => RobloxString::BinaryString(err.into_bytes()),
        }
    }
}

#[derive(Debug, Serialize, Deserialize)]
pub enum DecodedChunk {
    Meta {
        entries: Vec<(String, String)>,

        #[serde(with = "unknown_buffer", default, skip_serializing_if = "Vec::is_empty")]
        remaining: Vec<u8>,
    },

    Sstr {
        version: u32,
        entries: Vec<DecodedSharedString>,

        #[serde(with = "unknown_buffer", default, skip_serializing_if = "Vec::is_empty")]
        remaining: Vec<u8>,
    },

    Inst {
        type_id: u32,
        type_name: String,
        is_service: bool,
        referents: Vec<i32>,

        #[serde(default, skip_serializing_if = "Vec::is_empty")]
        service_flags: Vec<u8>,

        #[serde(with = "unknown_buffer", default, skip_serializing_if = "Vec::is_empty")]
        remaining: Vec<u8>,
    },

    Prop {
        type_id: u32,
        prop_name: String,
        prop_type: DecodedPropType,

        #[serde(default, skip_serializing_if = "Option::is_none")]
        values: Option<DecodedValues>,

        #[serde(with = "unknown_buffer", default, skip_serializing_if = "Vec::is_empty")]
        remaining: Vec<u8>,
    },

    Prnt {
        version: u8,
        links: Vec<(i32, i32)>,

        #[serde(with = "unknown_buffer", default, skip_serializing_if = "Vec::is_empty")]
        remaining: Vec<u8>,
    },

    End {
        compressed: bool,

        #[serde(with = "unknown_buffer")]
        contents: Vec<u8>,
    },

    /// A chunk whose signature was recognized but whose body failed to
    /// parse. The raw payload is kept for inspection.
    Invalid {
        name: String,
        error: String,

        #[serde(with = "unknown_buffer")]
        contents: Vec<u8>,
    },

    Unknown {
        name: String,

        #[serde(with = "unknown_buffer")]
        contents: Vec<u8>,
    },
}

/// Contains data that we haven't decoded for a chunk. Using `unknown_buffer`
/// should generally be a placeholder since its results are opaque, but
/// stable.
mod unknown_buffer {
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S>(value: &Vec<u8>, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.collect_str(&base64::display::Base64Display::with_config(
            value,
            base64::STANDARD,
        ))
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Vec<u8>, D::Error>
    where
        D: Deserializer<'de>,
    {
        let encoded = String::deserialize(deserializer)?;
        let contents = base64::decode(&encoded).map_err(serde::de::Error::custom)?;

        Ok(contents)
    }
}
