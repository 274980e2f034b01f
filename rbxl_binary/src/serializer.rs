use std::{
    borrow::Cow,
    collections::{BTreeMap, HashMap},
    convert::TryInto,
    io::{self, Write},
};

use byteorder::WriteBytesExt;
use rbxl_dom::Dom;
use rbxl_types::{Ref, SharedString, Variant};
use thiserror::Error;

use crate::{
    cframe,
    chunk::{ChunkBuilder, ChunkCompression},
    core::{RbxWriteExt, FILE_FOOTER, FILE_MAGIC_HEADER, FILE_SIGNATURE, FILE_VERSION},
    types::Type,
    warning::Warning,
    Mode,
};

/// Represents an error that occurred during serialization.
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
}

#[derive(Debug, Error)]
pub(crate) enum InnerError {
    #[error(transparent)]
    Io {
        #[from]
        source: io::Error,
    },

    #[error("the instance with referent {referent:?} was not present in the dom")]
    InvalidInstanceId { referent: Ref },
}

/// Options available for serializing a binary place or model file.
#[derive(Debug, Clone)]
pub struct EncodeOptions {
    mode: Mode,
    uncompressed: bool,
}

impl EncodeOptions {
    /// Options for encoding a place file: top-level service containers keep
    /// their service markers.
    pub fn place() -> Self {
        EncodeOptions {
            mode: Mode::Place,
            uncompressed: false,
        }
    }

    /// Options for encoding a model file: every instance is written as a
    /// plain, non-service object.
    pub fn model() -> Self {
        EncodeOptions {
            mode: Mode::Model,
            uncompressed: false,
        }
    }

    /// When set, every chunk is written with compression disabled.
    pub fn uncompressed(self, uncompressed: bool) -> Self {
        EncodeOptions {
            uncompressed,
            ..self
        }
    }

    /// Serialize the whole forest held by `dom` into `writer`.
    pub fn encode<W: Write>(self, dom: &Dom, writer: W) -> Result<Vec<Warning>, Error> {
        encode_internal(dom, writer, self)
    }
}

pub(crate) fn encode_internal<W: Write>(
    dom: &Dom,
    writer: W,
    options: EncodeOptions,
) -> Result<Vec<Warning>, Error> {
    let mut warnings = Vec::new();

    match try_encode(dom, writer, &options, &mut warnings) {
        Ok(()) => Ok(warnings),
        Err(source) => Err(Error {
            warnings,
            source: Box::new(source),
        }),
    }
}

fn try_encode<W: Write>(
    dom: &Dom,
    writer: W,
    options: &EncodeOptions,
    warnings: &mut Vec<Warning>,
) -> Result<(), InnerError> {
    let mut serializer = BinarySerializer::new(dom, writer, options, warnings);

    serializer.add_instances(dom.root_refs())?;

    log::debug!("Type info discovered: {:#?}", serializer.type_infos);

    serializer.assign_ids();
    serializer.pool_shared_string_defaults();

    log::trace!("Referents constructed: {:#?}", serializer.id_to_referent);

    serializer.write_header()?;
    serializer.serialize_metadata()?;
    serializer.serialize_shared_strings()?;
    serializer.serialize_instances()?;
    serializer.serialize_properties()?;
    serializer.serialize_parents()?;
    serializer.serialize_end()?;

    Ok(())
}

/// Represents all of the state during a single serialization session. A new
/// `BinarySerializer` object should be created every time we want to
/// serialize a binary file.
struct BinarySerializer<'a, W> {
    /// The dom containing all of the instances that we're serializing.
    dom: &'a Dom,

    /// Where the binary output should be written.
    output: W,

    mode: Mode,
    compression: ChunkCompression,

    /// All of the instances, in referent-assignment order, that we're going
    /// to be serializing.
    relevant_instances: Vec<Ref>,

    /// A map from the dom's unique instance IDs to the ID space used in the
    /// binary format, signed integers.
    id_to_referent: HashMap<Ref, i32>,

    /// All of the types of instance discovered by our serializer that we'll
    /// be writing into the output.
    ///
    /// These are stored sorted so that the type IDs we generate follow
    /// class-name order and our output is deterministic.
    type_infos: BTreeMap<String, TypeInfo>,

    /// The shared-string table, deduplicated by content hash. Entries keep
    /// insertion order so that the indices already handed out stay valid.
    shared_strings: Vec<SharedString>,
    shared_string_ids: HashMap<SharedString, u32>,

    warnings: &'a mut Vec<Warning>,
}

/// An instance class that our serializer knows about. We should have one
/// struct per unique ClassName.
#[derive(Debug)]
struct TypeInfo {
    /// The ID that this serializer will use to refer to this type of
    /// instance. Assigned once all classes are known.
    type_id: u32,

    /// Whether this type is considered a service. In a place file this is
    /// picked up from the instances themselves; model files never mark
    /// services.
    is_service: bool,

    /// The IDs of all of the instances of this type.
    object_refs: Vec<Ref>,

    /// All of the properties found on any instance of this type, keyed by
    /// name. Stored sorted so property chunks come out in a deterministic
    /// order.
    properties: BTreeMap<String, PropInfo>,
}

/// A property on a specific class that our serializer knows about.
#[derive(Debug)]
struct PropInfo {
    /// The binary format type that will be used to serialize this property,
    /// fixed by the first concrete value seen for it.
    prop_type: Type,

    /// Set when a later instance carried the same property with a different
    /// type. The whole column is dropped; one chunk can hold one type.
    dropped: bool,
}

impl<'a, W: Write> BinarySerializer<'a, W> {
    fn new(
        dom: &'a Dom,
        output: W,
        options: &EncodeOptions,
        warnings: &'a mut Vec<Warning>,
    ) -> Self {
        BinarySerializer {
            dom,
            output,
            mode: options.mode,
            compression: if options.uncompressed {
                ChunkCompression::Uncompressed
            } else {
                ChunkCompression::Compressed
            },
            relevant_instances: Vec::new(),
            id_to_referent: HashMap::new(),
            type_infos: BTreeMap::new(),
            shared_strings: Vec::new(),
            shared_string_ids: HashMap::new(),
            warnings,
        }
    }

    /// Mark the given roots and all of their descendants as intended for
    /// serialization. Instances are visited depth-first, which fixes the
    /// referent order.
    fn add_instances(&mut self, roots: &[Ref]) -> Result<(), InnerError> {
        let mut to_visit: Vec<Ref> = roots.iter().rev().copied().collect();

        while let Some(referent) = to_visit.pop() {
            self.relevant_instances.push(referent);
            self.collect_type_info(referent)?;

            let instance = self
                .dom
                .get_by_ref(referent)
                .ok_or(InnerError::InvalidInstanceId { referent })?;
            to_visit.extend(instance.children().iter().rev().copied());
        }

        Ok(())
    }

    /// Collect information about all the different types of instance and
    /// their properties.
    fn collect_type_info(&mut self, referent: Ref) -> Result<(), InnerError> {
        let instance = self
            .dom
            .get_by_ref(referent)
            .ok_or(InnerError::InvalidInstanceId { referent })?;

        let type_info = Self::get_or_create_type_info(&mut self.type_infos, &instance.class);
        type_info.object_refs.push(referent);

        if self.mode == Mode::Place && instance.is_service {
            type_info.is_service = true;
        }

        for (prop_name, prop_value) in &instance.properties {
            let ser_type = match Type::from_variant_type(prop_value.ty()) {
                Some(ser_type) => ser_type,
                None => {
                    self.warnings.push(Warning::UnsupportedPropType {
                        class_name: instance.class.clone(),
                        prop_name: prop_name.clone(),
                        type_name: format!("{:?}", prop_value.ty()),
                    });
                    continue;
                }
            };

            match type_info.properties.get_mut(prop_name) {
                Some(prop_info) => {
                    // The first concrete value fixed this column's type. A
                    // conflicting value poisons the whole column.
                    if !prop_info.dropped && prop_info.prop_type != ser_type {
                        prop_info.dropped = true;
                        self.warnings.push(Warning::PropTypeConflict {
                            class_name: instance.class.clone(),
                            prop_name: prop_name.clone(),
                        });
                    }
                }
                None => {
                    type_info.properties.insert(
                        prop_name.clone(),
                        PropInfo {
                            prop_type: ser_type,
                            dropped: false,
                        },
                    );
                }
            }

            if let Variant::SharedString(shared) = prop_value {
                Self::pool_shared_string(
                    &mut self.shared_strings,
                    &mut self.shared_string_ids,
                    shared,
                );
            }
        }

        Ok(())
    }

    /// Finds the type info from the given class name if it exists, or
    /// creates one and returns a reference to it if not.
    fn get_or_create_type_info<'infos>(
        type_infos: &'infos mut BTreeMap<String, TypeInfo>,
        class: &str,
    ) -> &'infos mut TypeInfo {
        if !type_infos.contains_key(class) {
            let mut properties = BTreeMap::new();

            // Every instance has a property named Name. Even though the dom
            // stores the name property specially, we still insert it into
            // the type info and handle it like a regular property during
            // encoding.
            properties.insert(
                "Name".to_owned(),
                PropInfo {
                    prop_type: Type::String,
                    dropped: false,
                },
            );

            type_infos.insert(
                class.to_owned(),
                TypeInfo {
                    type_id: 0,
                    is_service: false,
                    object_refs: Vec::new(),
                    properties,
                },
            );
        }

        // This unwrap will not panic because we always insert this key into
        // type_infos in this function.
        type_infos.get_mut(class).unwrap()
    }

    fn pool_shared_string(
        shared_strings: &mut Vec<SharedString>,
        shared_string_ids: &mut HashMap<SharedString, u32>,
        value: &SharedString,
    ) {
        if !shared_string_ids.contains_key(value) {
            shared_string_ids.insert(value.clone(), shared_strings.len() as u32);
            shared_strings.push(value.clone());
        }
    }

    /// Populate the map from the dom's instance ID space to the IDs that
    /// we'll be serializing, and give every class its final type ID. Type
    /// IDs count up through the classes in name order.
    fn assign_ids(&mut self) {
        self.id_to_referent.reserve(self.relevant_instances.len());

        for (next_referent, id) in self.relevant_instances.iter().enumerate() {
            self.id_to_referent
                .insert(*id, next_referent.try_into().unwrap());
        }

        for (next_type_id, type_info) in self.type_infos.values_mut().enumerate() {
            type_info.type_id = next_type_id as u32;
        }
    }

    /// Shared-string columns pad missing values with the empty string, so
    /// the empty string has to be in the table before the table is written.
    fn pool_shared_string_defaults(&mut self) {
        let mut needs_empty = false;

        for type_info in self.type_infos.values() {
            for (prop_name, prop_info) in &type_info.properties {
                if prop_info.prop_type != Type::SharedString || prop_info.dropped {
                    continue;
                }

                for id in &type_info.object_refs {
                    let instance = self.dom.get_by_ref(*id).unwrap();

                    match instance.properties.get(prop_name.as_str()) {
                        Some(Variant::SharedString(_)) => {}
                        _ => needs_empty = true,
                    }
                }
            }
        }

        if needs_empty {
            Self::pool_shared_string(
                &mut self.shared_strings,
                &mut self.shared_string_ids,
                &SharedString::new(Vec::new()),
            );
        }
    }

    fn write_header(&mut self) -> Result<(), InnerError> {
        log::trace!("Writing header");

        self.output.write_all(FILE_MAGIC_HEADER)?;
        self.output.write_all(FILE_SIGNATURE)?;
        self.output.write_le_u16(FILE_VERSION)?;

        self.output.write_le_u32(self.type_infos.len() as u32)?;
        self.output
            .write_le_u32(self.relevant_instances.len() as u32)?;
        self.output.write_all(&[0; 8])?;

        Ok(())
    }

    /// Write out the document metadata, stored in a chunk named META. The
    /// chunk is omitted entirely when there is no metadata.
    fn serialize_metadata(&mut self) -> Result<(), InnerError> {
        let metadata = self.dom.metadata();

        if metadata.is_empty() {
            return Ok(());
        }

        log::trace!("Writing metadata ({} entries)", metadata.len());

        let mut chunk = ChunkBuilder::new(b"META", self.compression);

        chunk.write_le_u32(metadata.len() as u32)?;
        for (key, value) in metadata {
            chunk.write_string(key)?;
            chunk.write_string(value)?;
        }

        chunk.dump(&mut self.output)?;

        Ok(())
    }

    /// Write out the shared-string table, stored in a chunk named SSTR. The
    /// chunk is omitted entirely when no property referenced a shared
    /// string.
    fn serialize_shared_strings(&mut self) -> Result<(), InnerError> {
        if self.shared_strings.is_empty() {
            return Ok(());
        }

        log::trace!(
            "Writing shared string table ({} entries)",
            self.shared_strings.len()
        );

        let mut chunk = ChunkBuilder::new(b"SSTR", self.compression);

        chunk.write_le_u32(0)?; // SSTR version 0
        chunk.write_le_u32(self.shared_strings.len() as u32)?;

        for shared in &self.shared_strings {
            chunk.write_all(&shared.hash())?;
            chunk.write_binary_string(shared.data())?;
        }

        chunk.dump(&mut self.output)?;

        Ok(())
    }

    /// Write out the declarations of all instances, stored in a series of
    /// chunks named INST.
    fn serialize_instances(&mut self) -> Result<(), InnerError> {
        log::trace!("Writing instance chunks");

        let dom = self.dom;

        for (type_name, type_info) in &self.type_infos {
            log::trace!(
                "Writing chunk for {} ({} instances)",
                type_name,
                type_info.object_refs.len()
            );

            let mut chunk = ChunkBuilder::new(b"INST", self.compression);

            chunk.write_le_u32(type_info.type_id)?;
            chunk.write_string(type_name)?;
            chunk.write_bool(type_info.is_service)?;
            chunk.write_le_u32(type_info.object_refs.len() as u32)?;

            chunk.write_referents(
                type_info
                    .object_refs
                    .iter()
                    .map(|id| self.id_to_referent[id]),
            )?;

            if type_info.is_service {
                // One flag byte per instance. Mixed groups are legal; a
                // non-service instance of a service class gets a zero.
                for id in &type_info.object_refs {
                    let instance = dom.get_by_ref(*id).unwrap();
                    chunk.write_bool(instance.is_service)?;
                }
            }

            chunk.dump(&mut self.output)?;
        }

        Ok(())
    }

    /// Write out batch declarations of property values for the instances
    /// previously defined in the INST chunks. Property data is contained in
    /// chunks named PROP.
    fn serialize_properties(&mut self) -> Result<(), InnerError> {
        log::trace!("Writing properties");

        let dom = self.dom;

        for (type_name, type_info) in &self.type_infos {
            for (prop_name, prop_info) in &type_info.properties {
                if prop_info.dropped {
                    continue;
                }

                log::trace!(
                    "Writing property {}.{} (type {:?})",
                    type_name,
                    prop_name,
                    prop_info.prop_type
                );

                let mut chunk = ChunkBuilder::new(b"PROP", self.compression);

                chunk.write_le_u32(type_info.type_id)?;
                chunk.write_string(prop_name)?;
                chunk.write_u8(prop_info.prop_type as u8)?;

                // Every slot in the column gets a value: the instance's own
                // if it has one of the right type, the type's zero value if
                // not.
                let default_value = prop_info.prop_type.zero_value();
                let values: Vec<Cow<'_, Variant>> = type_info
                    .object_refs
                    .iter()
                    .map(|id| {
                        // This unwrap will not panic because we uphold the
                        // invariant that any ID in object_refs must be part
                        // of this dom.
                        let instance = dom.get_by_ref(*id).unwrap();

                        // We store the Name property in a different field
                        // for convenience, but when serializing we need to
                        // handle it just like other properties.
                        if prop_name == "Name" {
                            return Cow::Owned(Variant::String(instance.name.clone()));
                        }

                        match instance.properties.get(prop_name.as_str()) {
                            Some(value)
                                if Type::from_variant_type(value.ty())
                                    == Some(prop_info.prop_type) =>
                            {
                                Cow::Borrowed(value)
                            }
                            _ => Cow::Borrowed(&default_value),
                        }
                    })
                    .collect();

                write_values(&mut chunk, prop_info.prop_type, &values, |target| {
                    self.id_to_referent.get(target).copied().unwrap_or(-1)
                }, |shared| {
                    self.shared_string_ids.get(shared).copied().unwrap_or(0)
                })?;

                chunk.dump(&mut self.output)?;
            }
        }

        Ok(())
    }

    /// Write out the hierarchical relations between instances, stored in a
    /// chunk named PRNT. Children come before their parents.
    fn serialize_parents(&mut self) -> Result<(), InnerError> {
        log::trace!("Writing parent relationships");

        let mut subjects = Vec::with_capacity(self.relevant_instances.len());
        let mut parents = Vec::with_capacity(self.relevant_instances.len());

        for root in self.dom.root_refs() {
            self.fill_parent_links(*root, &mut subjects, &mut parents);
        }

        let mut chunk = ChunkBuilder::new(b"PRNT", self.compression);

        chunk.write_u8(0)?; // PRNT version 0
        chunk.write_le_u32(subjects.len() as u32)?;

        chunk.write_referents(subjects.into_iter())?;
        chunk.write_referents(parents.into_iter())?;

        chunk.dump(&mut self.output)?;

        Ok(())
    }

    fn fill_parent_links(&self, referent: Ref, subjects: &mut Vec<i32>, parents: &mut Vec<i32>) {
        let instance = self.dom.get_by_ref(referent).unwrap();

        for child in instance.children() {
            self.fill_parent_links(*child, subjects, parents);
        }

        subjects.push(self.id_to_referent[&referent]);

        // A missing or foreign parent is encoded as -1, making the instance
        // a root of the decoded file.
        let parent = instance.parent();
        parents.push(if parent.is_some() {
            self.id_to_referent.get(&parent).copied().unwrap_or(-1)
        } else {
            -1
        });
    }

    /// Write the fixed, uncompressed end chunk used to verify that the file
    /// hasn't been truncated mistakenly. This chunk is named END\0, with a
    /// zero byte at the end.
    fn serialize_end(&mut self) -> Result<(), InnerError> {
        log::trace!("Writing file end");

        let mut end = ChunkBuilder::new(b"END\0", ChunkCompression::Uncompressed);
        end.write_all(FILE_FOOTER)?;
        end.dump(&mut self.output)?;

        Ok(())
    }
}

/// Encode one property column. Values are already padded and filtered to
/// match `prop_type`; anything that still doesn't fit is written as the
/// type's zero value.
fn write_values<W: Write>(
    chunk: &mut W,
    prop_type: Type,
    values: &[Cow<'_, Variant>],
    mut referent_for: impl FnMut(&Ref) -> i32,
    mut shared_string_id_for: impl FnMut(&SharedString) -> u32,
) -> io::Result<()> {
    match prop_type {
        Type::String => {
            for value in values {
                match value.as_ref() {
                    Variant::String(string) => chunk.write_string(string)?,
                    Variant::Content(content) => chunk.write_string(content.as_ref())?,
                    Variant::BinaryString(buffer) => chunk.write_binary_string(buffer.as_ref())?,
                    _ => chunk.write_string("")?,
                }
            }
        }
        Type::Bool => {
            for value in values {
                match value.as_ref() {
                    Variant::Bool(bool_value) => chunk.write_bool(*bool_value)?,
                    _ => chunk.write_bool(false)?,
                }
            }
        }
        Type::Int32 => {
            let buf: Vec<i32> = values
                .iter()
                .map(|value| match value.as_ref() {
                    Variant::Int32(int_value) => *int_value,
                    _ => 0,
                })
                .collect();

            chunk.write_interleaved_i32_array(buf.into_iter())?;
        }
        Type::Float32 => {
            let buf: Vec<f32> = values
                .iter()
                .map(|value| match value.as_ref() {
                    Variant::Float32(float_value) => *float_value,
                    _ => 0.0,
                })
                .collect();

            chunk.write_interleaved_f32_array(buf.into_iter())?;
        }
        Type::Float64 => {
            for value in values {
                match value.as_ref() {
                    Variant::Float64(float_value) => chunk.write_le_f64(*float_value)?,
                    _ => chunk.write_le_f64(0.0)?,
                }
            }
        }
        Type::UDim => {
            let mut scales = Vec::with_capacity(values.len());
            let mut offsets = Vec::with_capacity(values.len());

            for value in values {
                match value.as_ref() {
                    Variant::UDim(udim) => {
                        scales.push(udim.scale);
                        offsets.push(udim.offset);
                    }
                    _ => {
                        scales.push(0.0);
                        offsets.push(0);
                    }
                }
            }

            chunk.write_interleaved_f32_array(scales.into_iter())?;
            chunk.write_interleaved_i32_array(offsets.into_iter())?;
        }
        Type::UDim2 => {
            let mut scales_x = Vec::with_capacity(values.len());
            let mut scales_y = Vec::with_capacity(values.len());
            let mut offsets_x = Vec::with_capacity(values.len());
            let mut offsets_y = Vec::with_capacity(values.len());

            for value in values {
                match value.as_ref() {
                    Variant::UDim2(udim2) => {
                        scales_x.push(udim2.x.scale);
                        scales_y.push(udim2.y.scale);
                        offsets_x.push(udim2.x.offset);
                        offsets_y.push(udim2.y.offset);
                    }
                    _ => {
                        scales_x.push(0.0);
                        scales_y.push(0.0);
                        offsets_x.push(0);
                        offsets_y.push(0);
                    }
                }
            }

            chunk.write_interleaved_f32_array(scales_x.into_iter())?;
            chunk.write_interleaved_f32_array(scales_y.into_iter())?;
            chunk.write_interleaved_i32_array(offsets_x.into_iter())?;
            chunk.write_interleaved_i32_array(offsets_y.into_iter())?;
        }
        Type::Ray => {
            for value in values {
                let ray = match value.as_ref() {
                    Variant::Ray(ray) => *ray,
                    _ => rbxl_types::Ray::new(
                        rbxl_types::Vector3::new(0.0, 0.0, 0.0),
                        rbxl_types::Vector3::new(0.0, 0.0, 0.0),
                    ),
                };

                chunk.write_le_f32(ray.origin.x)?;
                chunk.write_le_f32(ray.origin.y)?;
                chunk.write_le_f32(ray.origin.z)?;
                chunk.write_le_f32(ray.direction.x)?;
                chunk.write_le_f32(ray.direction.y)?;
                chunk.write_le_f32(ray.direction.z)?;
            }
        }
        Type::Faces => {
            for value in values {
                match value.as_ref() {
                    Variant::Faces(faces) => chunk.write_u8(faces.bits())?,
                    _ => chunk.write_u8(0)?,
                }
            }
        }
        Type::Axes => {
            for value in values {
                match value.as_ref() {
                    Variant::Axes(axes) => chunk.write_u8(axes.bits())?,
                    _ => chunk.write_u8(0)?,
                }
            }
        }
        Type::BrickColor => {
            let buf: Vec<u32> = values
                .iter()
                .map(|value| match value.as_ref() {
                    Variant::BrickColor(color) => color.as_number(),
                    _ => 0,
                })
                .collect();

            chunk.write_interleaved_u32_array(&buf)?;
        }
        Type::Color3 => {
            let mut r = Vec::with_capacity(values.len());
            let mut g = Vec::with_capacity(values.len());
            let mut b = Vec::with_capacity(values.len());

            for value in values {
                match value.as_ref() {
                    Variant::Color3(color) => {
                        r.push(color.r);
                        g.push(color.g);
                        b.push(color.b);
                    }
                    _ => {
                        r.push(0.0);
                        g.push(0.0);
                        b.push(0.0);
                    }
                }
            }

            chunk.write_interleaved_f32_array(r.into_iter())?;
            chunk.write_interleaved_f32_array(g.into_iter())?;
            chunk.write_interleaved_f32_array(b.into_iter())?;
        }
        Type::Vector2 => {
            let mut x = Vec::with_capacity(values.len());
            let mut y = Vec::with_capacity(values.len());

            for value in values {
                match value.as_ref() {
                    Variant::Vector2(vector) => {
                        x.push(vector.x);
                        y.push(vector.y);
                    }
                    _ => {
                        x.push(0.0);
                        y.push(0.0);
                    }
                }
            }

            chunk.write_interleaved_f32_array(x.into_iter())?;
            chunk.write_interleaved_f32_array(y.into_iter())?;
        }
        Type::Vector3 => {
            let mut x = Vec::with_capacity(values.len());
            let mut y = Vec::with_capacity(values.len());
            let mut z = Vec::with_capacity(values.len());

            for value in values {
                match value.as_ref() {
                    Variant::Vector3(vector) => {
                        x.push(vector.x);
                        y.push(vector.y);
                        z.push(vector.z);
                    }
                    _ => {
                        x.push(0.0);
                        y.push(0.0);
                        z.push(0.0);
                    }
                }
            }

            chunk.write_interleaved_f32_array(x.into_iter())?;
            chunk.write_interleaved_f32_array(y.into_iter())?;
            chunk.write_interleaved_f32_array(z.into_iter())?;
        }
        Type::Vector2int16 => {
            for value in values {
                let vector = match value.as_ref() {
                    Variant::Vector2int16(vector) => *vector,
                    _ => rbxl_types::Vector2int16::new(0, 0),
                };

                chunk.write_le_i16(vector.x)?;
                chunk.write_le_i16(vector.y)?;
            }
        }
        Type::Vector3int16 => {
            for value in values {
                let vector = match value.as_ref() {
                    Variant::Vector3int16(vector) => *vector,
                    _ => rbxl_types::Vector3int16::new(0, 0, 0),
                };

                chunk.write_le_i16(vector.x)?;
                chunk.write_le_i16(vector.y)?;
                chunk.write_le_i16(vector.z)?;
            }
        }
        Type::CFrame | Type::CFrameQuat => {
            let mut positions = Vec::with_capacity(values.len());

            for value in values {
                let cframe = match value.as_ref() {
                    Variant::CFrame(cframe) => *cframe,
                    _ => rbxl_types::CFrame::new(
                        rbxl_types::Vector3::new(0.0, 0.0, 0.0),
                        rbxl_types::Matrix3::identity(),
                    ),
                };

                positions.push(cframe.position);

                // Axis-aligned rotations shrink to one id byte; everything
                // else is id 0 followed by the full matrix.
                match cframe::id_from_rotation(&cframe.orientation) {
                    Some(id) => chunk.write_u8(id)?,
                    None => {
                        chunk.write_u8(0)?;

                        let matrix = cframe.orientation;
                        chunk.write_le_f32(matrix.x.x)?;
                        chunk.write_le_f32(matrix.x.y)?;
                        chunk.write_le_f32(matrix.x.z)?;
                        chunk.write_le_f32(matrix.y.x)?;
                        chunk.write_le_f32(matrix.y.y)?;
                        chunk.write_le_f32(matrix.y.z)?;
                        chunk.write_le_f32(matrix.z.x)?;
                        chunk.write_le_f32(matrix.z.y)?;
                        chunk.write_le_f32(matrix.z.z)?;
                    }
                }
            }

            chunk.write_interleaved_f32_array(positions.iter().map(|position| position.x))?;
            chunk.write_interleaved_f32_array(positions.iter().map(|position| position.y))?;
            chunk.write_interleaved_f32_array(positions.iter().map(|position| position.z))?;
        }
        Type::Enum => {
            let buf: Vec<u32> = values
                .iter()
                .map(|value| match value.as_ref() {
                    Variant::EnumValue(enum_value) => enum_value.to_u32(),
                    _ => 0,
                })
                .collect();

            chunk.write_interleaved_u32_array(&buf)?;
        }
        Type::Ref => {
            let buf: Vec<i32> = values
                .iter()
                .map(|value| match value.as_ref() {
                    // Pointers to instances outside the forest become -1,
                    // the same as null.
                    Variant::Ref(target) => referent_for(target),
                    _ => -1,
                })
                .collect();

            chunk.write_referents(buf.into_iter())?;
        }
        Type::NumberSequence => {
            for value in values {
                match value.as_ref() {
                    Variant::NumberSequence(sequence) => {
                        chunk.write_le_u32(sequence.keypoints.len() as u32)?;

                        for keypoint in &sequence.keypoints {
                            chunk.write_le_f32(keypoint.time)?;
                            chunk.write_le_f32(keypoint.value)?;
                            chunk.write_le_f32(keypoint.envelope)?;
                        }
                    }
                    _ => chunk.write_le_u32(0)?,
                }
            }
        }
        Type::ColorSequence => {
            for value in values {
                match value.as_ref() {
                    Variant::ColorSequence(sequence) => {
                        chunk.write_le_u32(sequence.keypoints.len() as u32)?;

                        for keypoint in &sequence.keypoints {
                            chunk.write_le_f32(keypoint.time)?;
                            chunk.write_le_f32(keypoint.color.r)?;
                            chunk.write_le_f32(keypoint.color.g)?;
                            chunk.write_le_f32(keypoint.color.b)?;

                            // The envelope is serialized but always zero.
                            chunk.write_le_f32(0.0)?;
                        }
                    }
                    _ => chunk.write_le_u32(0)?,
                }
            }
        }
        Type::NumberRange => {
            for value in values {
                let range = match value.as_ref() {
                    Variant::NumberRange(range) => *range,
                    _ => rbxl_types::NumberRange::new(0.0, 0.0),
                };

                chunk.write_le_f32(range.min)?;
                chunk.write_le_f32(range.max)?;
            }
        }
        Type::Rect => {
            let mut min_x = Vec::with_capacity(values.len());
            let mut min_y = Vec::with_capacity(values.len());
            let mut max_x = Vec::with_capacity(values.len());
            let mut max_y = Vec::with_capacity(values.len());

            for value in values {
                match value.as_ref() {
                    Variant::Rect(rect) => {
                        min_x.push(rect.min.x);
                        min_y.push(rect.min.y);
                        max_x.push(rect.max.x);
                        max_y.push(rect.max.y);
                    }
                    _ => {
                        min_x.push(0.0);
                        min_y.push(0.0);
                        max_x.push(0.0);
                        max_y.push(0.0);
                    }
                }
            }

            chunk.write_interleaved_f32_array(min_x.into_iter())?;
            chunk.write_interleaved_f32_array(min_y.into_iter())?;
            chunk.write_interleaved_f32_array(max_x.into_iter())?;
            chunk.write_interleaved_f32_array(max_y.into_iter())?;
        }
        Type::PhysicalProperties => {
            for value in values {
                match value.as_ref() {
                    Variant::PhysicalProperties(rbxl_types::PhysicalProperties::Custom(
                        custom,
                    )) => {
                        chunk.write_bool(true)?;
                        chunk.write_le_f32(custom.density)?;
                        chunk.write_le_f32(custom.friction)?;
                        chunk.write_le_f32(custom.elasticity)?;
                        chunk.write_le_f32(custom.friction_weight)?;
                        chunk.write_le_f32(custom.elasticity_weight)?;
                    }
                    _ => chunk.write_bool(false)?,
                }
            }
        }
        Type::Color3uint8 => {
            let mut r = Vec::with_capacity(values.len());
            let mut g = Vec::with_capacity(values.len());
            let mut b = Vec::with_capacity(values.len());

            for value in values {
                match value.as_ref() {
                    Variant::Color3uint8(color) => {
                        r.push(color.r);
                        g.push(color.g);
                        b.push(color.b);
                    }
                    _ => {
                        r.push(0);
                        g.push(0);
                        b.push(0);
                    }
                }
            }

            chunk.write_all(&r)?;
            chunk.write_all(&g)?;
            chunk.write_all(&b)?;
        }
        Type::Int64 => {
            let buf: Vec<i64> = values
                .iter()
                .map(|value| match value.as_ref() {
                    Variant::Int64(int_value) => *int_value,
                    _ => 0,
                })
                .collect();

            chunk.write_interleaved_i64_array(buf.into_iter())?;
        }
        Type::SharedString => {
            let buf: Vec<u32> = values
                .iter()
                .map(|value| match value.as_ref() {
                    Variant::SharedString(shared) => shared_string_id_for(shared),
                    _ => shared_string_id_for(&SharedString::new(Vec::new())),
                })
                .collect();

            chunk.write_interleaved_u32_array(&buf)?;
        }
    }

    Ok(())
}
