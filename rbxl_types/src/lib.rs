//! Types used to represent the values that can be stored in the properties
//! of Roblox instances, independent of any particular file format.
//!
//! The types here are plain data. Encoding rules, like which fields are
//! delta-encoded or how rotations are abbreviated, belong to the format
//! crates that consume them.

mod basic_types;
mod binary_string;
mod content;
mod referent;
mod shared_string;
mod variant;

pub use crate::{
    basic_types::{
        Axes, BrickColor, CFrame, Color3, Color3uint8, ColorSequence, ColorSequenceKeypoint,
        CustomPhysicalProperties, EnumValue, Faces, Matrix3, NumberRange, NumberSequence,
        NumberSequenceKeypoint, PhysicalProperties, Ray, Rect, UDim, UDim2, Vector2, Vector2int16,
        Vector3, Vector3int16,
    },
    binary_string::BinaryString,
    content::Content,
    referent::Ref,
    shared_string::SharedString,
    variant::{Variant, VariantType},
};
