use std::convert::TryFrom;

use rbxl_types::{
    Axes, BrickColor, CFrame, Color3, Color3uint8, ColorSequence, EnumValue, Faces, Matrix3,
    NumberRange, NumberSequence, PhysicalProperties, Ray, Rect, UDim, UDim2, Variant, VariantType,
    Vector2, Vector2int16, Vector3, Vector3int16,
};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// An error that can occur when converting a byte into a [`Type`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error("{0:#04x} is not a known binary type tag")]
pub struct UnknownTypeByte(pub u8);

/// The type tag identifying the layout of values in a `PROP` chunk.
///
/// These values are bit-exact with the file format and must not change.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Type {
    String = 0x01,
    Bool = 0x02,
    Int32 = 0x03,
    Float32 = 0x04,
    Float64 = 0x05,
    UDim = 0x06,
    UDim2 = 0x07,
    Ray = 0x08,
    Faces = 0x09,
    Axes = 0x0A,
    BrickColor = 0x0B,
    Color3 = 0x0C,
    Vector2 = 0x0D,
    Vector3 = 0x0E,
    Vector2int16 = 0x0F,
    CFrame = 0x10,
    CFrameQuat = 0x11,
    Enum = 0x12,
    Ref = 0x13,
    Vector3int16 = 0x14,
    NumberSequence = 0x15,
    ColorSequence = 0x16,
    NumberRange = 0x17,
    Rect = 0x18,
    PhysicalProperties = 0x19,
    Color3uint8 = 0x1A,
    Int64 = 0x1B,
    SharedString = 0x1C,
}

impl Type {
    /// The binary type used to serialize the given variant type, if there
    /// is one.
    ///
    /// The mapping is not 1:1: every string-like variant collapses into
    /// `Type::String`, which is why decoded files can never distinguish
    /// them again.
    pub fn from_variant_type(ty: VariantType) -> Option<Type> {
        Some(match ty {
            VariantType::String | VariantType::BinaryString | VariantType::Content => Type::String,
            VariantType::Bool => Type::Bool,
            VariantType::Int32 => Type::Int32,
            VariantType::Float32 => Type::Float32,
            VariantType::Float64 => Type::Float64,
            VariantType::UDim => Type::UDim,
            VariantType::UDim2 => Type::UDim2,
            VariantType::Ray => Type::Ray,
            VariantType::Faces => Type::Faces,
            VariantType::Axes => Type::Axes,
            VariantType::BrickColor => Type::BrickColor,
            VariantType::Color3 => Type::Color3,
            VariantType::Vector2 => Type::Vector2,
            VariantType::Vector3 => Type::Vector3,
            VariantType::Vector2int16 => Type::Vector2int16,
            VariantType::CFrame => Type::CFrame,
            VariantType::EnumValue => Type::Enum,
            VariantType::Ref => Type::Ref,
            VariantType::Vector3int16 => Type::Vector3int16,
            VariantType::NumberSequence => Type::NumberSequence,
            VariantType::ColorSequence => Type::ColorSequence,
            VariantType::NumberRange => Type::NumberRange,
            VariantType::Rect => Type::Rect,
            VariantType::PhysicalProperties => Type::PhysicalProperties,
            VariantType::Color3uint8 => Type::Color3uint8,
            VariantType::Int64 => Type::Int64,
            VariantType::SharedString => Type::SharedString,
        })
    }

    /// The value written into a property column for instances that don't
    /// carry the property.
    pub fn zero_value(self) -> Variant {
        match self {
            Type::String => Variant::String(String::new()),
            Type::Bool => Variant::Bool(false),
            Type::Int32 => Variant::Int32(0),
            Type::Float32 => Variant::Float32(0.0),
            Type::Float64 => Variant::Float64(0.0),
            Type::UDim => Variant::UDim(UDim::new(0.0, 0)),
            Type::UDim2 => Variant::UDim2(UDim2::new(UDim::new(0.0, 0), UDim::new(0.0, 0))),
            Type::Ray => Variant::Ray(Ray::new(
                Vector3::new(0.0, 0.0, 0.0),
                Vector3::new(0.0, 0.0, 0.0),
            )),
            Type::Faces => Variant::Faces(Faces::empty()),
            Type::Axes => Variant::Axes(Axes::empty()),
            Type::BrickColor => Variant::BrickColor(BrickColor::from_number(0)),
            Type::Color3 => Variant::Color3(Color3::new(0.0, 0.0, 0.0)),
            Type::Vector2 => Variant::Vector2(Vector2::new(0.0, 0.0)),
            Type::Vector3 => Variant::Vector3(Vector3::new(0.0, 0.0, 0.0)),
            Type::Vector2int16 => Variant::Vector2int16(Vector2int16::new(0, 0)),
            // A zero rotation matrix is degenerate, so absent coordinate
            // frames pad with the identity rotation at the origin.
            Type::CFrame | Type::CFrameQuat => Variant::CFrame(CFrame::new(
                Vector3::new(0.0, 0.0, 0.0),
                Matrix3::identity(),
            )),
            Type::Enum => Variant::EnumValue(EnumValue::from_u32(0)),
            Type::Ref => Variant::Ref(rbxl_types::Ref::none()),
            Type::Vector3int16 => Variant::Vector3int16(Vector3int16::new(0, 0, 0)),
            Type::NumberSequence => Variant::NumberSequence(NumberSequence {
                keypoints: Vec::new(),
            }),
            Type::ColorSequence => Variant::ColorSequence(ColorSequence {
                keypoints: Vec::new(),
            }),
            Type::NumberRange => Variant::NumberRange(NumberRange::new(0.0, 0.0)),
            Type::Rect => Variant::Rect(Rect::new(Vector2::new(0.0, 0.0), Vector2::new(0.0, 0.0))),
            Type::PhysicalProperties => Variant::PhysicalProperties(PhysicalProperties::Default),
            Type::Color3uint8 => Variant::Color3uint8(Color3uint8::new(0, 0, 0)),
            Type::Int64 => Variant::Int64(0),
            Type::SharedString => {
                Variant::SharedString(rbxl_types::SharedString::new(Vec::new()))
            }
        }
    }
}

impl TryFrom<u8> for Type {
    type Error = UnknownTypeByte;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        Ok(match value {
            0x01 => Type::String,
            0x02 => Type::Bool,
            0x03 => Type::Int32,
            0x04 => Type::Float32,
            0x05 => Type::Float64,
            0x06 => Type::UDim,
            0x07 => Type::UDim2,
            0x08 => Type::Ray,
            0x09 => Type::Faces,
            0x0A => Type::Axes,
            0x0B => Type::BrickColor,
            0x0C => Type::Color3,
            0x0D => Type::Vector2,
            0x0E => Type::Vector3,
            0x0F => Type::Vector2int16,
            0x10 => Type::CFrame,
            0x11 => Type::CFrameQuat,
            0x12 => Type::Enum,
            0x13 => Type::Ref,
            0x14 => Type::Vector3int16,
            0x15 => Type::NumberSequence,
            0x16 => Type::ColorSequence,
            0x17 => Type::NumberRange,
            0x18 => Type::Rect,
            0x19 => Type::PhysicalProperties,
            0x1A => Type::Color3uint8,
            0x1B => Type::Int64,
            0x1C => Type::SharedString,
            _ => return Err(UnknownTypeByte(value)),
        })
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn tags_round_trip() {
        for byte in 0x01..=0x1C {
            let ty = Type::try_from(byte).unwrap();
            assert_eq!(ty as u8, byte);
        }

        assert_eq!(Type::try_from(0x00), Err(UnknownTypeByte(0x00)));
        assert_eq!(Type::try_from(0x1D), Err(UnknownTypeByte(0x1D)));
    }

    #[test]
    fn string_like_types_collapse() {
        assert_eq!(
            Type::from_variant_type(VariantType::String),
            Some(Type::String)
        );
        assert_eq!(
            Type::from_variant_type(VariantType::BinaryString),
            Some(Type::String)
        );
        assert_eq!(
            Type::from_variant_type(VariantType::Content),
            Some(Type::String)
        );
    }

    #[test]
    fn zero_values_match_their_type() {
        for byte in 0x01..=0x1C {
            let ty = Type::try_from(byte).unwrap();
            let zero = ty.zero_value();

            let round_tripped = Type::from_variant_type(zero.ty()).unwrap();
            match ty {
                // The quaternion form decodes into a plain coordinate frame.
                Type::CFrameQuat => assert_eq!(round_tripped, Type::CFrame),
                _ => assert_eq!(round_tripped, ty),
            }
        }
    }
}
