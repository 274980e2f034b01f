//! The small, fixed-shape value types. These are kept as plain data with
//! public fields; they exist so that every file format agrees on one
//! in-memory representation.

use bitflags::bitflags;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// A two-dimensional vector of 32-bit floats.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct Vector2 {
    pub x: f32,
    pub y: f32,
}

impl Vector2 {
    pub fn new(x: f32, y: f32) -> Self {
        Vector2 { x, y }
    }
}

/// A three-dimensional vector of 32-bit floats.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct Vector3 {
    pub x: f32,
    pub y: f32,
    pub z: f32,
}

impl Vector3 {
    pub fn new(x: f32, y: f32, z: f32) -> Self {
        Vector3 { x, y, z }
    }
}

/// A two-dimensional vector of signed 16-bit integers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct Vector2int16 {
    pub x: i16,
    pub y: i16,
}

impl Vector2int16 {
    pub fn new(x: i16, y: i16) -> Self {
        Vector2int16 { x, y }
    }
}

/// A three-dimensional vector of signed 16-bit integers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct Vector3int16 {
    pub x: i16,
    pub y: i16,
    pub z: i16,
}

impl Vector3int16 {
    pub fn new(x: i16, y: i16, z: i16) -> Self {
        Vector3int16 { x, y, z }
    }
}

/// A 3×3 rotation matrix, stored as three row vectors.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct Matrix3 {
    pub x: Vector3,
    pub y: Vector3,
    pub z: Vector3,
}

impl Matrix3 {
    pub fn new(x: Vector3, y: Vector3, z: Vector3) -> Self {
        Matrix3 { x, y, z }
    }

    /// The identity rotation.
    pub fn identity() -> Self {
        Matrix3 {
            x: Vector3::new(1.0, 0.0, 0.0),
            y: Vector3::new(0.0, 1.0, 0.0),
            z: Vector3::new(0.0, 0.0, 1.0),
        }
    }
}

/// A coordinate frame: a position paired with a rotation.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct CFrame {
    pub position: Vector3,
    pub orientation: Matrix3,
}

impl CFrame {
    pub fn new(position: Vector3, orientation: Matrix3) -> Self {
        CFrame {
            position,
            orientation,
        }
    }
}

/// An RGB color with 32-bit float components, each nominally in `0.0..=1.0`.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct Color3 {
    pub r: f32,
    pub g: f32,
    pub b: f32,
}

impl Color3 {
    pub fn new(r: f32, g: f32, b: f32) -> Self {
        Color3 { r, g, b }
    }
}

/// An RGB color with 8-bit integer components.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct Color3uint8 {
    pub r: u8,
    pub g: u8,
    pub b: u8,
}

impl Color3uint8 {
    pub fn new(r: u8, g: u8, b: u8) -> Self {
        Color3uint8 { r, g, b }
    }
}

/// A one-dimensional offset measured as a fraction of a container plus a
/// fixed number of pixels.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct UDim {
    pub scale: f32,
    pub offset: i32,
}

impl UDim {
    pub fn new(scale: f32, offset: i32) -> Self {
        UDim { scale, offset }
    }
}

/// A two-dimensional [`UDim`].
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct UDim2 {
    pub x: UDim,
    pub y: UDim,
}

impl UDim2 {
    pub fn new(x: UDim, y: UDim) -> Self {
        UDim2 { x, y }
    }
}

/// A ray: an origin and a direction. The direction is not required to be
/// normalized.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct Ray {
    pub origin: Vector3,
    pub direction: Vector3,
}

impl Ray {
    pub fn new(origin: Vector3, direction: Vector3) -> Self {
        Ray { origin, direction }
    }
}

/// An axis-aligned rectangle described by its minimum and maximum corners.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct Rect {
    pub min: Vector2,
    pub max: Vector2,
}

impl Rect {
    pub fn new(min: Vector2, max: Vector2) -> Self {
        Rect { min, max }
    }
}

/// A range of 32-bit floats.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct NumberRange {
    pub min: f32,
    pub max: f32,
}

impl NumberRange {
    pub fn new(min: f32, max: f32) -> Self {
        NumberRange { min, max }
    }
}

/// A keypoint of a [`NumberSequence`].
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct NumberSequenceKeypoint {
    pub time: f32,
    pub value: f32,
    pub envelope: f32,
}

impl NumberSequenceKeypoint {
    pub fn new(time: f32, value: f32, envelope: f32) -> Self {
        NumberSequenceKeypoint {
            time,
            value,
            envelope,
        }
    }
}

/// A piecewise numeric function of time, described by keypoints.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct NumberSequence {
    pub keypoints: Vec<NumberSequenceKeypoint>,
}

/// A keypoint of a [`ColorSequence`].
///
/// Color keypoints carry an envelope on the wire in some formats, but the
/// value is always zero and is not exposed to developers, so it has no field
/// here.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct ColorSequenceKeypoint {
    pub time: f32,
    pub color: Color3,
}

impl ColorSequenceKeypoint {
    pub fn new(time: f32, color: Color3) -> Self {
        ColorSequenceKeypoint { time, color }
    }
}

/// A color gradient over time, described by keypoints.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct ColorSequence {
    pub keypoints: Vec<ColorSequenceKeypoint>,
}

bitflags! {
    /// The set of faces of a part, used by properties like `Handles.Faces`.
    #[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
    pub struct Faces: u8 {
        const RIGHT = 1;
        const TOP = 2;
        const BACK = 4;
        const LEFT = 8;
        const BOTTOM = 16;
        const FRONT = 32;
    }
}

bitflags! {
    /// The set of world axes, used by properties like `ArcHandles.Axes`.
    #[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
    pub struct Axes: u8 {
        const X = 1;
        const Y = 2;
        const Z = 4;
    }
}

/// A color from Roblox's fixed BrickColor palette, identified by number.
///
/// Palette names are intentionally not modeled; no schema is consulted by
/// the codecs, and the number is what appears on the wire.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct BrickColor(u32);

impl BrickColor {
    pub fn from_number(number: u32) -> Self {
        BrickColor(number)
    }

    pub fn as_number(self) -> u32 {
        self.0
    }
}

impl std::fmt::Display for BrickColor {
    fn fmt(&self, formatter: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(formatter, "BrickColor({})", self.0)
    }
}

/// The numeric value of an enum property. The enum's name and item names
/// live in external reflection information, not in files.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct EnumValue(u32);

impl EnumValue {
    pub fn from_u32(value: u32) -> Self {
        EnumValue(value)
    }

    pub fn to_u32(self) -> u32 {
        self.0
    }
}

/// Custom physics parameters for a part.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct CustomPhysicalProperties {
    pub density: f32,
    pub friction: f32,
    pub elasticity: f32,
    pub friction_weight: f32,
    pub elasticity_weight: f32,
}

/// Physics parameters of a part: either the engine defaults derived from
/// the part's material, or explicit custom values.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum PhysicalProperties {
    Default,
    Custom(CustomPhysicalProperties),
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn faces_bits() {
        let faces = Faces::RIGHT | Faces::FRONT;
        assert_eq!(faces.bits(), 0b10_0001);
        assert_eq!(Faces::from_bits(0b10_0001), Some(faces));
        assert_eq!(Faces::from_bits(0b100_0000), None);
    }

    #[test]
    fn axes_bits() {
        assert_eq!(Axes::all().bits(), 0b111);
        assert_eq!(Axes::from_bits_truncate(0b1111), Axes::all());
    }

    #[test]
    fn identity_matrix() {
        let identity = Matrix3::identity();
        assert_eq!(identity.x, Vector3::new(1.0, 0.0, 0.0));
        assert_eq!(identity.y, Vector3::new(0.0, 1.0, 0.0));
        assert_eq!(identity.z, Vector3::new(0.0, 0.0, 1.0));
    }
}
