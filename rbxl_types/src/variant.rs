use crate::{
    basic_types::{
        Axes, BrickColor, CFrame, Color3, Color3uint8, ColorSequence, EnumValue, Faces, NumberRange,
        NumberSequence, PhysicalProperties, Ray, Rect, UDim, UDim2, Vector2, Vector2int16, Vector3,
        Vector3int16,
    },
    binary_string::BinaryString,
    content::Content,
    referent::Ref,
    shared_string::SharedString,
};

/// Generates `Variant`, its paired `VariantType`, and the conversions
/// between them. Adding a type to the table below is all that is needed to
/// plumb it through.
macro_rules! make_variant {
    (
        $(
            $variant:ident($inner:ty),
        )*
    ) => {
        /// Any value that can be stored in an instance property, tagged
        /// with its type.
        #[derive(Debug, Clone, PartialEq)]
        #[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
        pub enum Variant {
            $(
                $variant($inner),
            )*
        }

        impl Variant {
            /// The type of this value with no data attached.
            pub fn ty(&self) -> VariantType {
                match self {
                    $(
                        Variant::$variant(_) => VariantType::$variant,
                    )*
                }
            }
        }

        /// The type of a [`Variant`].
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
        #[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
        pub enum VariantType {
            $(
                $variant,
            )*
        }

        $(
            impl From<$inner> for Variant {
                fn from(value: $inner) -> Self {
                    Variant::$variant(value)
                }
            }
        )*
    };
}

make_variant! {
    Axes(Axes),
    BinaryString(BinaryString),
    Bool(bool),
    BrickColor(BrickColor),
    CFrame(CFrame),
    Color3(Color3),
    Color3uint8(Color3uint8),
    ColorSequence(ColorSequence),
    Content(Content),
    EnumValue(EnumValue),
    Faces(Faces),
    Float32(f32),
    Float64(f64),
    Int32(i32),
    Int64(i64),
    NumberRange(NumberRange),
    NumberSequence(NumberSequence),
    PhysicalProperties(PhysicalProperties),
    Ray(Ray),
    Rect(Rect),
    Ref(Ref),
    SharedString(SharedString),
    String(String),
    UDim(UDim),
    UDim2(UDim2),
    Vector2(Vector2),
    Vector2int16(Vector2int16),
    Vector3(Vector3),
    Vector3int16(Vector3int16),
}

impl From<&str> for Variant {
    fn from(value: &str) -> Self {
        Variant::String(value.to_owned())
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn ty_matches_variant() {
        assert_eq!(Variant::Bool(true).ty(), VariantType::Bool);
        assert_eq!(Variant::Int32(5).ty(), VariantType::Int32);
        assert_eq!(
            Variant::from("hello").ty(),
            VariantType::String,
        );
    }

    #[test]
    fn conversions() {
        let value: Variant = Vector3::new(1.0, 2.0, 3.0).into();
        assert_eq!(value, Variant::Vector3(Vector3::new(1.0, 2.0, 3.0)));

        let value: Variant = false.into();
        assert_eq!(value, Variant::Bool(false));
    }
}
