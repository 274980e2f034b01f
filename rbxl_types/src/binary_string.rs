use std::fmt;

/// A buffer of arbitrary bytes stored in a property, like `Terrain`'s
/// voxel data. Unlike `String`, the contents are not expected to be UTF-8.
///
/// When serialized with Serde in a human-readable format, the contents are
/// represented as base64.
#[derive(Clone, Default, PartialEq, Eq, Hash)]
pub struct BinaryString {
    buffer: Vec<u8>,
}

impl BinaryString {
    pub fn new() -> Self {
        BinaryString { buffer: Vec::new() }
    }

    pub fn len(&self) -> usize {
        self.buffer.len()
    }

    pub fn is_empty(&self) -> bool {
        self.buffer.is_empty()
    }

    pub fn into_vec(self) -> Vec<u8> {
        self.buffer
    }
}

impl From<Vec<u8>> for BinaryString {
    fn from(buffer: Vec<u8>) -> Self {
        BinaryString { buffer }
    }
}

impl From<&[u8]> for BinaryString {
    fn from(buffer: &[u8]) -> Self {
        BinaryString {
            buffer: buffer.to_vec(),
        }
    }
}

impl AsRef<[u8]> for BinaryString {
    fn as_ref(&self) -> &[u8] {
        &self.buffer
    }
}

impl fmt::Debug for BinaryString {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(formatter, "BinaryString({} bytes)", self.buffer.len())
    }
}

#[cfg(feature = "serde")]
mod serde_impl {
    use super::*;

    use serde::{Deserialize, Deserializer, Serialize, Serializer};

    impl Serialize for BinaryString {
        fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
            if serializer.is_human_readable() {
                serializer.collect_str(&base64::display::Base64Display::with_config(
                    &self.buffer,
                    base64::STANDARD,
                ))
            } else {
                serializer.serialize_bytes(&self.buffer)
            }
        }
    }

    impl<'de> Deserialize<'de> for BinaryString {
        fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
            if deserializer.is_human_readable() {
                let encoded = String::deserialize(deserializer)?;
                let buffer = base64::decode(&encoded).map_err(serde::de::Error::custom)?;
                Ok(BinaryString { buffer })
            } else {
                let buffer = Vec::<u8>::deserialize(deserializer)?;
                Ok(BinaryString { buffer })
            }
        }
    }
}
