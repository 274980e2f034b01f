use std::fmt;
use std::hash::{Hash, Hasher};
use std::sync::Arc;

/// An immutable buffer of bytes that files deduplicate through a per-file
/// table. Two `SharedString` values with the same contents compare equal and
/// share one hash.
///
/// The hash is the first 16 bytes of the blake3 digest of the contents. It
/// only ever serves deduplication; nothing validates it against hashes found
/// in files.
#[derive(Clone)]
pub struct SharedString {
    hash: [u8; 16],
    data: Arc<Vec<u8>>,
}

impl SharedString {
    pub fn new(data: Vec<u8>) -> Self {
        let digest = blake3::hash(&data);

        let mut hash = [0; 16];
        hash.copy_from_slice(&digest.as_bytes()[..16]);

        SharedString {
            hash,
            data: Arc::new(data),
        }
    }

    pub fn data(&self) -> &[u8] {
        &self.data
    }

    pub fn hash(&self) -> [u8; 16] {
        self.hash
    }

    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }
}

impl PartialEq for SharedString {
    fn eq(&self, other: &Self) -> bool {
        self.hash == other.hash
    }
}

impl Eq for SharedString {}

impl Hash for SharedString {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.hash.hash(state);
    }
}

impl AsRef<[u8]> for SharedString {
    fn as_ref(&self) -> &[u8] {
        &self.data
    }
}

impl fmt::Debug for SharedString {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            formatter,
            "SharedString({} bytes, hash {})",
            self.data.len(),
            self.hash
                .iter()
                .map(|byte| format!("{:02x}", byte))
                .collect::<String>()
        )
    }
}

#[cfg(feature = "serde")]
mod serde_impl {
    use super::*;

    use serde::{Deserialize, Deserializer, Serialize, Serializer};

    impl Serialize for SharedString {
        fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
            if serializer.is_human_readable() {
                serializer.collect_str(&base64::display::Base64Display::with_config(
                    &self.data,
                    base64::STANDARD,
                ))
            } else {
                serializer.serialize_bytes(&self.data)
            }
        }
    }

    impl<'de> Deserialize<'de> for SharedString {
        fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
            let data = if deserializer.is_human_readable() {
                let encoded = String::deserialize(deserializer)?;
                base64::decode(&encoded).map_err(serde::de::Error::custom)?
            } else {
                Vec::<u8>::deserialize(deserializer)?
            };

            Ok(SharedString::new(data))
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn equal_contents_share_a_hash() {
        let first = SharedString::new(b"hello, world".to_vec());
        let second = SharedString::new(b"hello, world".to_vec());

        assert_eq!(first, second);
        assert_eq!(first.hash(), second.hash());
    }

    #[test]
    fn distinct_contents_differ() {
        let first = SharedString::new(b"hello".to_vec());
        let second = SharedString::new(b"world".to_vec());

        assert_ne!(first, second);
        assert_ne!(first.hash(), second.hash());
    }

    #[test]
    fn empty_is_well_formed() {
        let empty = SharedString::new(Vec::new());
        assert!(empty.is_empty());
        assert_eq!(empty.data(), &[] as &[u8]);
    }
}
