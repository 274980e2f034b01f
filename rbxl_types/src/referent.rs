use std::fmt;
use std::num::NonZeroU128;

use rand::Rng;

/// An opaque identity for an instance, unique within a process.
///
/// A `Ref` can also be null, which is used to represent "no instance" in
/// places like a root instance's parent or a dangling object reference.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Ref(Option<NonZeroU128>);

impl Ref {
    /// Generate a new random, non-null `Ref`.
    pub fn new() -> Self {
        let mut rng = rand::thread_rng();

        loop {
            if let Some(value) = NonZeroU128::new(rng.gen()) {
                return Ref(Some(value));
            }
        }
    }

    /// The null `Ref`.
    pub fn none() -> Self {
        Ref(None)
    }

    pub fn is_none(&self) -> bool {
        self.0.is_none()
    }

    pub fn is_some(&self) -> bool {
        self.0.is_some()
    }
}

impl Default for Ref {
    fn default() -> Self {
        Ref::none()
    }
}

impl fmt::Debug for Ref {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(formatter, "Ref({})", self)
    }
}

impl fmt::Display for Ref {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.0 {
            Some(value) => write!(formatter, "{:032x}", value),
            None => formatter.write_str("null"),
        }
    }
}

#[cfg(feature = "serde")]
mod serde_impl {
    use super::*;

    use serde::{Deserialize, Deserializer, Serialize, Serializer};

    impl Serialize for Ref {
        fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
            serializer.collect_str(self)
        }
    }

    impl<'de> Deserialize<'de> for Ref {
        fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
            let encoded = String::deserialize(deserializer)?;

            if encoded == "null" {
                return Ok(Ref::none());
            }

            let value = u128::from_str_radix(&encoded, 16).map_err(serde::de::Error::custom)?;
            Ok(Ref(NonZeroU128::new(value)))
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn null_ref() {
        assert!(Ref::none().is_none());
        assert_eq!(Ref::none().to_string(), "null");
        assert_eq!(Ref::none(), Ref::default());
    }

    #[test]
    fn fresh_refs_are_distinct() {
        assert_ne!(Ref::new(), Ref::new());
        assert!(Ref::new().is_some());
    }
}
