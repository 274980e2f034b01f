#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// A URL pointing at some content hosted outside the file, like
/// `rbxassetid://12345`. Stored as a string on the wire.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(transparent))]
pub struct Content {
    url: String,
}

impl Content {
    pub fn new() -> Self {
        Content { url: String::new() }
    }

    pub fn into_string(self) -> String {
        self.url
    }
}

impl From<String> for Content {
    fn from(url: String) -> Self {
        Content { url }
    }
}

impl From<&str> for Content {
    fn from(url: &str) -> Self {
        Content {
            url: url.to_owned(),
        }
    }
}

impl AsRef<str> for Content {
    fn as_ref(&self) -> &str {
        &self.url
    }
}
