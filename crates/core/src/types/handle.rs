//! Product handle type.

use core::fmt;

use serde::{Deserialize, Serialize};

/// Errors that can occur when parsing a [`ProductHandle`].
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum HandleError {
    /// The input string is empty.
    #[error("handle cannot be empty")]
    Empty,
    /// The input string is too long.
    #[error("handle must be at most {max} characters")]
    TooLong {
        /// Maximum allowed length.
        max: usize,
    },
    /// The input contains a character Shopify never emits in a handle.
    #[error("handle contains invalid character {0:?}")]
    InvalidCharacter(char),
}

/// A product handle, the URL slug used by `/products/<handle>`.
///
/// ## Constraints
///
/// - Length: 1-255 characters
/// - Lowercase letters, digits, `-` and `_` only (unicode letters are
///   allowed because Shopify keeps them in localized handles)
///
/// ## Examples
///
/// ```
/// use theme_widgets_core::ProductHandle;
///
/// assert!(ProductHandle::parse("classic-tee").is_ok());
/// assert!(ProductHandle::parse("../admin").is_err());
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ProductHandle(String);

impl ProductHandle {
    /// Maximum length of a handle.
    pub const MAX_LENGTH: usize = 255;

    /// Parse a `ProductHandle` from a string.
    ///
    /// # Errors
    ///
    /// Returns an error if the input is empty, too long, or contains
    /// characters outside the handle alphabet.
    pub fn parse(s: &str) -> Result<Self, HandleError> {
        if s.is_empty() {
            return Err(HandleError::Empty);
        }

        if s.chars().count() > Self::MAX_LENGTH {
            return Err(HandleError::TooLong {
                max: Self::MAX_LENGTH,
            });
        }

        if let Some(bad) = s
            .chars()
            .find(|c| !((c.is_alphanumeric() && !c.is_uppercase()) || *c == '-' || *c == '_'))
        {
            return Err(HandleError::InvalidCharacter(bad));
        }

        Ok(Self(s.to_owned()))
    }

    /// Returns the handle as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Consumes the handle and returns its inner string.
    #[must_use]
    pub fn into_inner(self) -> String {
        self.0
    }
}

impl fmt::Display for ProductHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl std::str::FromStr for ProductHandle {
    type Err = HandleError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl AsRef<str> for ProductHandle {
    fn as_ref(&self) -> &str {
        &self.0
    }
}
