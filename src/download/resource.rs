//! Resource identifiers.
//!
//! A [`ResourceId`] is the normalized locator of something to fetch. Two
//! requests are deduplicated exactly when their identifiers are equal.
//!
//! # Examples
//!
//! ```rust
//! use ferry::ResourceId;
//! use std::convert::TryFrom;
//!
//! let a = ResourceId::try_from("HTTPS://Example.com:443/images/pia17474_1.jpg#top")?;
//! let b = ResourceId::try_from("https://example.com/images/pia17474_1.jpg")?;
//! assert_eq!(a, b);
//! assert_eq!(a.file_name().as_deref(), Some("pia17474_1.jpg"));
//! # Ok::<(), ferry::Error>(())
//! ```

use crate::error::Error;

use reqwest::Url;
use std::convert::TryFrom;
use std::fmt;
use std::str::FromStr;

/// Normalized locator identifying a resource.
///
/// Normalization is whatever [`Url`] parsing performs (lowercased scheme and
/// host, default port elided, percent-encoding canonicalized) plus removal of
/// the fragment, which never reaches the server.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ResourceId {
    url: Url,
}

impl ResourceId {
    /// Get the normalized URL.
    pub fn url(&self) -> &Url {
        &self.url
    }

    /// Get the normalized locator as a string.
    pub fn as_str(&self) -> &str {
        self.url.as_str()
    }

    /// Get the URL scheme.
    pub fn scheme(&self) -> &str {
        self.url.scheme()
    }

    /// Decoded last path segment, if it is not empty.
    pub fn file_name(&self) -> Option<String> {
        self.url
            .path_segments()?
            .next_back()
            .filter(|segment| !segment.is_empty())
            .map(|segment| {
                form_urlencoded::parse(segment.as_bytes())
                    .map(|(key, val)| [key, val].concat())
                    .collect()
            })
    }

    /// Extension of [`file_name`](Self::file_name), without the dot.
    pub fn extension(&self) -> Option<String> {
        let name = self.file_name()?;
        let (stem, ext) = name.rsplit_once('.')?;
        if stem.is_empty() || ext.is_empty() {
            return None;
        }
        Some(ext.to_string())
    }
}

impl fmt::Display for ResourceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.url.as_str())
    }
}

impl AsRef<str> for ResourceId {
    fn as_ref(&self) -> &str {
        self.as_str()
    }
}

impl TryFrom<&Url> for ResourceId {
    type Error = Error;

    fn try_from(value: &Url) -> Result<Self, Self::Error> {
        if value.cannot_be_a_base() {
            return Err(Error::InvalidUrl(format!(
                "The url \"{}\" does not address a resource",
                value
            )));
        }
        if value.host_str().map_or(true, str::is_empty) {
            return Err(Error::InvalidUrl(format!(
                "The url \"{}\" does not contain a host",
                value
            )));
        }

        let mut url = value.clone();
        url.set_fragment(None);
        Ok(ResourceId { url })
    }
}

impl TryFrom<Url> for ResourceId {
    type Error = Error;

    fn try_from(value: Url) -> Result<Self, Self::Error> {
        ResourceId::try_from(&value)
    }
}

impl TryFrom<&str> for ResourceId {
    type Error = Error;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        Url::parse(value.trim())
            .map_err(|e| {
                Error::InvalidUrl(format!("The url \"{}\" cannot be parsed: {}", value, e))
            })
            .and_then(|u| ResourceId::try_from(&u))
    }
}

impl FromStr for ResourceId {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        ResourceId::try_from(s)
    }
}
