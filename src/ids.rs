//! Stable identifiers for generated objects.
//!
//! Visual Studio wants GUIDs, Xcode wants 24-digit hexadecimal object ids.
//! Both are derived from SHA-256 digests of stable inputs so repeated runs
//! over the same graph produce the same identifiers.

use std::collections::HashMap;
use std::fmt;

use camino::Utf8Path;
use itertools::Itertools;
use sha2::{Digest, Sha256};

use crate::error::{GenError, ValidationError};
use crate::model::QualifiedTarget;

const GUID_GROUPS: [usize; 5] = [8, 4, 4, 4, 12];
const OBJECT_ID_LEN: usize = 24;

/// A Visual Studio GUID, stored without braces.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Guid(String);

impl Guid {
    /// Derive a GUID from `seed`.
    ///
    /// ```
    /// use projgen::ids::Guid;
    ///
    /// let guid = Guid::derive("chrome/chrome.vcproj");
    /// assert_eq!(guid, Guid::derive("chrome/chrome.vcproj"));
    /// assert_eq!(guid.braced().len(), 38);
    /// ```
    #[must_use]
    pub fn derive(seed: &str) -> Self {
        let mut hasher = Sha256::new();
        update_with_len(&mut hasher, b"guid");
        update_with_len(&mut hasher, seed.as_bytes());
        let hex = format!("{:X}", hasher.finalize());
        let mut chars = hex.chars();
        let guid = GUID_GROUPS
            .iter()
            .map(|len| chars.by_ref().take(*len).collect::<String>())
            .join("-");
        Self(guid)
    }

    /// Accept an explicitly declared GUID.
    ///
    /// # Errors
    ///
    /// Returns [`ValidationError::InvalidGuid`] unless `raw` consists only of
    /// uppercase hexadecimal digits and dashes.
    pub fn parse_explicit(target: &QualifiedTarget, raw: &str) -> Result<Self, ValidationError> {
        if is_valid_guid(raw) {
            Ok(Self(raw.to_owned()))
        } else {
            Err(ValidationError::InvalidGuid {
                target: target.clone(),
                guid: raw.to_owned(),
            })
        }
    }

    /// `{XXXXXXXX-...}` form used in project and solution files.
    #[must_use]
    pub fn braced(&self) -> String {
        format!("{{{}}}", self.0)
    }
}

impl fmt::Display for Guid {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{{{}}}", self.0)
    }
}

/// Whether `raw` matches `^[A-F0-9-]+$`.
#[must_use]
pub fn is_valid_guid(raw: &str) -> bool {
    !raw.is_empty() && raw.chars().all(|c| matches!(c, 'A'..='F' | '0'..='9' | '-'))
}

/// Derive a 24-digit Xcode object id from a chain of hashables.
///
/// The chain lists the hashables of the object's ancestors followed by its
/// own, so identical objects in different containers get different ids.
#[must_use]
pub fn object_id<S: AsRef<str>>(hashables: &[S]) -> String {
    let mut hasher = Sha256::new();
    for item in hashables {
        update_with_len(&mut hasher, item.as_ref().as_bytes());
    }
    format!("{:X}", hasher.finalize())
        .chars()
        .take(OBJECT_ID_LEN)
        .collect()
}

/// Check that no identifier in one generated file is used twice.
///
/// # Errors
///
/// Returns [`GenError::IdCollision`] naming both owners of the first
/// duplicate found.
pub fn ensure_unique<I>(file: &Utf8Path, ids: I) -> Result<(), GenError>
where
    I: IntoIterator<Item = (String, String)>,
{
    let mut owners: HashMap<String, String> = HashMap::new();
    for (id, owner) in ids {
        if let Some(first) = owners.get(&id) {
            return Err(GenError::IdCollision {
                file: file.to_owned(),
                id,
                first: first.clone(),
                second: owner,
            });
        }
        owners.insert(id, owner);
    }
    Ok(())
}

fn update_with_len(hasher: &mut Sha256, bytes: &[u8]) {
    let len = bytes.len();
    hasher.update(format!("{len}:").as_bytes());
    hasher.update(bytes);
}
