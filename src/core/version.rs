//! Four-part `cm` version numbers and the feature thresholds depending on them.

use crate::core::error::PlasticError;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// A `cm` version such as `11.0.16.7709`, ordered field by field.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize)]
pub struct CliVersion {
    pub major: u32,
    pub minor: u32,
    pub patch: u32,
    pub changeset: u32,
}

impl CliVersion {
    pub const fn new(major: u32, minor: u32, patch: u32, changeset: u32) -> Self {
        Self {
            major,
            minor,
            patch,
            changeset,
        }
    }

    pub fn is_unknown(&self) -> bool {
        *self == CliVersion::default()
    }
}

impl FromStr for CliVersion {
    type Err = PlasticError;

    fn from_str(input: &str) -> Result<Self, Self::Err> {
        let fields: Vec<u32> = input
            .trim()
            .split('.')
            .map(|field| field.parse::<u32>())
            .collect::<Result<_, _>>()
            .map_err(|_| PlasticError::invalid_version(input))?;

        match fields.as_slice() {
            [major, minor, patch, changeset] => {
                Ok(CliVersion::new(*major, *minor, *patch, *changeset))
            }
            _ => Err(PlasticError::invalid_version(input)),
        }
    }
}

impl fmt::Display for CliVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}.{}.{}.{}",
            self.major, self.minor, self.patch, self.changeset
        )
    }
}

/// Oldest `cm` able to run the shell protocol used here
pub const OLDEST_SUPPORTED: CliVersion = CliVersion::new(9, 0, 16, 4839);

/// `cm history --limit`
pub const NEW_HISTORY_LIMIT: CliVersion = CliVersion::new(11, 0, 16, 7608);

/// `cm undocheckout --keepchanges`
pub const UNDO_CHECKOUT_KEEP_CHANGES: CliVersion = CliVersion::new(11, 0, 16, 7665);

/// `cm status --iscochanged`: `CO` means checked-out unchanged, `CO+CH` checked-out changed
pub const STATUS_IS_CHECKED_OUT_CHANGED: CliVersion = CliVersion::new(11, 0, 16, 7709);

/// `cm lock list --smartlocks`
pub const SMART_LOCKS: CliVersion = CliVersion::new(11, 0, 16, 8101);
