//! Safe contract versions and the domain shape they imply.

use std::fmt;
use std::str::FromStr;

use alloy_primitives::{Address, U256};
use semver::Version;
use sigil::TypedDataDomain;

use crate::SafeError;

/// First Safe release whose domain separator includes the chain id.
const CHAIN_ID_SINCE: Version = Version::new(1, 3, 0);

/// A parsed Safe contract version, e.g. `1.3.0` or `1.4.1+L2`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SafeVersion(Version);

impl SafeVersion {
    /// Parses a version string.
    ///
    /// # Errors
    ///
    /// Returns [`SafeError::UnsupportedSafeVersion`] if `version` is not valid
    /// semver. There is no fallback shape for unparsable versions.
    pub fn parse(version: &str) -> Result<Self, SafeError> {
        Version::parse(version.trim())
            .map(Self)
            .map_err(|source| SafeError::UnsupportedSafeVersion {
                version: version.to_owned(),
                source,
            })
    }

    /// The underlying semantic version.
    #[must_use]
    pub const fn as_semver(&self) -> &Version {
        &self.0
    }

    /// Domain layout used by this version.
    #[must_use]
    pub fn domain_shape(&self) -> DomainShape {
        if self.0 >= CHAIN_ID_SINCE {
            DomainShape::WithChainId
        } else {
            DomainShape::WithoutChainId
        }
    }
}

impl FromStr for SafeVersion {
    type Err = SafeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl fmt::Display for SafeVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(&self.0, f)
    }
}

/// The two `EIP712Domain` layouts used by Safe contracts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DomainShape {
    /// `EIP712Domain(uint256 chainId,address verifyingContract)`, Safe 1.3.0 and later.
    WithChainId,
    /// `EIP712Domain(address verifyingContract)`, Safe releases before 1.3.0.
    WithoutChainId,
}

impl DomainShape {
    /// Builds the signing domain for a Safe deployment.
    ///
    /// `chain_id` is dropped entirely for [`DomainShape::WithoutChainId`].
    #[must_use]
    pub fn domain(self, safe: Address, chain_id: U256) -> TypedDataDomain {
        TypedDataDomain {
            chain_id: match self {
                Self::WithChainId => Some(chain_id),
                Self::WithoutChainId => None,
            },
            verifying_contract: Some(safe),
            ..TypedDataDomain::default()
        }
    }
}
