//! Build-number to protocol resolution.
//!
//! Resolution is a pure, exact-match lookup over a compile-time-closed
//! table: there is no version-range or nearest-match fallback, and an
//! unknown build fails fast. Several build numbers map onto one schema
//! wherever the wire format did not change between client patches.

use crate::builds;
use crate::error::{ProtocolError, ProtocolResult};
use crate::schema::ReplayProtocol;

/// Build numbers with a registered schema, ascending.
pub const KNOWN_BUILDS: &[u32] = &[29406, 39445, 42958, 47479, 52860, 66488];

/// The fixed, oldest-known protocol.
///
/// Used only to read the build number out of a header before the real
/// protocol is known; every other decode goes through [`resolve`].
pub fn bootstrap() -> &'static dyn ReplayProtocol {
    &builds::build29406::PROTOCOL
}

/// Resolves a build number to its protocol implementation.
pub fn resolve(build: u32) -> ProtocolResult<&'static dyn ReplayProtocol> {
    match build {
        29406 | 39445 | 42958 => Ok(&builds::build29406::PROTOCOL),
        47479 | 52860 | 66488 => Ok(&builds::build47479::PROTOCOL),
        other => Err(ProtocolError::UnsupportedBuild(other)),
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn every_known_build_resolves() {
        for &build in KNOWN_BUILDS {
            assert!(resolve(build).is_ok(), "build {build} should resolve");
        }
    }

    #[test]
    fn unknown_build_fails_fast() {
        assert!(matches!(
            resolve(1).unwrap_err(),
            ProtocolError::UnsupportedBuild(1)
        ));
        // No nearest-match fallback: a build between two known ones is
        // still unsupported.
        assert!(matches!(
            resolve(29407).unwrap_err(),
            ProtocolError::UnsupportedBuild(29407)
        ));
    }

    #[test]
    fn aliased_builds_share_a_schema() {
        let a = resolve(29406).unwrap();
        let b = resolve(39445).unwrap();
        assert_eq!(a.build(), b.build());
    }

    #[test]
    fn bootstrap_is_the_oldest_known_build() {
        assert_eq!(bootstrap().build(), KNOWN_BUILDS[0]);
    }
}
