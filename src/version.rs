//! Testing-specification version handling.
//!
//! The metadata file declares which revision of the test-definition format a
//! definitions tree conforms to. Declared versions are written loosely
//! (`"0.1"` rather than `"0.1.0"`), so parsing pads missing components before
//! handing the string to [`semver`]. Compatibility is precedence equality:
//! build metadata is ignored, pre-release identifiers are not.

use semver::Version;

/// The only specification version this runner accepts.
///
/// Passed into the discovery engine at construction so alternative callers
/// (and tests) can supply their own.
pub const SUPPORTED_SPEC_VERSION: Version = Version::new(0, 1, 0);

/// Parses a version string, padding one- or two-component versions with
/// zeros (`"0.1"` becomes `0.1.0`).
pub fn parse_lenient(text: &str) -> Result<Version, semver::Error> {
    match Version::parse(text) {
        Ok(version) => Ok(version),
        Err(err) => {
            // Pad the core before any pre-release or build suffix.
            let core_end = text.find(['-', '+']).unwrap_or(text.len());
            let (core, suffix) = text.split_at(core_end);
            let padded = match core.bytes().filter(|byte| *byte == b'.').count() {
                0 => format!("{core}.0.0{suffix}"),
                1 => format!("{core}.0{suffix}"),
                _ => return Err(err),
            };
            Version::parse(&padded).map_err(|_| err)
        }
    }
}

/// Whether two versions are equal under semantic-versioning precedence
/// (build metadata ignored).
pub fn matches(declared: &Version, supported: &Version) -> bool {
    declared.cmp_precedence(supported).is_eq()
}
