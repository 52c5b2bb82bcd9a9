//! Size strings and disk geometry.
//!
//! Sizes are declared as `<digits><unit>` with an uppercase unit among
//! `B K M G T` and compared in whole megabytes. Division truncates, so
//! `"1048575B"` is 0 MB.

use crate::error::{ProviderError, Result};

/// Kilobytes per cylinder: 15 tracks/cylinder, 12 blocks/track, 4 KB/block.
///
/// This is the ECKD geometry z/VM reports minidisks in.
pub const KB_PER_CYLINDER: u64 = 15 * 12 * 4;

/// Minidisk unit the reconciler understands.
pub const CYLINDERS: &str = "Cylinders";

/// Parse a size string into megabytes.
///
/// # Errors
/// Returns [`ProviderError::Conversion`] if the unit is missing or unknown,
/// the prefix is not a non-negative integer, or the result overflows.
pub fn to_megabytes(size: &str) -> Result<u64> {
    let conversion = |reason: &str| ProviderError::Conversion {
        value: size.to_string(),
        reason: reason.to_string(),
    };

    let unit = size.chars().last().ok_or_else(|| conversion("empty size"))?;
    let digits = &size[..size.len() - unit.len_utf8()];
    let n: u64 = digits
        .parse()
        .map_err(|_| conversion("size must be an integer followed by a unit"))?;

    let megabytes = match unit {
        'B' => Some(n / 1_048_576),
        'K' => Some(n / 1_024),
        'M' => Some(n),
        'G' => n.checked_mul(1_024),
        'T' => n.checked_mul(1_048_576),
        _ => return Err(conversion("unit must be one of B K M G T")),
    };
    megabytes.ok_or_else(|| conversion("size is too large"))
}

/// Canonical spelling of a megabyte count, e.g. `"10240M"`.
pub fn megabytes_string(megabytes: u64) -> String {
    format!("{megabytes}M")
}

/// Convert a minidisk size in cylinders to megabytes.
pub fn cylinders_to_megabytes(cylinders: u64) -> u64 {
    cylinders.saturating_mul(KB_PER_CYLINDER) / 1_024
}
