//! MAC and IP address comparisons.

/// Hex digits that identify an adapter within a host.
///
/// z/VM assigns the first three bytes of a MAC from the system prefix, so
/// only the last three are under the caller's control.
const SUFFIX_DIGITS: usize = 6;

/// Whether two MAC addresses share the same last three bytes.
///
/// Separators are ignored and hex digits compare case-insensitively. If
/// either address has fewer than six hex digits the whole strings are
/// compared instead.
pub fn same_host_suffix(a: &str, b: &str) -> bool {
    match (suffix(a), suffix(b)) {
        (Some(a), Some(b)) => a == b,
        _ => a.eq_ignore_ascii_case(b),
    }
}

fn suffix(mac: &str) -> Option<String> {
    let digits: Vec<char> = mac
        .chars()
        .filter(char::is_ascii_hexdigit)
        .map(|c| c.to_ascii_lowercase())
        .collect();
    (digits.len() >= SUFFIX_DIGITS).then(|| digits[digits.len() - SUFFIX_DIGITS..].iter().collect())
}

/// Whether an adapter address is an IPv6 link-local address.
pub fn is_ipv6_link_local(ip_version: &str, address: &str) -> bool {
    ip_version == "6"
        && address
            .get(..5)
            .is_some_and(|prefix| prefix.eq_ignore_ascii_case("fe80:"))
}
