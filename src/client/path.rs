//! Path helpers for the `<root>/<domain>/<node>` store layout.

/// Joins path segments with a single `/`, tolerating stray separators on
/// either side.
pub fn join_path(base: &str, child: &str) -> String {
    format!("{}/{}", base.trim_end_matches('/'), child.trim_start_matches('/'))
}

/// Normalizes a domain name read from the store: surrounding whitespace and
/// the trailing root dot are dropped.
pub fn trim_domain(name: &str) -> &str {
    name.trim().trim_end_matches('.')
}

/// Extracts the address portion of a child-node name. Node names may carry
/// an `_<disambiguator>` suffix for multiple registrations of the same
/// address; only the part before the first underscore is meaningful.
pub fn node_address(name: &str) -> &str {
    match name.split_once('_') {
        Some((address, _)) => address,
        None => name,
    }
}
