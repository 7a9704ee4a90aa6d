//! Storage namespace derivation from identity key material.
//!
//! The namespace is an FNV-1a digest of the private key bytes. It only keeps
//! identities apart in storage; it is not a security boundary.

/// Namespace used when no key material is available.
pub const ANONYMOUS_NAMESPACE: &str = "anonymous";

const FNV_OFFSET_BASIS: u32 = 0x811c_9dc5;
const FNV_PRIME: u32 = 0x0100_0193;

/// Derive the storage namespace for a private key.
pub fn derive_namespace(private_key: Option<&[u8]>) -> String {
    match private_key {
        Some(bytes) if !bytes.is_empty() => format!("{:08x}", fnv1a_32(bytes)),
        _ => ANONYMOUS_NAMESPACE.to_string(),
    }
}

fn fnv1a_32(bytes: &[u8]) -> u32 {
    bytes.iter().fold(FNV_OFFSET_BASIS, |hash, byte| {
        (hash ^ u32::from(*byte)).wrapping_mul(FNV_PRIME)
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn matches_reference_vectors() {
        assert_eq!(fnv1a_32(b""), 0x811c_9dc5);
        assert_eq!(fnv1a_32(b"a"), 0xe40c_292c);
        assert_eq!(fnv1a_32(b"foobar"), 0xbf9c_f968);
    }

    #[test]
    fn renders_lowercase_hex() {
        assert_eq!(derive_namespace(Some(b"a")), "e40c292c");
    }

    #[test]
    fn missing_or_empty_key_is_anonymous() {
        assert_eq!(derive_namespace(None), ANONYMOUS_NAMESPACE);
        assert_eq!(derive_namespace(Some(&[])), ANONYMOUS_NAMESPACE);
    }

    #[test]
    fn distinct_keys_get_distinct_namespaces() {
        let first = derive_namespace(Some(&[1, 2, 3, 4]));
        assert_eq!(first, derive_namespace(Some(&[1, 2, 3, 4])));
        assert_ne!(first, derive_namespace(Some(&[4, 3, 2, 1])));
    }
}
