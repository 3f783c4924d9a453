//! Node identity: a display name, operator id, and the 128-bit long
//! address derived from the node's public key.
//!
//! Grounded on `HeyMacIdent.cpp`/`.h`. The original's `hash_key_to_addr`
//! only initializes a `mbedtls_sha512_context` and never finishes the
//! computation; `hash_long_addr` below implements the formula spec'd
//! instead: SHA-512-of-SHA-512, truncated to 16 bytes.

use sha2::{Digest, Sha512};

/// Maximum length of [`NodeIdentity::name`].
pub const NAME_MAX: usize = 64;
/// Maximum length of [`NodeIdentity::tac_id`].
pub const TAC_ID_MAX: usize = 16;
/// Length of a SECP384R1 public key as stored in the credential file.
pub const PUB_KEY_SZ: usize = 96;
/// Length of a node's long address.
pub const LONG_ADDR_SZ: usize = 16;

/// A credential read from external storage: operator-supplied name, tac id,
/// and the node's long-term public key.
pub struct Credential {
    pub name: heapless::String<NAME_MAX>,
    pub tac_id: heapless::String<TAC_ID_MAX>,
    pub pub_key: [u8; PUB_KEY_SZ],
}

/// The external seam for obtaining a node's [`Credential`]. Reading it from
/// a mounted block device/filesystem is out of scope for this crate (see
/// `HeyMacIdent::get_long_addr`'s use of `BlockDevice`/`LittleFileSystem`);
/// implementations live in the board support crate.
pub trait CredentialSource {
    /// Returns `None` if the device is unmounted or the file is missing,
    /// in which case the caller falls back to [`NodeIdentity::spoof`].
    fn read(&mut self) -> Option<Credential>;
}

/// A node's identity: display name, operator id, and long address.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct NodeIdentity {
    pub name: heapless::String<NAME_MAX>,
    pub tac_id: heapless::String<TAC_ID_MAX>,
    pub long_addr: [u8; LONG_ADDR_SZ],
}

impl NodeIdentity {
    /// Reads a credential from `source`, hashing its public key into a long
    /// address; falls back to [`NodeIdentity::spoof`] when no credential is
    /// available.
    pub fn from_source(source: &mut impl CredentialSource) -> Self {
        match source.read() {
            Some(cred) => NodeIdentity {
                name: cred.name,
                tac_id: cred.tac_id,
                long_addr: hash_long_addr(&cred.pub_key),
            },
            None => Self::spoof(),
        }
    }

    /// The fixed identity used when no credential source is available.
    pub fn spoof() -> Self {
        NodeIdentity {
            name: heapless::String::try_from("spoof").unwrap(),
            tac_id: heapless::String::try_from("AAA").unwrap(),
            long_addr: [0xAA; LONG_ADDR_SZ],
        }
    }
}

/// `SHA-512(SHA-512(pub_key))`, truncated to the first 16 bytes.
pub fn hash_long_addr(pub_key: &[u8; PUB_KEY_SZ]) -> [u8; LONG_ADDR_SZ] {
    let first = Sha512::digest(pub_key);
    let second = Sha512::digest(first);
    let mut addr = [0u8; LONG_ADDR_SZ];
    addr.copy_from_slice(&second[..LONG_ADDR_SZ]);
    addr
}

#[cfg(test)]
mod tests {
    use super::*;

    struct NoSource;
    impl CredentialSource for NoSource {
        fn read(&mut self) -> Option<Credential> {
            None
        }
    }

    struct FixedSource(Option<Credential>);
    impl CredentialSource for FixedSource {
        fn read(&mut self) -> Option<Credential> {
            self.0.take()
        }
    }

    #[test]
    fn missing_source_falls_back_to_spoof() {
        let mut src = NoSource;
        assert_eq!(NodeIdentity::from_source(&mut src), NodeIdentity::spoof());
    }

    #[test]
    fn hash_is_deterministic_and_truncated() {
        let key = [0x42u8; PUB_KEY_SZ];
        let a = hash_long_addr(&key);
        let b = hash_long_addr(&key);
        assert_eq!(a, b);
        assert_eq!(a.len(), LONG_ADDR_SZ);
    }

    #[test]
    fn different_keys_hash_differently() {
        let a = hash_long_addr(&[0x01u8; PUB_KEY_SZ]);
        let b = hash_long_addr(&[0x02u8; PUB_KEY_SZ]);
        assert_ne!(a, b);
    }

    #[test]
    fn present_source_is_used_over_spoof() {
        let cred = Credential {
            name: heapless::String::try_from("node1").unwrap(),
            tac_id: heapless::String::try_from("TAC1").unwrap(),
            pub_key: [0x99u8; PUB_KEY_SZ],
        };
        let mut src = FixedSource(Some(cred));
        let ident = NodeIdentity::from_source(&mut src);
        assert_eq!(ident.name.as_str(), "node1");
        assert_eq!(ident.long_addr, hash_long_addr(&[0x99u8; PUB_KEY_SZ]));
    }
}
