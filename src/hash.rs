//! Key hashing
//!
//! Keys are reduced to a 32-bit FNV-1a identifier. Distinct keys can collide;
//! colliding keys share an index entry and overwrite each other.

/// Fixed-width identifier derived from a string key
pub type Identifier = u32;

const FNV_OFFSET_BASIS: u32 = 0x811c_9dc5;
const FNV_PRIME: u32 = 0x0100_0193;

/// Hash a key to its identifier (FNV-1a, 32-bit)
pub fn hash(key: &str) -> Identifier {
    hash_bytes(key.as_bytes())
}

/// FNV-1a over raw bytes
pub fn hash_bytes(bytes: &[u8]) -> Identifier {
    let mut h = FNV_OFFSET_BASIS;
    for &b in bytes {
        h ^= b as u32;
        h = h.wrapping_mul(FNV_PRIME);
    }
    h
}
