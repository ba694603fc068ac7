//! Utility functions and helpers
//!
//! This module contains the hashing and signing primitives the core consumes,
//! the injected clock, and the persistence encoding.

pub mod clock;
pub mod crypto;
pub mod serialization;

pub use clock::{Clock, FixedClock, SystemClock};
pub use crypto::{
    base58_encode, current_timestamp, ecdsa_p256_sha256_sign_digest,
    ecdsa_p256_sha256_sign_verify, new_key_pair, public_key_from_pkcs8, sha256_digest,
    sha256_pair, Hash, HASH_SIZE, ZERO_HASH,
};

pub use serialization::{deserialize, serialize};
