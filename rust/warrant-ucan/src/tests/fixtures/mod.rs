mod identities;
mod semantics;

pub use identities::*;
pub use semantics::*;

use crate::{
    crypto::did::KeyConstructorSlice,
    key_material::ed25519::{bytes_to_ed25519_key, ED25519_MAGIC_BYTES},
};

pub const SUPPORTED_KEYS: &KeyConstructorSlice = &[(ED25519_MAGIC_BYTES, bytes_to_ed25519_key)];
