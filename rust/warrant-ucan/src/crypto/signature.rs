use strum_macros::{Display, EnumString};

/// The JOSE algorithm names this crate can name in a token header. See
/// RFC 7518 and RFC 8037; `ES256K` is registered for secp256k1.
#[derive(Debug, Display, EnumString, Eq, PartialEq)]
pub enum JwtSignatureAlgorithm {
    EdDSA,
    ES256,
    ES256K,
}
