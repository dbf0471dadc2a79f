//! Opaque invitation token generation.

use base64::Engine;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;

/// Random bytes per token.
pub const TOKEN_BYTES: usize = 32;

/// Generate a cryptographically random invitation token
/// (32 bytes → base64url-encoded, no padding).
///
/// Uniqueness is only probabilistic here; the unique index on
/// `user.invitation_token` is what rejects a collision.
pub fn generate_invitation_token() -> String {
    let mut rng = rand::rng();
    let bytes: [u8; TOKEN_BYTES] = rand::Rng::random(&mut rng);
    URL_SAFE_NO_PAD.encode(bytes)
}
