//! Access token claim inspection used to derive expiry instants.
//!
//! The backend issues JWT-shaped access tokens; the only claim this crate reads
//! is `exp`. Signature verification is the backend's job, so the payload is
//! decoded without validating the token.

// crates.io
use base64::{Engine, engine::general_purpose::URL_SAFE_NO_PAD};
// self
use crate::_prelude::*;

/// Extracts the expiry instant from a JWT-shaped access token's `exp` claim.
///
/// Returns `None` for opaque tokens, malformed payloads, or out-of-range
/// timestamps; callers fall back to the refresh response's `expiresIn` field.
pub fn token_expiry(access_token: &str) -> Option<OffsetDateTime> {
	#[derive(Deserialize)]
	struct Claims {
		exp: i64,
	}

	let payload = access_token.split('.').nth(1)?;
	let bytes = URL_SAFE_NO_PAD.decode(payload).ok()?;
	let claims = serde_json::from_slice::<Claims>(&bytes).ok()?;

	OffsetDateTime::from_unix_timestamp(claims.exp).ok()
}
