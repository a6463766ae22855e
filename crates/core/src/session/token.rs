use base64::{Engine as _, engine::general_purpose::URL_SAFE_NO_PAD};
use rand::{RngCore, rngs::OsRng};

/// 128 random bits, base64url without padding (22 chars).
pub fn new_session_token() -> String {
    let mut bytes = [0u8; 16];
    if let Err(e) = OsRng.try_fill_bytes(&mut bytes) {
        tracing::warn!(error = %e, "OS randomness unavailable, using thread rng");
        rand::thread_rng().fill_bytes(&mut bytes);
    }
    URL_SAFE_NO_PAD.encode(bytes)
}

/// Whether `token` looks like something `new_session_token` produced.
pub fn is_well_formed(token: &str) -> bool {
    token.len() == 22
        && token
            .bytes()
            .all(|b| b.is_ascii_alphanumeric() || b == b'-' || b == b'_')
}
