//! Referral code generation

use rand::Rng;

/// Length of a generated referral code
pub const REFERRAL_CODE_LEN: usize = 8;

/// Generate a random referral code.
///
/// Uppercase letters and digits only, without the easily confused `0`, `O`,
/// `1` and `I`, since customers read these codes aloud to each other.
pub fn generate_referral_code() -> String {
    const CHARSET: &[u8] = b"ABCDEFGHJKLMNPQRSTUVWXYZ23456789";

    let mut rng = rand::thread_rng();
    (0..REFERRAL_CODE_LEN)
        .map(|_| CHARSET[rng.gen_range(0..CHARSET.len())] as char)
        .collect()
}
