use crate::error::{IdentityError, Result};
use rand::rngs::OsRng;
use rand::Rng;

/// Numeric one-time code of `length` digits, each drawn uniformly from the OS RNG.
///
/// A zero length yields an empty code; a negative length is rejected.
pub fn generate_otp(length: i32) -> Result<String> {
    let length = usize::try_from(length).map_err(|_| IdentityError::InvalidOtpLength(length))?;

    let mut rng = OsRng;
    Ok((0..length)
        .map(|_| char::from(b'0' + rng.gen_range(0..10u8)))
        .collect())
}
