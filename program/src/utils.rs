// Draw Lottery - Utility Functions
use rand::Rng;

/// Pick a uniformly distributed index below `len`, or `None` for an empty range
pub fn random_index<R: Rng + ?Sized>(rng: &mut R, len: usize) -> Option<usize> {
    if len == 0 {
        return None;
    }
    Some(rng.gen_range(0..len))
}

/// Trim a user supplied display name, rejecting blank input
pub fn normalize_name(name: &str) -> Option<String> {
    let trimmed = name.trim();
    if trimmed.is_empty() {
        None
    } else {
        Some(trimmed.to_string())
    }
}
