use rand::Rng;

/// Layout of a generated identifier. `x` is any hex digit, `y` is one of `8`, `9`, `a`, `b`.
const TEMPLATE: &str = "xxxxxxxx-xxxx-4xxx-yxxx-xxxxxxxxxxxx";

/// Generates a UUID-v4-shaped identifier for document nodes.
///
/// The digits come from `rand::thread_rng`, so identifiers are unique enough for a single
/// editing session but must not be used where unpredictability matters (tokens, secrets).
/// There is no collision detection.
///
/// Returns:
/// - A 36-character lowercase string such as `3f2b8c1e-9a4d-4c7e-b1f0-2d6e8a9c0b13`.
///
/// Example:
/// ```
/// let id = curriculum_schema::gen_uuid();
/// assert_eq!(id.len(), 36);
/// ```
pub fn gen_uuid() -> String {
    let mut rng = rand::thread_rng();
    TEMPLATE
        .chars()
        .map(|c| match c {
            'x' => hex_digit(rng.gen_range(0..16)),
            'y' => hex_digit((rng.gen_range(0..16) & 0x3) | 0x8),
            other => other,
        })
        .collect()
}

fn hex_digit(value: u32) -> char {
    std::char::from_digit(value, 16).unwrap_or('0')
}
