//! Float codec for the sensor's two-register values ("ABCD" big-endian
//! word order). This is a bit reinterpretation, never a numeric cast:
//! swapping the words silently yields a plausible-looking but wrong number.

/// Split the IEEE-754 bit pattern of `value` into (high word, low word).
pub fn encode_float(value: f32) -> (u16, u16) {
    let bits = value.to_bits();
    ((bits >> 16) as u16, bits as u16)
}

/// Reassemble a float from its (high word, low word) register pair.
pub fn decode_float(word0: u16, word1: u16) -> f32 {
    f32::from_bits(((word0 as u32) << 16) | word1 as u32)
}

/// Render a register pair as the 8-digit uppercase hex string used for
/// bit-level validation alongside the decoded float.
pub fn words_to_hex(word0: u16, word1: u16) -> String {
    format!("{word0:04X}{word1:04X}")
}
