use crate::types::MessageIndex;

const HALF_RANGE: u16 = 32768;

/// Returns whether a wrapping message index comes after another
/// sequence_greater_than(2,1) will return true
/// sequence_greater_than(1,65535) will return true
/// sequence_greater_than(1,1) will return false
pub fn sequence_greater_than(s1: MessageIndex, s2: MessageIndex) -> bool {
    ((s1 > s2) && (s1 - s2 <= HALF_RANGE)) || ((s1 < s2) && (s2 - s1 > HALF_RANGE))
}

/// Returns whether a wrapping message index comes before another
pub fn sequence_less_than(s1: MessageIndex, s2: MessageIndex) -> bool {
    sequence_greater_than(s2, s1)
}

/// Number of steps forward from `from` to reach `to`, treating the indices as
/// wrapping. Only meaningful when `to` is not behind `from`.
///
/// ```
/// # use voxsync_shared::forward_distance;
/// assert_eq!(forward_distance(10, 12), 2);
/// assert_eq!(forward_distance(65535, 1), 2);
/// ```
pub fn forward_distance(from: MessageIndex, to: MessageIndex) -> u16 {
    to.wrapping_sub(from)
}
