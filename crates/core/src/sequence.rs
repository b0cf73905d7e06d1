//! Auto-increment collision guard decision.
//!
//! HPOS orders and legacy posts share one ID space: every order gets a
//! shadow `shop_order` post with the same ID. If the orders table's
//! `AUTO_INCREMENT` falls behind the highest post ID, the next order would
//! collide with an existing post.

/// Decide whether the orders counter must be raised.
///
/// `highest_id` is the largest ID already used in either table (`None` if
/// both are empty). Returns the new counter value, or `None` if the current
/// counter is already ahead.
///
/// ```
/// use woo_backoffice_core::next_auto_increment;
///
/// assert_eq!(next_auto_increment(Some(50_000), 49_999), Some(50_001));
/// assert_eq!(next_auto_increment(Some(50_000), 50_005), None);
/// ```
#[must_use]
pub fn next_auto_increment(highest_id: Option<u64>, current_counter: u64) -> Option<u64> {
    let required = highest_id?.checked_add(1)?;
    (current_counter < required).then_some(required)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_counter_behind_legacy_max_is_raised() {
        assert_eq!(next_auto_increment(Some(50_000), 49_999), Some(50_001));
        assert_eq!(next_auto_increment(Some(50_000), 50_000), Some(50_001));
    }

    #[test]
    fn test_counter_ahead_is_left_alone() {
        assert_eq!(next_auto_increment(Some(50_000), 50_005), None);
        assert_eq!(next_auto_increment(Some(50_000), 50_001), None);
    }

    #[test]
    fn test_empty_tables_need_nothing() {
        assert_eq!(next_auto_increment(None, 1), None);
    }

    #[test]
    fn test_overflow_is_ignored() {
        assert_eq!(next_auto_increment(Some(u64::MAX), 10), None);
    }
}
