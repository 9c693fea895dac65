//! Per-concept attribute-change accumulation.
//!
//! Non-IS_A relationship deltas are not applied to the projection directly;
//! they are logged per concept and replayed in effective-time order against
//! the stored attribute map. Replaying in this order makes the result correct
//! when several versions of the same assertion land in one commit window: at
//! equal effective time removals sort before additions, so a deactivate plus
//! reactivate pair collapses to the later (present) state.

use termstore_core::ConceptId;

/// Sort sentinel for unreleased content: sorts after every real `yyyymmdd`
/// effective time.
pub const UNPUBLISHED_EFFECTIVE_TIME: i32 = 90_000_000;

/// A single attribute add or remove event.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AttributeChange {
    effective_time: i32,
    group: u8,
    attribute_type: ConceptId,
    value: ConceptId,
    add: bool,
}

impl AttributeChange {
    fn new(
        effective_time: Option<i32>,
        group: u8,
        attribute_type: ConceptId,
        value: ConceptId,
        add: bool,
    ) -> Self {
        Self {
            effective_time: effective_time.unwrap_or(UNPUBLISHED_EFFECTIVE_TIME),
            group,
            attribute_type,
            value,
            add,
        }
    }

    pub fn is_add(&self) -> bool {
        self.add
    }

    pub fn effective_time(&self) -> i32 {
        self.effective_time
    }

    pub fn group(&self) -> u8 {
        self.group
    }

    pub fn attribute_type(&self) -> ConceptId {
        self.attribute_type
    }

    pub fn value(&self) -> ConceptId {
        self.value
    }
}

/// Append-only log of attribute changes for one concept.
#[derive(Debug, Default)]
pub struct AttributeChanges {
    changes: Vec<AttributeChange>,
}

impl AttributeChanges {
    /// Log an attribute addition
    pub fn add_attribute(
        &mut self,
        effective_time: Option<i32>,
        group: u8,
        attribute_type: ConceptId,
        value: ConceptId,
    ) {
        self.changes.push(AttributeChange::new(
            effective_time,
            group,
            attribute_type,
            value,
            true,
        ));
    }

    /// Log an attribute removal
    pub fn remove_attribute(
        &mut self,
        effective_time: Option<i32>,
        group: u8,
        attribute_type: ConceptId,
        value: ConceptId,
    ) {
        self.changes.push(AttributeChange::new(
            effective_time,
            group,
            attribute_type,
            value,
            false,
        ));
    }

    /// The changes in replay order: effective time ascending, removals before
    /// additions at equal effective time.
    pub fn effective_sorted_changes(&mut self) -> &[AttributeChange] {
        self.changes.sort_by_key(|c| (c.effective_time, c.add));
        &self.changes
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unreleased_changes_sort_last() {
        let mut changes = AttributeChanges::default();
        changes.add_attribute(None, 0, 7, 8);
        changes.add_attribute(Some(20230131), 0, 7, 9);

        let sorted = changes.effective_sorted_changes();
        assert_eq!(sorted[0].value(), 9);
        assert_eq!(sorted[1].value(), 8);
        assert_eq!(sorted[1].effective_time(), UNPUBLISHED_EFFECTIVE_TIME);
    }

    #[test]
    fn removal_sorts_before_addition_at_equal_effective_time() {
        let mut changes = AttributeChanges::default();
        changes.add_attribute(Some(20230131), 1, 7, 8);
        changes.remove_attribute(Some(20230131), 1, 7, 8);

        let sorted = changes.effective_sorted_changes();
        assert!(!sorted[0].is_add(), "removal must replay first");
        assert!(sorted[1].is_add(), "addition must win the window");
    }

    #[test]
    fn replay_order_is_stable_across_insertion_orders() {
        let mut a = AttributeChanges::default();
        a.add_attribute(Some(20220131), 0, 7, 8);
        a.remove_attribute(Some(20230131), 0, 7, 8);

        let mut b = AttributeChanges::default();
        b.remove_attribute(Some(20230131), 0, 7, 8);
        b.add_attribute(Some(20220131), 0, 7, 8);

        assert_eq!(a.effective_sorted_changes(), b.effective_sorted_changes());
    }
}
