//! Local filtering of the fetched complaint collection.
//!
//! Filtering never touches the network. It always runs over the collection
//! the last completed fetch returned.

use std::str::FromStr;

use crate::models::{Complaint, ComplaintStatus, Emotion, Priority};

/// Option string meaning "do not filter on this field".
pub const ALL: &str = "all";

/// Either the `all` sentinel or one exact value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Selector<T> {
    #[default]
    All,
    Only(T),
}

impl<T: PartialEq + Copy> Selector<T> {
    /// An unset field never matches an exact selector.
    pub fn matches(&self, value: Option<T>) -> bool {
        match self {
            Selector::All => true,
            Selector::Only(expected) => value == Some(*expected),
        }
    }
}

impl<T: FromStr<Err = String>> FromStr for Selector<T> {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s == ALL {
            Ok(Selector::All)
        } else {
            s.parse().map(Selector::Only)
        }
    }
}

/// The three independent, conjunctive filters of the complaint list.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct FilterSet {
    pub priority: Selector<Priority>,
    pub emotion: Selector<Emotion>,
    pub status: Selector<ComplaintStatus>,
}

impl FilterSet {
    pub fn new(
        priority: Selector<Priority>,
        emotion: Selector<Emotion>,
        status: Selector<ComplaintStatus>,
    ) -> Self {
        Self {
            priority,
            emotion,
            status,
        }
    }

    pub fn is_unfiltered(&self) -> bool {
        *self == FilterSet::default()
    }

    pub fn matches(&self, complaint: &Complaint) -> bool {
        self.priority.matches(complaint.priority)
            && self.emotion.matches(complaint.emotion)
            && self.status.matches(Some(complaint.status))
    }

    /// Matching complaints in their original order.
    pub fn apply(&self, complaints: &[Complaint]) -> Vec<Complaint> {
        complaints
            .iter()
            .filter(|c| self.matches(c))
            .cloned()
            .collect()
    }
}

/// Visible subset of `complaints` under the given filters.
pub fn visible(
    complaints: &[Complaint],
    priority: Selector<Priority>,
    emotion: Selector<Emotion>,
    status: Selector<ComplaintStatus>,
) -> Vec<Complaint> {
    FilterSet::new(priority, emotion, status).apply(complaints)
}


#[cfg(test)]
mod property_tests {
    use super::*;
    use crate::models::sample_complaint;
    use proptest::prelude::*;

    fn arb_priority() -> impl Strategy<Value = Option<Priority>> {
        prop::option::of(prop::sample::select(Priority::ALL.to_vec()))
    }

    fn arb_emotion() -> impl Strategy<Value = Option<Emotion>> {
        prop::option::of(prop::sample::select(Emotion::ALL.to_vec()))
    }

    fn arb_status() -> impl Strategy<Value = ComplaintStatus> {
        prop::sample::select(ComplaintStatus::ALL.to_vec())
    }

    fn arb_complaints() -> impl Strategy<Value = Vec<Complaint>> {
        prop::collection::vec((arb_priority(), arb_emotion(), arb_status()), 0..30).prop_map(
            |rows| {
                rows.into_iter()
                    .enumerate()
                    .map(|(i, (p, e, s))| sample_complaint(i as u64 + 1, p, e, s))
                    .collect()
            },
        )
    }

    fn arb_selector<T: Clone + std::fmt::Debug + 'static>(
        inner: impl Strategy<Value = T> + 'static,
    ) -> impl Strategy<Value = Selector<T>> {
        prop_oneof![Just(Selector::All), inner.prop_map(Selector::Only)]
    }

    fn arb_filters() -> impl Strategy<Value = FilterSet> {
        (
            arb_selector(prop::sample::select(Priority::ALL.to_vec())),
            arb_selector(prop::sample::select(Emotion::ALL.to_vec())),
            arb_selector(arb_status()),
        )
            .prop_map(|(p, e, s)| FilterSet::new(p, e, s))
    }

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(200))]

        /// The result holds exactly the matching complaints, in input order.
        #[test]
        fn prop_visible_is_exact_ordered_subset(
            complaints in arb_complaints(),
            filters in arb_filters(),
        ) {
            let result = filters.apply(&complaints);
            let expected: Vec<Complaint> = complaints
                .iter()
                .filter(|c| {
                    let p = match filters.priority { Selector::All => true, Selector::Only(v) => c.priority == Some(v) };
                    let e = match filters.emotion { Selector::All => true, Selector::Only(v) => c.emotion == Some(v) };
                    let s = match filters.status { Selector::All => true, Selector::Only(v) => c.status == v };
                    p && e && s
                })
                .cloned()
                .collect();
            prop_assert_eq!(result, expected);
        }

        /// Filtering twice changes nothing.
        #[test]
        fn prop_visible_is_idempotent(
            complaints in arb_complaints(),
            filters in arb_filters(),
        ) {
            let once = filters.apply(&complaints);
            let twice = filters.apply(&once);
            prop_assert_eq!(once, twice);
        }

        /// `all` on every field returns the input unchanged.
        #[test]
        fn prop_all_filters_is_identity(complaints in arb_complaints()) {
            let result = visible(&complaints, Selector::All, Selector::All, Selector::All);
            prop_assert_eq!(result, complaints);
        }
    }
}
