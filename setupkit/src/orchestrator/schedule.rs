//! Ordering and grouping of a selection.
//!
//! Pure functions over task priorities; the session runs whatever plan
//! they return.

use std::cmp::Reverse;

use super::policy::Priority;

/// Indices of `priorities` ordered for installation.
///
/// Higher priority first; equal priorities keep their input order.
pub fn install_order(priorities: &[Priority]) -> Vec<usize> {
    let mut order: Vec<usize> = (0..priorities.len()).collect();
    // sort_by_key is stable
    order.sort_by_key(|&i| Reverse(priorities[i]));
    order
}

/// Install order split into groups of at most `group_size` tasks.
///
/// A `group_size` of zero is treated as one.
pub fn plan_groups(priorities: &[Priority], group_size: usize) -> Vec<Vec<usize>> {
    install_order(priorities)
        .chunks(group_size.max(1))
        .map(<[usize]>::to_vec)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn p(values: &[i32]) -> Vec<Priority> {
        values.iter().copied().map(Priority::new).collect()
    }

    #[test]
    fn test_higher_priority_first() {
        assert_eq!(install_order(&p(&[0, 100, -50, 10])), vec![1, 3, 0, 2]);
    }

    #[test]
    fn test_ties_keep_input_order() {
        assert_eq!(install_order(&p(&[5, 5, 9, 5])), vec![2, 0, 1, 3]);
    }

    #[test]
    fn test_groups() {
        let groups = plan_groups(&p(&[0, 0, 0, 0, 0]), 3);
        assert_eq!(groups, vec![vec![0, 1, 2], vec![3, 4]]);
        assert!(plan_groups(&[], 3).is_empty());
        assert_eq!(plan_groups(&p(&[1, 2]), 0), vec![vec![1], vec![0]]);
    }

    proptest! {
        #[test]
        fn prop_every_task_planned_once(
            values in prop::collection::vec(-5i32..5, 0..40),
            group_size in 1usize..8,
        ) {
            let groups = plan_groups(&p(&values), group_size);

            let mut seen: Vec<usize> = groups.iter().flatten().copied().collect();
            seen.sort_unstable();
            prop_assert_eq!(seen, (0..values.len()).collect::<Vec<_>>());
            prop_assert!(groups.iter().all(|g| !g.is_empty() && g.len() <= group_size));
        }

        #[test]
        fn prop_order_is_priority_then_input(
            values in prop::collection::vec(-5i32..5, 0..40),
            group_size in 1usize..8,
        ) {
            let flat: Vec<usize> = plan_groups(&p(&values), group_size)
                .into_iter()
                .flatten()
                .collect();

            for pair in flat.windows(2) {
                let (a, b) = (pair[0], pair[1]);
                prop_assert!(values[a] > values[b] || (values[a] == values[b] && a < b));
            }
        }
    }
}
