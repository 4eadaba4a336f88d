//! Unique quest-order assignment.
//!
//! Every team walks the quest list in its own randomized sequence. The
//! assigner hands out permutations of the current quest ids and keeps them
//! pairwise distinct as long as the permutation space allows it; once the
//! retry budget runs out a duplicate is accepted so the operation always
//! terminates, and the caller can observe that degradation through the
//! `budget_exhausted` flag.

mod shuffle;

use rand::Rng;

pub use shuffle::shuffle;

/// Shuffle attempts granted per order slot before a duplicate is accepted.
pub const DEFAULT_ATTEMPT_BUDGET: usize = 1000;

/// Result of a bulk reassignment covering every team at once.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BulkAssignment {
    /// One order per team slot, in the same order as the requested slots.
    pub orders: Vec<Vec<String>>,
    /// True when at least one slot ran out of attempts and may duplicate
    /// another order.
    pub budget_exhausted: bool,
}

/// Result of assigning an order to a single new team.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewTeamAssignment {
    /// The order picked for the new team.
    pub order: Vec<String>,
    /// True when the attempt budget ran out and the order may duplicate an
    /// existing one.
    pub budget_exhausted: bool,
}

/// Produce exactly `team_count` orders over `quest_ids`, pairwise distinct
/// while the attempt budget holds.
///
/// Each slot repeatedly shuffles `quest_ids` and accepts the first candidate
/// not already handed out in this batch. After `budget` failed attempts the
/// last candidate is kept even if it duplicates an earlier one; with more
/// teams than distinct permutations that is the only way to stay live. An
/// empty `quest_ids` short-circuits to empty orders for every slot.
pub fn assign_all_orders<R>(
    quest_ids: &[String],
    team_count: usize,
    budget: usize,
    rng: &mut R,
) -> BulkAssignment
where
    R: Rng + ?Sized,
{
    if quest_ids.is_empty() {
        return BulkAssignment {
            orders: vec![Vec::new(); team_count],
            budget_exhausted: false,
        };
    }

    let mut orders: Vec<Vec<String>> = Vec::with_capacity(team_count);
    let mut budget_exhausted = false;

    for _ in 0..team_count {
        let (order, exhausted) = pick_order(quest_ids, &orders, budget, rng);
        budget_exhausted |= exhausted;
        orders.push(order);
    }

    BulkAssignment {
        orders,
        budget_exhausted,
    }
}

/// Pick an order for one new team that differs from every comparable
/// existing order.
///
/// Only existing orders whose length matches the current quest count are
/// considered: orders computed before a quest was added or removed live in a
/// different permutation space and cannot collide with a fresh one. An empty
/// `quest_ids` returns an empty order without entering the shuffle loop.
pub fn assign_order_for_new_team<R>(
    quest_ids: &[String],
    existing_orders: &[Vec<String>],
    budget: usize,
    rng: &mut R,
) -> NewTeamAssignment
where
    R: Rng + ?Sized,
{
    if quest_ids.is_empty() {
        return NewTeamAssignment {
            order: Vec::new(),
            budget_exhausted: false,
        };
    }

    let comparable: Vec<&Vec<String>> = existing_orders
        .iter()
        .filter(|order| order.len() == quest_ids.len())
        .collect();

    let mut attempts = 0;
    loop {
        let candidate = shuffle(quest_ids, rng);
        attempts += 1;

        if !comparable.iter().any(|order| same_order(order, &candidate)) {
            return NewTeamAssignment {
                order: candidate,
                budget_exhausted: false,
            };
        }

        if attempts >= budget {
            // Permutation space is (practically) exhausted; keep the last
            // shuffle rather than spinning forever.
            return NewTeamAssignment {
                order: candidate,
                budget_exhausted: true,
            };
        }
    }
}

/// Whether two orders are identical: same length and the same quest id at
/// every position. Orders of different lengths never match, regardless of
/// how many ids they share.
pub fn same_order(a: &[String], b: &[String]) -> bool {
    a.len() == b.len() && a.iter().zip(b).all(|(left, right)| left == right)
}

fn pick_order<R>(
    quest_ids: &[String],
    accepted: &[Vec<String>],
    budget: usize,
    rng: &mut R,
) -> (Vec<String>, bool)
where
    R: Rng + ?Sized,
{
    let mut attempts = 0;
    loop {
        let candidate = shuffle(quest_ids, rng);
        attempts += 1;

        if !accepted.iter().any(|order| same_order(order, &candidate)) {
            return (candidate, false);
        }

        if attempts >= budget {
            return (candidate, true);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ids(names: &[&str]) -> Vec<String> {
        names.iter().map(|name| name.to_string()).collect()
    }

    #[test]
    fn bulk_assignment_is_pairwise_distinct_within_the_space() {
        // 3 quests allow 6 permutations, so 3 teams must all differ.
        let quest_ids = ids(&["a", "b", "c"]);
        let mut rng = rand::rng();

        let assignment = assign_all_orders(&quest_ids, 3, DEFAULT_ATTEMPT_BUDGET, &mut rng);

        assert_eq!(assignment.orders.len(), 3);
        assert!(!assignment.budget_exhausted);
        for order in &assignment.orders {
            let mut sorted = order.clone();
            sorted.sort();
            assert_eq!(sorted, quest_ids, "order is not a permutation");
        }
        for (i, left) in assignment.orders.iter().enumerate() {
            for right in &assignment.orders[i + 1..] {
                assert!(!same_order(left, right), "duplicate order handed out");
            }
        }
    }

    #[test]
    fn bulk_assignment_with_no_quests_yields_empty_orders() {
        let mut rng = rand::rng();
        let assignment = assign_all_orders(&[], 4, DEFAULT_ATTEMPT_BUDGET, &mut rng);

        assert_eq!(assignment.orders, vec![Vec::<String>::new(); 4]);
        assert!(!assignment.budget_exhausted);
    }

    #[test]
    fn bulk_assignment_past_the_permutation_space_flags_exhaustion() {
        // 2 quests allow only 2 permutations; the third slot must duplicate.
        let quest_ids = ids(&["a", "b"]);
        let mut rng = rand::rng();

        let assignment = assign_all_orders(&quest_ids, 3, 50, &mut rng);

        assert_eq!(assignment.orders.len(), 3);
        assert!(assignment.budget_exhausted);
    }

    #[test]
    fn new_team_avoids_every_comparable_existing_order() {
        let quest_ids = ids(&["a", "b", "c"]);
        // Occupy 5 of the 6 permutations; the assigner has to find the sixth.
        let existing = vec![
            ids(&["a", "b", "c"]),
            ids(&["a", "c", "b"]),
            ids(&["b", "a", "c"]),
            ids(&["b", "c", "a"]),
            ids(&["c", "a", "b"]),
        ];
        let mut rng = rand::rng();

        let assignment =
            assign_order_for_new_team(&quest_ids, &existing, DEFAULT_ATTEMPT_BUDGET, &mut rng);

        assert_eq!(assignment.order, ids(&["c", "b", "a"]));
        assert!(!assignment.budget_exhausted);
    }

    #[test]
    fn new_team_ignores_stale_orders_of_a_different_length() {
        // A single quest leaves exactly one valid order; the stale two-quest
        // orders must not be compared against it.
        let quest_ids = ids(&["a"]);
        let existing = vec![ids(&["a", "b"]), ids(&["b", "a"])];
        let mut rng = rand::rng();

        let assignment =
            assign_order_for_new_team(&quest_ids, &existing, DEFAULT_ATTEMPT_BUDGET, &mut rng);

        assert_eq!(assignment.order, ids(&["a"]));
        assert!(!assignment.budget_exhausted);
    }

    #[test]
    fn new_team_with_no_quests_returns_empty_immediately() {
        let existing = vec![ids(&["a", "b"])];
        let mut rng = rand::rng();

        let assignment = assign_order_for_new_team(&[], &existing, DEFAULT_ATTEMPT_BUDGET, &mut rng);

        assert!(assignment.order.is_empty());
        assert!(!assignment.budget_exhausted);
    }

    #[test]
    fn new_team_falls_back_to_a_valid_shuffle_once_the_budget_runs_out() {
        // Both permutations of two quests are taken; the result must still be
        // a permutation of the current quest list.
        let quest_ids = ids(&["a", "b"]);
        let existing = vec![ids(&["a", "b"]), ids(&["b", "a"])];
        let mut rng = rand::rng();

        let assignment = assign_order_for_new_team(&quest_ids, &existing, 25, &mut rng);

        assert!(assignment.budget_exhausted);
        let mut sorted = assignment.order.clone();
        sorted.sort();
        assert_eq!(sorted, quest_ids);
    }

    #[test]
    fn same_order_rejects_different_lengths() {
        let long = ids(&["a", "b", "c"]);
        let short = ids(&["a", "b"]);

        assert!(!same_order(&long, &short));
        assert!(!same_order(&short, &long));
        assert!(same_order(&long, &long.clone()));
    }
}
