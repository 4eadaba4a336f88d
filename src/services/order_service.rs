//! Orchestration around the order assigner: fetch quests and teams, run the
//! assignment, and persist the result atomically.

use serde_json::json;
use tracing::{debug, info, warn};

use crate::{
    dao::{
        document_store::{Fields, WriteBatch, collections},
        models::TeamRecord,
    },
    error::ServiceError,
    orders::{self, NewTeamAssignment},
    state::SharedState,
};

/// Outcome of a full reassignment across every team.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReassignmentOutcome {
    /// Number of team documents rewritten.
    pub teams_updated: usize,
    /// True when at least one slot ran out of attempts.
    pub budget_exhausted: bool,
}

/// Recompute and persist a fresh unique order for every team.
///
/// Reads the current quest and team sets, generates one permutation per team,
/// and commits all order updates in a single atomic batch. No lock is held
/// between the read and the write; a team created in that window picks up a
/// unique order of its own and is healed by the next reassignment at the
/// latest.
pub async fn reassign_all_orders(state: &SharedState) -> Result<ReassignmentOutcome, ServiceError> {
    let store = state.require_store().await?;

    let quests = store.list(collections::QUESTS).await?;
    let teams = store.list(collections::USERS).await?;

    if teams.is_empty() {
        debug!("no teams to reassign");
        return Ok(ReassignmentOutcome {
            teams_updated: 0,
            budget_exhausted: false,
        });
    }

    let quest_ids: Vec<String> = quests.iter().map(|quest| quest.id.clone()).collect();
    let mut batch = WriteBatch::new();
    let mut budget_exhausted = false;

    if quest_ids.is_empty() {
        // Without quests there is nothing to order; clear every team.
        for team in &teams {
            batch.update(collections::USERS, &team.id, order_fields(Vec::new()));
        }
    } else {
        let budget = state.config().order_attempt_budget();
        let assignment =
            orders::assign_all_orders(&quest_ids, teams.len(), budget, &mut rand::rng());
        budget_exhausted = assignment.budget_exhausted;
        if budget_exhausted {
            warn!(
                teams = teams.len(),
                quests = quest_ids.len(),
                "order attempt budget exhausted; duplicate orders are possible"
            );
        }

        for (team, order) in teams.iter().zip(assignment.orders) {
            batch.update(collections::USERS, &team.id, order_fields(order));
        }
    }

    store.commit(batch).await?;
    info!(
        teams = teams.len(),
        quests = quest_ids.len(),
        "reassigned quest orders"
    );

    Ok(ReassignmentOutcome {
        teams_updated: teams.len(),
        budget_exhausted,
    })
}

/// Compute a unique order for a team that is about to be created.
///
/// Existing orders are decoded leniently: a team document that fails to
/// decode is skipped for uniqueness purposes rather than failing the join.
pub async fn order_for_new_team(state: &SharedState) -> Result<NewTeamAssignment, ServiceError> {
    let store = state.require_store().await?;

    let quests = store.list(collections::QUESTS).await?;
    let teams = store.list(collections::USERS).await?;

    let quest_ids: Vec<String> = quests.iter().map(|quest| quest.id.clone()).collect();
    let existing_orders: Vec<Vec<String>> = teams
        .iter()
        .filter_map(|document| {
            match crate::dao::models::decode::<TeamRecord>(document) {
                Ok(team) => Some(team.order),
                Err(err) => {
                    warn!(id = %document.id, error = %err, "skipping undecodable team document");
                    None
                }
            }
        })
        .collect();

    let budget = state.config().order_attempt_budget();
    let assignment = orders::assign_order_for_new_team(
        &quest_ids,
        &existing_orders,
        budget,
        &mut rand::rng(),
    );
    if assignment.budget_exhausted {
        warn!(
            teams = existing_orders.len(),
            quests = quest_ids.len(),
            "order attempt budget exhausted for new team; duplicate order possible"
        );
    }

    Ok(assignment)
}

fn order_fields(order: Vec<String>) -> Fields {
    let mut fields = Fields::new();
    fields.insert("order".into(), json!(order));
    fields
}
