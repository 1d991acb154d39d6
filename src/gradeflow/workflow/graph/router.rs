// SPDX-License-Identifier: MIT

//! Graph topology and the single branch decision
//!
//! ```text
//! evaluate -> check_anomaly -+-(needs_review)-----> human_review -> finalize
//!                            +-(no_review_needed)-> finalize
//! ```

use serde::{Deserialize, Serialize};

use crate::gradeflow::workflow::nodes::NodeId;
use crate::gradeflow::workflow::state::WorkflowState;

/// First node of every fresh run
pub const ENTRY: NodeId = NodeId::Evaluate;

/// Labels of the conditional edges leaving `check_anomaly`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Edge {
    NeedsReview,
    NoReviewNeeded,
}

/// Pick the branch after `check_anomaly`. Depends on `hitl_required` only,
/// so a resumed run re-derives the same decision from its checkpoint.
pub fn route(state: &WorkflowState) -> Edge {
    if state.hitl_required {
        Edge::NeedsReview
    } else {
        Edge::NoReviewNeeded
    }
}

/// Successor of `from`, or `None` once the graph is finished
pub fn next_node(from: NodeId, state: &WorkflowState) -> Option<NodeId> {
    match from {
        NodeId::Evaluate => Some(NodeId::CheckAnomaly),
        NodeId::CheckAnomaly => match route(state) {
            Edge::NeedsReview => Some(NodeId::HumanReview),
            Edge::NoReviewNeeded => Some(NodeId::Finalize),
        },
        NodeId::HumanReview => Some(NodeId::Finalize),
        NodeId::Finalize => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_route_follows_hitl_flag() {
        let state = WorkflowState::new("q", "a");
        assert_eq!(route(&state), Edge::NoReviewNeeded);
        assert_eq!(route(&state.with_hitl_required(true)), Edge::NeedsReview);
    }

    #[test]
    fn test_route_ignores_anomaly_without_flag() {
        // Routing reads the derived flag, not the raw reason
        let state = WorkflowState::new("q", "a").with_evaluation(1, "?", Some("odd".into()));
        assert_eq!(route(&state), Edge::NoReviewNeeded);
    }

    #[test]
    fn test_paths_through_graph() {
        let walk = |state: &WorkflowState| {
            let mut path = vec![ENTRY];
            while let Some(next) = next_node(*path.last().unwrap(), state) {
                path.push(next);
            }
            path
        };

        assert_eq!(
            walk(&WorkflowState::default()),
            vec![NodeId::Evaluate, NodeId::CheckAnomaly, NodeId::Finalize]
        );
        assert_eq!(
            walk(&WorkflowState::default().with_hitl_required(true)),
            vec![
                NodeId::Evaluate,
                NodeId::CheckAnomaly,
                NodeId::HumanReview,
                NodeId::Finalize
            ]
        );
    }
}
