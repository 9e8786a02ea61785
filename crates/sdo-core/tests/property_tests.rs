//! Randomised critique scripts never break the session invariants.

use proptest::prelude::*;
use sdo_core::{CallOptions, NewSession};
use sdo_kernel::{CritiqueItem, WorkflowStatus};
use sdo_test_utils::{orchestrator_with, sample_context, two_section_plan, ScriptedCritic, ScriptedGenerator};
use std::sync::Arc;

/// Number of issues the critic raises on each successive review
fn script() -> impl Strategy<Value = Vec<usize>> {
    prop::collection::vec(0usize..3, 0..12)
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]

    #[test]
    fn invariants_hold_for_any_critique_script(issues in script(), max_revisions in 0u32..4) {
        let runtime = tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()
            .unwrap();

        runtime.block_on(async {
            let critic = issues.iter().fold(ScriptedCritic::approving(), |critic, n| {
                critic.then(Ok((0..*n).map(|i| CritiqueItem::new(format!("issue {i}"))).collect()))
            });
            let generator = Arc::new(ScriptedGenerator::new());
            let critic = Arc::new(critic);
            let orch = orchestrator_with(generator.clone(), critic.clone());
            let id = orch
                .create_session(
                    NewSession::new(sample_context(), two_section_plan()).with_max_revisions(max_revisions),
                )
                .await
                .unwrap();

            let mut state = orch.get_state(&id).await.unwrap();
            for _ in 0..64 {
                let prev = state.clone();
                state = orch.advance(&id).await.unwrap();
                state.check_invariants().unwrap();
                prop_assert!(state.revision_count <= state.max_revisions);

                // a suspended session does not move
                if prev.status.is_suspended() {
                    prop_assert_eq!(&state, &prev);
                }
                if state.status == WorkflowStatus::NeedsHuman {
                    prop_assert!(!state.critique_list.is_empty());
                    prop_assert_eq!(state.revision_count, state.max_revisions);
                }
            }

            prop_assert!(state.status.is_suspended());
            // every draft was reviewed, except possibly the one awaiting review
            prop_assert!(generator.calls() >= critic.calls());
            prop_assert!(generator.calls() <= critic.calls() + 1);
            Ok(())
        })?;
    }
}
