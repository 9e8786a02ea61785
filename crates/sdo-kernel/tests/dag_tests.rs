use proptest::prelude::*;
use sdo_kernel::prelude::*;
use sdo_kernel::GraphError;

proptest! {
    #[test]
    fn prop_built_graphs_are_acyclic(
        node_count in 1..15usize,
        edges in proptest::collection::vec((0..15usize, 0..15usize), 0..40)
    ) {
        let mut plan = WorkflowPlan::new((0..node_count).map(|i| SectionId::new(format!("n{i}"))));
        for (from, to) in edges {
            if from < node_count && to < node_count && from != to {
                plan = plan.with_dependency(format!("n{to}").as_str(), format!("n{from}").as_str());
            }
        }

        match DependencyGraph::new(&plan) {
            Ok(graph) => {
                // a valid graph always yields a complete topological order
                let order = graph.topological_order();
                prop_assert_eq!(order.len(), node_count);
                for (pos, id) in order.iter().enumerate() {
                    for dep in graph.dependencies(id).unwrap() {
                        let dep_pos = order.iter().position(|x| x == dep).unwrap();
                        prop_assert!(dep_pos < pos);
                    }
                }
            }
            Err(GraphError::CycleDetected { members }) => prop_assert!(members.len() >= 2),
            Err(other) => prop_assert!(false, "unexpected error {other}"),
        }
    }
}

#[test]
fn test_rejects_three_way_cycle() {
    let plan = WorkflowPlan::new(["a", "b", "c", "d"])
        .with_dependency("b", "a")
        .with_dependency("c", "b")
        .with_dependency("a", "c")
        .with_dependency("d", "a");

    match DependencyGraph::new(&plan) {
        Err(GraphError::CycleDetected { members }) => {
            assert_eq!(members, vec![SectionId::from("a"), SectionId::from("b"), SectionId::from("c")]);
        }
        other => panic!("expected cycle, got {other:?}"),
    }
}

#[test]
fn test_plan_round_trips_through_graph() {
    let plan = WorkflowPlan::new(["a", "b", "c"])
        .with_dependency("c", "a")
        .with_dependency("c", "b");
    let graph = DependencyGraph::new(&plan).unwrap();

    assert_eq!(graph.to_plan(), plan);
}
