//! Section dependency graph
//!
//! Static mapping from a section to the sections that must be finished before
//! it may be drafted. Built once per session from its `WorkflowPlan` and
//! validated eagerly: unknown ids, self-dependencies and cycles are rejected
//! at construction so the planner can never deadlock mid-workflow.

use crate::error::GraphError;
use crate::types::{SectionId, SectionStatus, SkipPolicy, WorkflowPlan};
use petgraph::algo::{is_cyclic_directed, tarjan_scc};
use petgraph::graph::{DiGraph, NodeIndex};
use petgraph::Direction;
use std::collections::{BTreeMap, BTreeSet, HashMap, HashSet};

#[derive(Debug, Clone)]
pub struct DependencyGraph {
    /// Priority order, also the planner's iteration order
    order: Vec<SectionId>,
    dependencies: BTreeMap<SectionId, BTreeSet<SectionId>>,
    /// Edges point from a dependency to its dependent
    inner: DiGraph<SectionId, ()>,
    index: HashMap<SectionId, NodeIndex>,
}

impl DependencyGraph {
    /// Build and validate the graph described by a plan
    pub fn new(plan: &WorkflowPlan) -> Result<Self, GraphError> {
        if plan.sections.is_empty() {
            return Err(GraphError::Empty);
        }

        let mut inner = DiGraph::new();
        let mut index = HashMap::with_capacity(plan.sections.len());
        for section in &plan.sections {
            if index.contains_key(section) {
                return Err(GraphError::DuplicateSection(section.clone()));
            }
            let node = inner.add_node(section.clone());
            index.insert(section.clone(), node);
        }

        let mut dependencies: BTreeMap<SectionId, BTreeSet<SectionId>> = plan
            .sections
            .iter()
            .map(|id| (id.clone(), BTreeSet::new()))
            .collect();

        for (section, requires) in &plan.dependencies {
            let to = *index
                .get(section)
                .ok_or_else(|| GraphError::UnknownSection(section.clone()))?;

            for dep in requires {
                if dep == section {
                    return Err(GraphError::SelfDependency(section.clone()));
                }
                let from = *index
                    .get(dep)
                    .ok_or_else(|| GraphError::UnknownSection(dep.clone()))?;
                inner.update_edge(from, to, ());
            }

            if let Some(entry) = dependencies.get_mut(section) {
                entry.extend(requires.iter().cloned());
            }
        }

        let graph = Self {
            order: plan.sections.clone(),
            dependencies,
            inner,
            index,
        };
        graph.validate()?;
        Ok(graph)
    }

    /// Reject cycles, naming the sections involved
    fn validate(&self) -> Result<(), GraphError> {
        if !is_cyclic_directed(&self.inner) {
            return Ok(());
        }

        let cyclic: HashSet<SectionId> = tarjan_scc(&self.inner)
            .into_iter()
            .filter(|component| component.len() > 1)
            .flatten()
            .map(|node| self.inner[node].clone())
            .collect();

        let members = self
            .order
            .iter()
            .filter(|id| cyclic.contains(*id))
            .cloned()
            .collect();

        Err(GraphError::CycleDetected { members })
    }

    /// Sections in priority order
    #[inline]
    #[must_use]
    pub fn sections(&self) -> &[SectionId] {
        &self.order
    }

    #[inline]
    #[must_use]
    pub fn contains(&self, section: &SectionId) -> bool {
        self.index.contains_key(section)
    }

    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.order.len()
    }

    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }

    #[must_use]
    pub fn edge_count(&self) -> usize {
        self.inner.edge_count()
    }

    /// Sections that must be finished before `section` may start
    pub fn dependencies(&self, section: &SectionId) -> Result<&BTreeSet<SectionId>, GraphError> {
        self.dependencies
            .get(section)
            .ok_or_else(|| GraphError::UnknownSection(section.clone()))
    }

    /// Sections waiting directly on `section`, in priority order
    pub fn dependents(&self, section: &SectionId) -> Result<Vec<SectionId>, GraphError> {
        let node = self
            .index
            .get(section)
            .ok_or_else(|| GraphError::UnknownSection(section.clone()))?;

        let direct: HashSet<&SectionId> = self
            .inner
            .neighbors_directed(*node, Direction::Outgoing)
            .map(|n| &self.inner[n])
            .collect();

        Ok(self
            .order
            .iter()
            .filter(|id| direct.contains(id))
            .cloned()
            .collect())
    }

    /// True iff every dependency of `section` counts as done under `policy`.
    ///
    /// Sections missing from `statuses` are treated as pending.
    pub fn satisfied(
        &self,
        section: &SectionId,
        statuses: &BTreeMap<SectionId, SectionStatus>,
        policy: SkipPolicy,
    ) -> Result<bool, GraphError> {
        let deps = self.dependencies(section)?;
        Ok(deps.iter().all(|dep| {
            statuses
                .get(dep)
                .is_some_and(|status| policy.satisfies(*status))
        }))
    }

    /// Dependency-respecting order, ties broken by priority.
    ///
    /// This is the order the planner follows when every draft passes first time.
    #[must_use]
    pub fn topological_order(&self) -> Vec<SectionId> {
        let mut emitted: HashSet<&SectionId> = HashSet::with_capacity(self.order.len());
        let mut out = Vec::with_capacity(self.order.len());

        while out.len() < self.order.len() {
            let next = self.order.iter().find(|id| {
                !emitted.contains(id)
                    && self.dependencies[*id].iter().all(|dep| emitted.contains(&dep))
            });
            match next {
                Some(id) => {
                    emitted.insert(id);
                    out.push(id.clone());
                }
                // unreachable for a validated graph
                None => break,
            }
        }

        out
    }

    /// The plan this graph was built from, normalized
    #[must_use]
    pub fn to_plan(&self) -> WorkflowPlan {
        WorkflowPlan {
            sections: self.order.clone(),
            dependencies: self
                .dependencies
                .iter()
                .filter(|(_, deps)| !deps.is_empty())
                .map(|(id, deps)| (id.clone(), deps.clone()))
                .collect(),
        }
    }
}
