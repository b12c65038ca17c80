// src/dag/graph.rs

use std::collections::{HashMap, HashSet};

use petgraph::algo::{tarjan_scc, toposort};
use petgraph::graphmap::DiGraphMap;

use crate::errors::DefinitionError;
use crate::workflow::{TaskId, Workflow};

/// Per-task adjacency plus the blockers still outstanding in this run.
#[derive(Debug, Clone)]
struct DagNode {
    /// Effective dependencies, sorted.
    deps: Vec<TaskId>,
    /// Tasks that list this one as a dependency, in workflow order.
    dependents: Vec<TaskId>,
    /// Dependencies that have not completed yet.
    blockers: HashSet<TaskId>,
}

/// Dependency graph of one workflow.
///
/// Built once per run. Construction validates the definition (unique IDs,
/// resolvable edges, no cycles); afterwards the scheduler loop is the only
/// caller of [`DependencyGraph::mark_completed`].
#[derive(Debug, Clone)]
pub struct DependencyGraph {
    workflow: String,
    /// Task IDs in workflow order; all query results follow it.
    order: Vec<TaskId>,
    position: HashMap<TaskId, usize>,
    nodes: HashMap<TaskId, DagNode>,
    completed: HashSet<TaskId>,
}

impl DependencyGraph {
    pub fn build(workflow: &Workflow) -> Result<Self, DefinitionError> {
        let mut order = Vec::with_capacity(workflow.tasks.len());
        let mut position = HashMap::with_capacity(workflow.tasks.len());

        for task in &workflow.tasks {
            if position.insert(task.id.clone(), order.len()).is_some() {
                return Err(DefinitionError::DuplicateTask {
                    workflow: workflow.name.clone(),
                    task: task.id.clone(),
                });
            }
            order.push(task.id.clone());
        }

        // Links keyed by a task that does not exist would otherwise vanish.
        if let Some(task) = workflow.dependencies.keys().find(|t| !position.contains_key(*t)) {
            return Err(DefinitionError::UnknownTask {
                workflow: workflow.name.clone(),
                task: task.clone(),
            });
        }

        let mut nodes: HashMap<TaskId, DagNode> = HashMap::with_capacity(order.len());
        for id in &order {
            let deps = workflow.effective_dependencies(id);
            if let Some(unknown) = deps.iter().find(|d| !position.contains_key(*d)) {
                return Err(DefinitionError::UnknownDependency {
                    workflow: workflow.name.clone(),
                    task: id.clone(),
                    dependency: unknown.clone(),
                });
            }
            nodes.insert(
                id.clone(),
                DagNode {
                    blockers: deps.iter().cloned().collect(),
                    deps,
                    dependents: Vec::new(),
                },
            );
        }

        // Walking `order` keeps every dependents list in workflow order.
        for id in &order {
            let deps = nodes.get(id).map(|n| n.deps.clone()).unwrap_or_default();
            for dep in deps {
                if let Some(dep_node) = nodes.get_mut(&dep) {
                    dep_node.dependents.push(id.clone());
                }
            }
        }

        let graph = Self {
            workflow: workflow.name.clone(),
            order,
            position,
            nodes,
            completed: HashSet::new(),
        };
        graph.check_acyclic()?;
        Ok(graph)
    }

    /// Edge direction is dep -> task, so a topological order is a valid
    /// execution order.
    fn check_acyclic(&self) -> Result<(), DefinitionError> {
        let mut graph: DiGraphMap<&str, ()> = DiGraphMap::new();
        for id in &self.order {
            graph.add_node(id.as_str());
        }
        for id in &self.order {
            for dep in self.dependencies_of(id) {
                graph.add_edge(dep.as_str(), id.as_str(), ());
            }
        }

        let Err(cycle) = toposort(&graph, None) else {
            return Ok(());
        };

        let offender = cycle.node_id();
        let mut members: Vec<TaskId> = tarjan_scc(&graph)
            .into_iter()
            .find(|scc| scc.contains(&offender))
            .map(|scc| scc.into_iter().map(str::to_string).collect())
            .unwrap_or_else(|| vec![offender.to_string()]);
        members.sort_by_key(|id| self.position.get(id).copied().unwrap_or(usize::MAX));

        Err(DefinitionError::Cycle {
            workflow: self.workflow.clone(),
            members,
        })
    }

    pub fn len(&self) -> usize {
        self.order.len()
    }

    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }

    pub fn dependencies_of(&self, id: &str) -> &[TaskId] {
        self.nodes.get(id).map(|n| n.deps.as_slice()).unwrap_or(&[])
    }

    pub fn dependents_of(&self, id: &str) -> &[TaskId] {
        self.nodes
            .get(id)
            .map(|n| n.dependents.as_slice())
            .unwrap_or(&[])
    }

    /// Tasks with no outstanding blockers that have not completed.
    pub fn ready_tasks(&self) -> Vec<TaskId> {
        self.order
            .iter()
            .filter(|id| !self.completed.contains(*id))
            .filter(|id| self.nodes.get(*id).is_some_and(|n| n.blockers.is_empty()))
            .cloned()
            .collect()
    }

    /// Record `id` as completed and return the dependents it unblocked.
    ///
    /// Unknown or already completed tasks unblock nothing.
    pub fn mark_completed(&mut self, id: &str) -> Vec<TaskId> {
        if !self.nodes.contains_key(id) || !self.completed.insert(id.to_string()) {
            return Vec::new();
        }

        let dependents = self.dependents_of(id).to_vec();
        let mut unblocked = Vec::new();
        for dependent in dependents {
            if let Some(node) = self.nodes.get_mut(&dependent) {
                if node.blockers.remove(id) && node.blockers.is_empty() {
                    unblocked.push(dependent);
                }
            }
        }

        unblocked.sort_by_key(|t| self.position.get(t).copied().unwrap_or(usize::MAX));
        unblocked
    }

    pub fn completed_count(&self) -> usize {
        self.completed.len()
    }

    /// Tasks not completed yet, in workflow order.
    pub fn remaining(&self) -> Vec<TaskId> {
        self.order
            .iter()
            .filter(|id| !self.completed.contains(*id))
            .cloned()
            .collect()
    }
}
