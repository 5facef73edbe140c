//! Parent/child project forest built from the flat project list.
//!
//! Roots are projects without a parent. Siblings keep the order in which the server listed them.
//! A project whose parent is missing from the list is unreachable and left out, and so is every
//! project on a parent cycle, since no root leads to it.
//!
//! Building, querying, walking, and dropping a tree use explicit stacks, so nesting depth is
//! bounded by memory rather than by the thread stack. The derived `Clone`, `PartialEq`, and serde
//! impls still recurse per level.

// std
use std::{collections::HashSet, mem};
// self
use crate::{_prelude::*, api::Project};

/// A project with its nested sub-projects.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProjectTree {
	/// Project at this node.
	pub project: Project,
	/// Direct sub-projects, in listing order.
	pub children: Vec<ProjectTree>,
}
impl ProjectTree {
	/// Number of projects in this subtree, including the root.
	pub fn node_count(&self) -> usize {
		let mut count = 0;

		self.walk(&mut |_, _| count += 1);

		count
	}

	/// Height of the subtree; a leaf has depth 1.
	pub fn depth(&self) -> usize {
		let mut depth = 0;

		self.walk(&mut |level, _| depth = depth.max(level + 1));

		depth
	}

	/// Finds the subtree rooted at `id`.
	pub fn find(&self, id: i64) -> Option<&ProjectTree> {
		let mut stack = vec![self];

		while let Some(node) = stack.pop() {
			if node.project.id == id {
				return Some(node);
			}

			stack.extend(node.children.iter().rev());
		}

		None
	}

	/// Visits every node in pre-order together with its nesting level (root = 0).
	pub fn walk<'a>(&'a self, visit: &mut impl FnMut(usize, &'a Project)) {
		let mut stack = vec![(0, self)];

		while let Some((level, node)) = stack.pop() {
			visit(level, &node.project);

			for child in node.children.iter().rev() {
				stack.push((level + 1, child));
			}
		}
	}
}
impl Drop for ProjectTree {
	fn drop(&mut self) {
		// Detach descendants first so each node drops with no children left.
		let mut stack = mem::take(&mut self.children);

		while let Some(mut node) = stack.pop() {
			stack.append(&mut node.children);
		}
	}
}

struct Slot<'a> {
	project: &'a Project,
	children: Vec<usize>,
}

/// Builds the project forest.
pub fn build_hierarchy(projects: &[Project]) -> Vec<ProjectTree> {
	let mut children_of: HashMap<Option<i64>, Vec<&Project>> = HashMap::new();

	for project in projects {
		children_of.entry(project.parent_project_id).or_default().push(project);
	}

	// Pre-order arena: every child lands after its parent.
	let mut slots: Vec<Slot> = Vec::new();
	let mut roots = Vec::new();
	let mut placed = HashSet::new();
	let mut stack: Vec<(Option<usize>, &Project)> = children_of
		.get(&None)
		.into_iter()
		.flatten()
		.rev()
		.map(|root| (None, *root))
		.collect();

	while let Some((parent, project)) = stack.pop() {
		// An id is placed at most once; duplicated ids would otherwise nest under themselves.
		if !placed.insert(project.id) {
			continue;
		}

		let idx = slots.len();

		slots.push(Slot { project, children: Vec::new() });

		match parent {
			Some(parent) => slots[parent].children.push(idx),
			None => roots.push(idx),
		}

		for kid in children_of.get(&Some(project.id)).into_iter().flatten().rev() {
			stack.push((Some(idx), *kid));
		}
	}

	let mut built: Vec<Option<ProjectTree>> = Vec::with_capacity(slots.len());

	built.resize_with(slots.len(), || None);

	for (idx, slot) in slots.iter().enumerate().rev() {
		let children = slot.children.iter().filter_map(|&child| built[child].take()).collect();

		built[idx] = Some(ProjectTree { project: slot.project.clone(), children });
	}

	roots.into_iter().filter_map(|root| built[root].take()).collect()
}

/// Looks up a subtree anywhere in the forest.
pub fn find_in_forest(forest: &[ProjectTree], id: i64) -> Option<&ProjectTree> {
	forest.iter().find_map(|tree| tree.find(id))
}
