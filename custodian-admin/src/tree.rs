/// Resource tree builder
///
/// Turns the flat resource records of one owner and one category into a
/// forest. A node's children are exactly the records whose `pid` equals its
/// ID, kept in input order. A record whose parent is absent from the input
/// becomes a root.
///
/// IDs must be unique and the parent relation acyclic. Records caught in a
/// parent cycle are never reachable from a root and are left out of the
/// forest; with duplicate IDs the parent/child wiring is unspecified.
///
/// # Example
///
/// ```
/// use custodian_admin::tree::build_forest;
/// # use custodian_shared::models::resource::{Resource, ResourceKind};
/// # fn resource(id: i32, pid: Option<i32>, name: &str, dir: bool) -> Resource {
/// #     Resource { id, pid, full_name: name.to_string(), is_directory: dir,
/// #         kind: ResourceKind::File, owner_id: 1, size: 0,
/// #         created_at: chrono::Utc::now(), updated_at: chrono::Utc::now() }
/// # }
///
/// let forest = build_forest(vec![
///     resource(2, Some(1), "/sub/b.txt", false),
///     resource(1, None, "/sub", true),
///     resource(3, None, "/a.txt", false),
/// ]);
///
/// assert_eq!(forest.len(), 2);
/// assert_eq!(forest[0].resource.full_name, "/sub");
/// assert_eq!(forest[0].children[0].resource.full_name, "/sub/b.txt");
/// ```

use custodian_shared::models::resource::Resource;
use std::collections::{HashMap, HashSet};

/// Resource plus its children
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResourceNode {
    /// The record
    pub resource: Resource,

    /// Direct children, in input order
    pub children: Vec<ResourceNode>,
}

impl ResourceNode {
    /// Number of nodes in this subtree, including itself
    pub fn size(&self) -> usize {
        1 + self.children.iter().map(ResourceNode::size).sum::<usize>()
    }
}

/// Builds the forest of a flat resource list
pub fn build_forest(resources: Vec<Resource>) -> Vec<ResourceNode> {
    let ids: HashSet<i32> = resources.iter().map(|r| r.id).collect();

    let mut roots = Vec::new();
    let mut children: HashMap<i32, Vec<usize>> = HashMap::new();

    for (index, resource) in resources.iter().enumerate() {
        match resource.pid {
            Some(pid) if ids.contains(&pid) => children.entry(pid).or_default().push(index),
            _ => roots.push(index),
        }
    }

    let mut slots: Vec<Option<Resource>> = resources.into_iter().map(Some).collect();

    roots
        .into_iter()
        .filter_map(|index| assemble(index, &mut slots, &children))
        .collect()
}

fn assemble(
    index: usize,
    slots: &mut [Option<Resource>],
    children: &HashMap<i32, Vec<usize>>,
) -> Option<ResourceNode> {
    let resource = slots.get_mut(index)?.take()?;

    let nodes = children
        .get(&resource.id)
        .map(|indices| {
            indices
                .iter()
                .filter_map(|child| assemble(*child, slots, children))
                .collect()
        })
        .unwrap_or_default();

    Some(ResourceNode {
        resource,
        children: nodes,
    })
}

/// Total node count of a forest
pub fn forest_size(forest: &[ResourceNode]) -> usize {
    forest.iter().map(ResourceNode::size).sum()
}
