use std::collections::HashMap;

use uuid::Uuid;

/// Set of ids that iterates in insertion order.
///
/// Insert, remove and lookup are O(1) amortized. Removal leaves a tombstone;
/// the slot vector is compacted once tombstones outnumber live entries.
#[derive(Debug, Clone, Default)]
pub struct OrderedIdSet {
    slots: Vec<Option<Uuid>>,
    positions: HashMap<Uuid, usize>,
}

impl OrderedIdSet {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends `id`. Returns `false` if it was already present.
    pub fn insert(&mut self, id: Uuid) -> bool {
        if self.positions.contains_key(&id) {
            return false;
        }
        self.positions.insert(id, self.slots.len());
        self.slots.push(Some(id));
        true
    }

    /// Returns `false` if `id` was not present.
    pub fn remove(&mut self, id: &Uuid) -> bool {
        let Some(position) = self.positions.remove(id) else {
            return false;
        };
        self.slots[position] = None;
        if self.slots.len() > 2 * self.positions.len() + 8 {
            self.compact();
        }
        true
    }

    #[must_use]
    pub fn contains(&self, id: &Uuid) -> bool {
        self.positions.contains_key(id)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.positions.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.positions.is_empty()
    }

    /// Live ids in insertion order.
    pub fn iter(&self) -> impl Iterator<Item = Uuid> + '_ {
        self.slots.iter().filter_map(|slot| *slot)
    }

    fn compact(&mut self) {
        self.slots.retain(Option::is_some);
        for (position, slot) in self.slots.iter().enumerate() {
            if let Some(id) = slot {
                self.positions.insert(*id, position);
            }
        }
    }
}

impl FromIterator<Uuid> for OrderedIdSet {
    fn from_iter<T: IntoIterator<Item = Uuid>>(iter: T) -> Self {
        let mut set = Self::new();
        for id in iter {
            set.insert(id);
        }
        set
    }
}

/// Bipartite many-to-many relation between parents and children.
///
/// Both directions are stored so that every query is a single map lookup.
/// An edge `(p, c)` exists iff `c` is in `children_of(p)` and `p` is in
/// `parents_of(c)`.
#[derive(Debug, Clone, Default)]
pub struct RelationGraph {
    children: HashMap<Uuid, OrderedIdSet>,
    parents: HashMap<Uuid, OrderedIdSet>,
}

impl RelationGraph {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds the edge. Returns `false` if it already existed.
    pub fn add_edge(&mut self, parent: Uuid, child: Uuid) -> bool {
        if !self.children.entry(parent).or_default().insert(child) {
            return false;
        }
        self.parents.entry(child).or_default().insert(parent);
        true
    }

    /// Removes the edge. Returns `false` if it did not exist.
    pub fn remove_edge(&mut self, parent: Uuid, child: Uuid) -> bool {
        let removed = self
            .children
            .get_mut(&parent)
            .is_some_and(|set| set.remove(&child));
        if !removed {
            return false;
        }
        Self::prune(&mut self.children, parent);
        if let Some(set) = self.parents.get_mut(&child) {
            set.remove(&parent);
        }
        Self::prune(&mut self.parents, child);
        true
    }

    #[must_use]
    pub fn has_edge(&self, parent: Uuid, child: Uuid) -> bool {
        self.children
            .get(&parent)
            .is_some_and(|set| set.contains(&child))
    }

    /// Children of `parent` in edge creation order.
    pub fn children_of(&self, parent: Uuid) -> impl Iterator<Item = Uuid> + '_ {
        self.children
            .get(&parent)
            .into_iter()
            .flat_map(|set| set.iter())
    }

    /// Parents of `child` in edge creation order.
    pub fn parents_of(&self, child: Uuid) -> impl Iterator<Item = Uuid> + '_ {
        self.parents
            .get(&child)
            .into_iter()
            .flat_map(|set| set.iter())
    }

    #[must_use]
    pub fn nb_children(&self, parent: Uuid) -> usize {
        self.children.get(&parent).map_or(0, OrderedIdSet::len)
    }

    #[must_use]
    pub fn nb_parents(&self, child: Uuid) -> usize {
        self.parents.get(&child).map_or(0, OrderedIdSet::len)
    }

    /// Total number of edges.
    #[must_use]
    pub fn nb_edges(&self) -> usize {
        self.children.values().map(OrderedIdSet::len).sum()
    }

    /// Drops every edge touching `node`, on either side. Returns the number
    /// of edges removed.
    pub fn remove_node(&mut self, node: Uuid) -> usize {
        let mut removed = 0;
        if let Some(children) = self.children.remove(&node) {
            for child in children.iter() {
                if let Some(set) = self.parents.get_mut(&child) {
                    set.remove(&node);
                }
                Self::prune(&mut self.parents, child);
                removed += 1;
            }
        }
        if let Some(parents) = self.parents.remove(&node) {
            for parent in parents.iter() {
                if let Some(set) = self.children.get_mut(&parent) {
                    set.remove(&node);
                }
                Self::prune(&mut self.children, parent);
                removed += 1;
            }
        }
        removed
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.children.is_empty()
    }

    /// Ordered child lists, one per parent.
    #[must_use]
    pub fn children_lists(&self) -> Vec<(Uuid, Vec<Uuid>)> {
        let mut lists: Vec<_> = self
            .children
            .iter()
            .map(|(parent, set)| (*parent, set.iter().collect()))
            .collect();
        lists.sort_by_key(|(parent, _)| *parent);
        lists
    }

    /// Ordered parent lists, one per child.
    #[must_use]
    pub fn parents_lists(&self) -> Vec<(Uuid, Vec<Uuid>)> {
        let mut lists: Vec<_> = self
            .parents
            .iter()
            .map(|(child, set)| (*child, set.iter().collect()))
            .collect();
        lists.sort_by_key(|(child, _)| *child);
        lists
    }

    /// Rebuilds a graph from ordered lists, restoring both orders.
    ///
    /// Returns `None` when the two sides describe different edge sets.
    #[must_use]
    pub fn from_lists(
        children: Vec<(Uuid, Vec<Uuid>)>,
        parents: Vec<(Uuid, Vec<Uuid>)>,
    ) -> Option<Self> {
        let graph = Self {
            children: children
                .into_iter()
                .filter(|(_, list)| !list.is_empty())
                .map(|(parent, list)| (parent, list.into_iter().collect()))
                .collect(),
            parents: parents
                .into_iter()
                .filter(|(_, list)| !list.is_empty())
                .map(|(child, list)| (child, list.into_iter().collect()))
                .collect(),
        };
        let forward = graph.nb_edges();
        let backward: usize = graph.parents.values().map(OrderedIdSet::len).sum();
        let symmetric = forward == backward
            && graph.parents.iter().all(|(child, set)| {
                set.iter().all(|parent| graph.has_edge(parent, *child))
            });
        symmetric.then_some(graph)
    }

    fn prune(map: &mut HashMap<Uuid, OrderedIdSet>, key: Uuid) {
        if map.get(&key).is_some_and(OrderedIdSet::is_empty) {
            map.remove(&key);
        }
    }
}
