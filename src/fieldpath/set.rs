//! Set types for field path tracking.

use super::path::{Path, PathElement};
use std::collections::BTreeMap;

/// PathElementSet is a sorted set of PathElements for efficient membership
/// testing.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PathElementSet {
    members: Vec<PathElement>,
}

impl PathElementSet {
    /// Creates a new empty set.
    pub fn new() -> Self {
        PathElementSet {
            members: Vec::new(),
        }
    }

    /// Creates a set from a vector of elements (will be sorted).
    pub fn from_vec(mut elements: Vec<PathElement>) -> Self {
        elements.sort();
        elements.dedup();
        PathElementSet { members: elements }
    }

    /// Returns the number of elements in the set.
    pub fn len(&self) -> usize {
        self.members.len()
    }

    /// Returns true if the set is empty.
    pub fn is_empty(&self) -> bool {
        self.members.is_empty()
    }

    /// Returns true if the set contains the given element.
    pub fn contains(&self, element: &PathElement) -> bool {
        self.members.binary_search(element).is_ok()
    }

    /// Inserts an element into the set.
    pub fn insert(&mut self, element: PathElement) {
        match self.members.binary_search(&element) {
            Ok(_) => {}
            Err(pos) => self.members.insert(pos, element),
        }
    }

    /// Removes an element from the set.
    pub fn remove(&mut self, element: &PathElement) -> bool {
        match self.members.binary_search(element) {
            Ok(pos) => {
                self.members.remove(pos);
                true
            }
            Err(_) => false,
        }
    }

    /// Returns an iterator over the elements in sorted order.
    pub fn iter(&self) -> impl Iterator<Item = &PathElement> {
        self.members.iter()
    }

    /// Returns the union of two sets.
    pub fn union(&self, other: &PathElementSet) -> PathElementSet {
        let mut result = Vec::with_capacity(self.len() + other.len());
        let mut i = 0;
        let mut j = 0;

        while i < self.members.len() && j < other.members.len() {
            match self.members[i].cmp(&other.members[j]) {
                std::cmp::Ordering::Less => {
                    result.push(self.members[i].clone());
                    i += 1;
                }
                std::cmp::Ordering::Greater => {
                    result.push(other.members[j].clone());
                    j += 1;
                }
                std::cmp::Ordering::Equal => {
                    result.push(self.members[i].clone());
                    i += 1;
                    j += 1;
                }
            }
        }

        result.extend(self.members[i..].iter().cloned());
        result.extend(other.members[j..].iter().cloned());

        PathElementSet { members: result }
    }

    /// Returns the intersection of two sets.
    pub fn intersection(&self, other: &PathElementSet) -> PathElementSet {
        let mut result = Vec::new();
        let mut i = 0;
        let mut j = 0;

        while i < self.members.len() && j < other.members.len() {
            match self.members[i].cmp(&other.members[j]) {
                std::cmp::Ordering::Less => i += 1,
                std::cmp::Ordering::Greater => j += 1,
                std::cmp::Ordering::Equal => {
                    result.push(self.members[i].clone());
                    i += 1;
                    j += 1;
                }
            }
        }

        PathElementSet { members: result }
    }

    /// Returns the difference of two sets (self - other).
    pub fn difference(&self, other: &PathElementSet) -> PathElementSet {
        let mut result = Vec::new();
        let mut i = 0;
        let mut j = 0;

        while i < self.members.len() && j < other.members.len() {
            match self.members[i].cmp(&other.members[j]) {
                std::cmp::Ordering::Less => {
                    result.push(self.members[i].clone());
                    i += 1;
                }
                std::cmp::Ordering::Greater => j += 1,
                std::cmp::Ordering::Equal => {
                    i += 1;
                    j += 1;
                }
            }
        }

        result.extend(self.members[i..].iter().cloned());

        PathElementSet { members: result }
    }
}

/// SetNodeMap maps PathElements to child Sets.
pub type SetNodeMap = BTreeMap<PathElement, Set>;

/// Set is a trie of paths, used to track groups of fields.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Set {
    /// Paths that terminate at this level.
    pub members: PathElementSet,
    /// Nested children for deeper paths.
    pub children: SetNodeMap,
    /// True if the empty path (root itself) is in this set.
    root_in_set: bool,
}

impl Set {
    /// Creates a new empty set.
    pub fn new() -> Self {
        Set {
            members: PathElementSet::new(),
            children: BTreeMap::new(),
            root_in_set: false,
        }
    }

    /// Creates a set containing the given paths.
    pub fn from_paths(paths: impl IntoIterator<Item = Path>) -> Self {
        let mut set = Set::new();
        for path in paths {
            set.insert(&path);
        }
        set
    }

    /// Returns true if the set is empty.
    pub fn is_empty(&self) -> bool {
        !self.root_in_set && self.members.is_empty() && self.children.is_empty()
    }

    /// Returns the number of paths in the set.
    pub fn size(&self) -> usize {
        let mut n = 0;
        self.iterate(|_| n += 1);
        n
    }

    /// Returns true if this set equals another set.
    pub fn equals(&self, other: &Set) -> bool {
        self == other
    }

    /// Returns true if the set contains the given path.
    pub fn has(&self, path: &Path) -> bool {
        if path.is_empty() {
            return self.root_in_set;
        }
        self.has_path_elements(path.as_slice())
    }

    fn has_path_elements(&self, elements: &[PathElement]) -> bool {
        let first = &elements[0];
        let rest = &elements[1..];

        if rest.is_empty() {
            return self.members.contains(first);
        }

        match self.children.get(first) {
            Some(child) => child.has_path_elements(rest),
            None => false,
        }
    }

    /// Returns true if the path or any ancestor of it is in the set.
    pub fn covers(&self, path: &Path) -> bool {
        if self.root_in_set {
            return true;
        }
        let mut node = self;
        for pe in path.as_slice() {
            if node.members.contains(pe) {
                return true;
            }
            match node.children.get(pe) {
                Some(child) => node = child,
                None => return false,
            }
        }
        false
    }

    /// Inserts a path into the set.
    pub fn insert(&mut self, path: &Path) {
        if path.is_empty() {
            self.root_in_set = true;
            return;
        }
        self.insert_path_elements(path.as_slice());
    }

    fn insert_path_elements(&mut self, elements: &[PathElement]) {
        let first = &elements[0];
        let rest = &elements[1..];

        if rest.is_empty() {
            self.members.insert(first.clone());
            return;
        }

        let child = self.children.entry(first.clone()).or_default();
        child.insert_path_elements(rest);
    }

    /// Returns the union of two sets.
    pub fn union(&self, other: &Set) -> Set {
        let mut result = self.clone();
        result.union_into(other);
        result
    }

    fn union_into(&mut self, other: &Set) {
        self.root_in_set = self.root_in_set || other.root_in_set;
        self.members = self.members.union(&other.members);

        for (key, other_child) in &other.children {
            if let Some(self_child) = self.children.get_mut(key) {
                self_child.union_into(other_child);
            } else {
                self.children.insert(key.clone(), other_child.clone());
            }
        }
    }

    /// Returns the intersection of two sets.
    pub fn intersection(&self, other: &Set) -> Set {
        let root_in_set = self.root_in_set && other.root_in_set;
        let members = self.members.intersection(&other.members);

        let mut children = BTreeMap::new();
        for (key, self_child) in &self.children {
            if let Some(other_child) = other.children.get(key) {
                let child = self_child.intersection(other_child);
                if !child.is_empty() {
                    children.insert(key.clone(), child);
                }
            }
        }

        Set { members, children, root_in_set }
    }

    /// Returns the difference of two sets (self - other).
    pub fn difference(&self, other: &Set) -> Set {
        let root_in_set = self.root_in_set && !other.root_in_set;
        let members = self.members.difference(&other.members);

        let mut children = BTreeMap::new();
        for (key, self_child) in &self.children {
            if let Some(other_child) = other.children.get(key) {
                let child = self_child.difference(other_child);
                if !child.is_empty() {
                    children.insert(key.clone(), child);
                }
            } else {
                children.insert(key.clone(), self_child.clone());
            }
        }

        Set { members, children, root_in_set }
    }

    /// Visits every path in the set in lexicographic path order.
    ///
    /// A member and a subtree rooted at the same element visit the member
    /// (the shorter path) first.
    pub fn iterate<F>(&self, mut f: F)
    where
        F: FnMut(&Path),
    {
        let mut current = Path::new();
        self.iterate_with_path(&mut current, &mut f);
    }

    fn iterate_with_path<F>(&self, current_path: &mut Path, f: &mut F)
    where
        F: FnMut(&Path),
    {
        if self.root_in_set && current_path.is_empty() {
            f(current_path);
        }

        // Merge the sorted member list and sorted child map so output is in
        // path order, not members-then-children order.
        let mut members = self.members.iter().peekable();
        let mut children = self.children.iter().peekable();

        loop {
            let emit_member = match (members.peek(), children.peek()) {
                (Some(m), Some((c, _))) => *m <= *c,
                (Some(_), None) => true,
                (None, Some(_)) => false,
                (None, None) => break,
            };

            if emit_member {
                let member = members.next().unwrap();
                current_path.push(member.clone());
                f(current_path);
                current_path.pop();
            } else {
                let (key, child) = children.next().unwrap();
                current_path.push(key.clone());
                child.iterate_with_path(current_path, f);
                current_path.pop();
            }
        }
    }

    /// Collects every path in the set, in order.
    pub fn paths(&self) -> Vec<Path> {
        let mut out = Vec::new();
        self.iterate(|p| out.push(p.clone()));
        out
    }
}
