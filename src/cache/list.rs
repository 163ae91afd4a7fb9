//! Arena-backed doubly linked lists
//!
//! Nodes live in a single [`SlotArena`] and link to each other by [`SlotId`]
//! instead of by reference. A [`List`] is just a head/tail/len header, so one
//! arena can host any number of lists (one recency list for LRU, one list per
//! frequency bucket for LFU). Moving a node between lists never reallocates
//! and never invalidates its id.
//!
//! ```text
//!   List { head ─┐                             ┌─ tail }
//!                ▼                             ▼
//!   slots: [ A: prev=None next=2 ] [free] [ B: prev=0 next=None ]
//! ```

// == Slot Id ==
/// Stable index of a node inside a [`SlotArena`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SlotId(usize);

#[derive(Debug)]
struct Node<T> {
    value: T,
    prev: Option<SlotId>,
    next: Option<SlotId>,
}

// == List Header ==
/// Head, tail and length of one list living inside an arena.
///
/// Front is the most recently linked node, back the least recently linked.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct List {
    head: Option<SlotId>,
    tail: Option<SlotId>,
    len: usize,
}

impl List {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    pub fn back(&self) -> Option<SlotId> {
        self.tail
    }
}

// == Slot Arena ==
/// Slot storage with a free list for O(1) insert and remove.
#[derive(Debug)]
pub struct SlotArena<T> {
    slots: Vec<Option<Node<T>>>,
    free_list: Vec<usize>,
    len: usize,
}

impl<T> SlotArena<T> {
    pub fn new() -> Self {
        Self {
            slots: Vec::new(),
            free_list: Vec::new(),
            len: 0,
        }
    }

    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            slots: Vec::with_capacity(capacity),
            free_list: Vec::new(),
            len: 0,
        }
    }

    /// Number of occupied slots across all lists.
    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Drops every node. All list headers pointing into this arena must be
    /// reset by the caller.
    pub fn clear(&mut self) {
        self.slots.clear();
        self.free_list.clear();
        self.len = 0;
    }

    /// Moves every value out of the arena. All list headers pointing into
    /// this arena must be reset by the caller.
    pub fn drain_values(&mut self) -> Vec<T> {
        self.free_list.clear();
        self.len = 0;
        self.slots.drain(..).flatten().map(|node| node.value).collect()
    }

    pub fn get(&self, id: SlotId) -> Option<&T> {
        self.node(id).map(|node| &node.value)
    }

    pub fn get_mut(&mut self, id: SlotId) -> Option<&mut T> {
        self.node_mut(id).map(|node| &mut node.value)
    }

    fn node(&self, id: SlotId) -> Option<&Node<T>> {
        self.slots.get(id.0).and_then(|slot| slot.as_ref())
    }

    fn node_mut(&mut self, id: SlotId) -> Option<&mut Node<T>> {
        self.slots.get_mut(id.0).and_then(|slot| slot.as_mut())
    }

    // == Push Front ==
    /// Allocates a node for `value` and links it at the front of `list`.
    pub fn push_front(&mut self, list: &mut List, value: T) -> SlotId {
        let node = Node {
            value,
            prev: None,
            next: None,
        };
        let idx = if let Some(idx) = self.free_list.pop() {
            self.slots[idx] = Some(node);
            idx
        } else {
            self.slots.push(Some(node));
            self.slots.len() - 1
        };
        self.len += 1;

        let id = SlotId(idx);
        self.link_front(list, id);
        id
    }

    // == Link / Unlink ==
    /// Links a detached node at the front of `list`.
    pub fn link_front(&mut self, list: &mut List, id: SlotId) {
        let old_head = list.head;
        match self.node_mut(id) {
            Some(node) => {
                node.prev = None;
                node.next = old_head;
            }
            None => return,
        }

        match old_head.and_then(|head| self.node_mut(head)) {
            Some(head) => head.prev = Some(id),
            None => list.tail = Some(id),
        }
        list.head = Some(id);
        list.len += 1;
    }

    /// Detaches a node from `list`, keeping its slot allocated.
    ///
    /// Returns false if `id` does not name an occupied slot.
    pub fn unlink(&mut self, list: &mut List, id: SlotId) -> bool {
        let (prev, next) = match self.node_mut(id) {
            Some(node) => (node.prev.take(), node.next.take()),
            None => return false,
        };

        match prev.and_then(|p| self.node_mut(p)) {
            Some(prev_node) => prev_node.next = next,
            None => list.head = next,
        }
        match next.and_then(|n| self.node_mut(n)) {
            Some(next_node) => next_node.prev = prev,
            None => list.tail = prev,
        }
        list.len -= 1;
        true
    }

    // == Move To Front ==
    pub fn move_to_front(&mut self, list: &mut List, id: SlotId) {
        if list.head == Some(id) {
            return;
        }
        if self.unlink(list, id) {
            self.link_front(list, id);
        }
    }

    // == Remove ==
    /// Unlinks a node from `list` and frees its slot.
    pub fn remove(&mut self, list: &mut List, id: SlotId) -> Option<T> {
        if !self.unlink(list, id) {
            return None;
        }
        let node = self.slots.get_mut(id.0)?.take()?;
        self.free_list.push(id.0);
        self.len -= 1;
        Some(node.value)
    }

    // == Iteration ==
    /// Iterates `list` from front (newest) to back (oldest).
    pub fn iter<'a>(&'a self, list: &List) -> Iter<'a, T> {
        Iter {
            arena: self,
            current: list.head,
            remaining: list.len,
        }
    }

    // == Validation ==
    /// Walks `list` checking link symmetry and the cached length.
    pub fn validate(&self, list: &List) -> Result<(), String> {
        let mut count = 0;
        let mut prev: Option<SlotId> = None;
        let mut current = list.head;

        while let Some(id) = current {
            let node = self
                .node(id)
                .ok_or_else(|| format!("list links to free slot {}", id.0))?;
            if node.prev != prev {
                return Err(format!("slot {} has a broken prev link", id.0));
            }
            count += 1;
            if count > self.len {
                return Err("list contains a cycle".to_string());
            }
            prev = current;
            current = node.next;
        }

        if prev != list.tail {
            return Err("list tail does not match last node".to_string());
        }
        if count != list.len {
            return Err(format!(
                "list header says {} nodes, walked {}",
                list.len, count
            ));
        }
        Ok(())
    }
}

impl<T> Default for SlotArena<T> {
    fn default() -> Self {
        Self::new()
    }
}

/// Front-to-back iterator yielding `(SlotId, &T)`.
pub struct Iter<'a, T> {
    arena: &'a SlotArena<T>,
    current: Option<SlotId>,
    remaining: usize,
}

impl<'a, T> Iterator for Iter<'a, T> {
    type Item = (SlotId, &'a T);

    fn next(&mut self) -> Option<Self::Item> {
        if self.remaining == 0 {
            return None;
        }
        let id = self.current?;
        let node = self.arena.node(id)?;
        self.current = node.next;
        self.remaining -= 1;
        Some((id, &node.value))
    }
}
