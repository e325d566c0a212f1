//! Per-set LRU ordering of occupied ways.
//!
//! Every set owns an intrusive doubly-linked list threaded through the
//! `links` array, so a way can be found by its index and moved to the
//! front without walking the list.

#[derive(Debug, Clone, Copy, Default)]
struct Link {
    prev: Option<usize>,
    next: Option<usize>,
    linked: bool,
}

#[derive(Debug, Clone, Copy, Default)]
struct SetList {
    // most recently used
    head: Option<usize>,
    // least recently used
    tail: Option<usize>,
    len: usize,
}

#[derive(Debug)]
pub struct RecencyTracker {
    associativity: usize,
    links: Vec<Link>,
    sets: Vec<SetList>,
}

impl RecencyTracker {
    pub const LINK_BYTES: usize = size_of::<Link>();
    pub const SET_BYTES: usize = size_of::<SetList>();

    pub fn new(num_sets: usize, associativity: usize) -> Self {
        RecencyTracker {
            associativity,
            links: vec![Link::default(); num_sets * associativity],
            sets: vec![SetList::default(); num_sets],
        }
    }

    fn slot(&self, set: usize, way: usize) -> usize {
        assert!(way < self.associativity, "way {} out of range", way);
        set * self.associativity + way
    }

    pub fn len(&self, set: usize) -> usize {
        self.sets[set].len
    }

    pub fn is_empty(&self, set: usize) -> bool {
        self.sets[set].len == 0
    }

    pub fn contains(&self, set: usize, way: usize) -> bool {
        self.links[self.slot(set, way)].linked
    }

    /// Ways of `set` from most to least recently used.
    pub fn iter(&self, set: usize) -> impl Iterator<Item = usize> + '_ {
        let base = set * self.associativity;
        std::iter::successors(self.sets[set].head, move |&way| {
            self.links[base + way].next
        })
    }

    /// Moves an already tracked way to the front of its set.
    pub fn mark_most_recent(&mut self, set: usize, way: usize) {
        assert!(
            self.contains(set, way),
            "way {} of set {} is not tracked",
            way,
            set
        );
        if self.sets[set].head == Some(way) {
            return;
        }
        self.unlink(set, way);
        self.push_front(set, way);
    }

    /// Starts tracking a way that was just filled.
    pub fn insert_most_recent(&mut self, set: usize, way: usize) {
        assert!(
            !self.contains(set, way),
            "way {} of set {} is already tracked",
            way,
            set
        );
        self.push_front(set, way);
    }

    /// Removes and returns the least recently used way of a full set.
    pub fn evict_least_recent(&mut self, set: usize) -> usize {
        let list = self.sets[set];
        assert!(
            list.len == self.associativity,
            "eviction from set {} holding {} of {} ways",
            set,
            list.len,
            self.associativity
        );
        let way = match list.tail {
            Some(way) => way,
            None => panic!("set {} has no tail", set),
        };
        self.unlink(set, way);
        way
    }

    fn push_front(&mut self, set: usize, way: usize) {
        let idx = self.slot(set, way);
        let old_head = self.sets[set].head;
        self.links[idx] = Link {
            prev: None,
            next: old_head,
            linked: true,
        };
        match old_head {
            Some(head) => {
                let head_idx = self.slot(set, head);
                self.links[head_idx].prev = Some(way);
            }
            None => self.sets[set].tail = Some(way),
        }
        let list = &mut self.sets[set];
        list.head = Some(way);
        list.len += 1;
    }

    fn unlink(&mut self, set: usize, way: usize) {
        let idx = self.slot(set, way);
        let Link { prev, next, .. } = self.links[idx];

        match prev {
            Some(p) => {
                let p_idx = self.slot(set, p);
                self.links[p_idx].next = next;
            }
            None => self.sets[set].head = next,
        }
        match next {
            Some(n) => {
                let n_idx = self.slot(set, n);
                self.links[n_idx].prev = prev;
            }
            None => self.sets[set].tail = prev,
        }

        self.links[idx] = Link::default();
        self.sets[set].len -= 1;
    }
}
