//! Cross-indexed triple storage.
//!
//! Every live triple sits in two structures at once: the chronological
//! list L (head = oldest, tail = newest) and exactly one level queue
//! (head = newest, tail = oldest). Both are intrusive doubly-linked lists
//! over a single slab arena, so a triple can be unlinked from either end
//! of either structure, or spliced out of the middle of L, in O(1) by
//! slot id. Slots are recycled through a free list.

use swave_types::Triple;

type SlotId = usize;

#[derive(Debug, Clone)]
struct Slot {
    triple: Triple,
    level: usize,
    chron_prev: Option<SlotId>,
    chron_next: Option<SlotId>,
    /// Toward the queue head (newer).
    queue_prev: Option<SlotId>,
    /// Toward the queue tail (older).
    queue_next: Option<SlotId>,
}

#[derive(Debug, Clone, Copy, Default)]
struct Ends {
    head: Option<SlotId>,
    tail: Option<SlotId>,
    len: usize,
}

#[derive(Debug)]
pub(crate) struct TripleList {
    slots: Vec<Option<Slot>>,
    free: Vec<SlotId>,
    chron: Ends,
    levels: Vec<Ends>,
}

impl TripleList {
    pub(crate) fn new(num_levels: usize) -> Self {
        Self {
            slots: Vec::new(),
            free: Vec::new(),
            chron: Ends::default(),
            levels: vec![Ends::default(); num_levels],
        }
    }

    /// Drop every triple and re-shape the level queues.
    pub(crate) fn rebuild(&mut self, num_levels: usize) {
        self.slots.clear();
        self.free.clear();
        self.chron = Ends::default();
        self.levels.clear();
        self.levels.resize(num_levels, Ends::default());
    }

    /// Drop every triple, keeping the level shape.
    pub(crate) fn clear(&mut self) {
        let num_levels = self.levels.len();
        self.rebuild(num_levels);
    }

    pub(crate) fn len(&self) -> usize {
        self.chron.len
    }

    pub(crate) fn is_empty(&self) -> bool {
        self.chron.len == 0
    }

    pub(crate) fn num_levels(&self) -> usize {
        self.levels.len()
    }

    pub(crate) fn level_len(&self, level: usize) -> usize {
        self.levels[level].len
    }

    /// Oldest triple, if any.
    pub(crate) fn front(&self) -> Option<Triple> {
        self.chron.head.map(|id| self.slot(id).triple)
    }

    /// Append a triple: tail of L, head of its level queue.
    pub(crate) fn push(&mut self, triple: Triple, level: usize) {
        debug_assert!(level < self.levels.len(), "level index out of range");

        let chron_tail = self.chron.tail;
        let queue_head = self.levels[level].head;
        let id = self.alloc(Slot {
            triple,
            level,
            chron_prev: chron_tail,
            chron_next: None,
            queue_prev: None,
            queue_next: queue_head,
        });

        match chron_tail {
            Some(tail) => self.slot_mut(tail).chron_next = Some(id),
            None => self.chron.head = Some(id),
        }
        self.chron.tail = Some(id);
        self.chron.len += 1;

        match queue_head {
            Some(head) => self.slot_mut(head).queue_prev = Some(id),
            None => self.levels[level].tail = Some(id),
        }
        self.levels[level].head = Some(id);
        self.levels[level].len += 1;
    }

    /// Remove and return the oldest triple, unlinking it from both L and
    /// its level queue.
    pub(crate) fn pop_front(&mut self) -> Option<Triple> {
        let id = self.chron.head?;
        let triple = self.slot(id).triple;
        self.unlink_chron(id);
        self.unlink_queue(id);
        self.release(id);
        Some(triple)
    }

    /// Remove and return the tail (oldest entry) of a level queue,
    /// splicing it out of L wherever it sits.
    pub(crate) fn evict_level_tail(&mut self, level: usize) -> Option<Triple> {
        let id = self.levels[level].tail?;
        let triple = self.slot(id).triple;
        self.unlink_queue(id);
        self.unlink_chron(id);
        self.release(id);
        Some(triple)
    }

    /// Triples in chronological order, oldest first.
    pub(crate) fn iter(&self) -> impl Iterator<Item = Triple> + '_ {
        LinkIter {
            list: self,
            next: self.chron.head,
            follow: |slot: &Slot| slot.chron_next,
        }
    }

    /// Triples in reverse chronological order, newest first.
    pub(crate) fn iter_rev(&self) -> impl Iterator<Item = Triple> + '_ {
        LinkIter {
            list: self,
            next: self.chron.tail,
            follow: |slot: &Slot| slot.chron_prev,
        }
    }

    /// Triples of one level queue, newest first.
    pub(crate) fn level_iter(&self, level: usize) -> impl Iterator<Item = Triple> + '_ {
        LinkIter {
            list: self,
            next: self.levels[level].head,
            follow: |slot: &Slot| slot.queue_next,
        }
    }

    fn slot(&self, id: SlotId) -> &Slot {
        self.slots[id]
            .as_ref()
            .unwrap_or_else(|| unreachable!("dangling slot id {id}"))
    }

    fn slot_mut(&mut self, id: SlotId) -> &mut Slot {
        self.slots[id]
            .as_mut()
            .unwrap_or_else(|| unreachable!("dangling slot id {id}"))
    }

    fn alloc(&mut self, slot: Slot) -> SlotId {
        if let Some(id) = self.free.pop() {
            self.slots[id] = Some(slot);
            id
        } else {
            self.slots.push(Some(slot));
            self.slots.len() - 1
        }
    }

    fn release(&mut self, id: SlotId) {
        self.slots[id] = None;
        self.free.push(id);
    }

    fn unlink_chron(&mut self, id: SlotId) {
        let (prev, next) = {
            let slot = self.slot(id);
            (slot.chron_prev, slot.chron_next)
        };
        match prev {
            Some(p) => self.slot_mut(p).chron_next = next,
            None => self.chron.head = next,
        }
        match next {
            Some(n) => self.slot_mut(n).chron_prev = prev,
            None => self.chron.tail = prev,
        }
        self.chron.len -= 1;
    }

    fn unlink_queue(&mut self, id: SlotId) {
        let (level, prev, next) = {
            let slot = self.slot(id);
            (slot.level, slot.queue_prev, slot.queue_next)
        };
        match prev {
            Some(p) => self.slot_mut(p).queue_next = next,
            None => self.levels[level].head = next,
        }
        match next {
            Some(n) => self.slot_mut(n).queue_prev = prev,
            None => self.levels[level].tail = prev,
        }
        self.levels[level].len -= 1;
    }

    /// Structural consistency: the chronological list and the level queues
    /// cover exactly the same slots, each slot in exactly one queue, and
    /// every length field matches its chain.
    #[cfg(test)]
    pub(crate) fn check_consistency(&self) -> Result<(), String> {
        use std::collections::HashSet;

        let mut chron_ids = HashSet::new();
        let mut cursor = self.chron.head;
        while let Some(id) = cursor {
            if !chron_ids.insert(id) {
                return Err(format!("slot {id} repeated in chronological list"));
            }
            cursor = self.slot(id).chron_next;
        }
        if chron_ids.len() != self.chron.len {
            return Err(format!(
                "chronological length {} does not match chain {}",
                self.chron.len,
                chron_ids.len()
            ));
        }

        let mut queued_ids = HashSet::new();
        for (level, ends) in self.levels.iter().enumerate() {
            let mut count = 0;
            let mut cursor = ends.head;
            while let Some(id) = cursor {
                if self.slot(id).level != level {
                    return Err(format!("slot {id} linked into foreign level {level}"));
                }
                if !queued_ids.insert(id) {
                    return Err(format!("slot {id} present in more than one queue"));
                }
                count += 1;
                cursor = self.slot(id).queue_next;
            }
            if count != ends.len {
                return Err(format!(
                    "level {level} length {} does not match chain {count}",
                    ends.len
                ));
            }
        }

        if queued_ids != chron_ids {
            return Err("queue membership does not match chronological list".to_owned());
        }
        Ok(())
    }
}

struct LinkIter<'a, F> {
    list: &'a TripleList,
    next: Option<SlotId>,
    follow: F,
}

impl<F> Iterator for LinkIter<'_, F>
where
    F: Fn(&Slot) -> Option<SlotId>,
{
    type Item = Triple;

    fn next(&mut self) -> Option<Triple> {
        let id = self.next?;
        let slot = self.list.slot(id);
        self.next = (self.follow)(slot);
        Some(slot.triple)
    }
}
