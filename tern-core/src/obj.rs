//!
//! Facilities for object storage.
//!
//! All runtime objects live in one slot arena owned by the interpreter.
//! Slots are carved from the backing vector in batches, threaded onto a
//! free list, and moved onto an intrusive doubly-linked live list when
//! allocated. The collector walks the live list directly, so neither
//! marking nor sweeping needs to touch dead slots.
//!
//! The heap limit is enforced at step boundaries, not inside allocation:
//! when the free list runs dry past the limit, the arena grows by one
//! emergency batch and raises the overshoot flag for the driver to
//! collect at its next safe point. Collecting mid-allocation would
//! reclaim objects a native still holds outside any root.

use crate::value::{ObjRef, Value};

/// Terminator for the intrusive slot lists.
const LIST_END: u32 = u32::MAX;

/// How many slots to carve from the backing vector per refill.
pub const DEFAULT_BATCH: usize = 1024;

pub struct Slot {
    pub value: Value,
    pub mark: bool,
    /// Permanent slots are treated as GC roots until released.
    pub permanent: bool,
    prev: u32,
    next: u32,
}

pub struct Store {
    slots: Vec<Slot>,
    free_head: u32,
    live_head: u32,
    live_count: usize,
    batch: usize,
    /// Ceiling on live objects, or `None` for an unbounded heap.
    limit: Option<usize>,
    /// Set when the arena had to grow past the limit.
    overshoot: bool,
}

impl Store {
    pub fn new(limit: Option<usize>, batch: usize) -> Store {
        let mut store = Store {
            slots: Vec::new(),
            free_head: LIST_END,
            live_head: LIST_END,
            live_count: 0,
            batch: batch.max(1),
            limit,
            overshoot: false,
        };
        // Slot 0 holds the empty list. It sits outside both lists so the
        // collector never visits it and allocation never hands it out.
        store.slots.push(Slot {
            value: Value::Nil,
            mark: false,
            permanent: false,
            prev: LIST_END,
            next: LIST_END,
        });
        store
    }

    #[inline]
    pub fn value(&self, r: ObjRef) -> &Value {
        &self.slots[r.0 as usize].value
    }

    #[inline]
    pub fn value_mut(&mut self, r: ObjRef) -> &mut Value {
        &mut self.slots[r.0 as usize].value
    }

    pub fn live_count(&self) -> usize {
        self.live_count
    }

    pub fn slot_count(&self) -> usize {
        self.slots.len()
    }

    pub fn limit(&self) -> Option<usize> {
        self.limit
    }

    /// Whether the arena grew past the limit since the last check.
    pub fn take_overshoot(&mut self) -> bool {
        std::mem::take(&mut self.overshoot)
    }

    /// Whether live objects alone exceed the limit, i.e. collection
    /// cannot bring the heap back under it.
    pub fn live_over_limit(&self) -> bool {
        self.limit.map_or(false, |l| self.live_count >= l)
    }

    pub fn is_permanent(&self, r: ObjRef) -> bool {
        !r.is_nil() && self.slots[r.0 as usize].permanent
    }

    pub fn set_permanent(&mut self, r: ObjRef, permanent: bool) {
        if !r.is_nil() {
            self.slots[r.0 as usize].permanent = permanent;
        }
    }

    #[inline]
    pub fn is_marked(&self, r: ObjRef) -> bool {
        self.slots[r.0 as usize].mark
    }

    #[inline]
    pub fn set_mark(&mut self, r: ObjRef, mark: bool) {
        self.slots[r.0 as usize].mark = mark;
    }

    /// Grab a slot for `value`, carving a fresh batch if the free list is
    /// empty.
    pub fn alloc(&mut self, value: Value) -> ObjRef {
        if self.free_head == LIST_END {
            self.carve();
        }
        let idx = self.free_head;
        self.free_head = self.slots[idx as usize].next;
        let slot = &mut self.slots[idx as usize];
        slot.value = value;
        slot.mark = false;
        slot.permanent = false;
        slot.prev = LIST_END;
        slot.next = self.live_head;
        if self.live_head != LIST_END {
            self.slots[self.live_head as usize].prev = idx;
        }
        self.live_head = idx;
        self.live_count += 1;
        ObjRef(idx)
    }

    /// Unlink a live slot and thread it back onto the free list. The
    /// payload is replaced with nil so any boxed resource drops now.
    pub fn free(&mut self, r: ObjRef) {
        debug_assert!(!r.is_nil());
        let idx = r.0;
        let (prev, next) = {
            let slot = &self.slots[idx as usize];
            (slot.prev, slot.next)
        };
        if prev != LIST_END {
            self.slots[prev as usize].next = next;
        } else {
            self.live_head = next;
        }
        if next != LIST_END {
            self.slots[next as usize].prev = prev;
        }
        let slot = &mut self.slots[idx as usize];
        slot.value = Value::Nil;
        slot.prev = LIST_END;
        slot.next = self.free_head;
        self.free_head = idx;
        self.live_count -= 1;
    }

    /// Visit every live slot index, front to back. The callback must not
    /// allocate or free.
    pub fn for_each_live(&self, mut f: impl FnMut(ObjRef)) {
        let mut cur = self.live_head;
        while cur != LIST_END {
            let next = self.slots[cur as usize].next;
            f(ObjRef(cur));
            cur = next;
        }
    }

    /// Refill the free list. Carves up to the limit when one is set, and
    /// past it (raising the overshoot flag) when it is already reached.
    fn carve(&mut self) {
        let want = match self.limit {
            Some(limit) => self.batch.min(limit.saturating_sub(self.slots.len())),
            None => self.batch,
        };
        if want > 0 {
            self.carve_n(want);
        } else {
            self.overshoot = true;
            self.carve_n(self.batch);
        }
    }

    fn carve_n(&mut self, n: usize) {
        self.slots.reserve(n);
        for _ in 0..n {
            let idx = self.slots.len() as u32;
            self.slots.push(Slot {
                value: Value::Nil,
                mark: false,
                permanent: false,
                prev: LIST_END,
                next: self.free_head,
            });
            self.free_head = idx;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn alloc_links_slots_onto_the_live_list() {
        let mut store = Store::new(None, 8);
        let a = store.alloc(Value::Int(1));
        let b = store.alloc(Value::Int(2));
        assert_eq!(store.live_count(), 2);
        let mut seen = Vec::new();
        store.for_each_live(|r| seen.push(r));
        assert_eq!(seen, vec![b, a]);
    }

    #[test]
    fn freed_slots_are_reused() {
        let mut store = Store::new(None, 4);
        let a = store.alloc(Value::Int(1));
        store.free(a);
        let b = store.alloc(Value::Int(2));
        assert_eq!(a, b);
        assert_eq!(store.live_count(), 1);
    }

    #[test]
    fn exhaustion_overshoots_the_limit_and_flags_it() {
        let mut store = Store::new(Some(3), 4);
        // Slot 0 counts toward the limit, leaving two slots within it.
        store.alloc(Value::Int(1));
        store.alloc(Value::Int(2));
        assert!(!store.take_overshoot());
        store.alloc(Value::Int(3));
        assert!(store.take_overshoot());
        assert!(store.live_over_limit());
        assert!(!store.take_overshoot());
    }

    #[test]
    fn slot_zero_is_never_handed_out() {
        let mut store = Store::new(None, 2);
        for _ in 0..100 {
            let r = store.alloc(Value::Int(0));
            assert!(!r.is_nil());
            store.free(r);
        }
    }
}
