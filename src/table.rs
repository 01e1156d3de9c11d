use crate::context::ContextId;

/// The number of slots a table starts with.
const INITIAL_CAPACITY: usize = 8;

/// A slot of the [`RecursionTable`].
///
/// A slot stays bound to the last context that used it. Slots whose count has
/// dropped back to zero are free to be rebound to another context.
#[derive(Copy, Clone, Debug, Default)]
struct Slot {
    context: Option<ContextId>,
    reads: u32,
}

impl Slot {
    fn is_free(&self) -> bool {
        self.context.is_none() || self.reads == 0
    }
}

/// Maps execution contexts to the number of read locks they hold, or are in
/// the middle of acquiring.
///
/// The expected number of distinct contexts concurrently touching one lock is
/// small, so lookups are a linear scan over a flat array of slots. Records are
/// never removed, slots are reused once their count returns to zero, and the
/// array doubles when every slot is in use.
#[derive(Debug)]
pub(crate) struct RecursionTable {
    slots: Box<[Slot]>,
}

impl RecursionTable {
    pub(crate) fn new() -> Self {
        Self::with_capacity(INITIAL_CAPACITY)
    }

    fn with_capacity(capacity: usize) -> Self {
        Self { slots: vec![Slot::default(); capacity.max(1)].into_boxed_slice() }
    }

    /// Returns the read count recorded for `context`, zero if none.
    pub(crate) fn reads(&self, context: ContextId) -> u32 {
        self.find(context).map_or(0, |index| self.slots[index].reads)
    }

    /// Returns a mutable reference to the read count of `context`, creating a
    /// record for it if there is none.
    pub(crate) fn reads_mut(&mut self, context: ContextId) -> &mut u32 {
        let index = match self.find(context) {
            Some(index) => index,
            None => self.bind(context),
        };
        &mut self.slots[index].reads
    }

    /// Returns the number of slots, in use or not.
    pub(crate) fn capacity(&self) -> usize {
        self.slots.len()
    }

    fn find(&self, context: ContextId) -> Option<usize> {
        self.slots.iter().position(|slot| slot.context == Some(context))
    }

    /// Binds a free slot to `context`, doubling the table if there is none.
    fn bind(&mut self, context: ContextId) -> usize {
        let index = match self.slots.iter().position(Slot::is_free) {
            Some(index) => index,
            None => self.grow(),
        };
        self.slots[index] = Slot { context: Some(context), reads: 0 };
        index
    }

    /// Doubles the table and returns the index of the first new slot.
    fn grow(&mut self) -> usize {
        let len = self.capacity();
        let mut slots = Vec::with_capacity(len * 2);
        slots.extend_from_slice(&self.slots);
        slots.resize(len * 2, Slot::default());
        self.slots = slots.into_boxed_slice();
        tracing::trace!(capacity = len * 2, "recursion table grown");
        len
    }
}

#[cfg(all(not(loom), test))]
mod test {
    use std::thread;

    use proptest::prelude::*;

    use super::{RecursionTable, INITIAL_CAPACITY};
    use crate::context::ContextId;

    /// Returns `count` distinct context ids.
    fn contexts(count: usize) -> Vec<ContextId> {
        (0..count).map(|_| thread::spawn(ContextId::current).join().unwrap()).collect()
    }

    #[test]
    fn missing_context_reads_zero() {
        let table = RecursionTable::new();
        assert_eq!(table.reads(ContextId::current()), 0);
    }

    #[test]
    fn records_reads() {
        let mut table = RecursionTable::new();
        let context = ContextId::current();
        *table.reads_mut(context) = 1;
        assert_eq!(table.reads(context), 1);
        *table.reads_mut(context) = 0;
        assert_eq!(table.reads(context), 0);
    }

    #[test]
    fn reuses_free_slots() {
        let mut table = RecursionTable::new();
        for context in contexts(INITIAL_CAPACITY * 3) {
            *table.reads_mut(context) = 1;
            *table.reads_mut(context) = 0;
        }
        assert_eq!(table.capacity(), INITIAL_CAPACITY);
    }

    #[test]
    fn doubles_when_full() {
        let mut table = RecursionTable::new();
        let contexts = contexts(INITIAL_CAPACITY + 1);
        for context in &contexts {
            *table.reads_mut(*context) = 1;
        }
        assert_eq!(table.capacity(), INITIAL_CAPACITY * 2);
        for context in &contexts {
            assert_eq!(table.reads(*context), 1);
        }
    }

    proptest! {
        #[test]
        fn held_counts_survive_other_contexts(held in proptest::collection::vec(any::<bool>(), 1..40)) {
            let contexts = contexts(held.len());
            let mut table = RecursionTable::new();
            for (context, held) in contexts.iter().zip(&held) {
                *table.reads_mut(*context) = 1;
                if !held {
                    *table.reads_mut(*context) = 0;
                }
            }
            for (context, held) in contexts.iter().zip(&held) {
                prop_assert_eq!(table.reads(*context), u32::from(*held));
            }
        }
    }
}
