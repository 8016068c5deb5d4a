// Transposition table for one search
//
// A fixed number of buckets indexed by the low bits of the state hash; each
// bucket keeps the full hashes already explored together with the exact
// value found for them. Only exact values are stored, so a hit can replace
// the whole subtree.

use crate::search::SearchValue;

#[derive(Debug, Clone, Copy)]
struct Entry {
    hash: u64,
    mover: usize,
    depth: u8,
    value: SearchValue,
}

/// Bucketed set of explored state hashes
#[derive(Debug)]
pub struct TranspositionTable {
    buckets: Vec<Vec<Entry>>,
    mask: u64,
    len: usize,
}

impl TranspositionTable {
    /// Creates a table with `2^bucket_bits` buckets (16 bits → 65536)
    pub fn new(bucket_bits: u8) -> Self {
        let count = 1usize << bucket_bits;
        TranspositionTable {
            buckets: vec![Vec::new(); count],
            mask: (count as u64) - 1,
            len: 0,
        }
    }

    fn bucket(&self, hash: u64) -> usize {
        (hash & self.mask) as usize
    }

    /// Value recorded for the same state, mover and remaining depth
    pub fn probe(&self, hash: u64, mover: usize, depth: u8) -> Option<SearchValue> {
        self.buckets[self.bucket(hash)]
            .iter()
            .find(|e| e.hash == hash && e.mover == mover && e.depth == depth)
            .map(|e| e.value)
    }

    /// Records an exact value; an existing entry for the same node is kept
    pub fn store(&mut self, hash: u64, mover: usize, depth: u8, value: SearchValue) {
        let idx = self.bucket(hash);
        let bucket = &mut self.buckets[idx];
        if bucket
            .iter()
            .any(|e| e.hash == hash && e.mover == mover && e.depth == depth)
        {
            return;
        }
        bucket.push(Entry {
            hash,
            mover,
            depth,
            value,
        });
        self.len += 1;
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Forgets everything, keeping the bucket allocations
    pub fn clear(&mut self) {
        for bucket in &mut self.buckets {
            bucket.clear();
        }
        self.len = 0;
    }
}
