//! Row Indirection Table: a bounded, per-bank associative row remapper.
//!
//! Entries always come in locked pairs `(src -> dst)` / `(dst -> src)`. The
//! pairing is an invariant maintained by `insert`/`remove`, not a literal
//! cycle of pointers — see `RitBank`'s plain `HashMap<row, RitEntry>`.

use std::collections::HashMap;

use crate::error::Error;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RitEntry {
    pub dst_row: i64,
    pub locked: bool,
}

/// One bank's indirection table, bounded to `capacity` entries (half that
/// many pairs, since every pair occupies two entries) — matching the
/// reference's `size() >= m_num_rit_entries` check, which counts entries,
/// not pairs.
#[derive(Debug, Clone)]
pub struct RitBank {
    capacity: usize,
    map: HashMap<i64, RitEntry>,
    /// Insertion order of keys, kept alongside `map` so `get_unswap_pair`'s
    /// "first unlocked match" is deterministic rather than hash-order dependent.
    order: Vec<i64>,
}

impl RitBank {
    fn new(capacity: usize) -> Self {
        Self {
            capacity,
            map: HashMap::new(),
            order: Vec::new(),
        }
    }

    pub fn num_pairs(&self) -> usize {
        self.map.len() / 2
    }

    pub fn is_full(&self) -> bool {
        self.map.len() >= self.capacity
    }

    pub fn get(&self, row: i64) -> Option<i64> {
        self.map.get(&row).map(|e| e.dst_row)
    }

    pub fn insert(&mut self, bank: usize, src: i64, dst: i64) -> Result<(), Error> {
        if self.is_full() {
            return Err(Error::RitFull { bank });
        }
        self.map.insert(src, RitEntry { dst_row: dst, locked: true });
        self.map.insert(dst, RitEntry { dst_row: src, locked: true });
        self.order.push(src);
        self.order.push(dst);
        Ok(())
    }

    pub fn remove(&mut self, src: i64, dst: i64) {
        let src_entry = self.map.remove(&src);
        let dst_entry = self.map.remove(&dst);
        assert!(
            src_entry.is_some() && dst_entry.is_some(),
            "RIT remove({src}, {dst}) called on a pair that isn't present"
        );
        self.order.retain(|&row| row != src && row != dst);
    }

    pub fn unlock_all(&mut self) {
        for entry in self.map.values_mut() {
            entry.locked = false;
        }
    }

    /// First unlocked pair whose `src` and `dst` are both absent from `exclude`.
    /// Deterministic by insertion order, not hash order. Panics if none exist —
    /// this signals a policy bug upstream, per the runtime-assertion error kind.
    pub fn get_unswap_pair(&self, exclude: &[i64]) -> (i64, i64) {
        for &row in &self.order {
            let entry = match self.map.get(&row) {
                Some(e) => e,
                None => continue,
            };
            if entry.locked {
                continue;
            }
            if exclude.contains(&row) || exclude.contains(&entry.dst_row) {
                continue;
            }
            return (row, entry.dst_row);
        }
        panic!("RIT get_unswap_pair: no eligible unlocked entry");
    }
}

/// The full table, one [`RitBank`] per flat bank id.
#[derive(Debug, Clone)]
pub struct RowIndirectionTable {
    banks: Vec<RitBank>,
}

impl RowIndirectionTable {
    pub fn new(num_banks: usize, num_rit_entries: usize) -> Self {
        Self {
            banks: (0..num_banks).map(|_| RitBank::new(num_rit_entries)).collect(),
        }
    }

    pub fn bank(&self, bank: usize) -> &RitBank {
        &self.banks[bank]
    }

    pub fn bank_mut(&mut self, bank: usize) -> &mut RitBank {
        &mut self.banks[bank]
    }

    pub fn is_full(&self, bank: usize) -> bool {
        self.banks[bank].is_full()
    }

    pub fn insert(&mut self, bank: usize, src: i64, dst: i64) -> Result<(), Error> {
        self.banks[bank].insert(bank, src, dst)
    }

    pub fn remove(&mut self, bank: usize, src: i64, dst: i64) {
        self.banks[bank].remove(src, dst);
    }

    pub fn unlock_all(&mut self) {
        for bank in &mut self.banks {
            bank.unlock_all();
        }
    }

    pub fn get(&self, bank: usize, row: i64) -> Option<i64> {
        self.banks[bank].get(row)
    }

    pub fn get_unswap_pair(&self, bank: usize, exclude: &[i64]) -> (i64, i64) {
        self.banks[bank].get_unswap_pair(exclude)
    }
}
