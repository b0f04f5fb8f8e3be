//! Sparse associative storage for the four Hydra table families.
//!
//! All four are "absent entry means the default value" — a plain
//! `HashMap<row_id, _>` per bank (or per rank+set, for the RCC) mirrors the
//! reference's own `std::unordered_map` choice and keeps memory proportional
//! to the working set within an epoch, collapsing to nothing at reset.

use std::collections::HashMap;

#[derive(Debug, Clone, Copy, Default)]
pub struct GctEntry {
    pub group_count: u32,
    pub initialized: bool,
}

/// One bank's Group-Count Table: `row_group_id -> GctEntry`.
#[derive(Debug, Clone, Default)]
pub struct GctBank(HashMap<i64, GctEntry>);

impl GctBank {
    pub fn get_or_default(&mut self, group_id: i64) -> &mut GctEntry {
        self.0.entry(group_id).or_default()
    }

    pub fn clear(&mut self) {
        self.0.clear();
    }

    pub fn get(&self, group_id: i64) -> Option<&GctEntry> {
        self.0.get(&group_id)
    }
}

/// One bank's Row-Count Table: `row_id -> counter`. Conceptually stored in
/// DRAM; this is the on-chip sparse mirror of that.
#[derive(Debug, Clone, Default)]
pub struct RctBank(HashMap<i64, u32>);

impl RctBank {
    pub fn get(&self, row: i64) -> Option<u32> {
        self.0.get(&row).copied()
    }

    pub fn set(&mut self, row: i64, value: u32) {
        self.0.insert(row, value);
    }

    pub fn increment(&mut self, row: i64) -> u32 {
        let entry = self.0.entry(row).or_insert(0);
        *entry += 1;
        *entry
    }

    pub fn clear(&mut self) {
        self.0.clear();
    }
}

/// The RCT-count table, used only for rows `< total_rct_row_size` (the rows
/// that hold the spilled RCT itself — see [`RctBank`]'s doc comment).
#[derive(Debug, Clone, Default)]
pub struct RctCountBank(HashMap<i64, u32>);

impl RctCountBank {
    pub fn get(&self, row: i64) -> Option<u32> {
        self.0.get(&row).copied()
    }

    pub fn increment(&mut self, row: i64) -> u32 {
        let entry = self.0.entry(row).or_insert(0);
        *entry += 1;
        *entry
    }

    pub fn remove(&mut self, row: i64) {
        self.0.remove(&row);
    }

    pub fn clear(&mut self) {
        self.0.clear();
    }
}

/// One 16-way set-associative RCC set: `tag -> counter`, plus insertion order
/// so eviction ("first match" ties, `RANDOM`'s index draw) is deterministic.
#[derive(Debug, Clone, Default)]
pub struct RccSet {
    counters: HashMap<i64, u32>,
    order: Vec<i64>,
}

impl RccSet {
    pub const CAPACITY: usize = 16;

    pub fn len(&self) -> usize {
        self.counters.len()
    }

    pub fn is_full(&self) -> bool {
        self.counters.len() >= Self::CAPACITY
    }

    pub fn get(&self, tag: i64) -> Option<u32> {
        self.counters.get(&tag).copied()
    }

    pub fn insert(&mut self, tag: i64, value: u32) {
        if self.counters.insert(tag, value).is_none() {
            self.order.push(tag);
        }
    }

    pub fn increment(&mut self, tag: i64) -> u32 {
        let entry = self.counters.entry(tag).or_insert(0);
        *entry += 1;
        *entry
    }

    pub fn remove(&mut self, tag: i64) {
        self.counters.remove(&tag);
        self.order.retain(|&t| t != tag);
    }

    pub fn contains(&self, tag: i64) -> bool {
        self.counters.contains_key(&tag)
    }

    pub fn tag_at(&self, index: usize) -> i64 {
        self.order[index]
    }

    pub fn min_count_tag(&self) -> i64 {
        self.order
            .iter()
            .copied()
            .min_by_key(|tag| self.counters[tag])
            .expect("min_count_tag called on an empty RCC set")
    }

    pub fn clear(&mut self) {
        self.counters.clear();
        self.order.clear();
    }
}
