//! The Hydra row-hammer tracker: GCT/RCC/RCT/RCT-count tables, the tick
//! contract, and periodic reset.

mod tables;

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use crate::addr_mapper::{fold_flat_bank_id, AddressMapper};
use crate::adapter::{ControllerAdapter, TranslationReserve};
use crate::config::{HydraConfig, RccPolicy};
use crate::error::{Error, Result};
use crate::request::Request;
use crate::stats::HydraStats;
use crate::topology::Topology;

use tables::{GctBank, RccSet, RctBank, RctCountBank};

/// Deterministic PRNG seed for the `RANDOM` eviction policy (spec-mandated).
const RNG_SEED: u64 = 1337;

pub struct Tracker {
    config: HydraConfig,
    stats: HydraStats,

    clk: i64,
    reset_period_clk: i64,

    vrr_id: i32,
    rd_id: i32,
    wr_id: i32,

    rank_level: usize,
    bank_group_level: Option<usize>,
    bank_level: usize,
    row_level: usize,
    col_level: usize,

    num_ranks: u32,
    num_banks_per_rank: u32,
    bank_size: u32,
    num_rows_per_bank: u32,

    row_address_bits: u32,
    counter_bits: u32,
    gct_index_bits: u32,
    rcc_set_num: u32,
    rcc_index_bits: u32,
    rcc_tag_row_bits: u32,

    total_rct_row_size: i64,
    rct_per_row: i64,
    rct_per_cl: i64,
    group_rct_cl_size: u32,
    row_group_size: u32,

    gct: Vec<GctBank>,
    rct: Vec<RctBank>,
    rcc: Vec<Vec<RccSet>>,
    rctct: Vec<RctCountBank>,

    rng: StdRng,
}

impl Tracker {
    #[allow(clippy::too_many_arguments)]
    pub fn setup(
        config: HydraConfig,
        topology: &Topology,
        mapper: &AddressMapper,
        translation: &mut impl TranslationReserve,
        max_addr: u64,
    ) -> Result<Self> {
        config.validate()?;

        let vrr_id = topology.command_id("victim-row-refresh").ok_or_else(|| {
            Error::Configuration(
                "Hydra is not compatible with a DRAM implementation that has no \
                 Victim-Row-Refresh (VRR) command"
                    .into(),
            )
        })?;
        let rd_id = topology
            .command_id("read")
            .ok_or_else(|| Error::Configuration("DRAM command table has no 'read' command".into()))?;
        let wr_id = topology
            .command_id("write")
            .ok_or_else(|| Error::Configuration("DRAM command table has no 'write' command".into()))?;

        let rank_level = topology
            .level_index("rank")
            .ok_or_else(|| Error::Configuration("topology has no 'rank' level".into()))?;
        let bank_group_level = topology.level_index("bankgroup");
        let bank_level = topology
            .level_index("bank")
            .ok_or_else(|| Error::Configuration("topology has no 'bank' level".into()))?;
        let row_level = topology
            .level_index("row")
            .ok_or_else(|| Error::Configuration("topology has no 'row' level".into()))?;
        let col_level = topology.num_levels() - 1;

        let num_ranks = topology.count(rank_level);
        let bank_size = topology.count(bank_level);
        let num_banks_per_rank = match bank_group_level {
            Some(bg) => topology.count(bg) * bank_size,
            None => bank_size,
        };
        let num_rows_per_bank = topology.count(row_level);
        let num_cls = topology.count(col_level) / 8;

        if num_rows_per_bank % config.row_group_size != 0 {
            return Err(Error::Configuration(format!(
                "row_group_size ({}) must divide num_rows_per_bank ({num_rows_per_bank})",
                config.row_group_size
            )));
        }

        let row_address_bits = log2_strict(num_rows_per_bank);
        let counter_bits = (((config.tracking_threshold as f64).log2() / 8.0).ceil() as u32) * 8;
        let gct_entries_per_bank = num_rows_per_bank / config.row_group_size;
        let gct_index_bits = log2_strict(gct_entries_per_bank);
        let rcc_set_num = config.rcc_num_per_rank / 16;
        let rcc_index_bits = log2_strict(rcc_set_num);
        let rcc_tag_row_bits = row_address_bits - rcc_index_bits;

        let total_rct_cl_size = (num_rows_per_bank as u64 * counter_bits as u64) / 512;
        let total_rct_row_size = (total_rct_cl_size as f64 / num_cls as f64).ceil() as i64;
        let rct_per_row = (num_cls as i64 * 512) / counter_bits as i64;
        let rct_per_cl = 512 / counter_bits as i64;
        let group_rct_cl_size = (config.row_group_size * counter_bits) / 512;

        let reset_period_clk =
            (config.reset_period_ns as f64 / (topology.t_ck_ps() as f64 / 1000.0)) as i64;

        let num_banks_total = (num_ranks * num_banks_per_rank) as usize;
        let row_group_size = config.row_group_size;

        let tracker = Self {
            config,
            stats: HydraStats::default(),
            clk: -1,
            reset_period_clk,
            vrr_id,
            rd_id,
            wr_id,
            rank_level,
            bank_group_level,
            bank_level,
            row_level,
            col_level,
            num_ranks,
            num_banks_per_rank,
            bank_size,
            num_rows_per_bank,
            row_address_bits,
            counter_bits,
            gct_index_bits,
            rcc_set_num,
            rcc_index_bits,
            rcc_tag_row_bits,
            total_rct_row_size,
            rct_per_row,
            rct_per_cl,
            group_rct_cl_size,
            row_group_size,
            gct: vec![GctBank::default(); num_banks_total],
            rct: vec![RctBank::default(); num_banks_total],
            rcc: (0..num_ranks)
                .map(|_| vec![RccSet::default(); rcc_set_num as usize])
                .collect(),
            rctct: vec![RctCountBank::default(); num_banks_total],
            rng: StdRng::seed_from_u64(RNG_SEED),
        };

        log::debug!(
            "hydra: setup derived num_ranks={} num_rows_per_bank={} rcc_set_num={} \
             total_rct_row_size={} row_address_bits={} counter_bits={}",
            tracker.num_ranks,
            tracker.num_rows_per_bank,
            tracker.rcc_set_num,
            tracker.total_rct_row_size,
            tracker.row_address_bits,
            tracker.counter_bits,
        );

        tracker.reserve_rct_rows(topology, mapper, translation, max_addr)?;

        Ok(tracker)
    }

    fn reserve_rct_rows(
        &self,
        topology: &Topology,
        mapper: &AddressMapper,
        translation: &mut impl TranslationReserve,
        max_addr: u64,
    ) -> Result<()> {
        let mut addr = 0u64;
        while addr < max_addr {
            let mut req = Request::new(addr, topology.num_levels(), 0, 0);
            mapper.apply(&mut req, topology);
            let row_id = req.addr_vec[self.row_level] as i64;
            if row_id < self.total_rct_row_size {
                translation.reserve(addr, row_id)?;
                log::debug!("hydra: reserved addr {addr:#x} for RCT row {row_id}");
            }
            addr += 64;
        }
        Ok(())
    }

    pub fn stats(&self) -> &HydraStats {
        &self.stats
    }

    /// Advance the clock by one tick, observing `request` if an activation was
    /// found this tick (`None` models `request_found == false`).
    pub fn update(&mut self, adapter: &mut impl ControllerAdapter, request: Option<&Request>) {
        self.clk += 1;
        if self.clk % self.reset_period_clk == 0 {
            self.reset_all_tables();
        }

        let Some(req) = request else { return };
        let topology = adapter.topology();
        if !topology.is_opening(req.command_id) || topology.command_scope(req.command_id) != Some(self.row_level)
        {
            return;
        }

        self.observe_activation(adapter, req);
    }

    fn reset_all_tables(&mut self) {
        for bank in &mut self.gct {
            bank.clear();
        }
        for bank in &mut self.rct {
            bank.clear();
        }
        for rank in &mut self.rcc {
            for set in rank {
                set.clear();
            }
        }
        for bank in &mut self.rctct {
            bank.clear();
        }
        log::debug!("hydra: reset all tables at clk {}", self.clk);
    }

    fn observe_activation(&mut self, adapter: &mut impl ControllerAdapter, req: &Request) {
        let flat_bank_id = fold_flat_bank_id(&req.addr_vec, adapter.topology(), self.rank_level, self.bank_level);
        let rank_id = req.addr_vec[self.rank_level] as i64;
        let bank_id = flat_bank_id.rem_euclid(self.num_banks_per_rank as i64);
        let row_id = req.addr_vec[self.row_level] as i64;
        let gct_index = row_id >> (self.row_address_bits - self.gct_index_bits);
        let rcc_index = row_id & mask_i64(self.rcc_index_bits);
        let rcc_tag = (row_id >> (self.row_address_bits - self.rcc_tag_row_bits)) | (bank_id << self.rcc_tag_row_bits);

        // Branch A: RCT-row fast path — rows that hold the spilled RCT itself.
        if row_id < self.total_rct_row_size {
            self.stats.hydra_rctct_check += 1;
            let count = self.rctct[flat_bank_id as usize].increment(row_id);
            if count >= self.config.tracking_threshold {
                self.emit_vrr(adapter, req);
                self.stats.hydra_num_vrr_rct += 1;
                self.rctct[flat_bank_id as usize].remove(row_id);
            }
            return;
        }

        // Branch B: GCT gating.
        self.stats.hydra_gct_check += 1;
        let group_count = self.gct[flat_bank_id as usize].get_or_default(gct_index).group_count;
        if group_count < self.config.group_threshold {
            self.gct[flat_bank_id as usize].get_or_default(gct_index).group_count += 1;
            return;
        }

        // Branch C: group initialization, if this is the group's first crossing.
        if !self.gct[flat_bank_id as usize].get_or_default(gct_index).initialized {
            self.gct[flat_bank_id as usize].get_or_default(gct_index).initialized = true;
            self.stats.hydra_num_initialization += 1;

            let row_group_start = gct_index * self.row_group_size as i64;
            for r in row_group_start..row_group_start + self.row_group_size as i64 {
                self.rct[flat_bank_id as usize].set(r, self.config.group_threshold);
            }
            for i in 0..self.group_rct_cl_size as i64 {
                let (rct_row, rct_col) = self.generate_row_col_id(row_group_start + i * self.rct_per_cl);
                let mut addr_vec = req.addr_vec.clone();
                addr_vec[self.row_level] = rct_row as i32;
                addr_vec[self.col_level] = rct_col;
                adapter.priority_send(Request::new_synthetic(addr_vec, self.wr_id));
                self.stats.hydra_num_write_req += 1;
            }
        }

        // Branch C: RCC lookup.
        self.stats.hydra_rcc_check += 1;
        let set = &mut self.rcc[rank_id as usize][rcc_index as usize];
        if !set.contains(rcc_tag) {
            self.stats.hydra_num_rcc_miss += 1;
            if set.is_full() {
                self.evict_rcc_entry(adapter, req, rank_id, rcc_index);
            }
            self.stats.hydra_rct_check += 1;

            let (rct_row, rct_col) = self.generate_row_col_id(row_id);
            let mut addr_vec = req.addr_vec.clone();
            addr_vec[self.row_level] = rct_row as i32;
            addr_vec[self.col_level] = rct_col;
            adapter.priority_send(Request::new_synthetic(addr_vec, self.rd_id));
            self.stats.hydra_num_read_req += 1;

            let value = self.rct[flat_bank_id as usize].increment(row_id);
            self.rcc[rank_id as usize][rcc_index as usize].insert(rcc_tag, value);
        } else {
            self.rcc[rank_id as usize][rcc_index as usize].increment(rcc_tag);
            self.rct[flat_bank_id as usize].increment(row_id);
        }

        let counter = self.rcc[rank_id as usize][rcc_index as usize].get(rcc_tag).unwrap();
        if counter >= self.config.tracking_threshold {
            self.emit_vrr(adapter, req);
            self.rcc[rank_id as usize][rcc_index as usize].insert(rcc_tag, 0);
            self.rct[flat_bank_id as usize].set(row_id, 0);
        }
    }

    fn evict_rcc_entry(&mut self, adapter: &mut impl ControllerAdapter, req: &Request, rank_id: i64, rcc_index: i64) {
        let tag_to_evict = {
            let set = &self.rcc[rank_id as usize][rcc_index as usize];
            match self.config.rcc_policy {
                RccPolicy::Random => {
                    let index = self.rng.gen_range(0..RccSet::CAPACITY);
                    set.tag_at(index)
                }
                RccPolicy::MinCount => set.min_count_tag(),
            }
        };
        self.rcc[rank_id as usize][rcc_index as usize].remove(tag_to_evict);

        let evicted_row_id = (tag_to_evict & mask_i64(self.rcc_tag_row_bits)) << self.rcc_index_bits | rcc_index;
        let evicted_bank_id = tag_to_evict >> self.rcc_tag_row_bits;
        let (rct_row, rct_col) = self.generate_row_col_id(evicted_row_id);

        let mut addr_vec = req.addr_vec.clone();
        if let Some(bg_level) = self.bank_group_level {
            addr_vec[bg_level] = (evicted_bank_id / self.bank_size as i64) as i32;
        }
        addr_vec[self.bank_level] = (evicted_bank_id % self.bank_size as i64) as i32;
        addr_vec[self.row_level] = rct_row as i32;
        addr_vec[self.col_level] = rct_col;

        adapter.priority_send(Request::new_synthetic(addr_vec, self.wr_id));
        self.stats.hydra_num_eviction += 1;
        self.stats.hydra_num_write_req += 1;
    }

    fn emit_vrr(&mut self, adapter: &mut impl ControllerAdapter, req: &Request) {
        adapter.priority_send(Request::new_synthetic(req.addr_vec.clone(), self.vrr_id));
        self.stats.hydra_num_vrr += 1;
    }

    fn generate_row_col_id(&self, row_id: i64) -> (i64, i32) {
        let rct_row = row_id / self.rct_per_row;
        let rct_col = ((row_id % self.rct_per_row) * self.counter_bits as i64 / 512) << 3;
        (rct_row, rct_col as i32)
    }

    // --- Introspection, for tests and debug tooling. ---

    pub fn clk(&self) -> i64 {
        self.clk
    }

    pub fn gct_entry(&self, flat_bank_id: usize, gct_index: i64) -> (u32, bool) {
        match self.gct[flat_bank_id].get(gct_index) {
            Some(entry) => (entry.group_count, entry.initialized),
            None => (0, false),
        }
    }

    pub fn rct_value(&self, flat_bank_id: usize, row_id: i64) -> Option<u32> {
        self.rct[flat_bank_id].get(row_id)
    }

    pub fn rctct_contains(&self, flat_bank_id: usize, row_id: i64) -> bool {
        self.rctct[flat_bank_id].get(row_id).is_some()
    }

    pub fn rcc_len(&self, rank_id: usize, set_idx: usize) -> usize {
        self.rcc[rank_id][set_idx].len()
    }

    pub fn rcc_counter(&self, rank_id: usize, set_idx: usize, tag: i64) -> Option<u32> {
        self.rcc[rank_id][set_idx].get(tag)
    }

    pub fn gct_index_bits(&self) -> u32 {
        self.gct_index_bits
    }

    pub fn rcc_index_bits(&self) -> u32 {
        self.rcc_index_bits
    }

    pub fn rcc_tag_row_bits(&self) -> u32 {
        self.rcc_tag_row_bits
    }

    pub fn row_address_bits(&self) -> u32 {
        self.row_address_bits
    }

    pub fn total_rct_row_size(&self) -> i64 {
        self.total_rct_row_size
    }

    pub fn group_rct_cl_size(&self) -> u32 {
        self.group_rct_cl_size
    }

    pub fn num_banks_per_rank(&self) -> u32 {
        self.num_banks_per_rank
    }

    pub fn bank_size(&self) -> u32 {
        self.bank_size
    }
}

fn log2_strict(n: u32) -> u32 {
    assert!(n.is_power_of_two(), "{n} is not a power of two");
    n.trailing_zeros()
}

fn mask_i64(bits: u32) -> i64 {
    if bits == 0 {
        0
    } else {
        (1i64 << bits) - 1
    }
}
