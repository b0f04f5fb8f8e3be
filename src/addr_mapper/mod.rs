//! Pure decomposition of a linear byte address into a DRAM coordinate vector,
//! with three named interleavings and an optional Row Indirection Table.

pub mod rit;

use crate::error::{Error, Result};
use crate::request::Request;
use crate::topology::Topology;
use rit::RowIndirectionTable;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MapperScheme {
    ChRaBaRoCo,
    RoBaRaCoCh,
    Mop4ClXor,
}

impl MapperScheme {
    /// The name registered under the address-mapper interface, including the
    /// `_with_rit` variant used when the mapper wraps a [`RowIndirectionTable`].
    pub fn registered_name(self, with_rit: bool) -> &'static str {
        match (self, with_rit) {
            (MapperScheme::ChRaBaRoCo, false) => "ChRaBaRoCo",
            (MapperScheme::ChRaBaRoCo, true) => "ChRaBaRoCo_with_rit",
            (MapperScheme::RoBaRaCoCh, false) => "RoBaRaCoCh",
            (MapperScheme::RoBaRaCoCh, true) => "RoBaRaCoCh_with_rit",
            (MapperScheme::Mop4ClXor, false) => "MOP4CLXOR",
            (MapperScheme::Mop4ClXor, true) => "MOP4CLXOR_with_rit",
        }
    }
}

fn mask(bits: u32) -> u64 {
    if bits == 0 {
        0
    } else if bits >= 64 {
        u64::MAX
    } else {
        (1u64 << bits) - 1
    }
}

fn log2_strict(n: u32) -> u32 {
    assert!(n.is_power_of_two(), "{n} is not a power of two");
    n.trailing_zeros()
}

/// Fold the levels from `rank_level` down to `bank_level` (inclusive) into a
/// single flat bank index, row-major across the intervening levels.
pub(crate) fn fold_flat_bank_id(
    addr_vec: &[i32],
    topology: &Topology,
    rank_level: usize,
    bank_level: usize,
) -> i64 {
    let mut flat_bank_id = addr_vec[bank_level] as i64;
    let mut accum: i64 = 1;
    let mut i = bank_level;
    while i > rank_level {
        i -= 1;
        accum *= topology.count(i + 1) as i64;
        flat_bank_id += addr_vec[i] as i64 * accum;
    }
    flat_bank_id
}

/// Per-level bit-widths and fixed indices derived once at setup.
#[derive(Debug, Clone)]
pub struct AddressMapper {
    scheme: MapperScheme,
    num_levels: usize,
    addr_bits: Vec<u32>,
    tx_offset: u32,
    row_idx: usize,
    col_idx: usize,
    rank_level: usize,
    bank_level: usize,
    rit: Option<RowIndirectionTable>,
}

impl AddressMapper {
    pub fn new(scheme: MapperScheme, topology: &Topology) -> Result<Self> {
        Self::new_impl(scheme, topology, None)
    }

    pub fn new_with_rit(
        scheme: MapperScheme,
        topology: &Topology,
        num_rit_entries: usize,
    ) -> Result<Self> {
        Self::new_impl(scheme, topology, Some(num_rit_entries))
    }

    fn new_impl(
        scheme: MapperScheme,
        topology: &Topology,
        num_rit_entries: Option<usize>,
    ) -> Result<Self> {
        let row_idx = topology.level_index("row").ok_or_else(|| {
            Error::Configuration("topology has no 'row' level".into())
        })?;
        let rank_level = topology.level_index("rank").ok_or_else(|| {
            Error::Configuration("topology has no 'rank' level".into())
        })?;
        let bank_level = topology.level_index("bank").ok_or_else(|| {
            Error::Configuration("topology has no 'bank' level".into())
        })?;

        let num_levels = topology.num_levels();
        let col_idx = num_levels - 1;

        let mut addr_bits = Vec::with_capacity(num_levels);
        for i in 0..num_levels {
            if i == col_idx {
                let col_bits = log2_strict(topology.count(i));
                let prefetch_bits = log2_strict(topology.prefetch_size());
                if col_bits < prefetch_bits {
                    return Err(Error::Configuration(format!(
                        "column level has {col_bits} bits, smaller than prefetch_size's {prefetch_bits} bits"
                    )));
                }
                addr_bits.push(col_bits - prefetch_bits);
            } else {
                addr_bits.push(log2_strict(topology.count(i)));
            }
        }

        let tx_offset = log2_strict(
            topology.prefetch_size() * topology.channel_width_bits() / 8,
        );

        let rit = num_rit_entries.map(|entries| {
            let num_banks = (0..=bank_level)
                .fold(1u64, |acc, lvl| {
                    if lvl >= rank_level {
                        acc * topology.count(lvl) as u64
                    } else {
                        acc
                    }
                }) as usize;
            RowIndirectionTable::new(num_banks, entries)
        });

        Ok(Self {
            scheme,
            num_levels,
            addr_bits,
            tx_offset,
            row_idx,
            col_idx,
            rank_level,
            bank_level,
            rit,
        })
    }

    pub fn rit(&self) -> Option<&RowIndirectionTable> {
        self.rit.as_ref()
    }

    pub fn rit_mut(&mut self) -> Option<&mut RowIndirectionTable> {
        self.rit.as_mut()
    }

    pub fn addr_bits(&self, level: usize) -> u32 {
        self.addr_bits[level]
    }

    pub fn tx_offset(&self) -> u32 {
        self.tx_offset
    }

    pub fn row_idx(&self) -> usize {
        self.row_idx
    }

    pub fn rank_level(&self) -> usize {
        self.rank_level
    }

    pub fn bank_level(&self) -> usize {
        self.bank_level
    }

    /// Decomposes `req.addr` and writes `req.addr_vec`, applying the Row
    /// Indirection Table (if any) after the base decomposition.
    pub fn apply(&self, req: &mut Request, topology: &Topology) {
        req.addr_vec = vec![crate::request::UNASSIGNED; self.num_levels];
        let addr_prime = req.addr >> self.tx_offset;

        match self.scheme {
            MapperScheme::ChRaBaRoCo => self.apply_ch_ra_ba_ro_co(addr_prime, &mut req.addr_vec),
            MapperScheme::RoBaRaCoCh => self.apply_ro_ba_ra_co_ch(addr_prime, &mut req.addr_vec),
            MapperScheme::Mop4ClXor => self.apply_mop4_cl_xor(addr_prime, &mut req.addr_vec),
        }

        if let Some(rit) = &self.rit {
            let flat_bank_id =
                fold_flat_bank_id(&req.addr_vec, topology, self.rank_level, self.bank_level);
            if let Some(dst_row) = rit.get(flat_bank_id as usize, req.addr_vec[self.row_idx] as i64) {
                req.addr_vec[self.row_idx] = dst_row as i32;
            }
        }
    }

    fn apply_ch_ra_ba_ro_co(&self, mut addr: u64, addr_vec: &mut [i32]) {
        for i in (0..self.num_levels).rev() {
            addr_vec[i] = (addr & mask(self.addr_bits[i])) as i32;
            addr >>= self.addr_bits[i];
        }
    }

    fn apply_ro_ba_ra_co_ch(&self, mut addr: u64, addr_vec: &mut [i32]) {
        addr_vec[0] = (addr & mask(self.addr_bits[0])) as i32;
        addr >>= self.addr_bits[0];

        addr_vec[self.col_idx] = (addr & mask(self.addr_bits[self.col_idx])) as i32;
        addr >>= self.addr_bits[self.col_idx];

        for i in 1..=self.row_idx {
            addr_vec[i] = (addr & mask(self.addr_bits[i])) as i32;
            addr >>= self.addr_bits[i];
        }
        // Levels strictly between row_idx and col_idx (if any) stay UNASSIGNED:
        // intentional for flat topologies, not a bug (see spec open question).
    }

    fn apply_mop4_cl_xor(&self, mut addr: u64, addr_vec: &mut [i32]) {
        const RESERVED_COL_BITS: u32 = 2;

        let col_low = addr & mask(RESERVED_COL_BITS);
        addr >>= RESERVED_COL_BITS;

        for i in 0..self.row_idx {
            addr_vec[i] = (addr & mask(self.addr_bits[i])) as i32;
            addr >>= self.addr_bits[i];
        }

        let col_high_bits = self.addr_bits[self.col_idx] - RESERVED_COL_BITS;
        let col_high = addr & mask(col_high_bits);
        addr >>= col_high_bits;
        addr_vec[self.col_idx] = ((col_high << RESERVED_COL_BITS) | col_low) as i32;

        addr_vec[self.row_idx] = (addr & mask(self.addr_bits[self.row_idx])) as i32;

        let mut row_xor_index = 0u32;
        for lvl in 0..self.col_idx {
            if self.addr_bits[lvl] == 0 {
                continue;
            }
            let xor_bits = (addr_vec[self.col_idx] as u64 >> row_xor_index) & mask(self.addr_bits[lvl]);
            addr_vec[lvl] ^= xor_bits as i32;
            row_xor_index += self.addr_bits[lvl];
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::request::Request;
    use crate::topology::{CommandMeta, Level, Topology};

    fn topology() -> Topology {
        Topology::new(
            vec![
                Level { name: "channel".into(), count: 1 },
                Level { name: "rank".into(), count: 1 },
                Level { name: "bankgroup".into(), count: 1 },
                Level { name: "bank".into(), count: 4 },
                Level { name: "row".into(), count: 65536 },
                Level { name: "column".into(), count: 128 },
            ],
            vec![CommandMeta {
                name: "victim-row-refresh".into(),
                id: 0,
                is_opening: false,
                scope_level: 4,
            }],
            8,
            64,
            1000,
        )
        .unwrap()
    }

    #[test]
    fn ch_ra_ba_ro_co_bit_exact() {
        let topology = topology();
        let mapper = AddressMapper::new(MapperScheme::ChRaBaRoCo, &topology).unwrap();
        let mut req = Request::new(0x4080, 6, 0, 0);
        mapper.apply(&mut req, &topology);

        let addr_prime = req.addr >> mapper.tx_offset();
        let last = mapper.addr_bits(5);
        assert_eq!(req.addr_vec[5] as u64, addr_prime & mask(last));
    }

    #[test]
    fn ro_ba_ra_co_ch_bit_exact() {
        // Channel has a single member here, so it contributes zero bits and
        // the lowest surviving bits of addr' land in the column field, same
        // as ChRaBaRoCo's lowest bits do for this topology.
        let topology = topology();
        let mapper = AddressMapper::new(MapperScheme::RoBaRaCoCh, &topology).unwrap();
        let mut req = Request::new(0x123456, 6, 0, 0);
        mapper.apply(&mut req, &topology);

        let addr_prime = req.addr >> mapper.tx_offset();
        let col_bits = mapper.addr_bits(5);
        assert_eq!(req.addr_vec[5] as u64, addr_prime & mask(col_bits));
    }

    #[test]
    fn mop4_cl_xor_matches_low_column_bits() {
        let topology = topology();
        let a = AddressMapper::new(MapperScheme::ChRaBaRoCo, &topology).unwrap();
        let m = AddressMapper::new(MapperScheme::Mop4ClXor, &topology).unwrap();

        let mut req_a = Request::new(0x4080, 6, 0, 0);
        let mut req_m = req_a.clone();
        a.apply(&mut req_a, &topology);
        m.apply(&mut req_m, &topology);

        assert_eq!(req_a.addr_vec[5] & 0b11, req_m.addr_vec[5] & 0b11);
    }

    #[test]
    fn rit_round_trip_via_apply() {
        let topology = topology();
        let mut mapper = AddressMapper::new_with_rit(MapperScheme::ChRaBaRoCo, &topology, 4).unwrap();
        mapper.rit_mut().unwrap().insert(0, 100, 200).unwrap();

        let mut req = Request::new(0, 6, 0, 0);
        // Build an addr that decodes to row=100 on bank 0.
        req.addr_vec = vec![0, 0, 0, 0, 100, 0];
        let flat_bank_id = fold_flat_bank_id(&req.addr_vec, &topology, mapper.rank_level(), mapper.bank_level());
        assert_eq!(flat_bank_id, 0);

        if let Some(dst) = mapper.rit().unwrap().get(0, 100) {
            req.addr_vec[mapper.row_idx()] = dst as i32;
        }
        assert_eq!(req.addr_vec[mapper.row_idx()], 200);
    }

    #[test]
    fn disabled_rit_is_noop() {
        let topology = topology();
        let mapper = AddressMapper::new(MapperScheme::ChRaBaRoCo, &topology).unwrap();
        assert!(mapper.rit().is_none());
    }
}
