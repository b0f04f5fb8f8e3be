//! End-to-end scenarios over the full tracker/mapper pipeline, against the
//! topology and thresholds used throughout the external interface docs: 1
//! channel, 1 rank, 1 bankgroup, 4 banks, 65536 rows, 128 columns, prefetch
//! 8, channel width 64, `tCK_ps` 1000.

use hydra_rowhammer::{
    AddressMapper, CommandMeta, ControllerAdapter, Error, HydraConfig, Level, MapperScheme,
    Request, Topology, TranslationReserve, Tracker,
};

const ACT: i32 = 0;
const VRR: i32 = 1;
const RD: i32 = 2;
const WR: i32 = 3;

fn main_topology() -> Topology {
    Topology::new(
        vec![
            Level { name: "channel".into(), count: 1 },
            Level { name: "rank".into(), count: 1 },
            Level { name: "bankgroup".into(), count: 1 },
            Level { name: "bank".into(), count: 4 },
            Level { name: "row".into(), count: 65536 },
            Level { name: "column".into(), count: 128 },
        ],
        vec![
            CommandMeta { name: "ACT".into(), id: ACT, is_opening: true, scope_level: 4 },
            CommandMeta { name: "victim-row-refresh".into(), id: VRR, is_opening: false, scope_level: 4 },
            CommandMeta { name: "read".into(), id: RD, is_opening: false, scope_level: 5 },
            CommandMeta { name: "write".into(), id: WR, is_opening: false, scope_level: 5 },
        ],
        8,
        64,
        1000,
    )
    .unwrap()
}

fn main_config() -> HydraConfig {
    HydraConfig::from_json_str(
        r#"{
            "tracking_threshold": 16,
            "group_threshold": 4,
            "row_group_size": 128,
            "reset_period_ns": 1000000,
            "rcc_num_per_rank": 64,
            "rcc_policy": "RANDOM"
        }"#,
    )
    .unwrap()
}

struct NoopTranslation;

impl TranslationReserve for NoopTranslation {
    fn reserve(&mut self, _phys_addr: u64, _row_id: i64) -> Result<(), Error> {
        Ok(())
    }
}

struct RecordingAdapter<'t> {
    topology: &'t Topology,
    sent: Vec<Request>,
}

impl<'t> RecordingAdapter<'t> {
    fn new(topology: &'t Topology) -> Self {
        Self { topology, sent: Vec::new() }
    }
}

impl<'t> ControllerAdapter for RecordingAdapter<'t> {
    fn priority_send(&mut self, req: Request) {
        self.sent.push(req);
    }

    fn topology(&self) -> &Topology {
        self.topology
    }
}

fn activation(bank: i32, row: i32) -> Request {
    Request::new_synthetic(vec![0, 0, 0, bank, row, 0], ACT)
}

#[test]
fn gct_below_threshold() {
    let topology = main_topology();
    let mapper = AddressMapper::new(MapperScheme::ChRaBaRoCo, &topology).unwrap();
    let mut translation = NoopTranslation;
    let mut tracker = Tracker::setup(main_config(), &topology, &mapper, &mut translation, 1 << 16).unwrap();
    let mut adapter = RecordingAdapter::new(&topology);

    for _ in 0..3 {
        tracker.update(&mut adapter, Some(&activation(0, 4096)));
    }

    let (group_count, initialized) = tracker.gct_entry(0, 4096 >> (tracker.row_address_bits() - tracker.gct_index_bits()));
    assert_eq!(group_count, 3);
    assert!(!initialized);
    assert_eq!(tracker.rct_value(0, 4096), None);
    assert!(adapter.sent.is_empty());
}

#[test]
fn group_initializes_once_count_reaches_threshold() {
    // group_threshold == 4: the gating check happens *before* the increment,
    // so the table holds count == group_threshold after the 4th activation but
    // initialization (the "else" branch) fires on the 5th, when the stored
    // value is finally read as >= threshold.
    let topology = main_topology();
    let mapper = AddressMapper::new(MapperScheme::ChRaBaRoCo, &topology).unwrap();
    let mut translation = NoopTranslation;
    let mut tracker = Tracker::setup(main_config(), &topology, &mapper, &mut translation, 1 << 16).unwrap();
    let mut adapter = RecordingAdapter::new(&topology);

    for _ in 0..4 {
        tracker.update(&mut adapter, Some(&activation(0, 4096)));
    }
    let gct_index = 4096 >> (tracker.row_address_bits() - tracker.gct_index_bits());
    let (count, initialized) = tracker.gct_entry(0, gct_index);
    assert_eq!(count, 4);
    assert!(!initialized);
    assert!(adapter.sent.is_empty());

    tracker.update(&mut adapter, Some(&activation(0, 4096)));
    let (_, initialized) = tracker.gct_entry(0, gct_index);
    assert!(initialized);

    // Initialization seeds every row in the group to group_threshold; only the
    // row that triggered the init/RCC-fill activation gets the extra ++.
    let group_start = gct_index * 128;
    for r in group_start..group_start + 128 {
        let expected = if r == 4096 { 5 } else { 4 };
        assert_eq!(tracker.rct_value(0, r), Some(expected));
    }
    assert_eq!(tracker.stats().hydra_num_initialization, 1);

    let write_count = adapter.sent.iter().filter(|r| r.command_id == WR).count() as u32;
    assert_eq!(write_count, tracker.group_rct_cl_size());
}

#[test]
fn vrr_fires_via_rcc_and_resets_counters() {
    let topology = main_topology();
    let mapper = AddressMapper::new(MapperScheme::ChRaBaRoCo, &topology).unwrap();
    let mut translation = NoopTranslation;
    let mut tracker = Tracker::setup(main_config(), &topology, &mapper, &mut translation, 1 << 16).unwrap();
    let mut adapter = RecordingAdapter::new(&topology);

    let mut vrr_count = 0;
    for _ in 0..64 {
        tracker.update(&mut adapter, Some(&activation(0, 4096)));
        vrr_count = adapter.sent.iter().filter(|r| r.command_id == VRR).count();
        if vrr_count > 0 {
            break;
        }
    }

    assert_eq!(vrr_count, 1);
    assert_eq!(tracker.stats().hydra_num_vrr, 1);
    assert_eq!(tracker.rct_value(0, 4096), Some(0));

    let last_vrr = adapter.sent.iter().rev().find(|r| r.command_id == VRR).unwrap();
    assert_eq!(last_vrr.addr_vec, vec![0, 0, 0, 0, 4096, 0]);
}

#[test]
fn rct_row_fast_path_bypasses_other_tables() {
    // A small topology whose derived total_rct_row_size is exactly 2, so row
    // 0 always takes branch A and never touches GCT/RCC/RCT.
    let topology = Topology::new(
        vec![
            Level { name: "channel".into(), count: 1 },
            Level { name: "rank".into(), count: 1 },
            Level { name: "bankgroup".into(), count: 1 },
            Level { name: "bank".into(), count: 1 },
            Level { name: "row".into(), count: 128 },
            Level { name: "column".into(), count: 8 },
        ],
        vec![
            CommandMeta { name: "ACT".into(), id: ACT, is_opening: true, scope_level: 4 },
            CommandMeta { name: "victim-row-refresh".into(), id: VRR, is_opening: false, scope_level: 4 },
            CommandMeta { name: "read".into(), id: RD, is_opening: false, scope_level: 5 },
            CommandMeta { name: "write".into(), id: WR, is_opening: false, scope_level: 5 },
        ],
        8,
        64,
        1000,
    )
    .unwrap();

    let config = HydraConfig::from_json_str(
        r#"{"tracking_threshold":16,"group_threshold":4,"row_group_size":128,"rcc_num_per_rank":16}"#,
    )
    .unwrap();

    let mapper = AddressMapper::new(MapperScheme::ChRaBaRoCo, &topology).unwrap();
    let mut translation = NoopTranslation;
    let mut tracker = Tracker::setup(config, &topology, &mapper, &mut translation, 1024).unwrap();
    assert_eq!(tracker.total_rct_row_size(), 2);

    let mut adapter = RecordingAdapter::new(&topology);
    for _ in 0..16 {
        tracker.update(&mut adapter, Some(&activation(0, 0)));
    }

    assert_eq!(tracker.stats().hydra_num_vrr_rct, 1);
    assert_eq!(tracker.stats().hydra_num_vrr, 1);
    assert!(!tracker.rctct_contains(0, 0));

    let (group_count, initialized) = tracker.gct_entry(0, 0);
    assert_eq!(group_count, 0);
    assert!(!initialized);
    assert_eq!(tracker.rcc_len(0, 0), 0);
}

#[test]
fn rcc_eviction_makes_room_for_a_new_tag() {
    let topology = main_topology();
    let mapper = AddressMapper::new(MapperScheme::ChRaBaRoCo, &topology).unwrap();
    let mut translation = NoopTranslation;
    let mut tracker = Tracker::setup(main_config(), &topology, &mapper, &mut translation, 1 << 16).unwrap();
    let mut adapter = RecordingAdapter::new(&topology);

    // Rows below 4096 fall under total_rct_row_size(64) here and take the RCT-row
    // fast path, so the warmup/fill rows stay in the 4096-4223 group instead.
    const BASE: i32 = 4096;

    // Warm the group up to group_threshold without touching the RCC.
    for _ in 0..5 {
        tracker.update(&mut adapter, Some(&activation(0, BASE)));
    }
    assert_eq!(tracker.rcc_len(0, 0), 1);

    // 15 more distinct rows sharing rcc_index 0 (low 2 bits clear) fill the set.
    for k in 1..16 {
        tracker.update(&mut adapter, Some(&activation(0, BASE + k * 4)));
    }
    assert_eq!(tracker.rcc_len(0, 0), 16);
    assert_eq!(tracker.stats().hydra_num_eviction, 0);

    // The 17th distinct tag forces an eviction.
    tracker.update(&mut adapter, Some(&activation(0, BASE + 16 * 4)));
    assert_eq!(tracker.rcc_len(0, 0), 16);
    assert_eq!(tracker.stats().hydra_num_eviction, 1);

    let eviction_writes = adapter.sent.iter().filter(|r| r.command_id == WR).count();
    assert!(eviction_writes >= 1);
}

#[test]
fn mapper_schemes_are_deterministic_and_pure() {
    let topology = main_topology();
    let mapper = AddressMapper::new(MapperScheme::ChRaBaRoCo, &topology).unwrap();

    let mut req1 = Request::new(0x4080, topology.num_levels(), 0, 0);
    let mut req2 = Request::new(0x4080, topology.num_levels(), 0, 0);
    mapper.apply(&mut req1, &topology);
    mapper.apply(&mut req2, &topology);
    assert_eq!(req1.addr_vec, req2.addr_vec);
}

#[test]
fn rit_round_trip_through_mapper_apply() {
    let topology = main_topology();
    let mut mapper = AddressMapper::new_with_rit(MapperScheme::ChRaBaRoCo, &topology, 4).unwrap();
    mapper.rit_mut().unwrap().insert(0, 100, 200).unwrap();

    let dst = mapper.rit().unwrap().get(0, 100).unwrap();
    assert_eq!(dst, 200);
    let back = mapper.rit().unwrap().get(0, 200).unwrap();
    assert_eq!(back, 100);

    mapper.rit_mut().unwrap().unlock_all();
    let (src, dst) = mapper.rit().unwrap().get_unswap_pair(0, &[]);
    assert_eq!((src, dst), (100, 200));

    mapper.rit_mut().unwrap().remove(0, 100, 200);
    assert!(mapper.rit().unwrap().get(0, 100).is_none());
    assert!(mapper.rit().unwrap().get(0, 200).is_none());
}

#[test]
fn periodic_reset_clears_tables_but_not_clock_or_stats() {
    let topology = main_topology();
    let mapper = AddressMapper::new(MapperScheme::ChRaBaRoCo, &topology).unwrap();
    let mut translation = NoopTranslation;
    // tCK_ps is 1000 (1ns/tick), so reset_period_ns=5 gives reset_period_clk=5.
    let config = HydraConfig::from_json_str(
        r#"{"tracking_threshold":16,"group_threshold":4,"rcc_num_per_rank":64,"reset_period_ns":5}"#,
    )
    .unwrap();
    let mut tracker = Tracker::setup(config, &topology, &mapper, &mut translation, 1 << 16).unwrap();
    let mut adapter = RecordingAdapter::new(&topology);

    for _ in 0..5 {
        tracker.update(&mut adapter, Some(&activation(0, 4096)));
    }
    let gct_index = 4096 >> (tracker.row_address_bits() - tracker.gct_index_bits());
    assert!(tracker.gct_entry(0, gct_index).1);
    assert_eq!(tracker.stats().hydra_num_initialization, 1);

    // reset_period_clk == 5 here: clk went 0..=4 over the 5 activations above,
    // so this 6th update (clk == 5) lands exactly on the next reset boundary.
    tracker.update(&mut adapter, None);
    assert_eq!(tracker.gct_entry(0, gct_index), (0, false));
    assert_eq!(tracker.rct_value(0, 4096), None);
    assert_eq!(tracker.clk(), 5);
    assert_eq!(tracker.stats().hydra_num_initialization, 1);
}
