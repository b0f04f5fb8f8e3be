//! Synthetic access-trace driver. Reads `bank,row` pairs from a CSV file,
//! replays them as row-opening activations against a `Tracker`, and logs
//! every synthetic request it emits. A self-check harness, not a real
//! memory-controller integration.

use std::env;
use std::fs;
use std::process;

use hydra_rowhammer::{
    AddressMapper, CommandMeta, ControllerAdapter, Error, HydraConfig, Level, MapperScheme,
    Request, Topology, TranslationReserve, Tracker,
};

const ACT: i32 = 0;
const VRR: i32 = 1;
const RD: i32 = 2;
const WR: i32 = 3;

struct NoopTranslation;

impl TranslationReserve for NoopTranslation {
    fn reserve(&mut self, _phys_addr: u64, _row_id: i64) -> Result<(), Error> {
        Ok(())
    }
}

struct LoggingAdapter<'t> {
    topology: &'t Topology,
}

impl<'t> ControllerAdapter for LoggingAdapter<'t> {
    fn priority_send(&mut self, req: Request) {
        let kind = match req.command_id {
            VRR => "VRR",
            RD => "RD",
            WR => "WR",
            _ => "?",
        };
        log::info!("emitted {kind} addr_vec={:?}", req.addr_vec);
    }

    fn topology(&self) -> &Topology {
        self.topology
    }
}

fn demo_topology() -> Topology {
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
    .expect("demo topology is well-formed")
}

fn parse_trace(path: &str) -> Vec<(i32, i32)> {
    let content = fs::read_to_string(path).unwrap_or_else(|e| {
        eprintln!("hydra-trace: cannot read {path}: {e}");
        process::exit(1);
    });

    content
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty() && !line.starts_with('#'))
        .map(|line| {
            let mut parts = line.splitn(2, ',');
            let bank: i32 = parts
                .next()
                .and_then(|s| s.trim().parse().ok())
                .unwrap_or_else(|| {
                    eprintln!("hydra-trace: malformed line {line:?}, expected 'bank,row'");
                    process::exit(1);
                });
            let row: i32 = parts
                .next()
                .and_then(|s| s.trim().parse().ok())
                .unwrap_or_else(|| {
                    eprintln!("hydra-trace: malformed line {line:?}, expected 'bank,row'");
                    process::exit(1);
                });
            (bank, row)
        })
        .collect()
}

fn main() {
    env_logger::init();

    let path = env::args().nth(1).unwrap_or_else(|| {
        eprintln!("usage: hydra-trace <trace.csv>");
        process::exit(1);
    });

    let accesses = parse_trace(&path);
    let topology = demo_topology();
    let mapper = AddressMapper::new(MapperScheme::ChRaBaRoCo, &topology).unwrap();
    let config = HydraConfig::from_json_str(
        r#"{"tracking_threshold":16,"group_threshold":4,"rcc_num_per_rank":64}"#,
    )
    .expect("built-in demo config is valid");

    let mut translation = NoopTranslation;
    let mut tracker = Tracker::setup(config, &topology, &mapper, &mut translation, 1 << 16)
        .unwrap_or_else(|e| {
            eprintln!("hydra-trace: tracker setup failed: {e}");
            process::exit(1);
        });

    let mut adapter = LoggingAdapter { topology: &topology };
    for (bank, row) in &accesses {
        let req = Request::new_synthetic(vec![0, 0, 0, *bank, *row, 0], ACT);
        tracker.update(&mut adapter, Some(&req));
    }
    tracker.update(&mut adapter, None);

    let stats = tracker.stats();
    log::info!(
        "processed {} accesses: vrr={} vrr_rct={} read={} write={} init={} eviction={} rcc_miss={}",
        accesses.len(),
        stats.hydra_num_vrr,
        stats.hydra_num_vrr_rct,
        stats.hydra_num_read_req,
        stats.hydra_num_write_req,
        stats.hydra_num_initialization,
        stats.hydra_num_eviction,
        stats.hydra_num_rcc_miss,
    );
}
