//! Monotonic statistics counters, named for log compatibility with the
//! external interface. No registration service — the host aggregates across
//! instances itself.

#[derive(Debug, Clone, Default)]
pub struct HydraStats {
    pub hydra_num_vrr: u64,
    pub hydra_num_vrr_rct: u64,
    pub hydra_num_read_req: u64,
    pub hydra_num_write_req: u64,
    pub hydra_num_initialization: u64,
    pub hydra_num_eviction: u64,
    pub hydra_num_rcc_miss: u64,
    pub hydra_gct_check: u64,
    pub hydra_rcc_check: u64,
    pub hydra_rct_check: u64,
    pub hydra_rctct_check: u64,
}
