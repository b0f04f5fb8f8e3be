//! The thin contract the tracker uses to talk to its surrounding controller.
//! Both traits are opaque collaborator interfaces — their implementations
//! (a real scheduler, a real translation layer) live outside this crate.

use crate::error::Error;
use crate::request::Request;
use crate::topology::Topology;

/// Sink for synthetic requests the tracker emits, plus read access to the
/// topology the tracker was set up against.
pub trait ControllerAdapter {
    /// Enqueue `req` for immediate scheduling, ahead of ordinary traffic.
    fn priority_send(&mut self, req: Request);

    fn topology(&self) -> &Topology;
}

/// The physical-to-DRAM translation/reservation layer. Used only once, at
/// tracker setup, to pin the physical ranges that back the spilled RCT rows.
pub trait TranslationReserve {
    /// Reserve the physical range covering one 64-byte stride so it always
    /// maps to `row_id` in DRAM. Opaque to the tracker beyond success/failure.
    fn reserve(&mut self, phys_addr: u64, row_id: i64) -> Result<(), Error>;
}
