//! The request tuple the address mapper decodes and the tracker emits.

/// Sentinel written into an `addr_vec` entry for a level the mapping scheme leaves
/// unassigned (e.g. `RoBaRaCoCh`'s levels strictly between row and column).
pub const UNASSIGNED: i32 = -1;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Request {
    pub addr: u64,
    pub addr_vec: Vec<i32>,
    pub command_id: i32,
    pub type_id: i32,
}

impl Request {
    /// A request entering the controller, decoded by the address mapper.
    pub fn new(addr: u64, num_levels: usize, command_id: i32, type_id: i32) -> Self {
        Self {
            addr,
            addr_vec: vec![UNASSIGNED; num_levels],
            command_id,
            type_id,
        }
    }

    /// A synthetic request the tracker emits as a side effect of an activation.
    /// `addr` is left at `0`: the reference leaves it undefined, and nothing in
    /// this crate's scope reads it back (the controller rederives `addr` from
    /// `addr_vec` downstream).
    pub fn new_synthetic(addr_vec: Vec<i32>, command_id: i32) -> Self {
        Self {
            addr: 0,
            addr_vec,
            command_id,
            type_id: command_id,
        }
    }
}
