//! Read-only DRAM organization metadata.
//!
//! Everything here is immutable once built — the topology is handed to the
//! address mapper and the tracker at setup and never mutated afterwards.

use crate::error::{Error, Result};

/// One level of the DRAM hierarchy (channel, rank, bankgroup, bank, row, column, ...).
#[derive(Debug, Clone)]
pub struct Level {
    pub name: String,
    pub count: u32,
}

/// Metadata for one DRAM command (ACT, PRE, RD, WR, VRR, ...).
#[derive(Debug, Clone)]
pub struct CommandMeta {
    pub name: String,
    pub id: i32,
    /// True for commands that open a row into the sense amplifiers.
    pub is_opening: bool,
    /// The hierarchy level this command is scoped to (e.g. the row level for ACT).
    pub scope_level: usize,
}

#[derive(Debug, Clone)]
pub struct Topology {
    levels: Vec<Level>,
    commands: Vec<CommandMeta>,
    prefetch_size: u32,
    channel_width_bits: u32,
    t_ck_ps: u32,
}

impl Topology {
    pub fn new(
        levels: Vec<Level>,
        commands: Vec<CommandMeta>,
        prefetch_size: u32,
        channel_width_bits: u32,
        t_ck_ps: u32,
    ) -> Result<Self> {
        if levels.is_empty() {
            return Err(Error::Configuration(
                "topology must have at least one level".into(),
            ));
        }
        for level in &levels {
            if !level.count.is_power_of_two() {
                return Err(Error::Configuration(format!(
                    "level '{}' count {} is not a power of two",
                    level.name, level.count
                )));
            }
        }
        if !prefetch_size.is_power_of_two() {
            return Err(Error::Configuration(format!(
                "prefetch_size {prefetch_size} is not a power of two"
            )));
        }
        Ok(Self {
            levels,
            commands,
            prefetch_size,
            channel_width_bits,
            t_ck_ps,
        })
    }

    pub fn num_levels(&self) -> usize {
        self.levels.len()
    }

    pub fn level_name(&self, level: usize) -> &str {
        &self.levels[level].name
    }

    pub fn count(&self, level: usize) -> u32 {
        self.levels[level].count
    }

    pub fn level_index(&self, name: &str) -> Option<usize> {
        self.levels.iter().position(|l| l.name == name)
    }

    pub fn command_meta(&self, command_id: i32) -> Option<&CommandMeta> {
        self.commands.iter().find(|c| c.id == command_id)
    }

    pub fn command_id(&self, name: &str) -> Option<i32> {
        self.commands.iter().find(|c| c.name == name).map(|c| c.id)
    }

    pub fn command_scope(&self, command_id: i32) -> Option<usize> {
        self.command_meta(command_id).map(|c| c.scope_level)
    }

    pub fn is_opening(&self, command_id: i32) -> bool {
        self.command_meta(command_id)
            .map(|c| c.is_opening)
            .unwrap_or(false)
    }

    pub fn prefetch_size(&self) -> u32 {
        self.prefetch_size
    }

    pub fn channel_width_bits(&self) -> u32 {
        self.channel_width_bits
    }

    pub fn t_ck_ps(&self) -> u32 {
        self.t_ck_ps
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> Topology {
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
                CommandMeta { name: "ACT".into(), id: 0, is_opening: true, scope_level: 4 },
                CommandMeta { name: "victim-row-refresh".into(), id: 1, is_opening: false, scope_level: 4 },
                CommandMeta { name: "read".into(), id: 2, is_opening: false, scope_level: 5 },
                CommandMeta { name: "write".into(), id: 3, is_opening: false, scope_level: 5 },
            ],
            8,
            64,
            1000,
        )
        .unwrap()
    }

    #[test]
    fn level_lookup() {
        let t = sample();
        assert_eq!(t.level_index("row"), Some(4));
        assert_eq!(t.level_index("nonexistent"), None);
        assert_eq!(t.count(3), 4);
    }

    #[test]
    fn command_lookup() {
        let t = sample();
        assert_eq!(t.command_id("victim-row-refresh"), Some(1));
        assert!(t.is_opening(0));
        assert!(!t.is_opening(1));
        assert_eq!(t.command_scope(0), Some(4));
    }

    #[test]
    fn rejects_non_power_of_two_count() {
        let err = Topology::new(
            vec![Level { name: "row".into(), count: 3 }],
            vec![],
            8,
            64,
            1000,
        );
        assert!(err.is_err());
    }
}
