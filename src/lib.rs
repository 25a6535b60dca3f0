//! cmapool - replay of GPU buffer-object logs against a simulated CMA pool.
//!
//! The VC4 kernel driver can log every buffer-object lifecycle event with a
//! `@@@` marker. Replaying such a log against a bounded pool shows how much
//! purging and eviction a given workload causes.
//!
//! # Architecture
//! ```text
//! ┌─────────────────────────────────────────────────────────────────┐
//! │                           cmapool                               │
//! ├─────────────────────────────────────────────────────────────────┤
//! │  ┌─────────────────────────────────────────────────────────┐   │
//! │  │                 Replay (replay/)                         │   │
//! │  │        LineReader → parse_line → Replayer                │   │
//! │  └─────────────────────────────────────────────────────────┘   │
//! │                              ↓                                  │
//! │  ┌─────────────────────────────────────────────────────────┐   │
//! │  │                 Buffer Pool (buffer/)                    │   │
//! │  │   BufferRegistry + MruList + PoolStats                   │   │
//! │  │   page-in: best fit → purge → LRU eviction scan          │   │
//! │  └─────────────────────────────────────────────────────────┘   │
//! │                              ↓                                  │
//! │  ┌─────────────────────────────────────────────────────────┐   │
//! │  │          Range Allocator (crate cmapool-mm)              │   │
//! │  │        RangeManager + EvictionScan                       │   │
//! │  └─────────────────────────────────────────────────────────┘   │
//! └─────────────────────────────────────────────────────────────────┘
//! ```
//!
//! # Modules
//! - [`common`] - Shared primitives (BufferId, Error, config)
//! - [`buffer`] - Buffer records and the admission / eviction policy
//! - [`replay`] - Log decoding and the replay driver
//!
//! # Quick Start
//! ```
//! use cmapool::{replay_reader, PoolConfig};
//!
//! let log = "\
//! [   10.000000] @@@ create 1 4096
//! [   10.000100] @@@ madv 1 dontneed
//! [   10.000200] @@@ destroy 1
//! ";
//!
//! let report = replay_reader(PoolConfig::default(), log.as_bytes()).unwrap();
//! assert_eq!(report.commands, 3);
//! assert!(report.is_clean());
//! ```

pub mod buffer;
pub mod common;
pub mod replay;

// Re-export commonly used items at crate root for convenience
pub use common::config::{CMA_POOL_SIZE, PAGE_SIZE};
pub use common::{BufferId, Error, PoolConfig, Result};

pub use buffer::{Advice, Buffer, BufferPool, PoolStats, StatsSnapshot};
pub use replay::{replay_file, replay_reader, ReplayReport, Replayer};
