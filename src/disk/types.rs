use std::{fmt, sync::Arc, time::Duration};

use parking_lot::Mutex;

/// Size of a block on the canonical disk, in bytes.
pub const BLOCK_SIZE: usize = 512;

/// Largest disk the synchronous model accepts, in blocks.
pub const MAX_FAST_DISK_BLOCKS: usize = 1 << 15;

/// Host file the block array is saved to between runs.
pub const DEFAULT_IMAGE_PATH: &str = "DISK";

/// Caller-owned transfer area handed to the device for one request.
///
/// The device only touches it between request acceptance and the completion
/// signal; outside that window it belongs to the issuing caller.
pub type SharedBuffer = Arc<Mutex<Vec<u8>>>;

pub fn shared_buffer(len: usize) -> SharedBuffer {
    Arc::new(Mutex::new(vec![0; len]))
}

/// Shape of a disk: how many blocks and how big each one is.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Geometry {
    pub block_size: usize,
    pub disk_size: usize,
}

impl Geometry {
    pub fn new(disk_size: usize) -> Self {
        Self {
            block_size: BLOCK_SIZE,
            disk_size,
        }
    }

    pub fn with_block_size(disk_size: usize, block_size: usize) -> Self {
        Self {
            block_size,
            disk_size,
        }
    }

    /// Length of the persisted image in bytes.
    pub fn total_bytes(&self) -> usize {
        self.block_size * self.disk_size
    }

    pub fn offset(&self, block: usize) -> usize {
        block * self.block_size
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    Read,
    Write,
}

impl fmt::Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Read => write!(f, "read"),
            Self::Write => write!(f, "write"),
        }
    }
}

/// Seek cost of the slow disk: `base + distance / blocks_per_ms` milliseconds.
#[derive(Debug, Clone, Copy)]
pub struct SeekModel {
    pub base: Duration,
    pub blocks_per_ms: usize,
}

impl Default for SeekModel {
    fn default() -> Self {
        Self {
            base: Duration::from_millis(10),
            blocks_per_ms: 5,
        }
    }
}

impl SeekModel {
    /// No seek delay at all; handy when only the protocol matters.
    pub fn instant() -> Self {
        Self {
            base: Duration::ZERO,
            blocks_per_ms: 0,
        }
    }

    pub fn delay(&self, from: usize, to: usize) -> Duration {
        let distance = from.abs_diff(to);
        let travel = match self.blocks_per_ms {
            0 => 0,
            n => distance / n,
        };
        self.base + Duration::from_millis(travel as u64)
    }
}

/// Operation counters reported when the disk is flushed.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DiskStats {
    pub reads: u64,
    pub writes: u64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn seek_delay_grows_with_distance() {
        let seek = SeekModel::default();
        assert_eq!(seek.delay(0, 0), Duration::from_millis(10));
        assert_eq!(seek.delay(0, 50), Duration::from_millis(20));
        assert_eq!(seek.delay(50, 0), seek.delay(0, 50));
        assert!(seek.delay(0, 99) > seek.delay(0, 4));
    }

    #[test]
    fn instant_seek_never_sleeps() {
        assert_eq!(SeekModel::instant().delay(0, 1000), Duration::ZERO);
    }

    #[test]
    fn geometry_sizes() {
        let g = Geometry::with_block_size(4, 8);
        assert_eq!(g.total_bytes(), 32);
        assert_eq!(g.offset(3), 24);
        assert_eq!(Geometry::new(100).block_size, BLOCK_SIZE);
    }
}
