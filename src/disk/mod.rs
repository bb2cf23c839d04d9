use std::sync::Arc;

pub mod async_disk;
pub mod block_device;
pub mod fast_disk;
pub mod fault;
pub mod store;
pub mod types;

pub use async_disk::{CompletionHandler, Disk};
pub use block_device::BlockDevice;
pub use fast_disk::FastDisk;
pub use fault::DiskFault;
pub use store::BlockStore;
pub use types::{
    shared_buffer, Direction, DiskStats, Geometry, SeekModel, SharedBuffer, BLOCK_SIZE,
    DEFAULT_IMAGE_PATH, MAX_FAST_DISK_BLOCKS,
};

/// The disk handed to the kernel at power-on.
#[derive(Clone)]
pub enum DiskHandle {
    /// Slow disk: requests complete through a disk interrupt.
    Async(Arc<Disk>),
    /// Fast disk: requests complete before the call returns.
    Fast(Arc<FastDisk>),
}

impl DiskHandle {
    pub fn geometry(&self) -> Geometry {
        match self {
            Self::Async(disk) => disk.geometry(),
            Self::Fast(disk) => disk.geometry(),
        }
    }

    pub fn stats(&self) -> DiskStats {
        match self {
            Self::Async(disk) => disk.stats(),
            Self::Fast(disk) => disk.stats(),
        }
    }
}
