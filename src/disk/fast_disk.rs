use std::path::PathBuf;

use parking_lot::Mutex;

use crate::disk::{
    block_device::BlockDevice,
    fault::DiskFault,
    store::BlockStore,
    types::{DiskStats, Geometry, MAX_FAST_DISK_BLOCKS},
};

/// A disk so fast that every transfer is finished by the time the call
/// returns. It never raises a completion interrupt.
#[derive(Debug)]
pub struct FastDisk {
    store: Mutex<BlockStore>,
}

impl FastDisk {
    pub fn new(geometry: Geometry, image: impl Into<PathBuf>) -> Result<Self, DiskFault> {
        if geometry.disk_size >= MAX_FAST_DISK_BLOCKS {
            return Err(DiskFault::TooLarge {
                requested: geometry.disk_size,
                max: MAX_FAST_DISK_BLOCKS,
            });
        }
        Ok(Self {
            store: Mutex::new(BlockStore::open(geometry, image)?),
        })
    }

    pub fn read(&self, block: usize, buf: &mut [u8]) -> Result<(), DiskFault> {
        self.store.lock().copy_out(block, buf)
    }

    pub fn write(&self, block: usize, buf: &[u8]) -> Result<(), DiskFault> {
        self.store.lock().copy_in(block, buf)
    }

    pub fn stats(&self) -> DiskStats {
        self.store.lock().stats()
    }
}

impl BlockDevice for FastDisk {
    fn geometry(&self) -> Geometry {
        self.store.lock().geometry()
    }

    fn read_block(&self, block: usize, buf: &mut [u8]) -> Result<(), DiskFault> {
        self.read(block, buf)
    }

    fn write_block(&self, block: usize, buf: &[u8]) -> Result<(), DiskFault> {
        self.write(block, buf)
    }

    fn format(&self) {
        self.store.lock().format();
    }

    fn flush(&self) -> Result<(), DiskFault> {
        self.store.lock().flush()
    }
}
