use std::sync::Arc;

use parking_lot::{Condvar, Mutex};
use tracing::trace;

use crate::disk::{BlockDevice, Disk, DiskFault, Geometry};

/// Counts disk interrupts so a waiter can tell when its request is done.
#[derive(Debug, Default)]
pub struct CompletionLatch {
    completed: Mutex<u64>,
    signalled: Condvar,
}

impl CompletionLatch {
    pub fn new() -> Self {
        Self::default()
    }

    /// Interrupts seen so far. Take one before issuing a request.
    pub fn ticket(&self) -> u64 {
        *self.completed.lock()
    }

    pub fn signal(&self) {
        *self.completed.lock() += 1;
        self.signalled.notify_all();
    }

    /// Blocks until an interrupt arrives after `ticket` was taken.
    pub fn wait_past(&self, ticket: u64) {
        let mut completed = self.completed.lock();
        while *completed <= ticket {
            self.signalled.wait(&mut completed);
        }
    }
}

/// Blocking block access on top of the interrupt-driven disk.
///
/// Callers queue on `io` so only one request is ever outstanding; each
/// request waits for the disk interrupt routed through the kernel.
pub struct InterruptDrivenDisk {
    disk: Arc<Disk>,
    latch: Arc<CompletionLatch>,
    io: Mutex<()>,
}

impl InterruptDrivenDisk {
    pub fn new(disk: Arc<Disk>, latch: Arc<CompletionLatch>) -> Self {
        Self {
            disk,
            latch,
            io: Mutex::new(()),
        }
    }
}

impl BlockDevice for InterruptDrivenDisk {
    fn geometry(&self) -> Geometry {
        self.disk.geometry()
    }

    fn read_block(&self, block: usize, buf: &mut [u8]) -> Result<(), DiskFault> {
        let _io = self.io.lock();
        let buffer = Arc::new(Mutex::new(vec![0; buf.len()]));

        let ticket = self.latch.ticket();
        self.disk.begin_read(block, Arc::clone(&buffer))?;
        self.latch.wait_past(ticket);
        trace!(block, "read completed");

        let size = self.disk.geometry().block_size;
        buf[..size].copy_from_slice(&buffer.lock()[..size]);
        Ok(())
    }

    fn write_block(&self, block: usize, buf: &[u8]) -> Result<(), DiskFault> {
        let _io = self.io.lock();
        let buffer = Arc::new(Mutex::new(buf.to_vec()));

        let ticket = self.latch.ticket();
        self.disk.begin_write(block, buffer)?;
        self.latch.wait_past(ticket);
        trace!(block, "write completed");
        Ok(())
    }

    fn format(&self) {
        let _io = self.io.lock();
        self.disk.format();
    }

    fn flush(&self) -> Result<(), DiskFault> {
        let _io = self.io.lock();
        self.disk.flush()
    }
}
