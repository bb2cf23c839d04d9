use crate::disk::{fault::DiskFault, types::Geometry};

/// Blocking, whole-block access to a disk.
///
/// The synchronous disk implements this directly; the kernel wraps the
/// asynchronous disk in an adapter that issues a request and waits for its
/// completion interrupt.
pub trait BlockDevice: Send + Sync {
    fn geometry(&self) -> Geometry;
    fn read_block(&self, block: usize, buf: &mut [u8]) -> Result<(), DiskFault>;
    fn write_block(&self, block: usize, buf: &[u8]) -> Result<(), DiskFault>;
    fn format(&self);
    fn flush(&self) -> Result<(), DiskFault>;
}
