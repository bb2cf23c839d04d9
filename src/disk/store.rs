use std::{
    fs,
    path::{Path, PathBuf},
};

use tracing::{debug, info};

use crate::disk::{
    fault::DiskFault,
    types::{Direction, DiskStats, Geometry},
};

/// The block array shared by both disk models, plus its host image file.
#[derive(Debug)]
pub struct BlockStore {
    geometry: Geometry,
    data: Vec<u8>,
    image: PathBuf,
    stats: DiskStats,
}

impl BlockStore {
    /// Restores the array from `image` if that file exists, otherwise starts
    /// from a freshly formatted array. An existing image of the wrong length
    /// is a fatal configuration error.
    pub fn open(geometry: Geometry, image: impl Into<PathBuf>) -> Result<Self, DiskFault> {
        if geometry.disk_size < 1 {
            return Err(DiskFault::NoBlocks);
        }
        let image = image.into();
        let expected = geometry.total_bytes() as u64;

        let data = match fs::metadata(&image) {
            Ok(meta) => {
                if meta.len() != expected {
                    return Err(DiskFault::ImageSizeMismatch {
                        path: image,
                        actual: meta.len(),
                        expected,
                    });
                }
                let data = fs::read(&image).map_err(|source| DiskFault::Image {
                    path: image.clone(),
                    source,
                })?;
                info!(path = %image.display(), bytes = data.len(), "restored disk image");
                data
            }
            Err(_) => {
                info!(path = %image.display(), "creating new disk");
                vec![0; geometry.total_bytes()]
            }
        };

        Ok(Self {
            geometry,
            data,
            image,
            stats: DiskStats::default(),
        })
    }

    pub fn geometry(&self) -> Geometry {
        self.geometry
    }

    pub fn image_path(&self) -> &Path {
        &self.image
    }

    pub fn stats(&self) -> DiskStats {
        self.stats
    }

    /// Every byte back to zero.
    pub fn format(&mut self) {
        self.data.iter_mut().for_each(|b| *b = 0);
        debug!(blocks = self.geometry.disk_size, "disk formatted");
    }

    /// Rejects anything the hardware could not service.
    pub fn check(&self, direction: Direction, block: usize, len: usize) -> Result<(), DiskFault> {
        if block >= self.geometry.disk_size {
            return Err(DiskFault::BlockOutOfRange {
                direction,
                block,
                disk_size: self.geometry.disk_size,
            });
        }
        if len < self.geometry.block_size {
            return Err(DiskFault::BufferTooSmall {
                direction,
                len,
                block_size: self.geometry.block_size,
            });
        }
        Ok(())
    }

    /// Copies one block into the front of `buf`. Bytes past the block size
    /// are left alone.
    pub fn copy_out(&mut self, block: usize, buf: &mut [u8]) -> Result<(), DiskFault> {
        self.check(Direction::Read, block, buf.len())?;
        let start = self.geometry.offset(block);
        let size = self.geometry.block_size;
        buf[..size].copy_from_slice(&self.data[start..start + size]);
        self.stats.reads += 1;
        Ok(())
    }

    /// Copies the first block-size bytes of `buf` onto the disk.
    pub fn copy_in(&mut self, block: usize, buf: &[u8]) -> Result<(), DiskFault> {
        self.check(Direction::Write, block, buf.len())?;
        let start = self.geometry.offset(block);
        let size = self.geometry.block_size;
        self.data[start..start + size].copy_from_slice(&buf[..size]);
        self.stats.writes += 1;
        Ok(())
    }

    /// Saves the whole array to the image file.
    pub fn flush(&self) -> Result<(), DiskFault> {
        info!(path = %self.image.display(), "saving contents to disk image");
        fs::write(&self.image, &self.data).map_err(|source| DiskFault::Image {
            path: self.image.clone(),
            source,
        })?;
        info!(
            reads = self.stats.reads,
            writes = self.stats.writes,
            "{} read operations and {} write operations performed",
            self.stats.reads,
            self.stats.writes
        );
        Ok(())
    }
}
