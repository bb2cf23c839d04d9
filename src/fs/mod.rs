use std::sync::Arc;

use tracing::{debug, info};

use crate::{
    disk::BlockDevice,
    fs::{
        config::{
            BLOCK_FREE, BLOCK_USED, FILE_TABLE_SLOTS, FIRST_FILE_BLOCK_ID, FREE_MAP_BLOCK_ID,
            NAME_LEN,
        },
        error::{FileSystemError, Result},
    },
};

pub mod config;
pub mod error;

/// A flat file system: one file per block, a free map in block 0.
///
/// Block `i` holds a file when byte `i` of the free map is `'1'`. A file
/// block starts with the zero-padded name, the rest of the block is the
/// file's contents. The table mirrors the names so lookups don't touch
/// the disk.
pub struct FileSystem {
    device: Arc<dyn BlockDevice>,
    table: Vec<Option<String>>,
    block_size: usize,
}

impl FileSystem {
    /// Rebuilds the file table from what is already on the disk.
    pub fn mount(device: Arc<dyn BlockDevice>) -> Result<Self> {
        let geometry = device.geometry();
        if geometry.block_size <= NAME_LEN {
            return Err(FileSystemError::BlockTooSmall(geometry.block_size));
        }
        let slots = FILE_TABLE_SLOTS
            .min(geometry.disk_size)
            .min(geometry.block_size);

        let mut fs = Self {
            device,
            table: vec![None; slots],
            block_size: geometry.block_size,
        };

        let free_map = fs.read_free_map()?;
        let mut block_buf = vec![0; fs.block_size];
        for block in FIRST_FILE_BLOCK_ID..slots {
            if free_map[block] == BLOCK_USED {
                fs.device.read_block(block, &mut block_buf)?;
                fs.table[block] = Some(decode_name(&block_buf[..NAME_LEN]));
            }
        }

        info!(files = fs.list().len(), slots, "file system mounted");
        Ok(fs)
    }

    pub fn block_size(&self) -> usize {
        self.block_size
    }

    /// Largest payload a single file can hold.
    pub fn capacity(&self) -> usize {
        self.block_size - NAME_LEN
    }

    /// Wipes the disk and writes an empty free map.
    pub fn format(&mut self) -> Result<()> {
        self.device.format();
        self.table.iter_mut().for_each(|slot| *slot = None);

        let mut free_map = vec![0; self.block_size];
        free_map[FIRST_FILE_BLOCK_ID..self.table.len()].fill(BLOCK_FREE);
        self.device.write_block(FREE_MAP_BLOCK_ID, &free_map)?;
        info!("disk formatted");
        Ok(())
    }

    /// Creates an empty file and returns the block it lives in.
    pub fn create(&mut self, name: &str) -> Result<usize> {
        if name.is_empty() || name.len() > NAME_LEN {
            return Err(FileSystemError::InvalidName(name.to_string()));
        }
        if let Some(block) = self.find(name) {
            return Err(FileSystemError::AlreadyExists {
                name: name.to_string(),
                block,
            });
        }

        let mut free_map = self.read_free_map()?;
        let block = (FIRST_FILE_BLOCK_ID..self.table.len())
            .find(|&i| free_map[i] != BLOCK_USED)
            .ok_or(FileSystemError::DiskFull)?;

        let mut contents = vec![0; self.block_size];
        contents[..name.len()].copy_from_slice(name.as_bytes());
        self.device.write_block(block, &contents)?;

        free_map[block] = BLOCK_USED;
        self.device.write_block(FREE_MAP_BLOCK_ID, &free_map)?;
        self.table[block] = Some(name.to_string());

        debug!(name, block, "created file");
        Ok(block)
    }

    /// Copies the file's contents into `buf` and returns how many bytes
    /// were copied.
    pub fn read(&self, name: &str, buf: &mut [u8]) -> Result<usize> {
        let block = self.lookup(name)?;
        let mut contents = vec![0; self.block_size];
        self.device.read_block(block, &mut contents)?;

        let payload = &contents[NAME_LEN..];
        let n = payload.len().min(buf.len());
        buf[..n].copy_from_slice(&payload[..n]);
        Ok(n)
    }

    /// Replaces the file's contents. Data past the file's capacity is
    /// dropped; a shorter payload leaves the rest zeroed.
    pub fn write(&mut self, name: &str, data: &[u8]) -> Result<usize> {
        let block = self.lookup(name)?;
        let mut contents = vec![0; self.block_size];
        contents[..name.len()].copy_from_slice(name.as_bytes());

        let n = data.len().min(self.capacity());
        contents[NAME_LEN..NAME_LEN + n].copy_from_slice(&data[..n]);
        self.device.write_block(block, &contents)?;

        debug!(name, block, bytes = n, "wrote file");
        Ok(n)
    }

    pub fn delete(&mut self, name: &str) -> Result<()> {
        let block = self.lookup(name)?;
        self.device.write_block(block, &vec![0; self.block_size])?;
        self.table[block] = None;

        let mut free_map = self.read_free_map()?;
        free_map[block] = BLOCK_FREE;
        self.device.write_block(FREE_MAP_BLOCK_ID, &free_map)?;

        debug!(name, block, "deleted file");
        Ok(())
    }

    /// File names in block order.
    pub fn list(&self) -> Vec<String> {
        self.table.iter().flatten().cloned().collect()
    }

    pub fn sync(&self) -> Result<()> {
        self.device.flush()?;
        Ok(())
    }

    fn find(&self, name: &str) -> Option<usize> {
        self.table
            .iter()
            .position(|slot| slot.as_deref() == Some(name))
    }

    fn lookup(&self, name: &str) -> Result<usize> {
        self.find(name)
            .ok_or_else(|| FileSystemError::NotFound(name.to_string()))
    }

    fn read_free_map(&self) -> Result<Vec<u8>> {
        let mut free_map = vec![0; self.block_size];
        self.device.read_block(FREE_MAP_BLOCK_ID, &mut free_map)?;
        Ok(free_map)
    }
}

fn decode_name(raw: &[u8]) -> String {
    let end = raw.iter().position(|&b| b == 0).unwrap_or(raw.len());
    String::from_utf8_lossy(&raw[..end]).into_owned()
}
