use std::{path::PathBuf, sync::Arc};

use clap::{Args, ValueEnum};

use crate::disk::{
    Disk, DiskFault, DiskHandle, FastDisk, Geometry, SeekModel, DEFAULT_IMAGE_PATH,
};

pub const DEFAULT_CACHE_SIZE: usize = 10;
pub const DEFAULT_DISK_SIZE: usize = 100;
pub const DEFAULT_SHELL: &str = "FileTester";

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum DiskModel {
    /// Slow disk with seek delays and completion interrupts
    #[value(name = "Disk")]
    Disk,
    /// Instant disk, no interrupts
    #[value(name = "FastDisk")]
    FastDisk,
}

/// Boot parameters, handed to the kernel with the power-on interrupt.
#[derive(Debug, Clone, Args)]
pub struct BootConfig {
    /// Disk cache size, in blocks
    #[arg(long, default_value_t = DEFAULT_CACHE_SIZE)]
    pub cache_size: usize,

    /// Disk model to boot with
    #[arg(long = "disk", value_enum, ignore_case = true, default_value_t = DiskModel::FastDisk)]
    pub disk_model: DiskModel,

    /// Disk size, in blocks
    #[arg(long, default_value_t = DEFAULT_DISK_SIZE)]
    pub disk_size: usize,

    /// Host file holding the disk image
    #[arg(long, default_value = DEFAULT_IMAGE_PATH)]
    pub image: PathBuf,

    /// Initial program and its arguments
    #[arg(trailing_var_arg = true, allow_hyphen_values = true, value_name = "SHELL")]
    pub shell: Vec<String>,
}

impl BootConfig {
    pub fn shell_command(&self) -> String {
        if self.shell.is_empty() {
            DEFAULT_SHELL.to_string()
        } else {
            self.shell.join(" ")
        }
    }

    pub fn geometry(&self) -> Geometry {
        Geometry::new(self.disk_size)
    }

    /// Builds the chosen disk model, restoring the image if one exists.
    pub fn build_disk(&self) -> Result<DiskHandle, DiskFault> {
        let disk = match self.disk_model {
            DiskModel::Disk => DiskHandle::Async(Arc::new(Disk::new(
                self.geometry(),
                &self.image,
                SeekModel::default(),
            )?)),
            DiskModel::FastDisk => {
                DiskHandle::Fast(Arc::new(FastDisk::new(self.geometry(), &self.image)?))
            }
        };
        Ok(disk)
    }
}

impl Default for BootConfig {
    fn default() -> Self {
        Self {
            cache_size: DEFAULT_CACHE_SIZE,
            disk_model: DiskModel::FastDisk,
            disk_size: DEFAULT_DISK_SIZE,
            image: PathBuf::from(DEFAULT_IMAGE_PATH),
            shell: Vec::new(),
        }
    }
}
