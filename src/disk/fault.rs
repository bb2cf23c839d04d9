use std::{io, path::PathBuf};

use thiserror::Error;

use crate::disk::types::Direction;

/// Misuse of the simulated hardware.
///
/// These are not ordinary error returns: the kernel treats every one of them
/// as a crashed machine and halts the simulation.
#[derive(Debug, Error)]
pub enum DiskFault {
    #[error("YOU CRASHED THE DISK: illegal {direction} request for block {block} on a {disk_size}-block disk")]
    BlockOutOfRange {
        direction: Direction,
        block: usize,
        disk_size: usize,
    },

    #[error("YOU CRASHED THE DISK: illegal {direction} request with a {len}-byte buffer (block size is {block_size})")]
    BufferTooSmall {
        direction: Direction,
        len: usize,
        block_size: usize,
    },

    #[error("YOU CRASHED THE DISK: disk {0} attempted while the disk was still busy")]
    Busy(Direction),

    #[error("YOU CRASHED THE DISK: a disk must have at least one block")]
    NoBlocks,

    #[error("YOU CRASHED THE DISK: cannot make a FastDisk with {requested} blocks, max size is {max}")]
    TooLarge { requested: usize, max: usize },

    #[error("YOU CRASHED THE DISK: image {path:?} is {actual} bytes, expected {expected}")]
    ImageSizeMismatch {
        path: PathBuf,
        actual: u64,
        expected: u64,
    },

    #[error("YOU CRASHED THE DISK: image {path:?}: {source}")]
    Image {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("YOU CRASHED THE DISK: cannot start the disk worker: {0}")]
    WorkerSpawn(#[source] io::Error),
}
