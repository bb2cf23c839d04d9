pub const FREE_MAP_BLOCK_ID: usize = 0;

// First block a file may live in; block 0 is the free map
pub const FIRST_FILE_BLOCK_ID: usize = 1;

// Slots in the in-memory file table (slot 0 is never used)
pub const FILE_TABLE_SLOTS: usize = 100;

// Each file block starts with its zero-padded name
pub const NAME_LEN: usize = 32;

// Free-map byte values
pub const BLOCK_USED: u8 = b'1';
pub const BLOCK_FREE: u8 = b'0';
