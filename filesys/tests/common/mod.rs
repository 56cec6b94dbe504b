#![allow(dead_code)]

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use block_dev::{BlockDevice, RamDisk};
use filesys::{FileSystem, NUM_SECTORS, SECTOR_SIZE};

pub fn init_logger() {
    let _ = env_logger::builder().is_test(true).try_init();
}

pub fn ram_disk() -> Arc<RamDisk> {
    Arc::new(RamDisk::new(NUM_SECTORS, SECTOR_SIZE))
}

pub fn formatted() -> (FileSystem, Arc<RamDisk>) {
    init_logger();
    let disk = ram_disk();
    let fs = FileSystem::format(disk.clone(), NUM_SECTORS).unwrap();
    (fs, disk)
}

/// 记录读写次数的内存盘
pub struct CountingDisk {
    inner: RamDisk,
    pub reads: AtomicUsize,
    pub writes: AtomicUsize,
}

impl CountingDisk {
    pub fn new() -> Self {
        Self {
            inner: RamDisk::new(NUM_SECTORS, SECTOR_SIZE),
            reads: AtomicUsize::new(0),
            writes: AtomicUsize::new(0),
        }
    }

    pub fn reads(&self) -> usize {
        self.reads.load(Ordering::SeqCst)
    }
}

impl BlockDevice for CountingDisk {
    fn read_block(&self, block_id: usize, buf: &mut [u8]) {
        self.reads.fetch_add(1, Ordering::SeqCst);
        self.inner.read_block(block_id, buf);
    }

    fn write_block(&self, block_id: usize, buf: &[u8]) {
        self.writes.fetch_add(1, Ordering::SeqCst);
        self.inner.write_block(block_id, buf);
    }
}
