//! # 扇区设备接口层
//!
//! 磁盘以**扇区**为单位读写，[`BlockDevice`] 就是对扇区读写的抽象，
//! 实现了此特质的类型称为**块设备驱动**。
//!
//! 读写都是同步的：调用返回时数据已经落到设备上（或已从设备读出）。

#![no_std]

extern crate alloc;

use alloc::vec;
use alloc::vec::Vec;
use core::any::Any;

use spin::Mutex;

/// 块设备驱动特质
pub trait BlockDevice: Send + Sync + Any {
    /// 读出一整块，`buf` 的长度必须等于块大小
    fn read_block(&self, block_id: usize, buf: &mut [u8]);
    /// 写入一整块，`buf` 的长度必须等于块大小
    fn write_block(&self, block_id: usize, buf: &[u8]);
}

/// 内存盘：整块磁盘放在一段连续内存里
#[derive(Debug)]
pub struct RamDisk {
    block_size: usize,
    data: Mutex<Vec<u8>>,
}

impl RamDisk {
    pub fn new(num_blocks: usize, block_size: usize) -> Self {
        Self {
            block_size,
            data: Mutex::new(vec![0; num_blocks * block_size]),
        }
    }

    #[inline]
    pub fn num_blocks(&self) -> usize {
        self.data.lock().len() / self.block_size
    }

    #[inline]
    pub fn block_size(&self) -> usize {
        self.block_size
    }

    /// 块在内存中的字节范围
    fn span(&self, block_id: usize, len: usize) -> core::ops::Range<usize> {
        assert_eq!(len, self.block_size, "not a complete block!");
        assert!(block_id < self.num_blocks(), "block {block_id} out of range");
        let start = block_id * self.block_size;
        start..start + self.block_size
    }
}

impl BlockDevice for RamDisk {
    fn read_block(&self, block_id: usize, buf: &mut [u8]) {
        let span = self.span(block_id, buf.len());
        buf.copy_from_slice(&self.data.lock()[span]);
    }

    fn write_block(&self, block_id: usize, buf: &[u8]) {
        let span = self.span(block_id, buf.len());
        self.data.lock()[span].copy_from_slice(buf);
    }
}
