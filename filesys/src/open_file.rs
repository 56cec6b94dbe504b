//! # 文件句柄层
//!
//! 句柄只记住文件头所在的扇区与读写位置。同一文件可以有多个句柄，
//! 文件头以磁盘上的为准：每次读写都重新读出，写入与扩容在卷锁内完成。

use alloc::vec;

use block_dev::BlockDevice;
use log::warn;

use crate::layout::FileHeader;
use crate::FileSystem;
use crate::SectorId;

pub struct OpenFile {
    fs: FileSystem,
    header_sector: SectorId,
    /// 顺序读写的当前位置
    seek_position: usize,
}

impl OpenFile {
    pub(crate) fn new(fs: FileSystem, header_sector: SectorId) -> Self {
        Self {
            fs,
            header_sector,
            seek_position: 0,
        }
    }

    /// 从 `offset` 处读，最多读到文件末尾
    pub fn read_at(&self, offset: usize, buf: &mut [u8]) -> usize {
        self.header().read_at(offset, buf, self.fs.block_device())
    }

    /// 写到 `offset` 处。越过文件末尾时先尝试扩容，扩不了就只写到末尾为止
    pub fn write_at(&mut self, offset: usize, buf: &[u8]) -> usize {
        let block_device = self.fs.block_device();
        let mut volume = self.fs.volume();
        let mut header = self.header();

        let end = offset + buf.len();
        let length = header.file_length();
        if end > length {
            match header.expand_size(&mut volume.free_map, end - length) {
                Ok(()) => {
                    // 新扇区随位图一起落盘
                    volume.flush(block_device);
                    if offset > length {
                        zero_fill(&header, length, offset, block_device);
                    }
                }
                Err(err) => warn!("cannot expand file to {end} bytes: {err}"),
            }
        }

        let written = header.write_at(offset, buf, block_device);
        if written > 0 || header.file_length() != length {
            header.set_modified_time(&volume.clock.now());
            header.write_back(block_device, self.header_sector);
        }

        written
    }

    pub fn read(&mut self, buf: &mut [u8]) -> usize {
        let read = self.read_at(self.seek_position, buf);
        self.seek_position += read;
        read
    }

    pub fn write(&mut self, buf: &[u8]) -> usize {
        let written = self.write_at(self.seek_position, buf);
        self.seek_position += written;
        written
    }

    #[inline]
    pub fn seek(&mut self, position: usize) {
        self.seek_position = position;
    }

    pub fn length(&self) -> usize {
        self.header().file_length()
    }

    /// 从磁盘读出当前的文件头
    pub fn header(&self) -> FileHeader {
        let mut header = FileHeader::fetch_from(self.fs.block_device(), self.header_sector);
        header.set_header_sector(self.header_sector);
        header
    }

    #[inline]
    pub fn header_sector(&self) -> SectorId {
        self.header_sector
    }
}

/// 把 `[start, end)` 清零，扩容留下的空洞不能露出旧数据
fn zero_fill(header: &FileHeader, start: usize, end: usize, block_device: &dyn BlockDevice) {
    header.write_at(start, &vec![0; end - start], block_device);
}
