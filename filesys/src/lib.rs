#![no_std]

extern crate alloc;

/* 文件系统的整体架构，自上而下 */

// 管道层：以隐藏文件为存储的环形缓冲区
mod pipe;

// 命名层：按名字创建、打开、删除文件
mod fs;

// 文件句柄层：带读写位置、按字节偏移访问文件
mod open_file;

// 磁盘数据结构层：文件头、位图与目录项
mod layout;

// 扇区缓冲层：单个扇区在内存中的副本
mod sector;

mod error;

pub use block_dev::BlockDevice;

pub use self::{
    error::{Error, Result},
    fs::{Clock, FileSystem, NUM_DIR_ENTRIES},
    layout::{
        file_type_of, Bitmap, FileHeader, SectorMap, INDIRECT_COUNT, MAX_FILE_SIZE, MAX_SECTORS,
        NUM_DATA_SECTORS, NUM_DIRECT,
    },
    open_file::OpenFile,
    pipe::Pipe,
};

pub const SECTOR_SIZE: usize = 128;
/// 默认磁盘大小：32 道 × 每道 32 扇区
pub const NUM_SECTORS: usize = 32 * 32;

/// 空闲扇区位图文件的文件头所在扇区
pub const FREE_MAP_SECTOR: SectorId = SectorId::new(0);
/// 目录文件的文件头所在扇区
pub const DIRECTORY_SECTOR: SectorId = SectorId::new(1);

/// 扇区号
#[derive(
    Debug,
    Default,
    Clone,
    Copy,
    PartialEq,
    Eq,
    PartialOrd,
    Ord,
    Hash,
    derive_more::From,
    derive_more::Into,
    derive_more::Display,
)]
#[repr(transparent)]
pub struct SectorId(u32);

impl SectorId {
    #[inline]
    pub const fn new(raw: u32) -> Self {
        Self(raw)
    }

    #[inline]
    pub const fn as_usize(self) -> usize {
        self.0 as usize
    }
}
