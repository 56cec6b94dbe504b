//! # 磁盘数据结构层
//!
//! 磁盘布局：
//! 位图文件头(0号扇区) | 目录文件头(1号扇区) | 其余扇区按位图分配
//!
//! 位图与目录本身也是普通文件，其数据扇区同样由位图管理。

mod bitmap;
pub use bitmap::Bitmap;

mod file_header;
pub use file_header::{
    file_type_of, FileHeader, SectorMap, INDIRECT_COUNT, MAX_FILE_SIZE, MAX_SECTORS,
    NUM_DATA_SECTORS, NUM_DIRECT,
};

/// 目录项与平坦目录表
mod dir_entry;
pub use dir_entry::{DirEntry, Directory};
