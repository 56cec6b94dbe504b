use derive_more::Display;

#[derive(Debug, Display, Clone, Copy, PartialEq, Eq)]
pub enum Error {
    /// 空闲扇区不足
    #[display(fmt = "not enough space")]
    NoSpace,
    /// 超出单级间接索引所能表示的最大文件
    #[display(fmt = "file too large")]
    FileTooLarge,
    /// 扩容会越过直接索引的范围
    #[display(fmt = "cannot expand beyond the direct blocks")]
    ExpandBeyondDirect,
    #[display(fmt = "file already exists")]
    AlreadyExists,
    #[display(fmt = "file not found")]
    NotFound,
    #[display(fmt = "file name too long")]
    NameTooLong,
    #[display(fmt = "file name is empty")]
    EmptyName,
    #[display(fmt = "directory is full")]
    DirectoryFull,
    /// 管道至少要能缓存一个字节
    #[display(fmt = "pipe size must be positive")]
    ZeroSizedPipe,
}

pub type Result<T> = core::result::Result<T, Error>;

impl core::error::Error for Error {}
