//! # 命名层
//!
//! 把文件名映射到文件头所在扇区，负责整盘的格式化与挂载。
//!
//! 0 号扇区存放位图文件的文件头，1 号扇区存放目录文件的文件头；
//! 位图与目录常驻内存，每次修改后整体写回各自的文件。

use alloc::string::String;
use alloc::sync::Arc;
use alloc::vec;
use alloc::vec::Vec;
use core::fmt;

use block_dev::BlockDevice;
use log::{debug, info};
use spin::Mutex;

use crate::layout::{file_type_of, Bitmap, DirEntry, Directory, FileHeader};
use crate::sector::Sector;
use crate::{Error, OpenFile, Result, DIRECTORY_SECTOR, FREE_MAP_SECTOR};

/// 目录能容纳的文件数
pub const NUM_DIR_ENTRIES: usize = 16;

/// 时钟，为新建与修改的文件提供时间戳
pub trait Clock: Send + Sync {
    fn now(&self) -> String;
}

/// 没有时钟可用时，时间戳一律为空
struct NoClock;

impl Clock for NoClock {
    fn now(&self) -> String {
        String::new()
    }
}

/// 文件系统句柄，可在多个文件、管道之间共享
#[derive(Clone)]
pub struct FileSystem {
    volume: Arc<Mutex<Volume>>,
    block_device: Arc<dyn BlockDevice>,
}

/// 挂载后的整盘状态
pub(crate) struct Volume {
    pub(crate) free_map: Bitmap,
    directory: Directory,
    free_map_file: FileHeader,
    directory_file: FileHeader,
    pub(crate) clock: Arc<dyn Clock>,
}

impl FileSystem {
    /// 在 `num_sectors` 个扇区的磁盘上建立空文件系统
    pub fn format(block_device: Arc<dyn BlockDevice>, num_sectors: usize) -> Result<Self> {
        info!("formatting a disk of {num_sectors} sectors");
        let mut free_map = Bitmap::new(num_sectors);
        let directory = Directory::new(NUM_DIR_ENTRIES);

        // 先占住两个文件头所在的扇区
        free_map.mark(FREE_MAP_SECTOR);
        free_map.mark(DIRECTORY_SECTOR);

        let mut free_map_file = FileHeader::new();
        free_map_file.allocate(&mut free_map, &*block_device, num_sectors.div_ceil(8))?;
        free_map_file.set_header_sector(FREE_MAP_SECTOR);
        let mut directory_file = FileHeader::new();
        directory_file.allocate(
            &mut free_map,
            &*block_device,
            Directory::file_size(NUM_DIR_ENTRIES),
        )?;
        directory_file.set_header_sector(DIRECTORY_SECTOR);

        free_map_file.write_back(&*block_device, FREE_MAP_SECTOR);
        directory_file.write_back(&*block_device, DIRECTORY_SECTOR);

        let volume = Volume {
            free_map,
            directory,
            free_map_file,
            directory_file,
            clock: Arc::new(NoClock),
        };
        volume.flush(&*block_device);

        Ok(Self {
            volume: Arc::new(Mutex::new(volume)),
            block_device,
        })
    }

    /// 挂载已经格式化过的磁盘
    pub fn mount(block_device: Arc<dyn BlockDevice>, num_sectors: usize) -> Self {
        let mut free_map_file = FileHeader::fetch_from(&*block_device, FREE_MAP_SECTOR);
        free_map_file.set_header_sector(FREE_MAP_SECTOR);
        let mut directory_file = FileHeader::fetch_from(&*block_device, DIRECTORY_SECTOR);
        directory_file.set_header_sector(DIRECTORY_SECTOR);

        let mut raw = vec![0; free_map_file.file_length()];
        free_map_file.read_at(0, &mut raw, &*block_device);
        let free_map = Bitmap::from_bytes(num_sectors, &raw);

        let mut raw = vec![0; directory_file.file_length()];
        directory_file.read_at(0, &mut raw, &*block_device);
        let directory = Directory::from_bytes(NUM_DIR_ENTRIES, &raw);

        debug!(
            "mounted: {} files, {} free sectors",
            directory.names().len(),
            free_map.num_clear()
        );

        Self {
            volume: Arc::new(Mutex::new(Volume {
                free_map,
                directory,
                free_map_file,
                directory_file,
                clock: Arc::new(NoClock),
            })),
            block_device,
        }
    }

    pub fn with_clock(self, clock: Arc<dyn Clock>) -> Self {
        self.volume.lock().clock = clock;
        self
    }

    /// 新建 `size` 字节的文件。
    ///
    /// 在位图与目录的副本上操作，全部成功后才替换并写回，失败不留痕迹。
    pub fn create(&self, name: &str, size: usize) -> Result<()> {
        let mut volume = self.volume.lock();

        if volume.directory.find(name).is_some() {
            return Err(Error::AlreadyExists);
        }

        let mut free_map = volume.free_map.clone();
        let mut directory = volume.directory.clone();

        let sector = free_map.find().ok_or(Error::NoSpace)?;
        let entry = DirEntry::new(name, sector)?;
        directory.add(entry).ok_or(Error::DirectoryFull)?;

        let mut header = FileHeader::new();
        header.allocate(&mut free_map, &*self.block_device, size)?;
        // 新文件不能看到已删除文件的残留数据
        let zeroed = Sector::zeroed();
        for data_sector in header.sectors(&*self.block_device) {
            zeroed.store(data_sector, &*self.block_device);
        }
        header.set_header(file_type_of(name), &volume.clock.now());
        header.set_header_sector(sector);
        header.write_back(&*self.block_device, sector);

        volume.free_map = free_map;
        volume.directory = directory;
        volume.flush(&*self.block_device);
        debug!("created {name:?} ({size} bytes) with header in sector {sector}");

        Ok(())
    }

    pub fn open(&self, name: &str) -> Result<OpenFile> {
        let sector = self
            .volume
            .lock()
            .directory
            .find(name)
            .ok_or(Error::NotFound)?;
        Ok(OpenFile::new(self.clone(), sector))
    }

    /// 删除文件，归还其数据扇区与文件头扇区
    pub fn remove(&self, name: &str) -> Result<()> {
        let mut volume = self.volume.lock();

        let sector = volume.directory.remove(name).ok_or(Error::NotFound)?;
        let mut header = FileHeader::fetch_from(&*self.block_device, sector);
        header.deallocate(&mut volume.free_map, &*self.block_device);
        volume.free_map.clear(sector);

        volume.flush(&*self.block_device);
        debug!("removed {name:?}, header was in sector {sector}");

        Ok(())
    }

    pub fn list(&self) -> Vec<String> {
        self.volume.lock().directory.names()
    }

    pub fn num_free_sectors(&self) -> usize {
        self.volume.lock().free_map.num_clear()
    }

    /// 打印位图占用情况、目录以及每个文件的文件头
    pub fn print(&self, out: &mut impl fmt::Write) -> fmt::Result {
        let volume = self.volume.lock();

        writeln!(out, "Bit map file header:")?;
        volume.free_map_file.print(&*self.block_device, out)?;
        writeln!(out, "Directory file header:")?;
        volume.directory_file.print(&*self.block_device, out)?;

        writeln!(
            out,
            "Free sectors: {} of {}",
            volume.free_map.num_clear(),
            volume.free_map.len()
        )?;
        for name in volume.directory.names() {
            let Some(sector) = volume.directory.find(&name) else {
                continue;
            };
            writeln!(out, "Name: {name}, Sector: {sector}")?;
            FileHeader::fetch_from(&*self.block_device, sector).print(&*self.block_device, out)?;
        }

        Ok(())
    }
}

impl FileSystem {
    #[inline]
    pub(crate) fn block_device(&self) -> &dyn BlockDevice {
        &*self.block_device
    }

    #[inline]
    pub(crate) fn volume(&self) -> spin::MutexGuard<'_, Volume> {
        self.volume.lock()
    }
}

impl Volume {
    /// 位图与目录写回各自的文件
    pub(crate) fn flush(&self, block_device: &dyn BlockDevice) {
        self.free_map_file.write_at(0, &self.free_map.to_bytes(), block_device);
        self.directory_file.write_at(0, &self.directory.to_bytes(), block_device);
    }
}
