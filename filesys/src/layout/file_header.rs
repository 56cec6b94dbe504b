//! 文件头：描述文件的数据存放在磁盘的哪些扇区上
//!
//! 文件头恰好占据一个扇区，其中记录着若干**扇区编号**：
//! - 直接索引：编号直接指向一个**数据扇区**
//! - 一级间接索引：编号指向一个**索引扇区**，索引扇区整块连续存储数据扇区的编号
//!
//! 不支持二级及以上的间接索引，所以文件大小有上限 [`MAX_FILE_SIZE`]。
//!
//! ## 磁盘布局
//!
//! `[字节数][扇区数][类型][创建时间][修改时间][访问时间][扇区编号 × NUM_DATA_SECTORS]`
//!
//! 扇区编号表的最后一项在使用间接索引时存放索引扇区的编号。

use alloc::vec::Vec;
use core::fmt;
use core::mem;

use block_dev::BlockDevice;
use log::{debug, trace};

use crate::layout::Bitmap;
use crate::sector::Sector;
use crate::{Error, Result};
use crate::{SectorId, SECTOR_SIZE};

/// 文件类型字段的长度（含结尾的 `\0`）
pub const FILE_TYPE_LEN: usize = 5;
/// 时间字段的长度（含结尾的 `\0`）
pub const FILE_TIME_LEN: usize = 26;

/// 扇区编号表之前的元信息字节数：两个整数、类型和三个时间
const METADATA_SIZE: usize = 2 * mem::size_of::<u32>() + FILE_TYPE_LEN + 3 * FILE_TIME_LEN;

/// 文件头里扇区编号表的项数
pub const NUM_DATA_SECTORS: usize = (SECTOR_SIZE - METADATA_SIZE) / mem::size_of::<u32>();
/// 直接索引的项数，最后一项留给间接索引
pub const NUM_DIRECT: usize = NUM_DATA_SECTORS - 1;
/// 索引扇区的编号容量
pub const INDIRECT_COUNT: usize = SECTOR_SIZE / mem::size_of::<u32>();
/// 一个文件最多拥有的数据扇区数
pub const MAX_SECTORS: usize = NUM_DIRECT + INDIRECT_COUNT;
pub const MAX_FILE_SIZE: usize = MAX_SECTORS * SECTOR_SIZE;

/// 索引扇区
type IndirectBlock = [u32; INDIRECT_COUNT];

/// 文件头在磁盘上的样子
#[repr(C)]
struct DiskFileHeader {
    num_bytes: u32,
    num_sectors: u32,
    file_type: [u8; FILE_TYPE_LEN],
    created_time: [u8; FILE_TIME_LEN],
    modified_time: [u8; FILE_TIME_LEN],
    visited_time: [u8; FILE_TIME_LEN],
    data_sectors: [u32; NUM_DATA_SECTORS],
}

const _: () = assert!(mem::size_of::<DiskFileHeader>() == SECTOR_SIZE);

/// 文件头的扇区映射，由扇区数决定取哪一种
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SectorMap {
    /// 扇区数不超过 [`NUM_DIRECT`]，只用直接索引
    Direct { sectors: Vec<SectorId> },
    /// 直接索引全部用满，其余的数据扇区登记在索引扇区 `index` 里
    Indirect {
        direct: [SectorId; NUM_DIRECT],
        index: SectorId,
    },
}

impl Default for SectorMap {
    fn default() -> Self {
        Self::Direct {
            sectors: Vec::new(),
        }
    }
}

/// 内存中的文件头
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct FileHeader {
    num_bytes: u32,
    map: SectorMap,
    file_type: [u8; FILE_TYPE_LEN],
    created_time: [u8; FILE_TIME_LEN],
    modified_time: [u8; FILE_TIME_LEN],
    visited_time: [u8; FILE_TIME_LEN],
    /// 文件头自身所在的扇区，由命名层设置，不落盘
    header_sector: Option<SectorId>,
}

impl FileHeader {
    #[inline]
    pub fn new() -> Self {
        Self::default()
    }

    /// 为新文件分配 `file_size` 字节的数据扇区。
    ///
    /// 空闲扇区不足时返回 [`Error::NoSpace`]，超出单级间接索引的容量时返回
    /// [`Error::FileTooLarge`]；失败时位图与文件头都不会被改动。
    pub fn allocate(
        &mut self,
        free_map: &mut Bitmap,
        block_device: &dyn BlockDevice,
        file_size: usize,
    ) -> Result<()> {
        let num_sectors = Self::count_sectors(file_size);
        if num_sectors > MAX_SECTORS {
            return Err(Error::FileTooLarge);
        }
        if free_map.num_clear() < Self::count_total_sectors(file_size) {
            return Err(Error::NoSpace);
        }

        let mut take = || free_map.find().expect("free sectors were counted");

        self.map = if num_sectors <= NUM_DIRECT {
            debug!("allocating {num_sectors} sectors using direct indexing only");
            SectorMap::Direct {
                sectors: (0..num_sectors).map(|_| take()).collect(),
            }
        } else {
            debug!("allocating {num_sectors} sectors using single indirect indexing");
            let direct = core::array::from_fn(|_| take());
            let index = take();

            // 索引扇区不驻留在文件头里，分配完立即写盘
            let mut block = Sector::zeroed();
            block.map_mut(0, |indirect: &mut IndirectBlock| {
                for slot in &mut indirect[..num_sectors - NUM_DIRECT] {
                    *slot = take().into();
                }
            });
            block.store(index, block_device);

            SectorMap::Indirect { direct, index }
        };
        self.num_bytes = file_size as u32;

        Ok(())
    }

    /// 把文件拥有的全部扇区（包括索引扇区）归还给位图，之后文件头为空。
    ///
    /// 每个登记在案的扇区都必须在位图中被标记为占用，否则说明文件头与位图
    /// 已经不一致，直接 panic。
    pub fn deallocate(&mut self, free_map: &mut Bitmap, block_device: &dyn BlockDevice) {
        let num_sectors = self.sector_count();
        let release = |free_map: &mut Bitmap, sector: SectorId| {
            assert!(
                free_map.test(sector),
                "sector {sector} is not marked as allocated"
            );
            free_map.clear(sector);
        };

        for &sector in self.direct_sectors() {
            release(free_map, sector);
        }

        if let SectorMap::Indirect { index, .. } = self.map {
            debug!("deallocating single indirect index sector {index}");
            Sector::load(index, block_device).map(0, |indirect: &IndirectBlock| {
                for &sector in &indirect[..num_sectors - NUM_DIRECT] {
                    release(free_map, sector.into());
                }
            });
            release(free_map, index);
        }

        self.num_bytes = 0;
        self.map = SectorMap::default();
    }

    /// 在直接索引的范围内把文件扩大 `extra` 字节。
    ///
    /// 扇区数不变时只改字节数；需要新扇区但空闲扇区不足时返回
    /// [`Error::NoSpace`]；新扇区数越过直接索引时返回
    /// [`Error::ExpandBeyondDirect`]。失败时什么都不改。
    pub fn expand_size(&mut self, free_map: &mut Bitmap, extra: usize) -> Result<()> {
        let new_bytes = self.file_length() + extra;
        let old_sectors = self.sector_count();
        let new_sectors = Self::count_sectors(new_bytes);

        if new_sectors == old_sectors {
            self.num_bytes = new_bytes as u32;
            return Ok(());
        }

        let SectorMap::Direct { sectors } = &mut self.map else {
            return Err(Error::ExpandBeyondDirect);
        };
        if new_sectors > NUM_DIRECT {
            return Err(Error::ExpandBeyondDirect);
        }
        if free_map.num_clear() < new_sectors - old_sectors {
            return Err(Error::NoSpace);
        }

        debug!("expanding from {old_sectors} to {new_sectors} sectors");
        for _ in old_sectors..new_sectors {
            sectors.push(free_map.find().expect("free sectors were counted"));
        }
        self.num_bytes = new_bytes as u32;

        Ok(())
    }

    /// 把文件内的字节偏移翻译成存放该字节的扇区编号。
    ///
    /// 落在间接索引范围内的偏移每次都要多读一次索引扇区。
    pub fn byte_to_sector(&self, block_device: &dyn BlockDevice, offset: usize) -> SectorId {
        assert!(
            offset < self.file_length(),
            "offset {offset} out of file range {}",
            self.file_length()
        );
        let block_index = offset / SECTOR_SIZE;

        match &self.map {
            SectorMap::Direct { sectors } => sectors[block_index],
            SectorMap::Indirect { direct, .. } if block_index < NUM_DIRECT => direct[block_index],
            SectorMap::Indirect { index, .. } => {
                // 剔去直接索引的部分
                let slot = block_index - NUM_DIRECT;
                trace!("offset {offset} goes through index sector {index} slot {slot}");
                Sector::load(*index, block_device)
                    .map(0, |indirect: &IndirectBlock| indirect[slot].into())
            }
        }
    }

    /// 从磁盘读出文件头
    pub fn fetch_from(block_device: &dyn BlockDevice, sector: SectorId) -> Self {
        Sector::load(sector, block_device).map(0, |disk: &DiskFileHeader| {
            let num_sectors = disk.num_sectors as usize;
            assert!(
                num_sectors <= MAX_SECTORS,
                "corrupted file header in sector {sector}"
            );

            let map = if num_sectors <= NUM_DIRECT {
                SectorMap::Direct {
                    sectors: disk.data_sectors[..num_sectors]
                        .iter()
                        .map(|&raw| raw.into())
                        .collect(),
                }
            } else {
                SectorMap::Indirect {
                    direct: core::array::from_fn(|i| disk.data_sectors[i].into()),
                    index: disk.data_sectors[NUM_DIRECT].into(),
                }
            };

            Self {
                num_bytes: disk.num_bytes,
                map,
                file_type: disk.file_type,
                created_time: disk.created_time,
                modified_time: disk.modified_time,
                visited_time: disk.visited_time,
                header_sector: None,
            }
        })
    }

    /// 把文件头写回磁盘
    pub fn write_back(&self, block_device: &dyn BlockDevice, sector: SectorId) {
        let mut raw = Sector::zeroed();
        raw.map_mut(0, |disk: &mut DiskFileHeader| {
            disk.num_bytes = self.num_bytes;
            disk.num_sectors = self.sector_count() as u32;
            disk.file_type = self.file_type;
            disk.created_time = self.created_time;
            disk.modified_time = self.modified_time;
            disk.visited_time = self.visited_time;

            let direct = self.direct_sectors();
            for (slot, &sector) in disk.data_sectors.iter_mut().zip(direct) {
                *slot = sector.into();
            }
            if let SectorMap::Indirect { index, .. } = self.map {
                disk.data_sectors[NUM_DIRECT] = index.into();
            }
        });
        raw.store(sector, block_device);
    }

    /// 从指定位置（字节偏移）读出数据填充 `buf`，不会越过文件末尾
    pub fn read_at(&self, offset: usize, buf: &mut [u8], block_device: &dyn BlockDevice) -> usize {
        let mut start = offset;
        let end = (offset + buf.len()).min(self.file_length());

        if start >= end {
            return 0;
        }

        // 已读取多少字节
        let mut read_size = 0;
        loop {
            // 当前扇区的末地址(字节)
            let current_block_end = ((start / SECTOR_SIZE + 1) * SECTOR_SIZE).min(end);
            let block_read_size = current_block_end - start;

            let sector = Sector::load(self.byte_to_sector(block_device, start), block_device);
            // 绝对地址 % 扇区大小 = 扇区内偏移
            let src = &sector.bytes()[start % SECTOR_SIZE..][..block_read_size];
            buf[read_size..read_size + block_read_size].copy_from_slice(src);

            read_size += block_read_size;

            if current_block_end == end {
                break;
            }

            start = current_block_end;
        }

        read_size
    }

    /// 把 `buf` 写到指定位置，不会越过文件末尾
    pub fn write_at(&self, offset: usize, buf: &[u8], block_device: &dyn BlockDevice) -> usize {
        let mut start = offset;
        let end = (offset + buf.len()).min(self.file_length());

        if start >= end {
            return 0;
        }

        let mut written_size = 0;
        loop {
            let current_block_end = ((start / SECTOR_SIZE + 1) * SECTOR_SIZE).min(end);
            let block_write_size = current_block_end - start;

            let id = self.byte_to_sector(block_device, start);
            // 只写扇区的一部分时要先把原内容读出来
            let mut sector = if block_write_size == SECTOR_SIZE {
                Sector::zeroed()
            } else {
                Sector::load(id, block_device)
            };
            sector.bytes_mut()[start % SECTOR_SIZE..][..block_write_size]
                .copy_from_slice(&buf[written_size..written_size + block_write_size]);
            sector.store(id, block_device);

            written_size += block_write_size;

            if current_block_end == end {
                break;
            }

            start = current_block_end;
        }

        written_size
    }

    /// 按顺序列出全部数据扇区，间接部分只读一次索引扇区
    pub fn sectors(&self, block_device: &dyn BlockDevice) -> Vec<SectorId> {
        let mut sectors = self.direct_sectors().to_vec();

        if let SectorMap::Indirect { index, .. } = self.map {
            let num_indirect = self.sector_count() - NUM_DIRECT;
            Sector::load(index, block_device).map(0, |indirect: &IndirectBlock| {
                sectors.extend(indirect[..num_indirect].iter().copied().map(SectorId::from));
            });
        }

        sectors
    }

    /// 打印文件头的元信息以及全部数据扇区的内容，不可打印的字节以 `\xx` 表示
    pub fn print(&self, block_device: &dyn BlockDevice, out: &mut impl fmt::Write) -> fmt::Result {
        writeln!(out)?;
        writeln!(out, " File type:\t{}", self.file_type())?;
        writeln!(out, " Created:\t{}", self.created_time())?;
        writeln!(out, " Last visited:\t{}", self.visited_time())?;
        writeln!(out, " Modified:\t{}", self.modified_time())?;
        write!(out, " File size:\t{}\n File blocks:\n", self.num_bytes)?;

        let sectors = self.sectors(block_device);
        let (direct, indirect) = sectors.split_at(sectors.len().min(NUM_DIRECT));

        write!(out, "  Direct indexing:\n    ")?;
        for sector in direct {
            write!(out, "{sector} ")?;
        }
        if let SectorMap::Indirect { index, .. } = self.map {
            write!(out, "\n  Indirect indexing: (mapping table sector: {index})\n    ")?;
            for sector in indirect {
                write!(out, "{sector} ")?;
            }
        }

        writeln!(out, "\nFile contents:")?;
        let mut remaining = self.file_length();
        for &id in &sectors {
            let sector = Sector::load(id, block_device);
            let used = remaining.min(SECTOR_SIZE);
            for &byte in &sector.bytes()[..used] {
                if (0x20..=0x7e).contains(&byte) {
                    write!(out, "{}", byte as char)?;
                } else {
                    write!(out, "\\{byte:x}")?;
                }
            }
            writeln!(out)?;
            remaining -= used;
        }
        writeln!(out, "----------------------------------------------")
    }
}

impl FileHeader {
    #[inline]
    pub fn file_length(&self) -> usize {
        self.num_bytes as usize
    }

    #[inline]
    pub fn sector_count(&self) -> usize {
        Self::count_sectors(self.file_length())
    }

    #[inline]
    pub fn sector_map(&self) -> &SectorMap {
        &self.map
    }

    #[inline]
    pub fn header_sector(&self) -> Option<SectorId> {
        self.header_sector
    }

    #[inline]
    pub fn set_header_sector(&mut self, sector: SectorId) {
        self.header_sector = Some(sector);
    }

    pub fn file_type(&self) -> &str {
        fixed_to_str(&self.file_type)
    }

    pub fn created_time(&self) -> &str {
        fixed_to_str(&self.created_time)
    }

    pub fn modified_time(&self) -> &str {
        fixed_to_str(&self.modified_time)
    }

    pub fn visited_time(&self) -> &str {
        fixed_to_str(&self.visited_time)
    }

    /// 空类型记作 `None`
    pub fn set_file_type(&mut self, ext: &str) {
        let ext = if ext.is_empty() { "None" } else { ext };
        self.file_type = str_to_fixed(ext);
    }

    pub fn set_created_time(&mut self, time: &str) {
        self.created_time = str_to_fixed(time);
    }

    pub fn set_modified_time(&mut self, time: &str) {
        self.modified_time = str_to_fixed(time);
    }

    pub fn set_visited_time(&mut self, time: &str) {
        self.visited_time = str_to_fixed(time);
    }

    /// 新建文件时填写类型，三个时间都记为 `now`
    pub fn set_header(&mut self, ext: &str, now: &str) {
        self.set_file_type(ext);
        self.set_created_time(now);
        self.set_modified_time(now);
        self.set_visited_time(now);
    }

    /// 计算容纳指定数据量需要多少个**数据扇区**
    #[inline]
    pub fn count_sectors(size: usize) -> usize {
        size.div_ceil(SECTOR_SIZE)
    }

    /// 计算容纳指定数据量需要多少个**数据扇区**和**索引扇区**
    #[inline]
    pub fn count_total_sectors(size: usize) -> usize {
        let data_sectors = Self::count_sectors(size);
        data_sectors + usize::from(data_sectors > NUM_DIRECT)
    }

    fn direct_sectors(&self) -> &[SectorId] {
        match &self.map {
            SectorMap::Direct { sectors } => sectors,
            SectorMap::Indirect { direct, .. } => direct,
        }
    }
}

/// 取文件名最后一个 `.` 之后的部分作为类型；没有扩展名或以 `.` 开头时为空
pub fn file_type_of(name: &str) -> &str {
    match name.rfind('.') {
        None | Some(0) => "",
        Some(dot) => &name[dot + 1..],
    }
}

/// 截断到定长字段，末尾至少留一个 `\0`
fn str_to_fixed<const N: usize>(s: &str) -> [u8; N] {
    let s = s.trim_end_matches('\n');
    let mut len = s.len().min(N - 1);
    while !s.is_char_boundary(len) {
        len -= 1;
    }

    let mut fixed = [0; N];
    fixed[..len].copy_from_slice(&s.as_bytes()[..len]);
    fixed
}

fn fixed_to_str(fixed: &[u8]) -> &str {
    let len = fixed.iter().position(|&c| c == 0).unwrap_or(fixed.len());
    core::str::from_utf8(&fixed[..len]).unwrap_or_default()
}
