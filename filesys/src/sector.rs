//! # 扇区缓冲层
//!
//! 把一个扇区完整地复制到内存，以某种磁盘数据结构的视角读改，
//! 需要时再整块写回。
//!
//! 这里**没有**缓存：每次 [`Sector::load`] 都是一次真实的扇区读，
//! 每次 [`Sector::store`] 都是一次真实的扇区写。

use core::mem;

use block_dev::BlockDevice;

use crate::SectorId;
use crate::SECTOR_SIZE;

/// 内存中的扇区。按 8 字节对齐，以便当作 `u32`/`u64` 数组访问
#[derive(Clone)]
#[repr(C, align(8))]
pub struct Sector {
    data: [u8; SECTOR_SIZE],
}

impl Sector {
    #[inline]
    pub const fn zeroed() -> Self {
        Self {
            data: [0; SECTOR_SIZE],
        }
    }

    pub fn load(id: SectorId, block_device: &dyn BlockDevice) -> Self {
        let mut sector = Self::zeroed();
        block_device.read_block(id.as_usize(), &mut sector.data);
        sector
    }

    #[inline]
    pub fn store(&self, id: SectorId, block_device: &dyn BlockDevice) {
        block_device.write_block(id.as_usize(), &self.data);
    }

    #[inline]
    pub fn bytes(&self) -> &[u8; SECTOR_SIZE] {
        &self.data
    }

    #[inline]
    pub fn bytes_mut(&mut self) -> &mut [u8; SECTOR_SIZE] {
        &mut self.data
    }

    /// 以 `T` 的视角读扇区。
    /// `T` 只能是由整数与整数数组构成的 `#[repr(C)]` 结构，任意位模式皆合法
    pub fn get<T: Sized>(&self, offset: usize) -> &T {
        assert!(mem::size_of::<T>() + offset <= SECTOR_SIZE);
        assert_eq!(offset % mem::align_of::<T>(), 0);
        let addr = self.data[offset..].as_ptr().cast::<T>();
        unsafe { &*addr }
    }

    pub fn get_mut<T: Sized>(&mut self, offset: usize) -> &mut T {
        assert!(mem::size_of::<T>() + offset <= SECTOR_SIZE);
        assert_eq!(offset % mem::align_of::<T>(), 0);
        let addr = self.data[offset..].as_mut_ptr().cast::<T>();
        unsafe { &mut *addr }
    }

    #[inline]
    pub fn map<T: Sized, V>(&self, offset: usize, f: impl FnOnce(&T) -> V) -> V {
        f(self.get(offset))
    }

    #[inline]
    pub fn map_mut<T: Sized, V>(&mut self, offset: usize, f: impl FnOnce(&mut T) -> V) -> V {
        f(self.get_mut(offset))
    }
}
