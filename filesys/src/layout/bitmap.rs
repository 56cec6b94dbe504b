use alloc::vec;
use alloc::vec::Vec;

use crate::SectorId;

/// 空闲扇区位图，每一位对应一个扇区：1 为已占用，0 为空闲。
///
/// 位图常驻内存，由命名层负责把它存成一个普通文件。
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Bitmap {
    /// 位数
    bits: usize,
    groups: Vec<u64>,
}

impl Bitmap {
    pub fn new(bits: usize) -> Self {
        Self {
            bits,
            groups: vec![0; bits.div_ceil(64)],
        }
    }

    /// 位图所指示区域的总扇区数
    #[inline]
    pub fn len(&self) -> usize {
        self.bits
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.bits == 0
    }

    /// 找到编号最小的空闲扇区，标记为占用并返回其编号。
    /// 若位图的空间用尽，则返回空。
    pub fn find(&mut self) -> Option<SectorId> {
        let (group_index, ingroup_index) = self
            .groups
            .iter()
            .enumerate()
            .find_map(|(group_index, &bits)| {
                (bits != u64::MAX).then_some((group_index, bits.trailing_ones() as usize))
            })?;

        let id = group_index * 64 + ingroup_index;
        // 最后一组可能只有一部分位有效
        if id >= self.bits {
            return None;
        }

        self.groups[group_index] |= 1 << ingroup_index;
        Some(SectorId::new(id as u32))
    }

    pub fn mark(&mut self, id: SectorId) {
        let (group_index, ingroup_index) = self.locate(id);
        self.groups[group_index] |= 1 << ingroup_index;
    }

    pub fn clear(&mut self, id: SectorId) {
        let (group_index, ingroup_index) = self.locate(id);
        self.groups[group_index] &= !(1 << ingroup_index);
    }

    pub fn test(&self, id: SectorId) -> bool {
        let (group_index, ingroup_index) = self.locate(id);
        self.groups[group_index] & (1 << ingroup_index) != 0
    }

    pub fn num_clear(&self) -> usize {
        let used: usize = self.groups.iter().map(|g| g.count_ones() as usize).sum();
        self.bits - used
    }

    /// 按字节展开：第 `i` 位存放在第 `i / 8` 字节的第 `i % 8` 位
    pub fn to_bytes(&self) -> Vec<u8> {
        self.groups
            .iter()
            .flat_map(|group| group.to_le_bytes())
            .take(self.bits.div_ceil(8))
            .collect()
    }

    pub fn from_bytes(bits: usize, bytes: &[u8]) -> Self {
        let mut bitmap = Self::new(bits);
        for (group, chunk) in bitmap.groups.iter_mut().zip(bytes.chunks(8)) {
            let mut raw = [0; 8];
            raw[..chunk.len()].copy_from_slice(chunk);
            *group = u64::from_le_bytes(raw);
        }
        // 越界的位不算数
        if bits % 64 != 0 {
            if let Some(last) = bitmap.groups.last_mut() {
                *last &= (1 << (bits % 64)) - 1;
            }
        }
        bitmap
    }

    fn locate(&self, id: SectorId) -> (usize, usize) {
        let id = id.as_usize();
        assert!(id < self.bits, "sector {id} out of bitmap range");
        (id / 64, id % 64)
    }
}
