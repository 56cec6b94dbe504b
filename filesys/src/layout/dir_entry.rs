use alloc::string::String;
use alloc::vec;
use alloc::vec::Vec;
use core::{ptr, slice};

use crate::{Error, Result, SectorId};

pub const NAME_MAX_LEN: usize = 27;

/// 目录项：文件名与其文件头所在扇区
#[derive(Debug, Default, Clone, PartialEq, Eq)]
#[repr(C)]
pub struct DirEntry {
    // 最后一字节留给 \0；名字为空表示空槽
    name: [u8; NAME_MAX_LEN + 1],
    header_sector: u32,
}

impl DirEntry {
    /// 目录项大小恒为32字节
    pub const SIZE: usize = 32;

    pub fn new(name: &str, header_sector: SectorId) -> Result<Self> {
        let bytes = name.as_bytes();
        if bytes.is_empty() {
            return Err(Error::EmptyName);
        }
        if bytes.len() > NAME_MAX_LEN {
            return Err(Error::NameTooLong);
        }
        let mut raw = [0; NAME_MAX_LEN + 1];
        raw[..bytes.len()].copy_from_slice(bytes);

        Ok(Self {
            name: raw,
            header_sector: header_sector.into(),
        })
    }

    pub fn name(&self) -> &str {
        let len = self.name.iter().position(|&c| c == 0).unwrap_or(NAME_MAX_LEN);
        core::str::from_utf8(&self.name[..len]).unwrap_or_default()
    }

    #[inline]
    pub fn header_sector(&self) -> SectorId {
        self.header_sector.into()
    }

    #[inline]
    pub fn is_free(&self) -> bool {
        self.name[0] == 0
    }

    #[inline]
    pub fn as_bytes(&self) -> &[u8] {
        unsafe { slice::from_raw_parts(ptr::from_ref(self).cast(), Self::SIZE) }
    }

    #[inline]
    pub fn as_bytes_mut(&mut self) -> &mut [u8] {
        unsafe { slice::from_raw_parts_mut(ptr::from_mut(self).cast(), Self::SIZE) }
    }
}

const _: () = assert!(core::mem::size_of::<DirEntry>() == DirEntry::SIZE);

/// 平坦目录：固定数量的目录项，整体存成一个文件
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Directory {
    entries: Vec<DirEntry>,
}

impl Directory {
    pub fn new(capacity: usize) -> Self {
        Self {
            entries: vec![DirEntry::default(); capacity],
        }
    }

    /// 目录文件的字节数
    #[inline]
    pub fn file_size(capacity: usize) -> usize {
        capacity * DirEntry::SIZE
    }

    pub fn find(&self, name: &str) -> Option<SectorId> {
        self.entries
            .iter()
            .find(|entry| !entry.is_free() && entry.name() == name)
            .map(DirEntry::header_sector)
    }

    /// 占用一个空槽，调用者需先确认没有同名项
    pub fn add(&mut self, entry: DirEntry) -> Option<()> {
        let slot = self.entries.iter_mut().find(|entry| entry.is_free())?;
        *slot = entry;
        Some(())
    }

    pub fn remove(&mut self, name: &str) -> Option<SectorId> {
        let slot = self
            .entries
            .iter_mut()
            .find(|entry| !entry.is_free() && entry.name() == name)?;
        let header_sector = slot.header_sector();
        *slot = DirEntry::default();
        Some(header_sector)
    }

    pub fn names(&self) -> Vec<String> {
        self.entries
            .iter()
            .filter(|entry| !entry.is_free())
            .map(|entry| entry.name().into())
            .collect()
    }

    pub fn to_bytes(&self) -> Vec<u8> {
        self.entries
            .iter()
            .flat_map(|entry| entry.as_bytes().iter().copied())
            .collect()
    }

    pub fn from_bytes(capacity: usize, bytes: &[u8]) -> Self {
        let mut directory = Self::new(capacity);
        for (entry, raw) in directory
            .entries
            .iter_mut()
            .zip(bytes.chunks_exact(DirEntry::SIZE))
        {
            entry.as_bytes_mut().copy_from_slice(raw);
        }
        directory
    }
}
