//! 全局 inode 标识
//!
//! [`InodeIdentifier`] 由文件系统 ID 与文件系统内的 inode 编号组成，
//! 在整个系统范围内唯一确定一个 inode。

use alloc::sync::Arc;
use core::fmt;

use crate::{FILE_SYSTEMS, FileSystem};

/// 全局唯一的 inode 标识 `(fsid, index)`
///
/// 值类型，可自由复制和比较。`index == 0` 表示无效标识。
#[repr(C)]
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct InodeIdentifier {
    fsid: u32,
    index: u64,
}

impl InodeIdentifier {
    /// 构造标识
    pub const fn new(fsid: u32, index: u64) -> Self {
        Self { fsid, index }
    }

    /// 所属文件系统的 ID
    pub const fn fsid(&self) -> u32 {
        self.fsid
    }

    /// 文件系统内的 inode 编号
    pub const fn index(&self) -> u64 {
        self.index
    }

    /// 是否为有效标识
    pub const fn is_valid(&self) -> bool {
        self.index != 0
    }

    /// 通过注册表查找所属文件系统
    ///
    /// 文件系统已被释放或注销时返回 `None`。
    pub fn fs(&self) -> Option<Arc<dyn FileSystem>> {
        FILE_SYSTEMS.lookup(self.fsid)
    }

    /// 是否为所属文件系统的根 inode
    pub fn is_root_inode(&self) -> bool {
        self.fs().is_some_and(|fs| fs.root_inode() == *self)
    }
}

impl fmt::Display for InodeIdentifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:02}:{:08}", self.fsid, self.index)
    }
}
