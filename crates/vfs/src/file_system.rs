//! 文件系统抽象
//!
//! [`FileSystem`] 是后端需要实现的接口；`dyn FileSystem` 上的固有方法
//! （[`get_inode`](FileSystem::get_inode)、[`create_inode`](FileSystem::create_inode) 等）
//! 由 VFS 统一提供，负责缓存与一致性检查。

use alloc::boxed::Box;
use alloc::sync::Arc;
use alloc::vec::Vec;
use core::any::Any;

use crate::path::validate_name;
use crate::{FileMode, FsError, INODE_CACHE, Inode, InodeIdentifier, InodeOps, InodeType};

/// 文件系统 trait
///
/// 所有文件系统实现都必须实现此 trait。实例通过
/// [`register_file_system`](crate::register_file_system) 创建并获得文件系统 ID。
pub trait FileSystem: Send + Sync + Any {
    /// 注册时分配的文件系统 ID
    fn fsid(&self) -> u32;

    /// 文件系统类型名称
    fn class_name(&self) -> &'static str;

    /// 是否只读
    fn is_readonly(&self) -> bool {
        false
    }

    /// 根 inode 的标识
    fn root_inode(&self) -> InodeIdentifier;

    /// 为编号 `index` 构造后端存储接口，不存在时返回 `NotFound`
    fn load_inode(&self, index: u64) -> Result<Box<dyn InodeOps>, FsError>;

    /// 在后备存储中分配一个新对象，返回其编号
    ///
    /// 新对象尚未链接进任何目录；目录的初始链接数为 2，其余为 1。
    fn allocate_inode(
        &self,
        _parent: InodeIdentifier,
        _mode: FileMode,
        _size: u64,
    ) -> Result<u64, FsError> {
        Err(FsError::NotSupported)
    }

    /// 释放链接数已降为 0 的对象的存储
    fn reclaim_inode(&self, _index: u64) -> Result<(), FsError> {
        Ok(())
    }

    /// 把文件系统级的缓冲写回存储
    fn flush_writes(&self) -> Result<(), FsError> {
        Ok(())
    }

    /// 获取文件系统统计信息
    fn statfs(&self) -> Result<StatFs, FsError>;

    /// 向下转型为 &dyn Any，用于支持 downcast
    fn as_any(&self) -> &dyn Any;
}

/// 文件系统统计信息
#[derive(Debug, Clone)]
pub struct StatFs {
    /// 块大小（单位：字节）
    pub block_size: usize,
    /// 总块数
    pub total_blocks: usize,
    /// 空闲块数
    pub free_blocks: usize,
    /// 总 inode 数
    pub total_inodes: usize,
    /// 空闲 inode 数
    pub free_inodes: usize,
    /// 文件系统 ID
    pub fsid: u32,
    /// 最大文件名长度
    pub max_filename_len: usize,
}

/// 单个回写失败
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SyncFailure {
    /// 回写失败的 inode，文件系统级失败为 `None`
    pub inode: Option<InodeIdentifier>,
    /// 失败原因
    pub error: FsError,
}

/// 一次 sync 的结果
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SyncReport {
    /// 成功回写的 inode 数量
    pub flushed: usize,
    /// 失败列表
    pub failures: Vec<SyncFailure>,
}

impl SyncReport {
    /// 是否没有任何失败
    pub fn is_clean(&self) -> bool {
        self.failures.is_empty()
    }

    /// 合并另一份结果
    pub fn merge(&mut self, other: SyncReport) {
        self.flushed += other.flushed;
        self.failures.extend(other.failures);
    }
}

impl dyn FileSystem {
    /// 尝试获取具体类型的引用
    pub fn downcast_ref<T: FileSystem>(&self) -> Option<&T> {
        self.as_any().downcast_ref::<T>()
    }

    /// 获取 inode，已缓存时返回同一个实例
    pub fn get_inode(self: &Arc<Self>, identifier: InodeIdentifier) -> Result<Arc<Inode>, FsError> {
        if identifier.fsid() != self.fsid() || !identifier.is_valid() {
            return Err(FsError::InvalidArgument);
        }
        INODE_CACHE.get_or_load(identifier, |serial| {
            log::debug!("vfs: loading inode {} from {}", identifier, self.class_name());
            let ops = self.load_inode(identifier.index())?;
            Ok(Inode::new(identifier, self.clone(), ops, serial))
        })
    }

    /// 获取根 inode
    pub fn root(self: &Arc<Self>) -> Result<Arc<Inode>, FsError> {
        self.get_inode(self.root_inode())
    }

    /// 在 `parent` 中创建名为 `name` 的对象
    ///
    /// `mode` 未携带类型位时按普通文件处理。
    pub fn create_inode(
        self: &Arc<Self>,
        parent: &Arc<Inode>,
        name: &str,
        mode: FileMode,
        size: u64,
    ) -> Result<Arc<Inode>, FsError> {
        let inode_type = if mode.file_type_bits().is_empty() {
            InodeType::File
        } else {
            InodeType::from_mode(mode).ok_or(FsError::InvalidArgument)?
        };
        self.create_child(parent, name, mode.with_type(inode_type), inode_type, size)
    }

    /// 在 `parent` 中创建子目录，父目录链接数随之加一
    pub fn create_directory(
        self: &Arc<Self>,
        parent: &Arc<Inode>,
        name: &str,
        mode: FileMode,
    ) -> Result<Arc<Inode>, FsError> {
        let mode = mode.with_type(InodeType::Directory);
        let inode = self.create_child(parent, name, mode, InodeType::Directory, 0)?;
        parent.increment_link_count()?;
        Ok(inode)
    }

    fn create_child(
        self: &Arc<Self>,
        parent: &Arc<Inode>,
        name: &str,
        mode: FileMode,
        inode_type: InodeType,
        size: u64,
    ) -> Result<Arc<Inode>, FsError> {
        if self.is_readonly() {
            return Err(FsError::ReadOnlyFs);
        }
        if parent.fsid() != self.fsid() {
            return Err(FsError::InvalidArgument);
        }
        validate_name(name)?;
        match parent.lookup(name) {
            Ok(_) => return Err(FsError::AlreadyExists),
            Err(FsError::NotFound) => {}
            Err(err) => return Err(err),
        }

        let index = self.allocate_inode(parent.identifier(), mode, size)?;
        let identifier = InodeIdentifier::new(self.fsid(), index);
        if let Err(err) = parent.add_child(identifier, name, inode_type.to_d_type()) {
            if let Err(reclaim_err) = self.reclaim_inode(index) {
                log::warn!(
                    "vfs: failed to reclaim orphaned inode {}: {}",
                    identifier,
                    reclaim_err
                );
            }
            return Err(err);
        }
        self.get_inode(identifier)
    }

    /// 回写本文件系统所有脏 inode，再调用 [`FileSystem::flush_writes`]
    ///
    /// 单个 inode 的失败不会中断其余 inode 的回写。
    pub fn sync(&self) -> SyncReport {
        let mut report = SyncReport::default();
        let inodes = INODE_CACHE.inodes_for(self.fsid());
        for inode in inodes.iter().filter(|inode| inode.is_metadata_dirty()) {
            match inode.flush_metadata() {
                Ok(()) => report.flushed += 1,
                Err(err) => {
                    log::warn!("vfs: sync of inode {} failed: {}", inode.identifier(), err);
                    report.failures.push(SyncFailure {
                        inode: Some(inode.identifier()),
                        error: err,
                    });
                }
            }
        }
        drop(inodes);
        if let Err(err) = self.flush_writes() {
            log::warn!("vfs: flush_writes of {} failed: {}", self.class_name(), err);
            report.failures.push(SyncFailure {
                inode: None,
                error: err,
            });
        }
        report
    }
}
