//! Tmpfs 文件系统实现

use alloc::boxed::Box;
use alloc::sync::Arc;
use core::any::Any;

use vfs::{
    FileMode, FileSystem, FsError, InodeIdentifier, InodeMetadata, InodeOps, InodeType, StatFs,
    register_file_system,
};

use super::inode::TmpfsInode;
use super::store::{PAGE_SIZE, TmpfsNode, TmpfsStore};

/// 根目录在存储中的编号
const ROOT_INDEX: u64 = 1;

/// Tmpfs 文件系统
pub struct TmpFs {
    fsid: u32,
    store: Arc<TmpfsStore>,
}

impl TmpFs {
    /// 创建并注册新的 tmpfs 文件系统
    ///
    /// # 参数
    ///
    /// - `max_bytes`: 最大容量（字节，按页向上取整），0 表示无限制
    /// - `max_inodes`: 最大 inode 数（含根目录），0 表示无限制
    pub fn new(max_bytes: usize, max_inodes: usize) -> Arc<Self> {
        let max_pages = max_bytes.div_ceil(PAGE_SIZE);
        register_file_system(|fsid| {
            let store = Arc::new(TmpfsStore::new(max_pages, max_inodes));
            let root_mode = FileMode::from_bits_truncate(0o755).with_type(InodeType::Directory);
            let root = InodeMetadata::new(
                InodeIdentifier::new(fsid, ROOT_INDEX),
                InodeType::Directory,
                root_mode,
            );
            store.stats.lock().next_index = ROOT_INDEX + 1;
            store
                .nodes
                .lock()
                .insert(ROOT_INDEX, TmpfsNode::new(root, None));
            TmpFs { fsid, store }
        })
    }

    /// 后备存储
    pub fn store(&self) -> &Arc<TmpfsStore> {
        &self.store
    }

    /// 获取已使用的容量（字节）
    pub fn used_bytes(&self) -> usize {
        self.store.stats().allocated_pages * PAGE_SIZE
    }

    /// 获取总容量（字节，0 表示无限制）
    pub fn total_bytes(&self) -> usize {
        self.store.stats().max_pages * PAGE_SIZE
    }

    /// 元数据回写次数
    pub fn metadata_writebacks(&self) -> usize {
        self.store.metadata_writebacks()
    }
}

impl FileSystem for TmpFs {
    fn fsid(&self) -> u32 {
        self.fsid
    }

    fn class_name(&self) -> &'static str {
        "tmpfs"
    }

    fn root_inode(&self) -> InodeIdentifier {
        InodeIdentifier::new(self.fsid, ROOT_INDEX)
    }

    fn load_inode(&self, index: u64) -> Result<Box<dyn InodeOps>, FsError> {
        if !self.store.nodes.lock().contains_key(&index) {
            return Err(FsError::NotFound);
        }
        Ok(Box::new(TmpfsInode::new(
            self.fsid,
            index,
            self.store.clone(),
        )))
    }

    fn allocate_inode(
        &self,
        parent: InodeIdentifier,
        mode: FileMode,
        size: u64,
    ) -> Result<u64, FsError> {
        let inode_type = InodeType::from_mode(mode).ok_or(FsError::InvalidArgument)?;
        let mut nodes = self.store.nodes.lock();
        let index = self.store.reserve_index(nodes.len()).inspect_err(|_| {
            log::debug!("tmpfs: inode limit reached on fs {}", self.fsid);
        })?;
        let mut metadata =
            InodeMetadata::new(InodeIdentifier::new(self.fsid, index), inode_type, mode);
        metadata.size = size;
        nodes.insert(index, TmpfsNode::new(metadata, Some(parent.index())));
        Ok(index)
    }

    fn reclaim_inode(&self, index: u64) -> Result<(), FsError> {
        let node = self
            .store
            .nodes
            .lock()
            .remove(&index)
            .ok_or(FsError::NotFound)?;
        let pages = node.pages.len();
        self.store.release_pages(pages);
        log::debug!("tmpfs: reclaimed inode {} ({} pages)", index, pages);
        Ok(())
    }

    fn statfs(&self) -> Result<StatFs, FsError> {
        let stats = self.store.stats();
        let used_inodes = self.store.node_count();

        let total_blocks = if stats.max_pages == 0 {
            // 无限制时，使用一个较大的值
            usize::MAX / PAGE_SIZE
        } else {
            stats.max_pages
        };
        let free_blocks = total_blocks.saturating_sub(stats.allocated_pages);
        let (total_inodes, free_inodes) = if stats.max_inodes == 0 {
            (0, 0)
        } else {
            (stats.max_inodes, stats.max_inodes.saturating_sub(used_inodes))
        };

        Ok(StatFs {
            block_size: PAGE_SIZE,
            total_blocks,
            free_blocks,
            total_inodes,
            free_inodes,
            fsid: self.fsid,
            max_filename_len: vfs::config::MAX_NAME_LEN,
        })
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}
