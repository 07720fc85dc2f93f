//! Tmpfs 后备存储

use alloc::boxed::Box;
use alloc::collections::BTreeMap;
use alloc::string::String;
use alloc::vec;
use core::sync::atomic::{AtomicUsize, Ordering};

use sync::SpinLock;
use vfs::{FsError, InodeIdentifier, InodeMetadata};

/// 数据页大小
pub const PAGE_SIZE: usize = 4096;

/// Tmpfs 统计信息
#[derive(Debug, Clone)]
pub struct TmpfsStats {
    /// 已分配的总页数
    pub allocated_pages: usize,

    /// 最大允许的页数（0 表示无限制）
    pub max_pages: usize,

    /// 最大允许的 inode 数（0 表示无限制）
    pub max_inodes: usize,

    /// 下一个 inode 编号
    pub next_index: u64,
}

/// 单个节点的存储记录
pub(super) struct TmpfsNode {
    /// 最近一次回写的元数据
    pub(super) metadata: InodeMetadata,
    /// 数据长度，随写入增长，与回写无关
    pub(super) length: u64,
    /// 文件数据页：页号 -> 页，未写过的页不占空间
    pub(super) pages: BTreeMap<usize, Box<[u8]>>,
    /// 目录项：名字 -> (标识, d_type)
    pub(super) children: BTreeMap<String, (InodeIdentifier, u8)>,
    /// 父目录编号，根为 `None`
    pub(super) parent: Option<u64>,
}

impl TmpfsNode {
    pub(super) fn new(metadata: InodeMetadata, parent: Option<u64>) -> Self {
        Self {
            length: metadata.size,
            metadata,
            pages: BTreeMap::new(),
            children: BTreeMap::new(),
            parent,
        }
    }

    /// 从 `offset` 读取，空洞读出 0
    pub(super) fn read(&self, offset: u64, buf: &mut [u8]) -> usize {
        if offset >= self.length {
            return 0;
        }
        let read_size = buf.len().min((self.length - offset) as usize);
        let mut bytes_read = 0;
        while bytes_read < read_size {
            let pos = offset as usize + bytes_read;
            let page_index = pos / PAGE_SIZE;
            let page_offset = pos % PAGE_SIZE;
            let read_len = (PAGE_SIZE - page_offset).min(read_size - bytes_read);
            let dst = &mut buf[bytes_read..bytes_read + read_len];
            match self.pages.get(&page_index) {
                Some(page) => dst.copy_from_slice(&page[page_offset..page_offset + read_len]),
                None => dst.fill(0),
            }
            bytes_read += read_len;
        }
        read_size
    }
}

/// Tmpfs 的全部节点与容量统计
///
/// 锁顺序：`nodes` → `stats`。
pub struct TmpfsStore {
    pub(super) nodes: SpinLock<BTreeMap<u64, TmpfsNode>>,
    pub(super) stats: SpinLock<TmpfsStats>,
    metadata_writebacks: AtomicUsize,
}

impl TmpfsStore {
    pub(super) fn new(max_pages: usize, max_inodes: usize) -> Self {
        Self {
            nodes: SpinLock::new(BTreeMap::new()),
            stats: SpinLock::new(TmpfsStats {
                allocated_pages: 0,
                max_pages,
                max_inodes,
                next_index: 1,
            }),
            metadata_writebacks: AtomicUsize::new(0),
        }
    }

    /// 分配编号，达到 inode 上限时返回 `NoSpace`
    pub(super) fn reserve_index(&self, live_nodes: usize) -> Result<u64, FsError> {
        let mut stats = self.stats.lock();
        if stats.max_inodes != 0 && live_nodes >= stats.max_inodes {
            return Err(FsError::NoSpace);
        }
        let index = stats.next_index;
        stats.next_index += 1;
        Ok(index)
    }

    /// 预留一页，容量已满时返回 `false`
    pub(super) fn reserve_page(&self) -> bool {
        let mut stats = self.stats.lock();
        if stats.max_pages != 0 && stats.allocated_pages >= stats.max_pages {
            return false;
        }
        stats.allocated_pages += 1;
        true
    }

    pub(super) fn release_pages(&self, num: usize) {
        let mut stats = self.stats.lock();
        stats.allocated_pages = stats.allocated_pages.saturating_sub(num);
    }

    pub(super) fn record_writeback(&self) {
        self.metadata_writebacks.fetch_add(1, Ordering::Relaxed);
    }

    /// 统计信息快照
    pub fn stats(&self) -> TmpfsStats {
        self.stats.lock().clone()
    }

    /// 元数据回写次数
    pub fn metadata_writebacks(&self) -> usize {
        self.metadata_writebacks.load(Ordering::Relaxed)
    }

    /// 存储中的元数据（最近一次回写的版本）
    pub fn stored_metadata(&self, index: u64) -> Option<InodeMetadata> {
        self.nodes.lock().get(&index).map(|node| node.metadata.clone())
    }

    /// 存储中的节点数量
    pub fn node_count(&self) -> usize {
        self.nodes.lock().len()
    }
}

pub(super) fn new_page() -> Box<[u8]> {
    vec![0u8; PAGE_SIZE].into_boxed_slice()
}
