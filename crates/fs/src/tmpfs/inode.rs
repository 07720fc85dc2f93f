//! Tmpfs Inode 实现
//!
//! TmpfsInode 只持有存储和编号，每次操作都在 [`TmpfsStore`] 中查找节点记录。

use alloc::string::{String, ToString};
use alloc::sync::Arc;
use alloc::vec::Vec;
use core::any::Any;

use vfs::{
    DirectoryEntry, FileDescription, FsError, InodeIdentifier, InodeMetadata, InodeOps,
    IterationDecision,
};

use super::store::{PAGE_SIZE, TmpfsNode, TmpfsStore, new_page};

/// Tmpfs Inode 实现
pub struct TmpfsInode {
    fsid: u32,
    index: u64,
    store: Arc<TmpfsStore>,
}

impl TmpfsInode {
    pub(super) fn new(fsid: u32, index: u64, store: Arc<TmpfsStore>) -> Self {
        Self { fsid, index, store }
    }

    /// 在存储中的编号
    pub fn index(&self) -> u64 {
        self.index
    }

    fn with_node<R>(&self, f: impl FnOnce(&mut TmpfsNode) -> R) -> Result<R, FsError> {
        let mut nodes = self.store.nodes.lock();
        nodes.get_mut(&self.index).map(f).ok_or(FsError::NotFound)
    }
}

impl InodeOps for TmpfsInode {
    fn populate_metadata(&self) -> Result<InodeMetadata, FsError> {
        self.with_node(|node| node.metadata.clone())
    }

    fn read_bytes(
        &self,
        offset: u64,
        buf: &mut [u8],
        _description: Option<&FileDescription>,
    ) -> Result<usize, FsError> {
        self.with_node(|node| node.read(offset, buf))
    }

    /// 容量不足时短写；一个字节都写不进时返回 `NoSpace`
    fn write_bytes(
        &self,
        offset: u64,
        buf: &[u8],
        _description: Option<&FileDescription>,
    ) -> Result<usize, FsError> {
        if buf.is_empty() {
            return Ok(0);
        }
        let start = usize::try_from(offset).map_err(|_| FsError::InvalidArgument)?;
        if start.checked_add(buf.len()).is_none() {
            return Err(FsError::InvalidArgument);
        }
        let written = self.with_node(|node| {
            let mut written = 0;
            while written < buf.len() {
                let pos = start + written;
                let page_index = pos / PAGE_SIZE;
                let page_offset = pos % PAGE_SIZE;
                let write_len = (PAGE_SIZE - page_offset).min(buf.len() - written);

                if !node.pages.contains_key(&page_index) {
                    if !self.store.reserve_page() {
                        break;
                    }
                    node.pages.insert(page_index, new_page());
                }
                if let Some(page) = node.pages.get_mut(&page_index) {
                    page[page_offset..page_offset + write_len]
                        .copy_from_slice(&buf[written..written + write_len]);
                }
                written += write_len;
            }
            node.length = node.length.max((start + written) as u64);
            written
        })?;
        if written == 0 {
            log::debug!("tmpfs: no space left for inode {}", self.index);
            return Err(FsError::NoSpace);
        }
        Ok(written)
    }

    fn traverse_children(
        &self,
        visit: &mut dyn FnMut(&DirectoryEntry) -> IterationDecision,
    ) -> Result<(), FsError> {
        // 回调可能重新进入 VFS，先复制出目录项
        let children: Vec<(String, InodeIdentifier, u8)> = self.with_node(|node| {
            node.children
                .iter()
                .map(|(name, (id, file_type))| (name.clone(), *id, *file_type))
                .collect()
        })?;
        for (name, id, file_type) in children {
            let entry = DirectoryEntry::new(&name, id, file_type)?;
            if visit(&entry) == IterationDecision::Break {
                break;
            }
        }
        Ok(())
    }

    fn lookup(&self, name: &str) -> Result<InodeIdentifier, FsError> {
        self.with_node(|node| node.children.get(name).map(|(id, _)| *id))?
            .ok_or(FsError::NotFound)
    }

    fn add_child(&self, child: InodeIdentifier, name: &str, file_type: u8) -> Result<(), FsError> {
        self.with_node(|node| {
            if node.children.contains_key(name) {
                return Err(FsError::AlreadyExists);
            }
            node.children.insert(name.to_string(), (child, file_type));
            Ok(())
        })?
    }

    fn remove_child(&self, name: &str) -> Result<(), FsError> {
        self.with_node(|node| node.children.remove(name))?
            .map(|_| ())
            .ok_or(FsError::NotFound)
    }

    fn parent(&self) -> Option<InodeIdentifier> {
        self.with_node(|node| node.parent)
            .ok()
            .flatten()
            .map(|index| InodeIdentifier::new(self.fsid, index))
    }

    fn flush_metadata(&self, metadata: &InodeMetadata) -> Result<(), FsError> {
        self.with_node(|node| node.metadata = metadata.clone())?;
        self.store.record_writeback();
        Ok(())
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}
