//! Procfs 文件系统实现

use alloc::boxed::Box;
use alloc::collections::BTreeMap;
use alloc::string::{String, ToString};
use alloc::sync::Arc;
use alloc::vec::Vec;
use core::any::Any;
use core::sync::atomic::{AtomicU64, Ordering};

use sync::SpinLock;
use vfs::{
    FileMode, FileSystem, FsError, InodeIdentifier, InodeMetadata, InodeOps, InodeType, StatFs,
    register_file_system, validate_name,
};

use super::inode::{ContentGenerator, ProcInode, ProcInodeContent, ProcNode, ProcNodes};

/// ProcFS 文件系统对象（提供 `/proc` 目录树）。
///
/// VFS 视其为只读；下面的 `add_*` / [`remove`](ProcFS::remove) 是内核侧的填充接口，
/// 以父目录编号定位，根目录编号为 [`ProcFS::ROOT`]。
pub struct ProcFS {
    fsid: u32,
    nodes: Arc<ProcNodes>,
    next_index: AtomicU64,
}

impl ProcFS {
    /// 根目录编号
    pub const ROOT: u64 = 1;

    /// 创建并注册新的 ProcFS 实例
    pub fn new() -> Arc<Self> {
        register_file_system(|fsid| {
            let mode = FileMode::from_bits_truncate(0o555).with_type(InodeType::Directory);
            let root = ProcNode {
                metadata: InodeMetadata::new(
                    InodeIdentifier::new(fsid, Self::ROOT),
                    InodeType::Directory,
                    mode,
                ),
                parent: None,
                content: ProcInodeContent::Directory(BTreeMap::new()),
            };
            let mut nodes = BTreeMap::new();
            nodes.insert(Self::ROOT, root);
            ProcFS {
                fsid,
                nodes: Arc::new(SpinLock::new(nodes)),
                next_index: AtomicU64::new(Self::ROOT + 1),
            }
        })
    }

    fn add_node(
        &self,
        parent: u64,
        name: &str,
        inode_type: InodeType,
        mode: FileMode,
        content: ProcInodeContent,
    ) -> Result<u64, FsError> {
        validate_name(name)?;
        let index = self.next_index.fetch_add(1, Ordering::Relaxed);
        let mut metadata = InodeMetadata::new(
            InodeIdentifier::new(self.fsid, index),
            inode_type,
            mode.with_type(inode_type),
        );
        metadata.size = match &content {
            ProcInodeContent::Static(data) => data.len() as u64,
            ProcInodeContent::Symlink(target) => target.len() as u64,
            _ => 0,
        };

        let mut nodes = self.nodes.lock();
        let parent_node = nodes.get_mut(&parent).ok_or(FsError::NotFound)?;
        let ProcInodeContent::Directory(children) = &mut parent_node.content else {
            return Err(FsError::NotDirectory);
        };
        if children.contains_key(name) {
            return Err(FsError::AlreadyExists);
        }
        children.insert(name.to_string(), (index, inode_type.to_d_type()));
        if inode_type == InodeType::Directory {
            parent_node.metadata.link_count += 1;
        }
        nodes.insert(
            index,
            ProcNode {
                metadata,
                parent: Some(parent),
                content,
            },
        );
        Ok(index)
    }

    /// 创建子目录，返回其编号
    pub fn add_directory(&self, parent: u64, name: &str, mode: FileMode) -> Result<u64, FsError> {
        self.add_node(
            parent,
            name,
            InodeType::Directory,
            mode,
            ProcInodeContent::Directory(BTreeMap::new()),
        )
    }

    /// 创建内容固定的文件
    pub fn add_static_file(
        &self,
        parent: u64,
        name: &str,
        content: Vec<u8>,
        mode: FileMode,
    ) -> Result<u64, FsError> {
        self.add_node(
            parent,
            name,
            InodeType::File,
            mode,
            ProcInodeContent::Static(content),
        )
    }

    /// 创建读取时生成内容的文件
    pub fn add_generated_file<G>(
        &self,
        parent: u64,
        name: &str,
        generator: G,
        mode: FileMode,
    ) -> Result<u64, FsError>
    where
        G: ContentGenerator + 'static,
    {
        self.add_node(
            parent,
            name,
            InodeType::File,
            mode,
            ProcInodeContent::Generated(Arc::new(generator)),
        )
    }

    /// 创建符号链接
    pub fn add_symlink(&self, parent: u64, name: &str, target: &str) -> Result<u64, FsError> {
        if target.is_empty() {
            return Err(FsError::NotFound);
        }
        self.add_node(
            parent,
            name,
            InodeType::Symlink,
            FileMode::from_bits_truncate(0o777),
            ProcInodeContent::Symlink(String::from(target)),
        )
    }

    /// 删除目录项；目录必须为空
    pub fn remove(&self, parent: u64, name: &str) -> Result<(), FsError> {
        let removed = {
            let mut nodes = self.nodes.lock();
            let index = match &nodes.get(&parent).ok_or(FsError::NotFound)?.content {
                ProcInodeContent::Directory(children) => {
                    children.get(name).map(|(index, _)| *index).ok_or(FsError::NotFound)?
                }
                _ => return Err(FsError::NotDirectory),
            };
            let is_directory = match nodes.get(&index).map(|node| &node.content) {
                Some(ProcInodeContent::Directory(children)) if !children.is_empty() => {
                    return Err(FsError::DirectoryNotEmpty);
                }
                Some(ProcInodeContent::Directory(_)) => true,
                _ => false,
            };
            if let Some(parent_node) = nodes.get_mut(&parent) {
                if let ProcInodeContent::Directory(children) = &mut parent_node.content {
                    children.remove(name);
                }
                if is_directory {
                    parent_node.metadata.link_count -= 1;
                }
            }
            nodes.remove(&index)
        };
        // 生成器可能持有任意资源，在锁外释放
        drop(removed);
        Ok(())
    }
}

impl FileSystem for ProcFS {
    fn fsid(&self) -> u32 {
        self.fsid
    }

    fn class_name(&self) -> &'static str {
        "proc"
    }

    fn is_readonly(&self) -> bool {
        true
    }

    fn root_inode(&self) -> InodeIdentifier {
        InodeIdentifier::new(self.fsid, Self::ROOT)
    }

    fn load_inode(&self, index: u64) -> Result<Box<dyn InodeOps>, FsError> {
        if !self.nodes.lock().contains_key(&index) {
            return Err(FsError::NotFound);
        }
        Ok(Box::new(ProcInode::new(
            self.fsid,
            index,
            self.nodes.clone(),
        )))
    }

    fn statfs(&self) -> Result<StatFs, FsError> {
        Ok(StatFs {
            block_size: 4096,
            total_blocks: 0,
            free_blocks: 0,
            total_inodes: 0,
            free_inodes: 0,
            fsid: self.fsid,
            max_filename_len: vfs::config::MAX_NAME_LEN,
        })
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}
