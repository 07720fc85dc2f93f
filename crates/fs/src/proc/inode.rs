//! ProcFS Inode 实现

use alloc::collections::BTreeMap;
use alloc::string::String;
use alloc::sync::Arc;
use alloc::vec::Vec;
use core::any::Any;

use sync::SpinLock;
use vfs::{
    DirectoryEntry, FileDescription, FsError, InodeIdentifier, InodeMetadata, InodeOps,
    IterationDecision,
};

/// 动态内容生成器 trait
pub trait ContentGenerator: Send + Sync {
    /// 生成文件内容
    ///
    /// 同一个打开描述只在首次读取时调用一次，读到末尾后下一次读取重新生成。
    fn generate(&self) -> Result<Vec<u8>, FsError>;
}

impl<F> ContentGenerator for F
where
    F: Fn() -> Result<Vec<u8>, FsError> + Send + Sync,
{
    fn generate(&self) -> Result<Vec<u8>, FsError> {
        self()
    }
}

/// ProcFS inode 的内容类型。
pub enum ProcInodeContent {
    /// 静态文件（内容固定）
    Static(Vec<u8>),
    /// 动态文件（读取时生成）
    Generated(Arc<dyn ContentGenerator>),
    /// 目录：名字 -> (编号, d_type)
    Directory(BTreeMap<String, (u64, u8)>),
    /// 符号链接
    Symlink(String),
}

pub(super) struct ProcNode {
    pub(super) metadata: InodeMetadata,
    pub(super) parent: Option<u64>,
    pub(super) content: ProcInodeContent,
}

pub(super) type ProcNodes = SpinLock<BTreeMap<u64, ProcNode>>;

enum ReadSource {
    Bytes(usize),
    Generator(Arc<dyn ContentGenerator>),
}

fn copy_at(data: &[u8], offset: u64, buf: &mut [u8]) -> usize {
    if offset >= data.len() as u64 {
        return 0;
    }
    let start = offset as usize;
    let n = buf.len().min(data.len() - start);
    buf[..n].copy_from_slice(&data[start..start + n]);
    n
}

/// ProcFS 中的 inode 节点。
pub struct ProcInode {
    fsid: u32,
    index: u64,
    nodes: Arc<ProcNodes>,
}

impl ProcInode {
    pub(super) fn new(fsid: u32, index: u64, nodes: Arc<ProcNodes>) -> Self {
        Self { fsid, index, nodes }
    }

    fn identifier(&self, index: u64) -> InodeIdentifier {
        InodeIdentifier::new(self.fsid, index)
    }
}

impl InodeOps for ProcInode {
    fn populate_metadata(&self) -> Result<InodeMetadata, FsError> {
        self.nodes
            .lock()
            .get(&self.index)
            .map(|node| node.metadata.clone())
            .ok_or(FsError::NotFound)
    }

    fn read_bytes(
        &self,
        offset: u64,
        buf: &mut [u8],
        description: Option<&FileDescription>,
    ) -> Result<usize, FsError> {
        let source = {
            let nodes = self.nodes.lock();
            let node = nodes.get(&self.index).ok_or(FsError::NotFound)?;
            match &node.content {
                ProcInodeContent::Static(data) => ReadSource::Bytes(copy_at(data, offset, buf)),
                ProcInodeContent::Symlink(target) => {
                    ReadSource::Bytes(copy_at(target.as_bytes(), offset, buf))
                }
                ProcInodeContent::Generated(generator) => ReadSource::Generator(generator.clone()),
                ProcInodeContent::Directory(_) => return Err(FsError::IsDirectory),
            }
        };

        let generator = match source {
            ReadSource::Bytes(n) => return Ok(n),
            ReadSource::Generator(generator) => generator,
        };
        let Some(description) = description else {
            return Ok(copy_at(&generator.generate()?, offset, buf));
        };
        let content = description.generated_content(|| generator.generate())?;
        let n = copy_at(&content, offset, buf);
        if n == 0 && !buf.is_empty() {
            description.clear_generated_content();
        }
        Ok(n)
    }

    fn traverse_children(
        &self,
        visit: &mut dyn FnMut(&DirectoryEntry) -> IterationDecision,
    ) -> Result<(), FsError> {
        let children: Vec<(String, u64, u8)> = {
            let nodes = self.nodes.lock();
            match &nodes.get(&self.index).ok_or(FsError::NotFound)?.content {
                ProcInodeContent::Directory(children) => children
                    .iter()
                    .map(|(name, (index, file_type))| (name.clone(), *index, *file_type))
                    .collect(),
                _ => return Err(FsError::NotDirectory),
            }
        };
        for (name, index, file_type) in children {
            let entry = DirectoryEntry::new(&name, self.identifier(index), file_type)?;
            if visit(&entry) == IterationDecision::Break {
                break;
            }
        }
        Ok(())
    }

    fn lookup(&self, name: &str) -> Result<InodeIdentifier, FsError> {
        let nodes = self.nodes.lock();
        match &nodes.get(&self.index).ok_or(FsError::NotFound)?.content {
            ProcInodeContent::Directory(children) => children
                .get(name)
                .map(|(index, _)| self.identifier(*index))
                .ok_or(FsError::NotFound),
            _ => Err(FsError::NotDirectory),
        }
    }

    fn parent(&self) -> Option<InodeIdentifier> {
        let parent = self.nodes.lock().get(&self.index)?.parent?;
        Some(self.identifier(parent))
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}
