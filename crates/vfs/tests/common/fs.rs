//! 测试用内存文件系统
//!
//! 记录加载、回写、回收次数，并支持回写故障注入与加载延迟。

use std::any::Any;
use std::collections::BTreeMap;
use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use test_support::mock::fault::FaultSwitch;
use vfs::{
    DirectoryEntry, FileDescription, FileMode, FileSystem, FsError, InodeIdentifier,
    InodeMetadata, InodeOps, InodeType, IterationDecision, StatFs, register_file_system,
};

pub const ROOT_INDEX: u64 = 1;

struct Node {
    metadata: InodeMetadata,
    data: Vec<u8>,
    children: BTreeMap<String, (InodeIdentifier, u8)>,
    parent: Option<u64>,
}

#[derive(Default)]
pub struct Store {
    fsid: u32,
    nodes: Mutex<BTreeMap<u64, Node>>,
    next_index: AtomicU64,
    flushes: Mutex<BTreeMap<u64, usize>>,
    reclaimed: Mutex<Vec<u64>>,
    pub loads: AtomicUsize,
    pub flush_faults: FaultSwitch,
    pub load_delay_ms: AtomicU64,
}

impl Store {
    fn identifier(&self, index: u64) -> InodeIdentifier {
        InodeIdentifier::new(self.fsid, index)
    }

    fn insert_node(&self, parent: Option<u64>, inode_type: InodeType, mode: FileMode) -> u64 {
        let index = self.next_index.fetch_add(1, Ordering::SeqCst);
        let metadata = InodeMetadata::new(self.identifier(index), inode_type, mode);
        self.nodes.lock().unwrap().insert(
            index,
            Node {
                metadata,
                data: Vec::new(),
                children: BTreeMap::new(),
                parent,
            },
        );
        index
    }

    /// 回写次数
    pub fn flush_count(&self, index: u64) -> usize {
        self.flushes.lock().unwrap().get(&index).copied().unwrap_or(0)
    }

    /// 后备存储中的元数据
    pub fn persisted(&self, index: u64) -> Option<InodeMetadata> {
        self.nodes
            .lock()
            .unwrap()
            .get(&index)
            .map(|node| node.metadata.clone())
    }

    /// 后备存储中的数据
    pub fn data(&self, index: u64) -> Option<Vec<u8>> {
        self.nodes
            .lock()
            .unwrap()
            .get(&index)
            .map(|node| node.data.clone())
    }

    /// 已回收的编号
    pub fn reclaimed(&self) -> Vec<u64> {
        self.reclaimed.lock().unwrap().clone()
    }

    /// 绕过 VFS 直接放入一个子项（用于只读文件系统）
    pub fn seed(&self, parent: u64, name: &str, inode_type: InodeType, data: &[u8]) -> u64 {
        let index = self.insert_node(Some(parent), inode_type, FileMode::from_bits_truncate(0o755));
        let mut nodes = self.nodes.lock().unwrap();
        let node = nodes.get_mut(&index).unwrap();
        node.data = data.to_vec();
        node.metadata.size = data.len() as u64;
        let parent_node = nodes.get_mut(&parent).unwrap();
        parent_node.children.insert(
            name.to_string(),
            (self.identifier(index), inode_type.to_d_type()),
        );
        if inode_type == InodeType::Directory {
            parent_node.metadata.link_count += 1;
        }
        index
    }
}

pub struct TestFs {
    fsid: u32,
    readonly: bool,
    store: Arc<Store>,
}

impl TestFs {
    pub fn new() -> Arc<TestFs> {
        Self::with_readonly(false)
    }

    pub fn with_readonly(readonly: bool) -> Arc<TestFs> {
        register_file_system(|fsid| {
            let store = Arc::new(Store {
                fsid,
                next_index: AtomicU64::new(ROOT_INDEX),
                ..Default::default()
            });
            store.insert_node(None, InodeType::Directory, FileMode::from_bits_truncate(0o755));
            TestFs {
                fsid,
                readonly,
                store,
            }
        })
    }

    pub fn store(&self) -> &Arc<Store> {
        &self.store
    }
}

struct TestInode {
    store: Arc<Store>,
    index: u64,
}

impl TestInode {
    fn with_node<R>(&self, f: impl FnOnce(&mut Node) -> R) -> Result<R, FsError> {
        let mut nodes = self.store.nodes.lock().unwrap();
        nodes.get_mut(&self.index).map(f).ok_or(FsError::NotFound)
    }
}

impl InodeOps for TestInode {
    fn populate_metadata(&self) -> Result<InodeMetadata, FsError> {
        self.with_node(|node| node.metadata.clone())
    }

    fn read_bytes(
        &self,
        offset: u64,
        buf: &mut [u8],
        _description: Option<&FileDescription>,
    ) -> Result<usize, FsError> {
        self.with_node(|node| {
            let start = (offset as usize).min(node.data.len());
            let n = buf.len().min(node.data.len() - start);
            buf[..n].copy_from_slice(&node.data[start..start + n]);
            n
        })
    }

    fn write_bytes(
        &self,
        offset: u64,
        buf: &[u8],
        _description: Option<&FileDescription>,
    ) -> Result<usize, FsError> {
        self.with_node(|node| {
            let end = offset as usize + buf.len();
            if node.data.len() < end {
                node.data.resize(end, 0);
            }
            node.data[offset as usize..end].copy_from_slice(buf);
            buf.len()
        })
    }

    fn traverse_children(
        &self,
        visit: &mut dyn FnMut(&DirectoryEntry) -> IterationDecision,
    ) -> Result<(), FsError> {
        let children: Vec<(String, (InodeIdentifier, u8))> = self.with_node(|node| {
            node.children
                .iter()
                .map(|(name, entry)| (name.clone(), *entry))
                .collect()
        })?;
        for (name, (id, file_type)) in children {
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
        self.with_node(|node| node.children.remove(name).map(|_| ()))?
            .ok_or(FsError::NotFound)
    }

    fn parent(&self) -> Option<InodeIdentifier> {
        self.with_node(|node| node.parent)
            .ok()
            .flatten()
            .map(|index| self.store.identifier(index))
    }

    fn flush_metadata(&self, metadata: &InodeMetadata) -> Result<(), FsError> {
        if self.store.flush_faults.should_fail() {
            return Err(FsError::IoError);
        }
        self.with_node(|node| node.metadata = metadata.clone())?;
        *self
            .store
            .flushes
            .lock()
            .unwrap()
            .entry(self.index)
            .or_insert(0) += 1;
        Ok(())
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

impl FileSystem for TestFs {
    fn fsid(&self) -> u32 {
        self.fsid
    }

    fn class_name(&self) -> &'static str {
        "testfs"
    }

    fn is_readonly(&self) -> bool {
        self.readonly
    }

    fn root_inode(&self) -> InodeIdentifier {
        InodeIdentifier::new(self.fsid, ROOT_INDEX)
    }

    fn load_inode(&self, index: u64) -> Result<Box<dyn InodeOps>, FsError> {
        let delay = self.store.load_delay_ms.load(Ordering::SeqCst);
        if delay > 0 {
            std::thread::sleep(Duration::from_millis(delay));
        }
        if !self.store.nodes.lock().unwrap().contains_key(&index) {
            return Err(FsError::NotFound);
        }
        self.store.loads.fetch_add(1, Ordering::SeqCst);
        Ok(Box::new(TestInode {
            store: self.store.clone(),
            index,
        }))
    }

    fn allocate_inode(
        &self,
        parent: InodeIdentifier,
        mode: FileMode,
        size: u64,
    ) -> Result<u64, FsError> {
        let inode_type = InodeType::from_mode(mode).ok_or(FsError::InvalidArgument)?;
        let index = self
            .store
            .insert_node(Some(parent.index()), inode_type, mode);
        let mut nodes = self.store.nodes.lock().unwrap();
        let node = nodes.get_mut(&index).unwrap();
        node.data = vec![0; size as usize];
        node.metadata.size = size;
        Ok(index)
    }

    fn reclaim_inode(&self, index: u64) -> Result<(), FsError> {
        self.store.nodes.lock().unwrap().remove(&index);
        self.store.reclaimed.lock().unwrap().push(index);
        Ok(())
    }

    fn statfs(&self) -> Result<StatFs, FsError> {
        let nodes = self.store.nodes.lock().unwrap().len();
        Ok(StatFs {
            block_size: 512,
            total_blocks: 0,
            free_blocks: 0,
            total_inodes: nodes,
            free_inodes: 0,
            fsid: self.fsid,
            max_filename_len: 255,
        })
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}
