//! 文件系统注册表
//!
//! 为每个文件系统实例分配唯一的 ID，并支持按 ID 查找。
//! ID 从 1 开始单调递增，注销后不会复用。注册表只保存弱引用，
//! 实例的生命周期由挂载表和 inode 决定。

use alloc::collections::BTreeMap;
use alloc::sync::{Arc, Weak};
use alloc::vec::Vec;
use core::sync::atomic::{AtomicU32, Ordering};
use lazy_static::lazy_static;
use sync::SpinLock;

use crate::{FileSystem, FsError, INODE_CACHE, SyncReport};

/// 文件系统注册表
pub struct FileSystemRegistry {
    next_fsid: AtomicU32,
    entries: SpinLock<BTreeMap<u32, Weak<dyn FileSystem>>>,
}

lazy_static! {
    /// 全局文件系统注册表
    pub static ref FILE_SYSTEMS: FileSystemRegistry = FileSystemRegistry::new();
}

impl FileSystemRegistry {
    fn new() -> Self {
        Self {
            next_fsid: AtomicU32::new(1),
            entries: SpinLock::new(BTreeMap::new()),
        }
    }

    /// 分配 ID 并用它构造文件系统
    ///
    /// # Panics
    /// ID 空间耗尽，或 `build` 构造出的实例报告了不同的 ID 时 panic
    pub fn register<F, B>(&self, build: B) -> Arc<F>
    where
        F: FileSystem,
        B: FnOnce(u32) -> F,
    {
        let fsid = self.next_fsid.fetch_add(1, Ordering::Relaxed);
        assert!(fsid != 0, "vfs: filesystem id space exhausted");
        let fs = Arc::new(build(fsid));
        assert_eq!(fs.fsid(), fsid, "vfs: {} ignored its assigned fsid", fs.class_name());

        let weak: Weak<dyn FileSystem> = Arc::downgrade(&fs) as Weak<dyn FileSystem>;
        let mut entries = self.entries.lock();
        entries.retain(|_, entry| entry.strong_count() > 0);
        entries.insert(fsid, weak);
        drop(entries);

        log::debug!("vfs: registered {} as fsid {}", fs.class_name(), fsid);
        fs
    }

    /// 按 ID 查找文件系统
    pub fn lookup(&self, fsid: u32) -> Option<Arc<dyn FileSystem>> {
        let weak = self.entries.lock().get(&fsid).cloned()?;
        weak.upgrade()
    }

    /// 注销文件系统
    ///
    /// 该文件系统仍有 inode 存活（被引用或正在释放）时返回 `Busy`。
    pub fn unregister(&self, fsid: u32) -> Result<(), FsError> {
        if INODE_CACHE.count_for(fsid) > 0 {
            return Err(FsError::Busy);
        }
        let removed = self.entries.lock().remove(&fsid);
        match removed {
            Some(_) => {
                log::debug!("vfs: unregistered fsid {}", fsid);
                Ok(())
            }
            None => Err(FsError::NotFound),
        }
    }

    /// 已注册且仍存活的文件系统 ID
    pub fn registered(&self) -> Vec<u32> {
        self.entries
            .lock()
            .iter()
            .filter(|(_, entry)| entry.strong_count() > 0)
            .map(|(fsid, _)| *fsid)
            .collect()
    }

    /// 对所有存活的文件系统执行 sync
    pub fn sync_all(&self) -> SyncReport {
        let live: Vec<Weak<dyn FileSystem>> = self.entries.lock().values().cloned().collect();
        let mut report = SyncReport::default();
        for fs in live.iter().filter_map(Weak::upgrade) {
            report.merge(fs.sync());
        }
        report
    }
}

/// 在全局注册表中注册文件系统，见 [`FileSystemRegistry::register`]
pub fn register_file_system<F, B>(build: B) -> Arc<F>
where
    F: FileSystem,
    B: FnOnce(u32) -> F,
{
    FILE_SYSTEMS.register(build)
}
