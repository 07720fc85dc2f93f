//! 全局 inode 缓存
//!
//! 以 [`InodeIdentifier`] 为键，只保存弱引用：缓存本身不延长 inode 的生命周期。
//! 每个槽位处于以下两种状态之一：
//!
//! - `Loading`：某个线程正在从后端加载，其它请求者等待；
//! - `Live`：已加载，弱引用指向存活（或正在释放）的 [`Inode`]。
//!
//! 正在释放的 inode 在回写完成并调用 `evict` 之前一直占着槽位，
//! 因此同一标识不会在旧实例回写前被重新加载。
//!
//! 持有缓存锁期间不会释放任何 `Arc<Inode>`，inode 的析构会重新进入缓存。

use alloc::sync::{Arc, Weak};
use alloc::vec::Vec;
use core::hint;
use core::sync::atomic::{AtomicU64, Ordering};
use hashbrown::HashMap;
use lazy_static::lazy_static;
use sync::SpinLock;

use crate::{FsError, Inode, InodeIdentifier};

enum CacheSlot {
    Loading,
    Live { serial: u64, inode: Weak<Inode> },
}

/// inode 缓存
pub struct InodeCache {
    slots: SpinLock<HashMap<InodeIdentifier, CacheSlot>>,
    next_serial: AtomicU64,
}

lazy_static! {
    /// 全局 inode 缓存
    pub static ref INODE_CACHE: InodeCache = InodeCache::new();
}

/// 加载期间占住 `Loading` 槽位，任何提前退出（包括 panic）都会把槽位还回去
struct LoadingSlot<'a> {
    cache: &'a InodeCache,
    identifier: InodeIdentifier,
    armed: bool,
}

impl Drop for LoadingSlot<'_> {
    fn drop(&mut self) {
        if self.armed {
            self.cache.slots.lock().remove(&self.identifier);
        }
    }
}

impl InodeCache {
    fn new() -> Self {
        Self {
            slots: SpinLock::new(HashMap::new()),
            next_serial: AtomicU64::new(1),
        }
    }

    /// 获取缓存的 inode，未命中时调用 `load` 构造
    ///
    /// `load` 在不持锁的情况下执行，参数为本次加载分配的槽位序号。
    /// 同一标识的并发请求只会触发一次加载，所有请求者得到同一个实例。
    pub(crate) fn get_or_load<F>(
        &self,
        identifier: InodeIdentifier,
        load: F,
    ) -> Result<Arc<Inode>, FsError>
    where
        F: FnOnce(u64) -> Result<Inode, FsError>,
    {
        loop {
            {
                let mut slots = self.slots.lock();
                match slots.get(&identifier) {
                    None => {
                        slots.insert(identifier, CacheSlot::Loading);
                        break;
                    }
                    Some(CacheSlot::Live { inode, .. }) => {
                        if let Some(inode) = inode.upgrade() {
                            return Ok(inode);
                        }
                        // 旧实例正在析构，等它回写完毕
                    }
                    Some(CacheSlot::Loading) => {}
                }
            }
            hint::spin_loop();
        }

        let mut slot = LoadingSlot {
            cache: self,
            identifier,
            armed: true,
        };
        let serial = self.next_serial.fetch_add(1, Ordering::Relaxed);
        let inode = Arc::new(load(serial)?);
        slot.armed = false;
        self.slots.lock().insert(
            identifier,
            CacheSlot::Live {
                serial,
                inode: Arc::downgrade(&inode),
            },
        );
        Ok(inode)
    }

    /// 移除槽位，仅当槽位仍属于序号为 `serial` 的实例时生效
    pub(crate) fn evict(&self, identifier: InodeIdentifier, serial: u64) {
        let mut slots = self.slots.lock();
        let owned = matches!(
            slots.get(&identifier),
            Some(CacheSlot::Live { serial: current, .. }) if *current == serial
        );
        if owned {
            slots.remove(&identifier);
        }
    }

    /// 缓存中是否有该标识的槽位（包括正在加载或正在释放的）
    pub fn contains(&self, identifier: InodeIdentifier) -> bool {
        self.slots.lock().contains_key(&identifier)
    }

    /// 属于指定文件系统的槽位数量
    pub fn count_for(&self, fsid: u32) -> usize {
        self.slots
            .lock()
            .keys()
            .filter(|id| id.fsid() == fsid)
            .count()
    }

    /// 收集指定文件系统所有存活的 inode
    ///
    /// 返回的引用必须在调用者一侧释放，不能在缓存锁内释放。
    pub(crate) fn inodes_for(&self, fsid: u32) -> Vec<Arc<Inode>> {
        let slots = self.slots.lock();
        slots
            .iter()
            .filter(|(id, _)| id.fsid() == fsid)
            .filter_map(|(_, slot)| match slot {
                CacheSlot::Live { inode, .. } => inode.upgrade(),
                CacheSlot::Loading => None,
            })
            .collect()
    }

    /// 指定文件系统是否仍有外部引用
    ///
    /// `root` 允许被持有 `allowed_root_refs` 个强引用；其余任何槽位都视为占用。
    pub(crate) fn is_busy(
        &self,
        fsid: u32,
        root: InodeIdentifier,
        allowed_root_refs: usize,
    ) -> bool {
        let slots = self.slots.lock();
        slots
            .iter()
            .filter(|(id, _)| id.fsid() == fsid)
            .any(|(id, slot)| match slot {
                CacheSlot::Live { inode, .. } if *id == root => {
                    inode.strong_count() > allowed_root_refs
                }
                _ => true,
            })
    }
}
