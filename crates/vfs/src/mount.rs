//! 挂载表
//!
//! 每个挂载记录把一个宿主目录（以 [`InodeIdentifier`] 标识）映射到被挂载文件系统的根。
//! 根挂载没有宿主。对外只在读锁内克隆出被挂载根的强引用，
//! 因此卸载时可以准确判断文件系统是否仍被引用。

use alloc::string::String;
use alloc::sync::Arc;
use alloc::vec::Vec;
use sync::RwLock;

use crate::{Custody, FileSystem, FsError, Inode, InodeIdentifier};

bitflags::bitflags! {
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    /// 挂载选项
    pub struct MountFlags: u32 {
        /// 只读挂载
        const READ_ONLY = 1 << 0;
    }
}

/// 挂载记录
pub struct Mount {
    guest_fs: Arc<dyn FileSystem>,
    guest: Arc<Inode>,
    host_custody: Option<Arc<Custody>>,
    flags: MountFlags,
}

impl Mount {
    pub(crate) fn new(
        guest_fs: Arc<dyn FileSystem>,
        guest: Arc<Inode>,
        host_custody: Option<Arc<Custody>>,
        flags: MountFlags,
    ) -> Self {
        Self {
            guest_fs,
            guest,
            host_custody,
            flags,
        }
    }

    /// 被挂载的文件系统
    pub fn guest_fs(&self) -> &Arc<dyn FileSystem> {
        &self.guest_fs
    }

    /// 被挂载文件系统的根 inode
    pub fn guest(&self) -> &Arc<Inode> {
        &self.guest
    }

    /// 挂载点 custody，根挂载为 `None`
    pub fn host_custody(&self) -> Option<&Arc<Custody>> {
        self.host_custody.as_ref()
    }

    /// 挂载点 inode 标识，根挂载为 `None`
    pub fn host(&self) -> Option<InodeIdentifier> {
        self.host_custody.as_ref().map(|c| c.inode().identifier())
    }

    /// 挂载选项
    pub fn flags(&self) -> MountFlags {
        self.flags
    }

    /// 挂载路径
    pub fn absolute_path(&self) -> String {
        match &self.host_custody {
            Some(custody) => custody.absolute_path(),
            None => String::from("/"),
        }
    }

    fn info(&self) -> MountInfo {
        MountInfo {
            fsid: self.guest_fs.fsid(),
            class_name: self.guest_fs.class_name(),
            mount_path: self.absolute_path(),
            flags: self.flags,
        }
    }
}

/// 挂载信息快照
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MountInfo {
    /// 被挂载文件系统的 ID
    pub fsid: u32,
    /// 文件系统类型名称
    pub class_name: &'static str,
    /// 挂载路径
    pub mount_path: String,
    /// 挂载选项
    pub flags: MountFlags,
}

/// 挂载表
pub(crate) struct MountTable {
    mounts: RwLock<Vec<Mount>>,
}

impl MountTable {
    pub(crate) fn new(root: Mount) -> Self {
        let mut mounts = Vec::new();
        mounts.push(root);
        Self {
            mounts: RwLock::new(mounts),
        }
    }

    /// 挂在 `host` 上的文件系统的根
    pub(crate) fn guest_root_for_host(&self, host: InodeIdentifier) -> Option<Arc<Inode>> {
        self.mounts
            .read()
            .iter()
            .find(|m| m.host() == Some(host))
            .map(|m| m.guest.clone())
    }

    /// 以 `guest` 为根的非根挂载的挂载点 custody
    pub(crate) fn host_custody_for_guest(&self, guest: InodeIdentifier) -> Option<Arc<Custody>> {
        self.mounts
            .read()
            .iter()
            .find(|m| m.guest.identifier() == guest)
            .and_then(|m| m.host_custody.clone())
    }

    /// 文件系统所在挂载的选项，未挂载时为空
    pub(crate) fn flags_for(&self, fsid: u32) -> MountFlags {
        self.mounts
            .read()
            .iter()
            .find(|m| m.guest_fs.fsid() == fsid)
            .map_or(MountFlags::empty(), |m| m.flags)
    }

    /// 所有被挂载的文件系统
    pub(crate) fn file_systems(&self) -> Vec<Arc<dyn FileSystem>> {
        self.mounts
            .read()
            .iter()
            .map(|m| m.guest_fs.clone())
            .collect()
    }

    /// 加入挂载记录
    ///
    /// 挂载点已被占用，或挂载点本身是某个文件系统的根，或该文件系统已被挂载时返回 `AlreadyMounted`。
    /// 失败时把记录原样交还，由调用者在锁外释放。
    pub(crate) fn insert(&self, mount: Mount) -> Result<(), (FsError, Mount)> {
        let Some(host) = mount.host() else {
            return Err((FsError::InvalidArgument, mount));
        };
        let mut mounts = self.mounts.write();
        let occupied = mounts.iter().any(|m| {
            m.host() == Some(host)
                || m.guest.identifier() == host
                || m.guest_fs.fsid() == mount.guest_fs.fsid()
        });
        if occupied {
            return Err((FsError::AlreadyMounted, mount));
        }
        mounts.push(mount);
        Ok(())
    }

    /// 取出挂载记录
    ///
    /// `target` 既可以是被挂载的根，也可以是挂载点。`target` 就是被挂载的根时，
    /// 调用者手里的这一个引用不计入占用。根挂载不可移除。
    pub(crate) fn remove(&self, target: &Arc<Inode>) -> Result<Mount, FsError> {
        let id = target.identifier();
        let mut mounts = self.mounts.write();
        let pos = mounts
            .iter()
            .position(|m| m.guest.identifier() == id || m.host() == Some(id))
            .ok_or(FsError::InvalidArgument)?;
        let mount = &mounts[pos];
        if mount.host_custody.is_none() {
            return Err(FsError::Busy);
        }
        let caller_refs = usize::from(Arc::ptr_eq(target, &mount.guest));
        if crate::INODE_CACHE.is_busy(
            mount.guest_fs.fsid(),
            mount.guest.identifier(),
            1 + caller_refs,
        ) {
            return Err(FsError::Busy);
        }
        Ok(mounts.remove(pos))
    }

    /// 挂载信息快照
    pub(crate) fn list(&self) -> Vec<MountInfo> {
        self.mounts.read().iter().map(Mount::info).collect()
    }
}
