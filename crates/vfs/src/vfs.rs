//! 虚拟文件系统入口
//!
//! [`Vfs`] 持有根 custody 与挂载表，提供基于路径的全部操作。
//! 内核通过 [`init`] 建立全局实例，之后用 [`vfs()`] 访问；
//! 测试可以直接用 [`Vfs::new`] 构造互相独立的实例。

use alloc::boxed::Box;
use alloc::string::String;
use alloc::sync::Arc;
use alloc::vec::Vec;
use core::fmt;
use once_cell::race::OnceBox;
use uapi::fcntl::OpenFlags;
use uapi::fs::Stat;
use uapi::time::TimeSpec;

use crate::mount::{Mount, MountTable};
use crate::path::read_link_target;
use crate::{
    Custody, DirectoryEntry, FILE_SYSTEMS, FileDescription, FileMode, FileSystem, FsError,
    InodeType, IterationDecision, MountFlags, MountInfo, ResolveOptions, SyncReport,
};

/// 虚拟文件系统
pub struct Vfs {
    root_custody: Arc<Custody>,
    pub(crate) mount_table: MountTable,
}

static VFS: OnceBox<Vfs> = OnceBox::new();

/// 以 `root_fs` 为根文件系统初始化全局 VFS
///
/// 重复初始化返回 `AlreadyMounted`。
pub fn init(root_fs: Arc<dyn FileSystem>) -> Result<&'static Vfs, FsError> {
    let instance = Vfs::new(root_fs)?;
    if VFS.set(Box::new(instance)).is_err() {
        return Err(FsError::AlreadyMounted);
    }
    Ok(vfs())
}

/// 获取全局 VFS
///
/// # Panics
/// 如果尚未调用 [`init`]，则 panic
pub fn vfs() -> &'static Vfs {
    match VFS.get() {
        Some(vfs) => vfs,
        None => panic!("vfs: root filesystem not mounted"),
    }
}

impl fmt::Debug for Vfs {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Vfs")
            .field("root_custody", &self.root_custody)
            .finish_non_exhaustive()
    }
}

impl Vfs {
    /// 以 `root_fs` 的根目录为系统根构造 VFS
    pub fn new(root_fs: Arc<dyn FileSystem>) -> Result<Self, FsError> {
        let root = root_fs.root()?;
        if !root.metadata()?.is_directory() {
            return Err(FsError::NotDirectory);
        }
        log::info!(
            "vfs: mounted {} (fsid {}) at /",
            root_fs.class_name(),
            root_fs.fsid()
        );
        Ok(Self {
            root_custody: Custody::root(root.clone()),
            mount_table: MountTable::new(Mount::new(root_fs, root, None, MountFlags::empty())),
        })
    }

    /// 系统根 custody
    pub fn root_custody(&self) -> Arc<Custody> {
        self.root_custody.clone()
    }

    /// 把 `fs` 挂载到 `mount_point`
    pub fn mount(
        &self,
        fs: Arc<dyn FileSystem>,
        mount_point: &Arc<Custody>,
        flags: MountFlags,
    ) -> Result<(), FsError> {
        if !mount_point.inode().metadata()?.is_directory() {
            return Err(FsError::NotDirectory);
        }
        let guest = fs.root()?;
        let fsid = fs.fsid();
        let class_name = fs.class_name();
        let mount = Mount::new(fs, guest, Some(mount_point.clone()), flags);
        if let Err((err, rejected)) = self.mount_table.insert(mount) {
            drop(rejected);
            return Err(err);
        }
        log::info!(
            "vfs: mounted {} (fsid {}) at {}",
            class_name,
            fsid,
            mount_point.absolute_path()
        );
        Ok(())
    }

    /// 卸载 `mount_point` 上的文件系统
    ///
    /// `mount_point` 既可以是解析挂载路径得到的 custody（指向被挂载的根），
    /// 也可以是挂载前的宿主 custody。根文件系统不可卸载。
    pub fn unmount(&self, mount_point: &Arc<Custody>) -> Result<(), FsError> {
        let removed = self.mount_table.remove(mount_point.inode())?;
        let path = removed.absolute_path();
        let fs = removed.guest_fs().clone();
        drop(removed);

        let report = fs.sync();
        if !report.is_clean() {
            log::warn!(
                "vfs: {} inode(s) of {} failed to sync on unmount",
                report.failures.len(),
                fs.class_name()
            );
        }
        let fsid = fs.fsid();
        log::info!("vfs: unmounted {} (fsid {}) from {}", fs.class_name(), fsid, path);
        drop(fs);
        if let Err(err) = FILE_SYSTEMS.unregister(fsid) {
            // 调用者仍持有被挂载的根，注册表项随文件系统一起失效
            log::debug!("vfs: deferred unregistering fsid {}: {}", fsid, err);
        }
        Ok(())
    }

    /// 当前挂载列表
    pub fn mounts(&self) -> Vec<MountInfo> {
        self.mount_table.list()
    }

    /// 回写所有已挂载文件系统
    pub fn sync(&self) -> SyncReport {
        let mut report = SyncReport::default();
        for fs in self.mount_table.file_systems() {
            report.merge(fs.sync());
        }
        report
    }

    fn check_writable(&self, custody: &Custody) -> Result<(), FsError> {
        let inode = custody.inode();
        if inode.fs().is_readonly()
            || self
                .mount_table
                .flags_for(inode.fsid())
                .contains(MountFlags::READ_ONLY)
        {
            return Err(FsError::ReadOnlyFs);
        }
        Ok(())
    }

    /// 打开文件
    ///
    /// 带 `O_CREAT` 且路径不存在时创建普通文件；`O_CREAT | O_EXCL` 要求路径不存在。
    pub fn open(
        &self,
        path: &str,
        flags: OpenFlags,
        mode: FileMode,
        base: &Arc<Custody>,
    ) -> Result<Arc<FileDescription>, FsError> {
        let options = if flags.contains(OpenFlags::O_NOFOLLOW) {
            ResolveOptions::NO_FOLLOW
        } else {
            ResolveOptions::FOLLOW
        };
        let custody = match self.resolve_path(path, base, options) {
            Ok(custody) => custody,
            Err(FsError::NotFound) if flags.contains(OpenFlags::O_CREAT) => {
                return self.create(path, flags, mode, base);
            }
            Err(err) => return Err(err),
        };
        if flags.contains(OpenFlags::O_CREAT | OpenFlags::O_EXCL) {
            return Err(FsError::AlreadyExists);
        }
        self.open_custody(custody, flags)
    }

    fn open_custody(
        &self,
        custody: Arc<Custody>,
        flags: OpenFlags,
    ) -> Result<Arc<FileDescription>, FsError> {
        let metadata = custody.inode().metadata()?;
        if metadata.is_symlink() {
            return Err(FsError::TooManySymlinks);
        }
        if flags.contains(OpenFlags::O_DIRECTORY) && !metadata.is_directory() {
            return Err(FsError::NotDirectory);
        }
        if flags.writable() {
            if metadata.is_directory() {
                return Err(FsError::IsDirectory);
            }
            self.check_writable(&custody)?;
        }
        FileDescription::new(custody, flags)
    }

    /// 创建普通文件并打开
    pub fn create(
        &self,
        path: &str,
        flags: OpenFlags,
        mode: FileMode,
        base: &Arc<Custody>,
    ) -> Result<Arc<FileDescription>, FsError> {
        let (parent, name) = self.resolve_parent(path, base)?;
        if name.is_empty() || name == "." || name == ".." {
            return Err(FsError::AlreadyExists);
        }
        self.check_writable(&parent)?;
        let mode = if mode.file_type_bits().is_empty() {
            mode.with_type(InodeType::File)
        } else {
            mode
        };
        let parent_inode = parent.inode();
        let inode = match parent_inode.fs().create_inode(parent_inode, name, mode, 0) {
            Ok(inode) => inode,
            // 与另一个创建者竞争失败，按普通打开处理
            Err(FsError::AlreadyExists) if !flags.contains(OpenFlags::O_EXCL) => {
                let custody = self.resolve_path(path, base, ResolveOptions::FOLLOW)?;
                return self.open_custody(custody, flags);
            }
            Err(err) => return Err(err),
        };
        let custody = Custody::new(&parent, name, inode);
        self.open_custody(custody, flags)
    }

    /// 创建目录
    pub fn mkdir(&self, path: &str, mode: FileMode, base: &Arc<Custody>) -> Result<(), FsError> {
        let (parent, name) = self.resolve_parent(path, base)?;
        if name.is_empty() || name == "." || name == ".." {
            return Err(FsError::AlreadyExists);
        }
        self.check_writable(&parent)?;
        let parent_inode = parent.inode();
        parent_inode.fs().create_directory(parent_inode, name, mode)?;
        Ok(())
    }

    /// 创建指向 `target` 的符号链接 `link_path`
    pub fn symlink(
        &self,
        target: &str,
        link_path: &str,
        base: &Arc<Custody>,
    ) -> Result<(), FsError> {
        if target.is_empty() {
            return Err(FsError::NotFound);
        }
        let (parent, name) = self.resolve_parent(link_path, base)?;
        if name.is_empty() || name == "." || name == ".." {
            return Err(FsError::AlreadyExists);
        }
        self.check_writable(&parent)?;
        let parent_inode = parent.inode();
        let mode = FileMode::from_bits_truncate(0o777).with_type(InodeType::Symlink);
        let inode = parent_inode.fs().create_inode(parent_inode, name, mode, 0)?;
        let bytes = target.as_bytes();
        let mut written = 0;
        while written < bytes.len() {
            let n = inode.write_bytes(written as u64, &bytes[written..], None)?;
            if n == 0 {
                return Err(FsError::NoSpace);
            }
            written += n;
        }
        Ok(())
    }

    /// 读取符号链接的目标
    pub fn readlink(&self, path: &str, base: &Arc<Custody>) -> Result<String, FsError> {
        let custody = self.resolve_path(path, base, ResolveOptions::NO_FOLLOW)?;
        if !custody.inode().metadata()?.is_symlink() {
            return Err(FsError::InvalidArgument);
        }
        read_link_target(custody.inode())
    }

    /// 为 `old_path` 创建硬链接 `new_path`
    pub fn link(
        &self,
        old_path: &str,
        new_path: &str,
        base: &Arc<Custody>,
    ) -> Result<(), FsError> {
        let old = self.resolve_path(old_path, base, ResolveOptions::NO_FOLLOW)?;
        let old_inode = old.inode();
        let old_metadata = old_inode.metadata()?;
        if old_metadata.is_directory() {
            return Err(FsError::IsDirectory);
        }
        let (parent, name) = self.resolve_parent(new_path, base)?;
        if name.is_empty() || name == "." || name == ".." {
            return Err(FsError::AlreadyExists);
        }
        if parent.inode().fsid() != old_inode.fsid() {
            return Err(FsError::CrossDevice);
        }
        self.check_writable(&parent)?;
        parent.inode().add_child(
            old_inode.identifier(),
            name,
            old_metadata.inode_type.to_d_type(),
        )?;
        old_inode.increment_link_count()
    }

    /// 删除非目录项
    pub fn unlink(&self, path: &str, base: &Arc<Custody>) -> Result<(), FsError> {
        let (parent, name) = self.resolve_parent(path, base)?;
        if name.is_empty() || name == "." || name == ".." {
            return Err(FsError::IsDirectory);
        }
        let parent_inode = parent.inode();
        let child_id = parent_inode.lookup(name)?;
        if self.mount_table.guest_root_for_host(child_id).is_some() {
            return Err(FsError::Busy);
        }
        let child = parent_inode.fs().get_inode(child_id)?;
        if child.metadata()?.is_directory() {
            return Err(FsError::IsDirectory);
        }
        self.check_writable(&parent)?;
        parent_inode.remove_child_if(name, child_id)?;
        child.decrement_link_count()
    }

    /// 删除空目录
    pub fn rmdir(&self, path: &str, base: &Arc<Custody>) -> Result<(), FsError> {
        let (parent, name) = self.resolve_parent(path, base)?;
        match name {
            "" => return Err(FsError::Busy),
            "." => return Err(FsError::InvalidArgument),
            ".." => return Err(FsError::DirectoryNotEmpty),
            _ => {}
        }
        let parent_inode = parent.inode();
        let child_id = parent_inode.lookup(name)?;
        if self.mount_table.guest_root_for_host(child_id).is_some() {
            return Err(FsError::Busy);
        }
        let child = parent_inode.fs().get_inode(child_id)?;
        if !child.metadata()?.is_directory() {
            return Err(FsError::NotDirectory);
        }
        self.check_writable(&parent)?;
        parent_inode.remove_empty_directory(name, &child)
    }

    /// 获取文件状态
    pub fn stat(
        &self,
        path: &str,
        base: &Arc<Custody>,
        options: ResolveOptions,
    ) -> Result<Stat, FsError> {
        let custody = self.resolve_path(path, base, options)?;
        Ok(custody.inode().metadata()?.to_stat())
    }

    /// 设置访问时间与修改时间
    pub fn utime(
        &self,
        path: &str,
        atime: TimeSpec,
        mtime: TimeSpec,
        base: &Arc<Custody>,
    ) -> Result<(), FsError> {
        if !atime.is_valid() || !mtime.is_valid() {
            return Err(FsError::InvalidArgument);
        }
        let custody = self.resolve_path(path, base, ResolveOptions::FOLLOW)?;
        self.check_writable(&custody)?;
        let inode = custody.inode();
        inode.set_atime(atime)?;
        inode.set_mtime(mtime)
    }

    /// 修改权限位
    pub fn chmod(&self, path: &str, mode: FileMode, base: &Arc<Custody>) -> Result<(), FsError> {
        let custody = self.resolve_path(path, base, ResolveOptions::FOLLOW)?;
        self.check_writable(&custody)?;
        custody.inode().chmod(mode)
    }

    /// 遍历目录
    pub fn traverse_directory(
        &self,
        path: &str,
        base: &Arc<Custody>,
        visit: &mut dyn FnMut(&DirectoryEntry) -> IterationDecision,
    ) -> Result<(), FsError> {
        let custody = self.resolve_path(path, base, ResolveOptions::FOLLOW)?;
        custody.inode().traverse_as_directory(visit)
    }
}
