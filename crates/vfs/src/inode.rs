//! Inode 抽象层
//!
//! 该模块分两层：
//!
//! - [`InodeOps`]：由具体文件系统实现的存储接口，只负责与后备存储交互；
//! - [`Inode`]：VFS 持有的缓存对象，包装一个 `InodeOps`，负责元数据缓存、
//!   脏标记、`.`/`..` 合成以及释放时的回写。
//!
//! 同一个 [`InodeIdentifier`] 在任意时刻至多对应一个存活的 `Inode`（见 [`crate::InodeCache`]）。

use alloc::boxed::Box;
use alloc::string::String;
use alloc::sync::{Arc, Weak};
use alloc::vec::Vec;
use core::any::Any;
use core::fmt;
use sync::{RwLock, SpinLock};
use uapi::fs::{
    DT_BLK, DT_CHR, DT_DIR, DT_FIFO, DT_LNK, DT_REG, DT_SOCK, S_IFBLK, S_IFCHR, S_IFDIR, S_IFIFO,
    S_IFLNK, S_IFREG, S_IFSOCK, Stat,
};
use uapi::time::TimeSpec;

use crate::config::{MAX_FILE_SIZE, MAX_NAME_LEN, READ_CHUNK_SIZE};
use crate::path::validate_name;
use crate::{FileDescription, FileSystem, FsError, INODE_CACHE, InodeIdentifier, vfs_ops};

/// 文件类型
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InodeType {
    /// 普通文件
    File,
    /// 目录
    Directory,
    /// 符号链接
    Symlink,
    /// 字符设备
    CharDevice,
    /// 块设备
    BlockDevice,
    /// 命名管道
    Fifo,
    /// 套接字
    Socket,
}

impl InodeType {
    /// 从 mode 的类型位解析文件类型，类型位为空或非法时返回 `None`
    pub fn from_mode(mode: FileMode) -> Option<Self> {
        match mode.bits() & FileMode::S_IFMT.bits() {
            S_IFREG => Some(InodeType::File),
            S_IFDIR => Some(InodeType::Directory),
            S_IFLNK => Some(InodeType::Symlink),
            S_IFCHR => Some(InodeType::CharDevice),
            S_IFBLK => Some(InodeType::BlockDevice),
            S_IFIFO => Some(InodeType::Fifo),
            S_IFSOCK => Some(InodeType::Socket),
            _ => None,
        }
    }

    /// 对应的 mode 类型位
    pub fn type_bits(&self) -> FileMode {
        let bits = match self {
            InodeType::File => S_IFREG,
            InodeType::Directory => S_IFDIR,
            InodeType::Symlink => S_IFLNK,
            InodeType::CharDevice => S_IFCHR,
            InodeType::BlockDevice => S_IFBLK,
            InodeType::Fifo => S_IFIFO,
            InodeType::Socket => S_IFSOCK,
        };
        FileMode::from_bits_retain(bits)
    }

    /// 对应的 getdents `d_type`
    pub fn to_d_type(&self) -> u8 {
        match self {
            InodeType::File => DT_REG,
            InodeType::Directory => DT_DIR,
            InodeType::Symlink => DT_LNK,
            InodeType::CharDevice => DT_CHR,
            InodeType::BlockDevice => DT_BLK,
            InodeType::Fifo => DT_FIFO,
            InodeType::Socket => DT_SOCK,
        }
    }
}

bitflags::bitflags! {
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    /// 文件权限和类型（与 POSIX 兼容）
    pub struct FileMode: u32 {
        /// 文件类型掩码
        const S_IFMT   = 0o170000;
        /// 普通文件
        const S_IFREG  = 0o100000;
        /// 目录
        const S_IFDIR  = 0o040000;
        /// 符号链接
        const S_IFLNK  = 0o120000;
        /// 字符设备
        const S_IFCHR  = 0o020000;
        /// 块设备
        const S_IFBLK  = 0o060000;
        /// FIFO
        const S_IFIFO  = 0o010000;
        /// Socket
        const S_IFSOCK = 0o140000;

        /// 用户读
        const S_IRUSR  = 0o400;
        /// 用户写
        const S_IWUSR  = 0o200;
        /// 用户执行
        const S_IXUSR  = 0o100;
        /// 组读
        const S_IRGRP  = 0o040;
        /// 组写
        const S_IWGRP  = 0o020;
        /// 组执行
        const S_IXGRP  = 0o010;
        /// 其他读
        const S_IROTH  = 0o004;
        /// 其他写
        const S_IWOTH  = 0o002;
        /// 其他执行
        const S_IXOTH  = 0o001;

        /// Set UID
        const S_ISUID  = 0o4000;
        /// Set GID
        const S_ISGID  = 0o2000;
        /// Sticky bit
        const S_ISVTX  = 0o1000;
    }
}

impl FileMode {
    /// 仅保留类型位
    pub fn file_type_bits(&self) -> FileMode {
        *self & FileMode::S_IFMT
    }

    /// 仅保留权限位（含特殊位）
    pub fn permission_bits(&self) -> FileMode {
        *self & !FileMode::S_IFMT
    }

    /// 用给定类型位替换当前类型位
    pub fn with_type(&self, inode_type: InodeType) -> FileMode {
        self.permission_bits() | inode_type.type_bits()
    }
}

/// 文件元数据
///
/// 由后端在 [`InodeOps::populate_metadata`] 中填写，VFS 缓存在 [`Inode`] 内，
/// 修改后标记为脏，经 [`InodeOps::flush_metadata`] 回写。
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InodeMetadata {
    /// 所属 inode
    pub identifier: InodeIdentifier,
    /// 文件类型
    pub inode_type: InodeType,
    /// 类型位与权限位
    pub mode: FileMode,
    /// 用户 ID
    pub uid: u32,
    /// 组 ID
    pub gid: u32,
    /// 文件大小（字节）
    pub size: u64,
    /// 硬链接数
    pub link_count: u32,
    /// 访问时间
    pub atime: TimeSpec,
    /// 修改时间
    pub mtime: TimeSpec,
    /// 状态改变时间
    pub ctime: TimeSpec,
    /// 设备号（仅对 CharDevice 和 BlockDevice 有效）
    pub rdev: u64,
}

impl InodeMetadata {
    /// 用当前时间构造一份新建 inode 的元数据
    ///
    /// 目录的初始链接数为 2（自身的 `.` 与父目录中的表项），其余为 1。
    pub fn new(identifier: InodeIdentifier, inode_type: InodeType, mode: FileMode) -> Self {
        let now = vfs_ops().timespec_now();
        Self {
            identifier,
            inode_type,
            mode: mode.with_type(inode_type),
            uid: 0,
            gid: 0,
            size: 0,
            link_count: if inode_type == InodeType::Directory { 2 } else { 1 },
            atime: now,
            mtime: now,
            ctime: now,
            rdev: 0,
        }
    }

    /// 是否为目录
    pub fn is_directory(&self) -> bool {
        self.inode_type == InodeType::Directory
    }

    /// 是否为符号链接
    pub fn is_symlink(&self) -> bool {
        self.inode_type == InodeType::Symlink
    }

    /// 转换为 stat(2) 结构
    pub fn to_stat(&self) -> Stat {
        Stat {
            st_dev: self.identifier.fsid() as u64,
            st_ino: self.identifier.index(),
            st_mode: self.mode.bits(),
            st_nlink: self.link_count,
            st_uid: self.uid,
            st_gid: self.gid,
            st_rdev: self.rdev,
            st_size: self.size as i64,
            st_blksize: 512,
            st_blocks: self.size.div_ceil(512) as i64,
            st_atime: self.atime,
            st_mtime: self.mtime,
            st_ctime: self.ctime,
        }
    }
}

/// 定长目录项
///
/// 布局固定，可直接暴露给用户态：名字缓冲区、名字长度、inode 标识、`d_type`。
#[repr(C)]
#[derive(Clone)]
pub struct DirectoryEntry {
    name: [u8; MAX_NAME_LEN + 1],
    name_length: usize,
    inode: InodeIdentifier,
    file_type: u8,
}

impl DirectoryEntry {
    /// 构造目录项，名字超过 [`MAX_NAME_LEN`] 时返回 `NameTooLong`
    pub fn new(name: &str, inode: InodeIdentifier, file_type: u8) -> Result<Self, FsError> {
        if name.len() > MAX_NAME_LEN {
            return Err(FsError::NameTooLong);
        }
        let mut buf = [0u8; MAX_NAME_LEN + 1];
        buf[..name.len()].copy_from_slice(name.as_bytes());
        Ok(Self {
            name: buf,
            name_length: name.len(),
            inode,
            file_type,
        })
    }

    /// 名字
    pub fn name(&self) -> &str {
        core::str::from_utf8(self.name_bytes()).unwrap_or("")
    }

    /// 名字的原始字节
    pub fn name_bytes(&self) -> &[u8] {
        &self.name[..self.name_length]
    }

    /// 目标 inode
    pub fn inode(&self) -> InodeIdentifier {
        self.inode
    }

    /// `d_type`
    pub fn file_type(&self) -> u8 {
        self.file_type
    }
}

impl fmt::Debug for DirectoryEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DirectoryEntry")
            .field("name", &self.name())
            .field("inode", &self.inode)
            .field("file_type", &self.file_type)
            .finish()
    }
}

/// 目录遍历回调的返回值
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IterationDecision {
    /// 继续遍历
    Continue,
    /// 停止遍历
    Break,
}

/// 文件系统后端的 inode 存储接口
///
/// 实现者只与自己的后备存储打交道；权限、只读检查、元数据缓存和
/// `.`/`..` 合成由 [`Inode`] 负责。
pub trait InodeOps: Send + Sync + Any {
    /// 从后备存储读取元数据
    fn populate_metadata(&self) -> Result<InodeMetadata, FsError>;

    /// 从指定偏移量读取数据，可能短读，返回 0 表示到达末尾
    fn read_bytes(
        &self,
        offset: u64,
        buf: &mut [u8],
        description: Option<&FileDescription>,
    ) -> Result<usize, FsError>;

    /// 向指定偏移量写入数据，可能短写
    fn write_bytes(
        &self,
        _offset: u64,
        _buf: &[u8],
        _description: Option<&FileDescription>,
    ) -> Result<usize, FsError> {
        Err(FsError::NotSupported)
    }

    /// 枚举真实子项（不包含 `.` 和 `..`）
    fn traverse_children(
        &self,
        _visit: &mut dyn FnMut(&DirectoryEntry) -> IterationDecision,
    ) -> Result<(), FsError> {
        Err(FsError::NotDirectory)
    }

    /// 按名字查找子项
    fn lookup(&self, _name: &str) -> Result<InodeIdentifier, FsError> {
        Err(FsError::NotDirectory)
    }

    /// 添加目录项；名字已存在时必须返回 `AlreadyExists`
    fn add_child(
        &self,
        _child: InodeIdentifier,
        _name: &str,
        _file_type: u8,
    ) -> Result<(), FsError> {
        Err(FsError::NotSupported)
    }

    /// 删除目录项
    fn remove_child(&self, _name: &str) -> Result<(), FsError> {
        Err(FsError::NotSupported)
    }

    /// 父目录标识，文件系统根返回 `None`
    fn parent(&self) -> Option<InodeIdentifier>;

    /// 把元数据写回后备存储
    fn flush_metadata(&self, _metadata: &InodeMetadata) -> Result<(), FsError> {
        Ok(())
    }

    /// 向下转型为 &dyn Any，用于支持 downcast
    fn as_any(&self) -> &dyn Any;
}

impl dyn InodeOps {
    /// 尝试获取具体类型的引用
    pub fn downcast_ref<T: InodeOps>(&self) -> Option<&T> {
        self.as_any().downcast_ref::<T>()
    }
}

struct InodeState {
    metadata: Option<InodeMetadata>,
    dirty: bool,
}

/// VFS 缓存的 inode
///
/// 只能经由 [`crate::FileSystem::get_inode`] 获得。最后一个引用释放时：
/// 回写脏元数据（恰好一次）、链接数为 0 则回收存储，然后从缓存中移除。
pub struct Inode {
    identifier: InodeIdentifier,
    serial: u64,
    fs: Arc<dyn FileSystem>,
    ops: Box<dyn InodeOps>,
    state: SpinLock<InodeState>,
    directory_lock: RwLock<()>,
    vmobject: SpinLock<Option<Weak<dyn Any + Send + Sync>>>,
}

impl Inode {
    pub(crate) fn new(
        identifier: InodeIdentifier,
        fs: Arc<dyn FileSystem>,
        ops: Box<dyn InodeOps>,
        serial: u64,
    ) -> Self {
        Self {
            identifier,
            serial,
            fs,
            ops,
            state: SpinLock::new(InodeState {
                metadata: None,
                dirty: false,
            }),
            directory_lock: RwLock::new(()),
            vmobject: SpinLock::new(None),
        }
    }

    /// 全局标识
    pub fn identifier(&self) -> InodeIdentifier {
        self.identifier
    }

    /// 所属文件系统 ID
    pub fn fsid(&self) -> u32 {
        self.identifier.fsid()
    }

    /// 文件系统内的编号
    pub fn index(&self) -> u64 {
        self.identifier.index()
    }

    /// 所属文件系统
    pub fn fs(&self) -> &Arc<dyn FileSystem> {
        &self.fs
    }

    /// 后端存储接口
    pub fn ops(&self) -> &dyn InodeOps {
        self.ops.as_ref()
    }

    /// 元数据快照，首次访问时从后端加载
    pub fn metadata(&self) -> Result<InodeMetadata, FsError> {
        if let Some(metadata) = &self.state.lock().metadata {
            return Ok(metadata.clone());
        }
        // 加载时不持锁，并发加载以先写入者为准
        let loaded = self.ops.populate_metadata()?;
        let mut state = self.state.lock();
        Ok(state.metadata.get_or_insert(loaded).clone())
    }

    fn modify_metadata(&self, f: impl FnOnce(&mut InodeMetadata)) -> Result<(), FsError> {
        self.metadata()?;
        let mut state = self.state.lock();
        if let Some(metadata) = state.metadata.as_mut() {
            f(metadata);
            state.dirty = true;
        }
        Ok(())
    }

    fn ensure_writable(&self) -> Result<(), FsError> {
        if self.fs.is_readonly() {
            return Err(FsError::ReadOnlyFs);
        }
        Ok(())
    }

    fn ensure_directory(&self) -> Result<(), FsError> {
        if !self.metadata()?.is_directory() {
            return Err(FsError::NotDirectory);
        }
        Ok(())
    }

    /// 文件大小
    pub fn size(&self) -> Result<u64, FsError> {
        Ok(self.metadata()?.size)
    }

    /// 链接数
    pub fn link_count(&self) -> Result<u32, FsError> {
        Ok(self.metadata()?.link_count)
    }

    /// 是否为目录，元数据不可读时视为否
    pub fn is_directory(&self) -> bool {
        self.metadata().is_ok_and(|m| m.is_directory())
    }

    /// 是否为符号链接，元数据不可读时视为否
    pub fn is_symlink(&self) -> bool {
        self.metadata().is_ok_and(|m| m.is_symlink())
    }

    /// 缓存的元数据是否有未回写的修改
    pub fn is_metadata_dirty(&self) -> bool {
        self.state.lock().dirty
    }

    /// 从指定偏移量读取数据
    pub fn read_bytes(
        &self,
        offset: u64,
        buf: &mut [u8],
        description: Option<&FileDescription>,
    ) -> Result<usize, FsError> {
        if self.is_directory() {
            return Err(FsError::IsDirectory);
        }
        self.ops.read_bytes(offset, buf, description)
    }

    /// 向指定偏移量写入数据
    ///
    /// 写过当前末尾时扩大缓存中的大小并标记为脏。
    /// 写入范围超出 [`MAX_FILE_SIZE`] 时返回 `InvalidArgument`。
    pub fn write_bytes(
        &self,
        offset: u64,
        buf: &[u8],
        description: Option<&FileDescription>,
    ) -> Result<usize, FsError> {
        self.ensure_writable()?;
        if self.is_directory() {
            return Err(FsError::IsDirectory);
        }
        if offset
            .checked_add(buf.len() as u64)
            .is_none_or(|end| end > MAX_FILE_SIZE)
        {
            return Err(FsError::InvalidArgument);
        }
        let written = self.ops.write_bytes(offset, buf, description)?;
        let end = offset + written.min(buf.len()) as u64;
        let now = vfs_ops().timespec_now();
        self.modify_metadata(|metadata| {
            if end > metadata.size {
                metadata.size = end;
            }
            metadata.mtime = now;
            metadata.ctime = now;
        })?;
        Ok(written)
    }

    /// 读取全部内容
    pub fn read_entire(&self, description: Option<&FileDescription>) -> Result<Vec<u8>, FsError> {
        let mut data = Vec::new();
        let mut chunk = [0u8; READ_CHUNK_SIZE];
        loop {
            let n = self.read_bytes(data.len() as u64, &mut chunk, description)?;
            if n == 0 {
                break;
            }
            data.extend_from_slice(&chunk[..n]);
        }
        Ok(data)
    }

    /// 遍历目录
    ///
    /// 先给出 `.`（自身）与 `..`（父目录，文件系统根为自身），然后是后端的真实子项。
    /// 回调返回 [`IterationDecision::Break`] 时提前结束。回调在目录锁之外执行，
    /// 可以修改正在遍历的目录，但看到的是调用时刻的快照。
    pub fn traverse_as_directory(
        &self,
        visit: &mut dyn FnMut(&DirectoryEntry) -> IterationDecision,
    ) -> Result<(), FsError> {
        for entry in self.directory_entries()? {
            if visit(&entry) == IterationDecision::Break {
                break;
            }
        }
        Ok(())
    }

    /// 目录项快照（包含 `.` 与 `..`）
    pub fn directory_entries(&self) -> Result<Vec<DirectoryEntry>, FsError> {
        self.ensure_directory()?;
        let parent = self.ops.parent().unwrap_or(self.identifier);
        let mut entries = Vec::new();
        entries.push(DirectoryEntry::new(".", self.identifier, DT_DIR)?);
        entries.push(DirectoryEntry::new("..", parent, DT_DIR)?);
        let _guard = self.directory_lock.read();
        self.ops.traverse_children(&mut |entry| {
            entries.push(entry.clone());
            IterationDecision::Continue
        })?;
        Ok(entries)
    }

    /// 目录项数量（包含 `.` 与 `..`）
    pub fn directory_entry_count(&self) -> Result<usize, FsError> {
        let mut count = 0;
        self.traverse_as_directory(&mut |_| {
            count += 1;
            IterationDecision::Continue
        })?;
        Ok(count)
    }

    /// 按名字查找子项
    pub fn lookup(&self, name: &str) -> Result<InodeIdentifier, FsError> {
        self.ensure_directory()?;
        match name {
            "." => Ok(self.identifier),
            ".." => Ok(self.ops.parent().unwrap_or(self.identifier)),
            _ => {
                let _guard = self.directory_lock.read();
                self.ops.lookup(name)
            }
        }
    }

    /// 在本目录中查找指向 `child` 的名字
    pub fn reverse_lookup(&self, child: InodeIdentifier) -> Result<String, FsError> {
        self.ensure_directory()?;
        let mut found = None;
        {
            let _guard = self.directory_lock.read();
            self.ops.traverse_children(&mut |entry| {
                if entry.inode() == child {
                    found = Some(String::from(entry.name()));
                    IterationDecision::Break
                } else {
                    IterationDecision::Continue
                }
            })?;
        }
        found.ok_or(FsError::NotFound)
    }

    /// 父目录标识，文件系统根返回 `None`
    pub fn parent(&self) -> Option<InodeIdentifier> {
        self.ops.parent()
    }

    /// 添加目录项
    pub fn add_child(
        &self,
        child: InodeIdentifier,
        name: &str,
        file_type: u8,
    ) -> Result<(), FsError> {
        self.ensure_writable()?;
        self.ensure_directory()?;
        validate_name(name)?;
        {
            let _guard = self.directory_lock.write();
            // 已被 rmdir 删除的目录
            if self.link_count()? == 0 {
                return Err(FsError::NotFound);
            }
            match self.ops.lookup(name) {
                Ok(_) => return Err(FsError::AlreadyExists),
                Err(FsError::NotFound) => {}
                Err(err) => return Err(err),
            }
            self.ops.add_child(child, name, file_type)?;
        }
        self.touch_directory()
    }

    /// 删除目录项
    pub fn remove_child(&self, name: &str) -> Result<(), FsError> {
        self.ensure_writable()?;
        self.ensure_directory()?;
        if name == "." || name == ".." {
            return Err(FsError::InvalidArgument);
        }
        {
            let _guard = self.directory_lock.write();
            self.ops.remove_child(name)?;
        }
        self.touch_directory()
    }

    /// 删除名字仍指向 `expected` 的目录项
    ///
    /// 名字已被重新绑定到其他 inode 时返回 `NotFound`。检查与删除在同一次目录写锁内完成。
    pub fn remove_child_if(&self, name: &str, expected: InodeIdentifier) -> Result<(), FsError> {
        self.ensure_writable()?;
        self.ensure_directory()?;
        if name == "." || name == ".." {
            return Err(FsError::InvalidArgument);
        }
        {
            let _guard = self.directory_lock.write();
            self.remove_entry_locked(name, expected)?;
        }
        self.touch_directory()
    }

    /// 删除空子目录 `name`
    ///
    /// 同时持有本目录与 `child` 的目录写锁完成判空与删除，并把 `child` 的链接数减到 0，
    /// 此后向 `child` 添加目录项会返回 `NotFound`。锁顺序总是先父后子。
    pub fn remove_empty_directory(&self, name: &str, child: &Inode) -> Result<(), FsError> {
        self.ensure_writable()?;
        self.ensure_directory()?;
        child.ensure_directory()?;
        if name == "." || name == ".." || child.identifier == self.identifier {
            return Err(FsError::InvalidArgument);
        }
        {
            let _guard = self.directory_lock.write();
            let _child_guard = child.directory_lock.write();
            let mut empty = true;
            child.ops.traverse_children(&mut |_| {
                empty = false;
                IterationDecision::Break
            })?;
            if !empty {
                return Err(FsError::DirectoryNotEmpty);
            }
            self.remove_entry_locked(name, child.identifier)?;
            // 父目录中的表项与自身的 "."
            let now = vfs_ops().timespec_now();
            child.modify_metadata(|metadata| {
                metadata.link_count = metadata.link_count.saturating_sub(2);
                metadata.ctime = now;
            })?;
        }
        self.touch_directory()?;
        // 子目录的 ".."
        self.decrement_link_count()
    }

    fn remove_entry_locked(&self, name: &str, expected: InodeIdentifier) -> Result<(), FsError> {
        if self.ops.lookup(name)? != expected {
            return Err(FsError::NotFound);
        }
        self.ops.remove_child(name)
    }

    fn touch_directory(&self) -> Result<(), FsError> {
        let now = vfs_ops().timespec_now();
        self.modify_metadata(|metadata| {
            metadata.mtime = now;
            metadata.ctime = now;
        })
    }

    /// 设置访问时间
    pub fn set_atime(&self, time: TimeSpec) -> Result<(), FsError> {
        self.ensure_writable()?;
        self.modify_metadata(|metadata| metadata.atime = time)
    }

    /// 设置修改时间
    pub fn set_mtime(&self, time: TimeSpec) -> Result<(), FsError> {
        self.ensure_writable()?;
        self.modify_metadata(|metadata| metadata.mtime = time)
    }

    /// 设置状态改变时间
    pub fn set_ctime(&self, time: TimeSpec) -> Result<(), FsError> {
        self.ensure_writable()?;
        self.modify_metadata(|metadata| metadata.ctime = time)
    }

    /// 修改权限位，类型位保持不变
    pub fn chmod(&self, mode: FileMode) -> Result<(), FsError> {
        self.ensure_writable()?;
        let now = vfs_ops().timespec_now();
        self.modify_metadata(|metadata| {
            metadata.mode = mode.with_type(metadata.inode_type);
            metadata.ctime = now;
        })
    }

    /// 链接数加一
    pub fn increment_link_count(&self) -> Result<(), FsError> {
        self.ensure_writable()?;
        let now = vfs_ops().timespec_now();
        self.modify_metadata(|metadata| {
            metadata.link_count += 1;
            metadata.ctime = now;
        })
    }

    /// 链接数减一，已为 0 时返回 `InvalidArgument`
    pub fn decrement_link_count(&self) -> Result<(), FsError> {
        self.ensure_writable()?;
        if self.link_count()? == 0 {
            return Err(FsError::InvalidArgument);
        }
        let now = vfs_ops().timespec_now();
        self.modify_metadata(|metadata| {
            metadata.link_count = metadata.link_count.saturating_sub(1);
            metadata.ctime = now;
        })
    }

    /// 回写脏元数据
    ///
    /// 回写期间发生的新修改会保留脏标记。
    pub fn flush_metadata(&self) -> Result<(), FsError> {
        let snapshot = {
            let state = self.state.lock();
            if !state.dirty {
                return Ok(());
            }
            match &state.metadata {
                Some(metadata) => metadata.clone(),
                None => return Ok(()),
            }
        };
        self.ops.flush_metadata(&snapshot)?;
        let mut state = self.state.lock();
        if state.metadata.as_ref() == Some(&snapshot) {
            state.dirty = false;
        }
        Ok(())
    }

    /// 关联内存映射对象（只保存弱引用）
    pub fn set_vmobject(&self, vmobject: &Arc<dyn Any + Send + Sync>) {
        *self.vmobject.lock() = Some(Arc::downgrade(vmobject));
    }

    /// 关联的内存映射对象，未关联或已释放时返回 `None`
    pub fn vmobject(&self) -> Option<Arc<dyn Any + Send + Sync>> {
        self.vmobject.lock().as_ref().and_then(Weak::upgrade)
    }
}

impl Drop for Inode {
    fn drop(&mut self) {
        if let Err(err) = self.flush_metadata() {
            log::error!(
                "vfs: failed to flush metadata of inode {} on release: {}",
                self.identifier,
                err
            );
        }
        let unlinked = self
            .state
            .get_mut()
            .metadata
            .as_ref()
            .is_some_and(|m| m.link_count == 0);
        if unlinked && !self.fs.is_readonly() {
            if let Err(err) = self.fs.reclaim_inode(self.identifier.index()) {
                log::warn!("vfs: failed to reclaim inode {}: {}", self.identifier, err);
            }
        }
        INODE_CACHE.evict(self.identifier, self.serial);
    }
}

impl fmt::Debug for Inode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Inode")
            .field("identifier", &self.identifier)
            .field("fs", &self.fs.class_name())
            .finish()
    }
}
