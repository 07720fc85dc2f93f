//! 内核虚拟文件系统层
//!
//! 此 crate 提供 POSIX 兼容的虚拟文件系统抽象，包括：
//!
//! - [`FileSystem`] trait - 文件系统后端接口，以及注册表 [`FILE_SYSTEMS`]
//! - [`InodeOps`] trait 与 [`Inode`] - 后端存储接口与 VFS 缓存的 inode
//! - [`INODE_CACHE`] - 以 [`InodeIdentifier`] 为键的全局 inode 缓存
//! - [`Custody`] - 带父链的路径解析结果
//! - [`Vfs`] - 挂载表与基于路径的操作
//! - [`FileDescription`] - 打开文件的会话状态
//!
//! 锁顺序：挂载表 → 目录锁 → inode 状态锁 → inode 缓存 / 注册表。
//! 持有任何锁时都不调用后端 I/O，也不释放 `Arc<Inode>`。

#![no_std]

extern crate alloc;

pub mod config;
pub mod error;
pub mod ops;

mod custody;
mod file_description;
mod file_system;
mod identifier;
mod inode;
mod inode_cache;
mod mount;
mod path;
mod registry;
mod vfs;

// Re-export ops
pub use ops::{VfsOps, register_vfs_ops, vfs_ops};

// Re-export error
pub use error::FsError;

// Re-export identifier
pub use identifier::InodeIdentifier;

// Re-export inode
pub use inode::{
    DirectoryEntry, FileMode, Inode, InodeMetadata, InodeOps, InodeType, IterationDecision,
};

// Re-export inode cache
pub use inode_cache::{INODE_CACHE, InodeCache};

// Re-export file_system
pub use file_system::{FileSystem, StatFs, SyncFailure, SyncReport};

// Re-export registry
pub use registry::{FILE_SYSTEMS, FileSystemRegistry, register_file_system};

// Re-export custody
pub use custody::Custody;

// Re-export mount
pub use mount::{Mount, MountFlags, MountInfo};

// Re-export path
pub use path::{PathComponent, ResolveOptions, parse_path, split_path, validate_name};

// Re-export vfs
pub use vfs::{Vfs, init, vfs};

// Re-export file description
pub use file_description::FileDescription;

// Re-export uapi types for convenience
pub use uapi::fcntl::{OpenFlags, SeekWhence};
pub use uapi::fs::Stat;
pub use uapi::time::TimeSpec;
