//! # 文件系统模块 (FS)
//!
//! 本模块提供了两种具体的文件系统实现，通过实现 VFS 的 `FileSystem` 和 `InodeOps`
//! trait 与虚拟文件系统层集成。
//!
//! ## 支持的文件系统
//!
//! - **[tmpfs](tmpfs)**: 临时文件系统(纯内存，可限制容量)
//! - **[procfs](proc)**: 只读的内核信息伪文件系统
//!
//! 两者在构造时读取 [`vfs::vfs_ops`] 的时钟，使用前须先注册 `VfsOps`。

#![no_std]
#![doc = "文件系统实现"]

extern crate alloc;

pub mod proc;
pub mod tmpfs;

pub use proc::{ContentGenerator, MountsGenerator, ProcFS, ProcInode, ProcInodeContent};
pub use tmpfs::{TmpFs, TmpfsInode, TmpfsStats, TmpfsStore};
