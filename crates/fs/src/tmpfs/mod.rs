//! Tmpfs - 内存临时文件系统
//!
//! 该模块提供了一个**完全驻留在内存中的文件系统**。
//!
//! 节点记录（[`TmpfsStore`]）充当“后备存储”：VFS 缓存的元数据只有在
//! `flush_metadata` 之后才会出现在这里。文件数据按页稀疏存放，
//! 容量和 inode 数量都可以设上限，超出时返回 `NoSpace`。

mod inode;
mod store;
mod tmpfs;

pub use inode::TmpfsInode;
pub use store::{PAGE_SIZE, TmpfsStats, TmpfsStore};
pub use tmpfs::TmpFs;
