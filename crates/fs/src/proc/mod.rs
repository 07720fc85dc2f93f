//! ProcFS - 内核信息伪文件系统
//!
//! 对 VFS 只读；内容由内核通过 [`ProcFS`] 的填充接口直接构建，
//! 支持静态文件、按读生成的文件、目录和符号链接。

pub mod generators;
pub mod inode;
pub mod proc;

pub use generators::MountsGenerator;
pub use inode::{ContentGenerator, ProcInode, ProcInodeContent};
pub use proc::ProcFS;
