//! VFS 运行时操作 trait 定义和注册
//!
//! 此模块定义了 VFS 层需要的外部依赖接口，通过 trait 抽象实现与内核其余部分的解耦。

use alloc::boxed::Box;
use once_cell::race::OnceBox;
use uapi::time::TimeSpec;

/// VFS 运行时操作
///
/// 内核需要实现此 trait 并在挂载根文件系统之前注册。
pub trait VfsOps: Send + Sync {
    /// 获取当前时间
    fn timespec_now(&self) -> TimeSpec;
}

static VFS_OPS: OnceBox<&'static dyn VfsOps> = OnceBox::new();

/// 注册 VFS 操作实现
///
/// 只有第一次注册生效。重复注册返回 `false`，已注册的实现保持不变。
pub fn register_vfs_ops(ops: &'static dyn VfsOps) -> bool {
    VFS_OPS.set(Box::new(ops)).is_ok()
}

/// 获取已注册的 VFS 操作实现
///
/// # Panics
/// 如果尚未调用 [`register_vfs_ops`] 注册实现，则 panic
#[inline]
pub fn vfs_ops() -> &'static dyn VfsOps {
    match VFS_OPS.get() {
        Some(ops) => *ops,
        None => panic!("vfs: VfsOps not registered"),
    }
}
