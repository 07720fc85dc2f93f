//! 同步原语
//!
//! 向其它内核模块提供基本的锁原语：自旋锁与读写自旋锁。
//!
//! 两者都以 [`lock_api`] 的 raw lock trait 实现，数据访问通过 RAII guard 完成，
//! guard 在任何退出路径（包括 panic 展开）上都会释放锁。

#![no_std]

mod raw_spin_lock;
mod rwlock;
mod spin_lock;

pub use raw_spin_lock::RawSpinLock;
pub use rwlock::{RawRwSpinLock, RwLock, RwLockReadGuard, RwLockWriteGuard};
pub use spin_lock::{SpinLock, SpinLockGuard};
