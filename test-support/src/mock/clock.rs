//! 时钟的 Mock 实现
//!
//! 注意：这里不直接依赖 `vfs` crate（避免循环依赖）。
//! 测试在本地为包装类型实现 `VfsOps`，再委托给 [`MockClock`]。

use core::sync::atomic::{AtomicI64, Ordering};
use uapi::time::TimeSpec;

/// 单调递增的 Mock 时钟
///
/// 每次读取前进 1 纳秒，保证先后两次读取得到不同的时间戳。
pub struct MockClock {
    ticks: AtomicI64,
}

impl MockClock {
    pub const fn new(start_secs: i64) -> Self {
        Self {
            ticks: AtomicI64::new(start_secs * 1_000_000_000),
        }
    }

    /// 读取当前时间并前进一个刻度
    pub fn now(&self) -> TimeSpec {
        let ticks = self.ticks.fetch_add(1, Ordering::Relaxed);
        TimeSpec::new(ticks / 1_000_000_000, ticks % 1_000_000_000)
    }

    /// 向前拨动时钟
    pub fn advance_secs(&self, secs: i64) {
        self.ticks.fetch_add(secs * 1_000_000_000, Ordering::Relaxed);
    }
}

/// 全局 Mock 实例
pub static MOCK_CLOCK: MockClock = MockClock::new(1_700_000_000);
