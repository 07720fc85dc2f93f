//! 故障注入开关

use core::sync::atomic::{AtomicUsize, Ordering};

/// 让接下来的若干次操作失败
///
/// 测试后端在每次可失败的操作前调用 [`FaultSwitch::should_fail`]。
pub struct FaultSwitch {
    remaining: AtomicUsize,
}

impl FaultSwitch {
    pub const fn new() -> Self {
        Self {
            remaining: AtomicUsize::new(0),
        }
    }

    /// 接下来的 `count` 次操作失败
    pub fn fail_next(&self, count: usize) {
        self.remaining.store(count, Ordering::SeqCst);
    }

    /// 本次操作是否应当失败
    pub fn should_fail(&self) -> bool {
        self.remaining
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
            .is_ok()
    }

    /// 取消所有待注入的故障
    pub fn reset(&self) {
        self.remaining.store(0, Ordering::SeqCst);
    }
}

impl Default for FaultSwitch {
    fn default() -> Self {
        Self::new()
    }
}
