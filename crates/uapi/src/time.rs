//! 时间相关结构体

/// 对应 Linux 的 `struct timespec`
#[repr(C)]
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct TimeSpec {
    /// 秒
    pub tv_sec: i64,
    /// 纳秒
    pub tv_nsec: i64,
}

impl TimeSpec {
    pub const NSEC_PER_SEC: i64 = 1_000_000_000;

    /// 创建一个新的时间值
    pub const fn new(tv_sec: i64, tv_nsec: i64) -> Self {
        Self { tv_sec, tv_nsec }
    }

    /// 零时刻（Unix 纪元）
    pub const fn zero() -> Self {
        Self::new(0, 0)
    }

    /// 从秒数构造
    pub const fn from_secs(secs: i64) -> Self {
        Self::new(secs, 0)
    }

    /// 纳秒部分是否处于合法范围
    pub fn is_valid(&self) -> bool {
        self.tv_nsec >= 0 && self.tv_nsec < Self::NSEC_PER_SEC
    }
}
