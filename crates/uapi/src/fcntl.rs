//! 文件打开标志与 lseek 定位方式
//!
//! 数值与 Linux `include/uapi/asm-generic/fcntl.h` 保持一致。

bitflags::bitflags! {
    /// open(2) 标志
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct OpenFlags: u32 {
        const O_RDONLY    = 0o0;
        const O_WRONLY    = 0o1;
        const O_RDWR      = 0o2;
        const O_CREAT     = 0o100;
        const O_EXCL      = 0o200;
        const O_APPEND    = 0o2000;
        const O_DIRECTORY = 0o200000;
        const O_NOFOLLOW  = 0o400000;
    }
}

impl OpenFlags {
    /// 访问模式掩码（O_RDONLY / O_WRONLY / O_RDWR）
    pub const O_ACCMODE: u32 = 0o3;

    /// 是否以可读方式打开
    pub fn readable(&self) -> bool {
        let mode = self.bits() & Self::O_ACCMODE;
        mode == Self::O_RDONLY.bits() || mode == Self::O_RDWR.bits()
    }

    /// 是否以可写方式打开
    pub fn writable(&self) -> bool {
        let mode = self.bits() & Self::O_ACCMODE;
        mode == Self::O_WRONLY.bits() || mode == Self::O_RDWR.bits()
    }
}

/// lseek 的定位基准
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u32)]
pub enum SeekWhence {
    /// 从文件开头
    Set = 0,
    /// 从当前偏移
    Cur = 1,
    /// 从文件末尾
    End = 2,
}

impl TryFrom<u32> for SeekWhence {
    type Error = u32;

    fn try_from(value: u32) -> Result<Self, Self::Error> {
        match value {
            0 => Ok(SeekWhence::Set),
            1 => Ok(SeekWhence::Cur),
            2 => Ok(SeekWhence::End),
            other => Err(other),
        }
    }
}
