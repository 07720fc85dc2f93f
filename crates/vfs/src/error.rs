//! VFS 错误类型
//!
//! 定义了与 POSIX 兼容的文件系统错误码，可通过 [`FsError::to_errno()`] 转换为系统调用错误码。

use thiserror::Error;

/// VFS 错误类型
///
/// 各错误码对应标准 POSIX errno 值。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum FsError {
    // 文件/目录相关
    /// 文件不存在 (-ENOENT)
    #[error("no such file or directory")]
    NotFound,
    /// 文件已存在 (-EEXIST)
    #[error("file exists")]
    AlreadyExists,
    /// 不是目录 (-ENOTDIR)
    #[error("not a directory")]
    NotDirectory,
    /// 是目录 (-EISDIR)
    #[error("is a directory")]
    IsDirectory,
    /// 目录非空 (-ENOTEMPTY)
    #[error("directory not empty")]
    DirectoryNotEmpty,
    /// 符号链接层级过多 (-ELOOP)
    #[error("too many levels of symbolic links")]
    TooManySymlinks,

    // 文件描述符相关
    /// 无效的文件描述符 (-EBADF)
    #[error("bad file descriptor")]
    BadFileDescriptor,

    // 参数相关
    /// 无效参数 (-EINVAL)
    #[error("invalid argument")]
    InvalidArgument,
    /// 文件名过长 (-ENAMETOOLONG)
    #[error("file name too long")]
    NameTooLong,

    // 文件系统相关
    /// 只读文件系统 (-EROFS)
    #[error("read-only file system")]
    ReadOnlyFs,
    /// 设备空间不足 (-ENOSPC)
    #[error("no space left on device")]
    NoSpace,
    /// I/O 错误 (-EIO)
    #[error("input/output error")]
    IoError,
    /// 资源忙 (-EBUSY)
    #[error("device or resource busy")]
    Busy,
    /// 挂载点已被占用 (-EBUSY)
    #[error("mount point already in use")]
    AlreadyMounted,
    /// 跨文件系统链接 (-EXDEV)
    #[error("invalid cross-device link")]
    CrossDevice,

    // 其他
    /// 操作不支持 (-ENOTSUP)
    #[error("operation not supported")]
    NotSupported,
}

impl FsError {
    /// 转换为系统调用错误码（负数）
    pub fn to_errno(&self) -> isize {
        match self {
            FsError::NotFound => -2,
            FsError::IoError => -5,
            FsError::BadFileDescriptor => -9,
            FsError::Busy | FsError::AlreadyMounted => -16,
            FsError::AlreadyExists => -17,
            FsError::CrossDevice => -18,
            FsError::NotDirectory => -20,
            FsError::IsDirectory => -21,
            FsError::InvalidArgument => -22,
            FsError::NoSpace => -28,
            FsError::ReadOnlyFs => -30,
            FsError::NameTooLong => -36,
            FsError::DirectoryNotEmpty => -39,
            FsError::TooManySymlinks => -40,
            FsError::NotSupported => -95,
        }
    }
}
