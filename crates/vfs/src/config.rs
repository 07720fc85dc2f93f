//! VFS 编译期配置

/// 路径解析时允许展开的符号链接最大嵌套深度
pub const MAX_SYMLINK_DEPTH: usize = 8;

/// 单个路径分量的最大字节数
pub const MAX_NAME_LEN: usize = 255;

/// 完整路径的最大字节数
pub const MAX_PATH_LEN: usize = 4096;

/// [`read_entire`](crate::Inode::read_entire) 每次向后端请求的字节数
pub const READ_CHUNK_SIZE: usize = 4096;

/// 单个文件的最大字节数
pub const MAX_FILE_SIZE: u64 = i64::MAX as u64;
