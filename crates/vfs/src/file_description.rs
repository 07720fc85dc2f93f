//! 打开文件描述
//!
//! [`FileDescription`] 是一次 `open` 的会话状态：custody、打开标志和当前偏移量。
//! 多个文件描述符可以共享同一个描述（`Arc<FileDescription>`），从而共享偏移量。
//!
//! 与 [`Inode`] 的区别：
//!
//! - `FileDescription` 是“有状态”的，实现 `read/write/lseek` 语义；
//! - `Inode` 是按显式偏移量随机访问的存储接口，可被多个描述共享。

use alloc::string::String;
use alloc::sync::Arc;
use alloc::vec::Vec;
use sync::SpinLock;
use uapi::fcntl::{OpenFlags, SeekWhence};
use uapi::fs::Stat;

use crate::{Custody, FsError, Inode, IterationDecision};

/// 打开文件描述
#[derive(Debug)]
pub struct FileDescription {
    custody: Arc<Custody>,
    flags: OpenFlags,
    offset: SpinLock<u64>,
    generator_cache: SpinLock<Option<Arc<[u8]>>>,
}

impl FileDescription {
    /// 为已解析的 custody 创建描述
    ///
    /// 带 `O_APPEND` 时初始偏移量为文件末尾。
    pub fn new(custody: Arc<Custody>, flags: OpenFlags) -> Result<Arc<Self>, FsError> {
        let offset = if flags.contains(OpenFlags::O_APPEND) {
            custody.inode().size()?
        } else {
            0
        };
        Ok(Arc::new(Self {
            custody,
            flags,
            offset: SpinLock::new(offset),
            generator_cache: SpinLock::new(None),
        }))
    }

    /// 打开时解析得到的 custody
    pub fn custody(&self) -> &Arc<Custody> {
        &self.custody
    }

    /// 关联的 inode
    pub fn inode(&self) -> &Arc<Inode> {
        self.custody.inode()
    }

    /// 打开标志
    pub fn flags(&self) -> OpenFlags {
        self.flags
    }

    /// 检查文件是否可读
    pub fn is_readable(&self) -> bool {
        self.flags.readable()
    }

    /// 检查文件是否可写
    pub fn is_writable(&self) -> bool {
        self.flags.writable()
    }

    /// 是否为目录
    pub fn is_directory(&self) -> bool {
        self.inode().is_directory()
    }

    /// 当前偏移量
    pub fn offset(&self) -> u64 {
        *self.offset.lock()
    }

    /// 打开时的绝对路径
    pub fn absolute_path(&self) -> String {
        self.custody.absolute_path()
    }

    /// 从当前偏移量读取，并前移偏移量
    ///
    /// 同一描述上的并发读写不互相串行化，偏移量以最后完成者为准。
    pub fn read(&self, buf: &mut [u8]) -> Result<usize, FsError> {
        if !self.is_readable() {
            return Err(FsError::BadFileDescriptor);
        }
        let start = self.offset();
        let n = self.inode().read_bytes(start, buf, Some(self))?;
        *self.offset.lock() = start + n as u64;
        Ok(n)
    }

    /// 在当前偏移量写入（`O_APPEND` 时在末尾写入），并前移偏移量
    pub fn write(&self, buf: &[u8]) -> Result<usize, FsError> {
        if !self.is_writable() {
            return Err(FsError::BadFileDescriptor);
        }
        let start = if self.flags.contains(OpenFlags::O_APPEND) {
            self.inode().size()?
        } else {
            self.offset()
        };
        let n = self.inode().write_bytes(start, buf, Some(self))?;
        *self.offset.lock() = start + n as u64;
        Ok(n)
    }

    /// 设置偏移量，返回新偏移量
    pub fn seek(&self, offset: i64, whence: SeekWhence) -> Result<u64, FsError> {
        let base = match whence {
            SeekWhence::Set => 0,
            SeekWhence::Cur => self.offset() as i64,
            SeekWhence::End => self.inode().size()? as i64,
        };
        let new_offset = base.checked_add(offset).ok_or(FsError::InvalidArgument)?;
        if new_offset < 0 {
            return Err(FsError::InvalidArgument);
        }
        *self.offset.lock() = new_offset as u64;
        Ok(new_offset as u64)
    }

    /// 获取文件状态
    pub fn stat(&self) -> Result<Stat, FsError> {
        Ok(self.inode().metadata()?.to_stat())
    }

    /// 读取全部内容，不影响偏移量
    pub fn read_entire(&self) -> Result<Vec<u8>, FsError> {
        if !self.is_readable() {
            return Err(FsError::BadFileDescriptor);
        }
        self.inode().read_entire(Some(self))
    }

    /// 把目录项序列化到 `buf`，返回写入的字节数
    ///
    /// 每个目录项的格式：u32 LE inode 编号、u8 类型、u32 LE 名字长度、名字字节。
    /// `buf` 放不下全部目录项时返回 `InvalidArgument`。
    pub fn get_dir_entries(&self, buf: &mut [u8]) -> Result<usize, FsError> {
        if !self.is_directory() {
            return Err(FsError::NotDirectory);
        }
        let mut serialized = Vec::new();
        self.inode().traverse_as_directory(&mut |entry| {
            serialized.extend_from_slice(&(entry.inode().index() as u32).to_le_bytes());
            serialized.push(entry.file_type());
            serialized.extend_from_slice(&(entry.name_bytes().len() as u32).to_le_bytes());
            serialized.extend_from_slice(entry.name_bytes());
            IterationDecision::Continue
        })?;
        if buf.len() < serialized.len() {
            return Err(FsError::InvalidArgument);
        }
        buf[..serialized.len()].copy_from_slice(&serialized);
        Ok(serialized.len())
    }

    /// 按描述缓存动态生成的内容
    ///
    /// 同一描述上的多次读取看到同一份快照；`generate` 在不持锁的情况下执行。
    pub fn generated_content<G>(&self, generate: G) -> Result<Arc<[u8]>, FsError>
    where
        G: FnOnce() -> Result<Vec<u8>, FsError>,
    {
        if let Some(cached) = self.generator_cache.lock().as_ref() {
            return Ok(cached.clone());
        }
        let fresh: Arc<[u8]> = Arc::from(generate()?);
        let mut cache = self.generator_cache.lock();
        Ok(cache.get_or_insert(fresh).clone())
    }

    /// 丢弃缓存的生成内容，下次读取重新生成
    pub fn clear_generated_content(&self) {
        *self.generator_cache.lock() = None;
    }
}
