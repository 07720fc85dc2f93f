//! /proc/mounts 生成器

use alloc::format;
use alloc::string::String;
use alloc::vec::Vec;

use vfs::{FsError, MountFlags, Vfs};

use super::inode::ContentGenerator;

/// `/proc/mounts` 内容生成器。
pub struct MountsGenerator {
    vfs: &'static Vfs,
}

impl MountsGenerator {
    /// 为给定 VFS 创建生成器
    pub fn new(vfs: &'static Vfs) -> Self {
        Self { vfs }
    }
}

impl ContentGenerator for MountsGenerator {
    fn generate(&self) -> Result<Vec<u8>, FsError> {
        let mut content = String::new();

        for mount in self.vfs.mounts() {
            let access = if mount.flags.contains(MountFlags::READ_ONLY) {
                "ro"
            } else {
                "rw"
            };
            let line = format!(
                "{} {} {} {},relatime 0 0\n",
                mount.class_name, mount.mount_path, mount.class_name, access
            );
            content.push_str(&line);
        }

        Ok(content.into_bytes())
    }
}
