//! 路径解析引擎
//!
//! 该模块实现了 VFS 的路径解析功能，负责将路径字符串转换为 [`Custody`]。
//!
//! 支持的典型语义：
//!
//! - 绝对路径以 `/` 开头，从根目录开始解析；相对路径从调用者给出的 base 开始解析
//! - `.` 表示当前目录，解析时跳过；`..` 表示父目录（根目录的父目录是自身）
//! - 进入挂载点时切换到被挂载文件系统的根；在被挂载的根上执行 `..` 回到宿主一侧
//! - 支持符号链接解析：默认跟随；[`ResolveOptions::NO_FOLLOW`] 不跟随最后一个组件
//!
//! 路径不做字面上的规范化：`a/link/..` 与 `a` 在 `link` 为符号链接时并不等价。

use alloc::string::String;
use alloc::sync::Arc;
use alloc::vec::Vec;

use crate::config::{MAX_NAME_LEN, MAX_PATH_LEN, MAX_SYMLINK_DEPTH};
use crate::{Custody, FsError, Inode, Vfs};

/// 路径组件
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PathComponent {
    /// 根目录 "/"
    Root,
    /// 当前目录 "."
    Current,
    /// 父目录 ".."
    Parent,
    /// 正常的文件名
    Normal(String),
}

/// 将路径字符串解析为组件列表
pub fn parse_path(path: &str) -> Vec<PathComponent> {
    let mut components = Vec::new();

    // 绝对路径以 Root 开始
    if path.starts_with('/') {
        components.push(PathComponent::Root);
    }

    for part in path.split('/').filter(|s| !s.is_empty()) {
        let component = match part {
            "." => PathComponent::Current,
            ".." => PathComponent::Parent,
            name => PathComponent::Normal(String::from(name)),
        };
        components.push(component);
    }

    components
}

/// 将路径分割为目录部分和最后一个组件
///
/// 末尾的斜杠被忽略；没有目录部分时目录为 `"."`；路径为 `/` 时最后一个组件为空串。
pub fn split_path(path: &str) -> Result<(&str, &str), FsError> {
    if path.is_empty() {
        return Err(FsError::NotFound);
    }
    let trimmed = path.trim_end_matches('/');
    if trimmed.is_empty() {
        return Ok(("/", ""));
    }
    match trimmed.rfind('/') {
        Some(pos) => {
            let dir = trimmed[..pos].trim_end_matches('/');
            let dir = if dir.is_empty() { "/" } else { dir };
            Ok((dir, &trimmed[pos + 1..]))
        }
        None => Ok((".", trimmed)),
    }
}

/// 检查单个目录项名字是否合法
pub fn validate_name(name: &str) -> Result<(), FsError> {
    if name.is_empty() || name == "." || name == ".." || name.contains('/') || name.contains('\0')
    {
        return Err(FsError::InvalidArgument);
    }
    if name.len() > MAX_NAME_LEN {
        return Err(FsError::NameTooLong);
    }
    Ok(())
}

/// 路径解析选项
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ResolveOptions {
    /// 最后一个组件是符号链接时是否跟随
    pub follow_last_symlink: bool,
}

impl ResolveOptions {
    /// 跟随最后一个符号链接
    pub const FOLLOW: Self = Self {
        follow_last_symlink: true,
    };
    /// 不跟随最后一个符号链接
    pub const NO_FOLLOW: Self = Self {
        follow_last_symlink: false,
    };
}

impl Default for ResolveOptions {
    fn default() -> Self {
        Self::FOLLOW
    }
}

/// 读取符号链接的目标
pub(crate) fn read_link_target(inode: &Inode) -> Result<String, FsError> {
    let bytes = inode.read_entire(None)?;
    String::from_utf8(bytes).map_err(|_| FsError::InvalidArgument)
}

impl Vfs {
    /// 将路径解析为 [`Custody`]
    ///
    /// 相对路径从 `base` 开始；`"/"` 总是返回系统根 custody。
    pub fn resolve_path(
        &self,
        path: &str,
        base: &Arc<Custody>,
        options: ResolveOptions,
    ) -> Result<Arc<Custody>, FsError> {
        self.resolve_path_at_depth(path, base, options, 0)
    }

    /// 解析路径的父目录，返回父目录 custody 与最后一个组件
    pub(crate) fn resolve_parent<'p>(
        &self,
        path: &'p str,
        base: &Arc<Custody>,
    ) -> Result<(Arc<Custody>, &'p str), FsError> {
        let (dir, name) = split_path(path)?;
        let parent = self.resolve_path(dir, base, ResolveOptions::FOLLOW)?;
        Ok((parent, name))
    }

    fn resolve_path_at_depth(
        &self,
        path: &str,
        base: &Arc<Custody>,
        options: ResolveOptions,
        symlink_depth: usize,
    ) -> Result<Arc<Custody>, FsError> {
        if path.is_empty() {
            return Err(FsError::NotFound);
        }
        if path.len() > MAX_PATH_LEN {
            return Err(FsError::NameTooLong);
        }

        let mut components = parse_path(path);
        let mut current = if components.first() == Some(&PathComponent::Root) {
            components.remove(0);
            self.root_custody()
        } else {
            base.clone()
        };

        let count = components.len();
        for (i, component) in components.into_iter().enumerate() {
            let is_last = i + 1 == count;
            match component {
                PathComponent::Root | PathComponent::Current => {}
                PathComponent::Parent => current = self.parent_custody(&current),
                PathComponent::Normal(name) => {
                    if name.len() > MAX_NAME_LEN {
                        return Err(FsError::NameTooLong);
                    }
                    let parent = current.inode();
                    if !parent.metadata()?.is_directory() {
                        return Err(FsError::NotDirectory);
                    }
                    let child_id = parent.lookup(&name)?;
                    let child = match self.mount_table.guest_root_for_host(child_id) {
                        Some(guest_root) => guest_root,
                        None => parent.fs().get_inode(child_id)?,
                    };

                    if child.is_symlink() && (!is_last || options.follow_last_symlink) {
                        if symlink_depth >= MAX_SYMLINK_DEPTH {
                            return Err(FsError::TooManySymlinks);
                        }
                        let target = read_link_target(&child)?;
                        drop(child);
                        current = self.resolve_path_at_depth(
                            &target,
                            &current,
                            ResolveOptions::FOLLOW,
                            symlink_depth + 1,
                        )?;
                        continue;
                    }
                    current = Custody::new(&current, &name, child);
                }
            }
        }

        Ok(current)
    }

    /// `..` 的目标
    ///
    /// 在被挂载文件系统的根上时离开该文件系统，回到挂载点的父目录。
    fn parent_custody(&self, current: &Arc<Custody>) -> Arc<Custody> {
        if let Some(host) = self.mount_table.host_custody_for_guest(current.inode().identifier()) {
            return host.parent().cloned().unwrap_or(host);
        }
        match current.parent() {
            Some(parent) => parent.clone(),
            None => current.clone(),
        }
    }
}
