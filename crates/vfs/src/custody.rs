//! Custody：路径解析结果
//!
//! 一个 [`Custody`] 记录“在哪个父目录下、以什么名字”到达某个 inode，
//! 从而可以重建绝对路径并在挂载点边界上正确处理 `..`。
//! 子节点持有父节点的强引用，父节点从不引用子节点，因此不会形成环。

use alloc::string::String;
use alloc::sync::Arc;
use alloc::vec::Vec;
use core::fmt;

use crate::Inode;

/// 解析路径得到的 `(父 custody, 名字, inode)` 三元组
pub struct Custody {
    parent: Option<Arc<Custody>>,
    name: String,
    inode: Arc<Inode>,
}

impl Custody {
    /// 构造根 custody（没有父节点，名字为空）
    pub fn root(inode: Arc<Inode>) -> Arc<Self> {
        Arc::new(Self {
            parent: None,
            name: String::new(),
            inode,
        })
    }

    /// 构造 `parent` 下名为 `name` 的 custody
    pub fn new(parent: &Arc<Custody>, name: &str, inode: Arc<Inode>) -> Arc<Self> {
        Arc::new(Self {
            parent: Some(parent.clone()),
            name: String::from(name),
            inode,
        })
    }

    /// 父 custody，根返回 `None`
    pub fn parent(&self) -> Option<&Arc<Custody>> {
        self.parent.as_ref()
    }

    /// 在父目录中的名字
    pub fn name(&self) -> &str {
        &self.name
    }

    /// 指向的 inode
    pub fn inode(&self) -> &Arc<Inode> {
        &self.inode
    }

    /// 是否为根
    pub fn is_root(&self) -> bool {
        self.parent.is_none()
    }

    /// 绝对路径
    pub fn absolute_path(&self) -> String {
        let mut names: Vec<&str> = Vec::new();
        let mut current = self;
        while let Some(parent) = current.parent.as_deref() {
            names.push(&current.name);
            current = parent;
        }
        if names.is_empty() {
            return String::from("/");
        }
        let mut path = String::new();
        for name in names.iter().rev() {
            path.push('/');
            path.push_str(name);
        }
        path
    }
}

impl PartialEq for Custody {
    fn eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.inode, &other.inode)
            && self.name == other.name
            && match (&self.parent, &other.parent) {
                (None, None) => true,
                (Some(a), Some(b)) => Arc::ptr_eq(a, b) || **a == **b,
                _ => false,
            }
    }
}

impl Eq for Custody {}

impl fmt::Debug for Custody {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Custody({} -> {})", self.absolute_path(), self.inode.identifier())
    }
}
