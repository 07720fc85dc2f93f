#![allow(dead_code)]

pub mod fs;

use std::sync::Arc;

use test_support::mock::clock::MOCK_CLOCK;
use vfs::{FileSystem, TimeSpec, Vfs, VfsOps, register_vfs_ops};

pub use fs::{ROOT_INDEX, TestFs};

struct TestOps;

impl VfsOps for TestOps {
    fn timespec_now(&self) -> TimeSpec {
        MOCK_CLOCK.now()
    }
}

static TEST_OPS: TestOps = TestOps;

/// 注册运行时操作（多次调用无副作用）
pub fn setup() {
    register_vfs_ops(&TEST_OPS);
}

/// 以一个新的 [`TestFs`] 为根构造 VFS
pub fn new_vfs() -> (Vfs, Arc<TestFs>) {
    setup();
    let root_fs = TestFs::new();
    let vfs = Vfs::new(root_fs.clone() as Arc<dyn FileSystem>).unwrap();
    (vfs, root_fs)
}
