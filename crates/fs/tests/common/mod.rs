#![allow(dead_code)]

use std::sync::Arc;

use fs::TmpFs;
use test_support::mock::clock::MOCK_CLOCK;
use vfs::{FileSystem, TimeSpec, Vfs, VfsOps, register_vfs_ops};

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

/// 以容量不限的 tmpfs 为根构造 VFS
pub fn tmpfs_vfs() -> (Vfs, Arc<TmpFs>) {
    tmpfs_vfs_with_limits(0, 0)
}

/// 以给定容量的 tmpfs 为根构造 VFS
pub fn tmpfs_vfs_with_limits(max_bytes: usize, max_inodes: usize) -> (Vfs, Arc<TmpFs>) {
    setup();
    let tmpfs = TmpFs::new(max_bytes, max_inodes);
    let vfs = Vfs::new(tmpfs.clone() as Arc<dyn FileSystem>).unwrap();
    (vfs, tmpfs)
}
