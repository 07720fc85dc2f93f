mod common;

use std::any::Any;
use std::sync::Arc;
use std::thread;

use common::new_vfs;
use vfs::{
    FileMode, FsError, IterationDecision, OpenFlags, ResolveOptions, TimeSpec,
};

fn dir_mode() -> FileMode {
    FileMode::from_bits_truncate(0o755)
}

fn file_mode() -> FileMode {
    FileMode::from_bits_truncate(0o644)
}

const CREATE_RW: OpenFlags = OpenFlags::O_CREAT.union(OpenFlags::O_RDWR);

#[test]
fn test_open_create_and_exclusive() {
    let (vfs, _fs) = new_vfs();
    let root = vfs.root_custody();
    assert_eq!(
        vfs.open("/new", OpenFlags::O_RDONLY, file_mode(), &root).unwrap_err(),
        FsError::NotFound
    );

    let created = vfs.open("/new", CREATE_RW, file_mode(), &root).unwrap();
    assert_eq!(created.absolute_path(), "/new");
    let again = vfs.open("/new", CREATE_RW, file_mode(), &root).unwrap();
    assert!(Arc::ptr_eq(created.inode(), again.inode()));

    assert_eq!(
        vfs.open("/new", CREATE_RW | OpenFlags::O_EXCL, file_mode(), &root).unwrap_err(),
        FsError::AlreadyExists
    );
    assert_eq!(
        vfs.open("/missing/new", CREATE_RW, file_mode(), &root).unwrap_err(),
        FsError::NotFound
    );
}

#[test]
fn test_open_type_checks() {
    let (vfs, _fs) = new_vfs();
    let root = vfs.root_custody();
    vfs.open("/file", CREATE_RW, file_mode(), &root).unwrap();
    vfs.mkdir("/dir", dir_mode(), &root).unwrap();
    vfs.symlink("/file", "/link", &root).unwrap();

    assert_eq!(
        vfs.open("/file", OpenFlags::O_RDONLY | OpenFlags::O_DIRECTORY, file_mode(), &root)
            .unwrap_err(),
        FsError::NotDirectory
    );
    assert_eq!(
        vfs.open("/dir", OpenFlags::O_WRONLY, file_mode(), &root).unwrap_err(),
        FsError::IsDirectory
    );
    assert_eq!(
        vfs.open("/link", OpenFlags::O_RDONLY | OpenFlags::O_NOFOLLOW, file_mode(), &root)
            .unwrap_err(),
        FsError::TooManySymlinks
    );
    let through_link = vfs.open("/link", OpenFlags::O_RDONLY, file_mode(), &root).unwrap();
    assert_eq!(through_link.absolute_path(), "/file");
}

#[test]
fn test_mkdir_and_rmdir_link_counts() {
    let (vfs, _fs) = new_vfs();
    let root = vfs.root_custody();
    let root_links = root.inode().link_count().unwrap();

    vfs.mkdir("/a", dir_mode(), &root).unwrap();
    let a = vfs.resolve_path("/a", &root, ResolveOptions::FOLLOW).unwrap();
    assert_eq!(a.inode().link_count().unwrap(), 2);
    assert_eq!(root.inode().link_count().unwrap(), root_links + 1);
    assert_eq!(a.inode().directory_entry_count().unwrap(), 2);

    assert_eq!(vfs.mkdir("/a", dir_mode(), &root).unwrap_err(), FsError::AlreadyExists);
    assert_eq!(vfs.mkdir("/", dir_mode(), &root).unwrap_err(), FsError::AlreadyExists);

    vfs.open("/a/f", CREATE_RW, file_mode(), &root).unwrap();
    assert_eq!(vfs.rmdir("/a", &root).unwrap_err(), FsError::DirectoryNotEmpty);
    assert_eq!(vfs.rmdir("/a/f", &root).unwrap_err(), FsError::NotDirectory);
    assert_eq!(vfs.unlink("/a", &root).unwrap_err(), FsError::IsDirectory);

    vfs.unlink("/a/f", &root).unwrap();
    vfs.rmdir("/a", &root).unwrap();
    assert_eq!(a.inode().link_count().unwrap(), 0);
    assert_eq!(root.inode().link_count().unwrap(), root_links);
    assert_eq!(
        vfs.resolve_path("/a", &root, ResolveOptions::FOLLOW).unwrap_err(),
        FsError::NotFound
    );
}

#[test]
fn test_removed_directory_rejects_new_entries() {
    let (vfs, _fs) = new_vfs();
    let root = vfs.root_custody();
    vfs.mkdir("/d", dir_mode(), &root).unwrap();
    let d = vfs.resolve_path("/d", &root, ResolveOptions::FOLLOW).unwrap();

    vfs.rmdir("/d", &root).unwrap();
    assert_eq!(
        vfs.open("f", CREATE_RW, file_mode(), &d).unwrap_err(),
        FsError::NotFound
    );
    assert_eq!(vfs.mkdir("sub", dir_mode(), &d).unwrap_err(), FsError::NotFound);
    assert_eq!(d.inode().directory_entry_count().unwrap(), 2);
    assert_eq!(d.inode().link_count().unwrap(), 0);
}

#[test]
fn test_rmdir_races_with_create_inside() {
    let (vfs, _fs) = new_vfs();
    let root = vfs.root_custody();
    for i in 0..64 {
        let dir = format!("/d{i}");
        let file = format!("{dir}/x");
        vfs.mkdir(&dir, dir_mode(), &root).unwrap();
        let held = vfs.resolve_path(&dir, &root, ResolveOptions::FOLLOW).unwrap();

        let (removed, created) = thread::scope(|scope| {
            let remover = scope.spawn(|| vfs.rmdir(&dir, &root));
            let creator = scope.spawn(|| vfs.open(&file, CREATE_RW, file_mode(), &root));
            (remover.join().unwrap(), creator.join().unwrap())
        });

        // 两者恰好一个成功：要么删掉空目录，要么目录里多了 x
        match removed {
            Ok(()) => {
                assert_eq!(created.unwrap_err(), FsError::NotFound);
                assert_eq!(held.inode().directory_entry_count().unwrap(), 2);
            }
            Err(err) => {
                assert_eq!(err, FsError::DirectoryNotEmpty);
                assert!(created.is_ok());
                assert!(held.inode().lookup("x").is_ok());
            }
        }
    }
}

#[test]
fn test_remove_child_if_checks_binding() {
    let (vfs, _fs) = new_vfs();
    let root = vfs.root_custody();
    let x = vfs.open("/x", CREATE_RW, file_mode(), &root).unwrap();
    let y = vfs.open("/y", CREATE_RW, file_mode(), &root).unwrap();

    assert_eq!(
        root.inode()
            .remove_child_if("x", y.inode().identifier())
            .unwrap_err(),
        FsError::NotFound
    );
    assert_eq!(root.inode().lookup("x").unwrap(), x.inode().identifier());

    root.inode()
        .remove_child_if("x", x.inode().identifier())
        .unwrap();
    assert_eq!(root.inode().lookup("x").unwrap_err(), FsError::NotFound);
}

#[test]
fn test_hard_link() {
    let (vfs, _fs) = new_vfs();
    let root = vfs.root_custody();
    let original = vfs.open("/orig", CREATE_RW, file_mode(), &root).unwrap();
    original.write(b"shared").unwrap();

    vfs.link("/orig", "/alias", &root).unwrap();
    assert_eq!(original.inode().link_count().unwrap(), 2);
    let alias = vfs.open("/alias", OpenFlags::O_RDONLY, file_mode(), &root).unwrap();
    assert!(Arc::ptr_eq(original.inode(), alias.inode()));
    assert_eq!(
        vfs.link("/orig", "/alias", &root).unwrap_err(),
        FsError::AlreadyExists
    );

    vfs.mkdir("/dir", dir_mode(), &root).unwrap();
    assert_eq!(vfs.link("/dir", "/dir2", &root).unwrap_err(), FsError::IsDirectory);

    vfs.unlink("/orig", &root).unwrap();
    assert_eq!(alias.inode().link_count().unwrap(), 1);
    assert_eq!(alias.read_entire().unwrap(), b"shared");
    assert_eq!(
        root.inode().reverse_lookup(alias.inode().identifier()).unwrap(),
        "alias"
    );
}

#[test]
fn test_stat_and_lstat() {
    let (vfs, _fs) = new_vfs();
    let root = vfs.root_custody();
    let description = vfs.open("/f", CREATE_RW, file_mode(), &root).unwrap();
    description.write(b"abc").unwrap();
    vfs.symlink("f", "/l", &root).unwrap();

    let stat = vfs.stat("/l", &root, ResolveOptions::FOLLOW).unwrap();
    assert_eq!(stat.st_dev, description.inode().fsid() as u64);
    assert_eq!(stat.st_ino, description.inode().index());
    assert_eq!(stat.st_size, 3);
    assert_eq!(stat.st_mode & FileMode::S_IFMT.bits(), FileMode::S_IFREG.bits());
    assert_eq!(stat.st_nlink, 1);

    let lstat = vfs.stat("/l", &root, ResolveOptions::NO_FOLLOW).unwrap();
    assert_eq!(lstat.st_mode & FileMode::S_IFMT.bits(), FileMode::S_IFLNK.bits());
    assert_eq!(lstat.st_size, 1);
    assert_eq!(vfs.readlink("/l", &root).unwrap(), "f");
    assert_eq!(vfs.readlink("/f", &root).unwrap_err(), FsError::InvalidArgument);
}

#[test]
fn test_utime_and_chmod() {
    let (vfs, _fs) = new_vfs();
    let root = vfs.root_custody();
    let description = vfs.open("/t", CREATE_RW, file_mode(), &root).unwrap();

    vfs.utime("/t", TimeSpec::from_secs(100), TimeSpec::from_secs(200), &root)
        .unwrap();
    let metadata = description.inode().metadata().unwrap();
    assert_eq!(metadata.atime, TimeSpec::from_secs(100));
    assert_eq!(metadata.mtime, TimeSpec::from_secs(200));
    assert!(description.inode().is_metadata_dirty());
    assert_eq!(
        vfs.utime("/t", TimeSpec::new(0, -1), TimeSpec::zero(), &root).unwrap_err(),
        FsError::InvalidArgument
    );

    vfs.chmod("/t", FileMode::from_bits_truncate(0o4700), &root).unwrap();
    let mode = description.inode().metadata().unwrap().mode;
    assert!(mode.contains(FileMode::S_IFREG));
    assert_eq!(mode.permission_bits().bits(), 0o4700);
}

#[test]
fn test_write_past_end_grows_size() {
    let (vfs, _fs) = new_vfs();
    let root = vfs.root_custody();
    let description = vfs.open("/sparse", CREATE_RW, file_mode(), &root).unwrap();
    let inode = description.inode();
    let before = inode.metadata().unwrap().mtime;

    assert_eq!(inode.write_bytes(10, b"xy", None).unwrap(), 2);
    let metadata = inode.metadata().unwrap();
    assert_eq!(metadata.size, 12);
    assert!(metadata.mtime > before);
    assert!(inode.is_metadata_dirty());

    // 在末尾之内写入不改变大小
    inode.write_bytes(0, b"a", None).unwrap();
    assert_eq!(inode.size().unwrap(), 12);
}

#[test]
fn test_traverse_directory_and_early_break() {
    let (vfs, _fs) = new_vfs();
    let root = vfs.root_custody();
    vfs.mkdir("/d", dir_mode(), &root).unwrap();
    for name in ["x", "y", "z"] {
        vfs.open(&format!("/d/{}", name), CREATE_RW, file_mode(), &root).unwrap();
    }

    let mut names = Vec::new();
    vfs.traverse_directory("/d", &root, &mut |entry| {
        names.push(entry.name().to_string());
        IterationDecision::Continue
    })
    .unwrap();
    assert_eq!(names, vec![".", "..", "x", "y", "z"]);

    let d = vfs.resolve_path("/d", &root, ResolveOptions::FOLLOW).unwrap();
    let mut seen = 0;
    d.inode()
        .traverse_as_directory(&mut |entry| {
            seen += 1;
            if entry.name() == ".." {
                assert_eq!(entry.inode(), root.inode().identifier());
                IterationDecision::Break
            } else {
                IterationDecision::Continue
            }
        })
        .unwrap();
    assert_eq!(seen, 2);

    // 根目录的 ".." 指向自身
    assert_eq!(root.inode().lookup("..").unwrap(), root.inode().identifier());
    assert_eq!(
        vfs.traverse_directory("/d/x", &root, &mut |_| IterationDecision::Continue)
            .unwrap_err(),
        FsError::NotDirectory
    );
}

#[test]
fn test_directory_changes_during_traversal() {
    let (vfs, _fs) = new_vfs();
    let root = vfs.root_custody();
    vfs.mkdir("/d", dir_mode(), &root).unwrap();
    vfs.open("/d/old", CREATE_RW, file_mode(), &root).unwrap();

    let mut names = Vec::new();
    vfs.traverse_directory("/d", &root, &mut |entry| {
        if entry.name() == "." {
            vfs.mkdir("/d/new", dir_mode(), &root).unwrap();
            vfs.unlink("/d/old", &root).unwrap();
        }
        names.push(entry.name().to_string());
        IterationDecision::Continue
    })
    .unwrap();

    // 回调看到的是遍历开始时的快照
    assert_eq!(names, vec![".", "..", "old"]);
    let d = vfs.resolve_path("/d", &root, ResolveOptions::FOLLOW).unwrap();
    assert!(d.inode().lookup("new").is_ok());
    assert_eq!(d.inode().lookup("old").unwrap_err(), FsError::NotFound);
}

#[test]
fn test_open_create_through_dangling_symlink() {
    let (vfs, _fs) = new_vfs();
    let root = vfs.root_custody();
    vfs.symlink("/target", "/dangling", &root).unwrap();

    assert_eq!(
        vfs.open("/dangling", CREATE_RW, file_mode(), &root).unwrap_err(),
        FsError::NotFound
    );
    assert_eq!(
        vfs.open("/dangling", CREATE_RW | OpenFlags::O_EXCL, file_mode(), &root)
            .unwrap_err(),
        FsError::AlreadyExists
    );
    assert_eq!(
        vfs.resolve_path("/target", &root, ResolveOptions::FOLLOW).unwrap_err(),
        FsError::NotFound
    );
}

#[test]
fn test_vmobject_is_weak() {
    let (vfs, _fs) = new_vfs();
    let root = vfs.root_custody();
    let inode = root.inode();
    assert!(inode.vmobject().is_none());

    let object: Arc<dyn Any + Send + Sync> = Arc::new(7u32);
    inode.set_vmobject(&object);
    let found = inode.vmobject().unwrap();
    assert_eq!(found.downcast_ref::<u32>(), Some(&7));
    drop(found);
    drop(object);
    assert!(inode.vmobject().is_none());
}
