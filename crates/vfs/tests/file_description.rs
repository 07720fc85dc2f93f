mod common;

use common::new_vfs;
use vfs::{FileMode, FsError, InodeType, OpenFlags, SeekWhence, Vfs};

fn file_mode() -> FileMode {
    FileMode::from_bits_truncate(0o644)
}

fn write_file(vfs: &Vfs, path: &str, data: &[u8]) {
    let root = vfs.root_custody();
    let description = vfs
        .open(path, OpenFlags::O_CREAT | OpenFlags::O_WRONLY, file_mode(), &root)
        .unwrap();
    assert_eq!(description.write(data).unwrap(), data.len());
}

#[test]
fn test_read_write_advance_offset() {
    let (vfs, _fs) = new_vfs();
    let root = vfs.root_custody();
    let description = vfs
        .open("/f", OpenFlags::O_CREAT | OpenFlags::O_RDWR, file_mode(), &root)
        .unwrap();
    assert_eq!(description.write(b"hello ").unwrap(), 6);
    assert_eq!(description.write(b"world").unwrap(), 5);
    assert_eq!(description.offset(), 11);
    assert_eq!(description.stat().unwrap().st_size, 11);

    assert_eq!(description.seek(0, SeekWhence::Set).unwrap(), 0);
    let mut buf = [0u8; 5];
    assert_eq!(description.read(&mut buf).unwrap(), 5);
    assert_eq!(&buf, b"hello");
    assert_eq!(description.offset(), 5);

    let mut rest = [0u8; 16];
    assert_eq!(description.read(&mut rest).unwrap(), 6);
    assert_eq!(&rest[..6], b" world");
    assert_eq!(description.read(&mut rest).unwrap(), 0);
}

#[test]
fn test_seek_variants() {
    let (vfs, _fs) = new_vfs();
    let root = vfs.root_custody();
    write_file(&vfs, "/s", b"0123456789");
    let description = vfs.open("/s", OpenFlags::O_RDONLY, file_mode(), &root).unwrap();

    assert_eq!(description.seek(4, SeekWhence::Set).unwrap(), 4);
    assert_eq!(description.seek(2, SeekWhence::Cur).unwrap(), 6);
    assert_eq!(description.seek(-3, SeekWhence::End).unwrap(), 7);
    assert_eq!(
        description.seek(-1, SeekWhence::Set).unwrap_err(),
        FsError::InvalidArgument
    );
    assert_eq!(description.offset(), 7);
    // 越过末尾是允许的
    assert_eq!(description.seek(100, SeekWhence::Set).unwrap(), 100);
}

#[test]
fn test_append_writes_at_end() {
    let (vfs, _fs) = new_vfs();
    let root = vfs.root_custody();
    write_file(&vfs, "/log", b"one\n");

    let description = vfs
        .open("/log", OpenFlags::O_WRONLY | OpenFlags::O_APPEND, file_mode(), &root)
        .unwrap();
    assert_eq!(description.offset(), 4);
    description.seek(0, SeekWhence::Set).unwrap();
    description.write(b"two\n").unwrap();

    let reader = vfs.open("/log", OpenFlags::O_RDONLY, file_mode(), &root).unwrap();
    assert_eq!(reader.read_entire().unwrap(), b"one\ntwo\n");
}

#[test]
fn test_access_mode_enforced() {
    let (vfs, _fs) = new_vfs();
    let root = vfs.root_custody();
    write_file(&vfs, "/m", b"x");

    let read_only = vfs.open("/m", OpenFlags::O_RDONLY, file_mode(), &root).unwrap();
    assert!(read_only.is_readable());
    assert!(!read_only.is_writable());
    assert_eq!(read_only.write(b"y").unwrap_err(), FsError::BadFileDescriptor);

    let write_only = vfs.open("/m", OpenFlags::O_WRONLY, file_mode(), &root).unwrap();
    let mut buf = [0u8; 1];
    assert_eq!(write_only.read(&mut buf).unwrap_err(), FsError::BadFileDescriptor);
    assert_eq!(write_only.read_entire().unwrap_err(), FsError::BadFileDescriptor);
}

#[test]
fn test_read_entire_spans_chunks() {
    let (vfs, _fs) = new_vfs();
    let root = vfs.root_custody();
    let data: Vec<u8> = (0..10_000u32).map(|i| (i % 251) as u8).collect();
    write_file(&vfs, "/big", &data);
    let description = vfs.open("/big", OpenFlags::O_RDONLY, file_mode(), &root).unwrap();
    assert_eq!(description.read_entire().unwrap(), data);
    assert_eq!(description.offset(), 0);
}

#[test]
fn test_get_dir_entries_serialization() {
    let (vfs, _fs) = new_vfs();
    let root = vfs.root_custody();
    vfs.mkdir("/d", FileMode::from_bits_truncate(0o755), &root).unwrap();
    write_file(&vfs, "/d/ab", b"");

    let dir = vfs
        .open("/d", OpenFlags::O_RDONLY | OpenFlags::O_DIRECTORY, file_mode(), &root)
        .unwrap();
    assert_eq!(dir.absolute_path(), "/d");
    let mut buf = [0u8; 256];
    let n = dir.get_dir_entries(&mut buf).unwrap();

    let mut names = Vec::new();
    let mut pos = 0;
    while pos < n {
        let _index = u32::from_le_bytes(buf[pos..pos + 4].try_into().unwrap());
        let file_type = buf[pos + 4];
        let len = u32::from_le_bytes(buf[pos + 5..pos + 9].try_into().unwrap()) as usize;
        let name = std::str::from_utf8(&buf[pos + 9..pos + 9 + len]).unwrap().to_string();
        names.push((name, file_type));
        pos += 9 + len;
    }
    assert_eq!(pos, n);
    assert_eq!(
        names,
        vec![
            (".".to_string(), InodeType::Directory.to_d_type()),
            ("..".to_string(), InodeType::Directory.to_d_type()),
            ("ab".to_string(), InodeType::File.to_d_type()),
        ]
    );

    let mut small = [0u8; 8];
    assert_eq!(dir.get_dir_entries(&mut small).unwrap_err(), FsError::InvalidArgument);
}

#[test]
fn test_get_dir_entries_on_file() {
    let (vfs, _fs) = new_vfs();
    let root = vfs.root_custody();
    write_file(&vfs, "/plain", b"x");
    let description = vfs.open("/plain", OpenFlags::O_RDONLY, file_mode(), &root).unwrap();
    let mut buf = [0u8; 64];
    assert_eq!(description.get_dir_entries(&mut buf).unwrap_err(), FsError::NotDirectory);
}

#[test]
fn test_reading_directory_fails() {
    let (vfs, _fs) = new_vfs();
    let root = vfs.root_custody();
    let dir = vfs.open("/", OpenFlags::O_RDONLY, file_mode(), &root).unwrap();
    let mut buf = [0u8; 8];
    assert_eq!(dir.read(&mut buf).unwrap_err(), FsError::IsDirectory);
}
