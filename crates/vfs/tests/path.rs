use vfs::{FsError, PathComponent, parse_path, split_path, validate_name};

#[test]
fn test_parse_path_components() {
    let components = parse_path("/foo/bar");
    assert_eq!(components.len(), 3);
    assert_eq!(components[0], PathComponent::Root);
    assert_eq!(components[1], PathComponent::Normal("foo".to_string()));
    assert_eq!(components[2], PathComponent::Normal("bar".to_string()));

    let components = parse_path("foo/./bar/../baz");
    assert_eq!(components.len(), 5);
    assert_eq!(components[0], PathComponent::Normal("foo".to_string()));
    assert_eq!(components[1], PathComponent::Current);
    assert_eq!(components[2], PathComponent::Normal("bar".to_string()));
    assert_eq!(components[3], PathComponent::Parent);
    assert_eq!(components[4], PathComponent::Normal("baz".to_string()));
}

#[test]
fn test_parse_path_collapses_slashes() {
    assert_eq!(
        parse_path("///foo///bar///"),
        vec![
            PathComponent::Root,
            PathComponent::Normal("foo".to_string()),
            PathComponent::Normal("bar".to_string()),
        ]
    );
    assert_eq!(parse_path("/"), vec![PathComponent::Root]);
    assert!(parse_path("").is_empty());
}

#[test]
fn test_split_path_absolute() {
    assert_eq!(split_path("/foo/bar.txt").unwrap(), ("/foo", "bar.txt"));
    assert_eq!(split_path("/hello").unwrap(), ("/", "hello"));
}

#[test]
fn test_split_path_relative() {
    assert_eq!(split_path("foo/bar.txt").unwrap(), ("foo", "bar.txt"));
    assert_eq!(split_path("hello.txt").unwrap(), (".", "hello.txt"));
}

#[test]
fn test_split_path_trailing_slash() {
    assert_eq!(split_path("/foo/bar/").unwrap(), ("/foo", "bar"));
    assert_eq!(split_path("/").unwrap(), ("/", ""));
}

#[test]
fn test_split_path_multiple_slashes() {
    assert_eq!(split_path("///foo///bar.txt").unwrap(), ("///foo", "bar.txt"));
}

#[test]
fn test_split_path_keeps_dot_dot() {
    // 不做字面规范化，".." 交给解析器处理
    assert_eq!(split_path("/foo/../bar").unwrap(), ("/foo/..", "bar"));
    assert_eq!(split_path("a/..").unwrap(), ("a", ".."));
}

#[test]
fn test_split_path_empty() {
    assert_eq!(split_path(""), Err(FsError::NotFound));
}

#[test]
fn test_validate_name() {
    assert!(validate_name("file.txt").is_ok());
    assert_eq!(validate_name(""), Err(FsError::InvalidArgument));
    assert_eq!(validate_name("."), Err(FsError::InvalidArgument));
    assert_eq!(validate_name(".."), Err(FsError::InvalidArgument));
    assert_eq!(validate_name("a/b"), Err(FsError::InvalidArgument));
    assert_eq!(validate_name(&"x".repeat(255)), Ok(()));
    assert_eq!(validate_name(&"x".repeat(256)), Err(FsError::NameTooLong));
}
