//! Helpers shared by the FTP and SFTP backends.
//!
//! These are pure string functions, compiled regardless of transport
//! features.

use crate::{Access, AccessModes, StorePath};

/// Compose the remote path of `path` under `root`.
///
/// An empty root means the session's working directory.
///
/// ```rust
/// use anystore::StorePath;
/// use anystore::backend::remote::remote_path;
///
/// let p = StorePath::parse("a/b.txt").unwrap();
/// assert_eq!(remote_path("/srv/", &p), "/srv/a/b.txt");
/// assert_eq!(remote_path("/", &p), "/a/b.txt");
/// assert_eq!(remote_path("", &p), "a/b.txt");
/// assert_eq!(remote_path("", &StorePath::root()), ".");
/// ```
pub fn remote_path(root: &str, path: &StorePath) -> String {
    let trimmed = root.trim_end_matches('/');
    let absolute = root.starts_with('/');
    match (path.is_root(), trimmed.is_empty()) {
        (true, true) if absolute => "/".to_owned(),
        (true, true) => ".".to_owned(),
        (true, false) => trimmed.to_owned(),
        (false, true) if absolute => format!("/{path}"),
        (false, true) => path.to_string(),
        (false, false) => format!("{trimmed}/{path}"),
    }
}

/// Parse an `ls -l` permission string into mode bits.
///
/// Accepts the nine `rwx` characters with or without the leading type
/// character. Setuid, setgid and sticky markers are honoured (`s`/`t` imply
/// the execute bit).
pub fn parse_mode(perm: &str) -> Option<u32> {
    let bits = match perm.len() {
        10 => perm.get(1..)?,
        9 => perm,
        _ => return None,
    };
    let mut mode = 0u32;
    for (i, c) in bits.chars().enumerate() {
        let shift = 8 - i as u32;
        let slot = i % 3;
        let set = match (slot, c) {
            (_, '-') => false,
            (0, 'r') | (1, 'w') | (2, 'x') => true,
            (2, 's' | 't') => true,
            (2, 'S' | 'T') => false,
            _ => return None,
        };
        if set {
            mode |= 1 << shift;
        }
        if slot == 2 && matches!(c, 's' | 'S' | 't' | 'T') {
            mode |= match i {
                2 => 0o4000,
                5 => 0o2000,
                _ => 0o1000,
            };
        }
    }
    Some(mode)
}

/// Access of a `LIST` line, read from its permission column.
///
/// ```rust
/// use anystore::Access;
/// use anystore::backend::remote::access_from_listing;
///
/// let line = "-rw-r--r--    1 ftp  ftp   5 Jan 01 12:00 a.txt";
/// assert_eq!(access_from_listing(line), Some(Access::Public));
/// assert_eq!(access_from_listing("drwx------ 2 u g 0 Jan 01 12:00 d"), Some(Access::Private));
/// ```
pub fn access_from_listing(line: &str) -> Option<Access> {
    let perm = line.split_whitespace().next()?;
    parse_mode(perm).map(AccessModes::access_of)
}

/// Whether an FTP reply code reports the requested file or directory as
/// unavailable (`450`, `550`).
///
/// ```rust
/// use anystore::backend::remote::is_missing_reply;
///
/// assert!(is_missing_reply(550));
/// assert!(!is_missing_reply(530));
/// ```
pub fn is_missing_reply(code: u32) -> bool {
    matches!(code, 450 | 550)
}

/// Octal rendering used by `SITE CHMOD`.
pub fn format_mode(mode: u32) -> String {
    format!("{:03o}", mode & 0o7777)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn remote_path_variants() {
        let p = StorePath::parse("x/y").unwrap();
        assert_eq!(remote_path("/home/ftp", &p), "/home/ftp/x/y");
        assert_eq!(remote_path("data/", &p), "data/x/y");
        assert_eq!(remote_path("/home/ftp/", &StorePath::root()), "/home/ftp");
        assert_eq!(remote_path("/", &StorePath::root()), "/");
    }

    #[test]
    fn parse_mode_common_strings() {
        assert_eq!(parse_mode("-rw-r--r--"), Some(0o644));
        assert_eq!(parse_mode("drwxr-xr-x"), Some(0o755));
        assert_eq!(parse_mode("rw-------"), Some(0o600));
        assert_eq!(parse_mode("-rwsr-xr-t"), Some(0o5755));
        assert_eq!(parse_mode("-rwSr--r--"), Some(0o4644));
    }

    #[test]
    fn parse_mode_rejects_garbage() {
        assert_eq!(parse_mode("total"), None);
        assert_eq!(parse_mode("-rw-r--r-x-"), None);
        assert_eq!(parse_mode("-wr-r--r--"), None);
    }

    #[test]
    fn listing_access() {
        assert_eq!(
            access_from_listing("-rw-------   1 u g  10 Mar  3  2024 secret"),
            Some(Access::Private)
        );
        assert_eq!(access_from_listing(""), None);
    }

    #[test]
    fn missing_replies() {
        assert!(is_missing_reply(450));
        assert!(is_missing_reply(550));
        for code in [226, 421, 425, 451, 530, 553] {
            assert!(!is_missing_reply(code), "{code}");
        }
    }

    #[test]
    fn format_mode_is_octal() {
        assert_eq!(format_mode(0o644), "644");
        assert_eq!(format_mode(0o100600), "600");
        assert_eq!(format_mode(0o4755), "4755");
    }
}
