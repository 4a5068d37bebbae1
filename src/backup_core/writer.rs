use std::ffi::{OsStr, OsString};
use std::fs::{self, File, FileTimes, OpenOptions};
use std::io;
use std::path::{Path, PathBuf};

/// Copy `source` into `dest_folder` as `file_name`, never overwriting.
///
/// When the name is taken, `_1`, `_2`, ... is inserted before the extension
/// until a free name is found. The destination is claimed with `create_new`,
/// so a name that appears between the check and the copy is skipped rather
/// than clobbered. Content, permissions and access/modification times are
/// carried over. Returns the path actually written.
pub fn copy_collision_safe(
    source: &Path,
    dest_folder: &Path,
    file_name: &OsStr,
) -> io::Result<PathBuf> {
    let metadata = fs::metadata(source)?;
    let mut input = File::open(source)?;

    let (target, mut output) = claim_destination(dest_folder, file_name)?;

    if let Err(e) = copy_contents(&mut input, &mut output, &metadata) {
        drop(output);
        if let Err(cleanup) = fs::remove_file(&target) {
            log::warn!(
                "Could not remove partial copy {}: {}",
                target.display(),
                cleanup
            );
        }
        return Err(e);
    }

    Ok(target)
}

/// Copy using the source file's base name.
pub fn copy_into(source: &Path, dest_folder: &Path) -> io::Result<PathBuf> {
    let file_name = source.file_name().ok_or_else(|| {
        io::Error::new(
            io::ErrorKind::InvalidInput,
            format!("{} has no file name", source.display()),
        )
    })?;
    copy_collision_safe(source, dest_folder, file_name)
}

/// Candidate name for the n-th collision (`n == 0` is the name itself).
///
/// Works on raw OS strings so names that are not valid UTF-8 survive intact.
pub fn suffixed_name(file_name: &OsStr, n: u32) -> OsString {
    if n == 0 {
        return file_name.to_os_string();
    }
    let path = Path::new(file_name);
    let suffix = format!("_{}", n);
    match (path.file_stem(), path.extension()) {
        (Some(stem), Some(ext)) => {
            let mut name = stem.to_os_string();
            name.push(&suffix);
            name.push(".");
            name.push(ext);
            name
        }
        _ => {
            let mut name = file_name.to_os_string();
            name.push(&suffix);
            name
        }
    }
}

fn claim_destination(dest_folder: &Path, file_name: &OsStr) -> io::Result<(PathBuf, File)> {
    let mut n = 0u32;
    loop {
        let candidate = dest_folder.join(suffixed_name(file_name, n));
        if !candidate.exists() {
            match OpenOptions::new().write(true).create_new(true).open(&candidate) {
                Ok(file) => return Ok((candidate, file)),
                Err(e) if e.kind() == io::ErrorKind::AlreadyExists => {}
                Err(e) => return Err(e),
            }
        }
        n = n.checked_add(1).ok_or_else(|| {
            io::Error::other(format!(
                "no free name for {} in {}",
                file_name.to_string_lossy(),
                dest_folder.display()
            ))
        })?;
    }
}

fn copy_contents(input: &mut File, output: &mut File, metadata: &fs::Metadata) -> io::Result<()> {
    io::copy(input, output)?;
    output.set_permissions(metadata.permissions())?;

    let mut times = FileTimes::new();
    if let Ok(accessed) = metadata.accessed() {
        times = times.set_accessed(accessed);
    }
    if let Ok(modified) = metadata.modified() {
        times = times.set_modified(modified);
    }
    output.set_times(times)?;
    output.sync_all()
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_fs::TempDir;
    use assert_fs::prelude::*;
    use std::time::{Duration, SystemTime};

    #[test]
    fn test_suffixed_name() {
        assert_eq!(suffixed_name(OsStr::new("IMG_1.jpg"), 0), "IMG_1.jpg");
        assert_eq!(suffixed_name(OsStr::new("IMG_1.jpg"), 1), "IMG_1_1.jpg");
        assert_eq!(suffixed_name(OsStr::new("archive.tar.gz"), 2), "archive.tar_2.gz");
        assert_eq!(suffixed_name(OsStr::new("README"), 3), "README_3");
    }

    // APFS rejects names that are not UTF-8
    #[cfg(target_os = "linux")]
    #[test]
    fn test_non_utf8_name_is_kept_byte_for_byte() {
        use std::os::unix::ffi::OsStrExt;

        let temp = TempDir::new().unwrap();
        let name = OsStr::from_bytes(b"caf\xE9.jpg");
        let other = OsStr::from_bytes(b"caf\xE8.jpg");
        let source_dir = temp.child("src");
        source_dir.create_dir_all().unwrap();
        fs::write(source_dir.path().join(name), b"one").unwrap();
        fs::write(source_dir.path().join(other), b"two").unwrap();
        let dest = temp.child("dest");
        dest.create_dir_all().unwrap();

        let first = copy_into(&source_dir.path().join(name), dest.path()).unwrap();
        let second = copy_into(&source_dir.path().join(other), dest.path()).unwrap();
        let again = copy_into(&source_dir.path().join(name), dest.path()).unwrap();

        assert_eq!(first.file_name().unwrap(), name);
        assert_eq!(second.file_name().unwrap(), other);
        assert_eq!(again.file_name().unwrap().as_bytes(), b"caf\xE9_1.jpg");
        assert_eq!(fs::read(first).unwrap(), b"one");
    }

    #[cfg(unix)]
    #[test]
    fn test_copy_preserves_permissions() {
        use std::os::unix::fs::PermissionsExt;

        let temp = TempDir::new().unwrap();
        let source = temp.child("locked.jpg");
        source.write_str("read only").unwrap();
        fs::set_permissions(source.path(), fs::Permissions::from_mode(0o444)).unwrap();
        let dest = temp.child("dest");
        dest.create_dir_all().unwrap();

        let copied = copy_into(source.path(), dest.path()).unwrap();
        let mode = fs::metadata(&copied).unwrap().permissions().mode();
        assert_eq!(mode & 0o777, 0o444);
        assert_eq!(fs::read_to_string(copied).unwrap(), "read only");
    }

    #[test]
    fn test_repeated_copies_get_distinct_names() {
        let temp = TempDir::new().unwrap();
        let source = temp.child("src/name.ext");
        source.write_str("payload").unwrap();
        let dest = temp.child("dest");
        dest.create_dir_all().unwrap();

        let first = copy_into(source.path(), dest.path()).unwrap();
        let second = copy_into(source.path(), dest.path()).unwrap();
        let third = copy_into(source.path(), dest.path()).unwrap();

        assert_eq!(first, dest.path().join("name.ext"));
        assert_eq!(second, dest.path().join("name_1.ext"));
        assert_eq!(third, dest.path().join("name_2.ext"));
        for path in [first, second, third] {
            assert_eq!(fs::read_to_string(path).unwrap(), "payload");
        }
    }

    #[test]
    fn test_copy_preserves_modification_time() {
        let temp = TempDir::new().unwrap();
        let source = temp.child("clip.mp4");
        source.write_binary(b"\x00\x01\x02").unwrap();
        let stamp = SystemTime::UNIX_EPOCH + Duration::from_secs(1_600_000_000);
        File::options()
            .write(true)
            .open(source.path())
            .unwrap()
            .set_modified(stamp)
            .unwrap();

        let copied = copy_into(source.path(), temp.path().join("out").as_path());
        assert!(copied.is_err(), "destination folder must exist");

        let dest = temp.child("out");
        dest.create_dir_all().unwrap();
        let copied = copy_into(source.path(), dest.path()).unwrap();
        let modified = fs::metadata(copied).unwrap().modified().unwrap();
        assert_eq!(modified, stamp);
    }

    #[test]
    fn test_missing_source_is_an_error_and_leaves_nothing() {
        let temp = TempDir::new().unwrap();
        let dest = temp.child("dest");
        dest.create_dir_all().unwrap();

        let result = copy_into(&temp.path().join("vanished.jpg"), dest.path());
        assert!(result.is_err());
        assert_eq!(fs::read_dir(dest.path()).unwrap().count(), 0);
    }
}
