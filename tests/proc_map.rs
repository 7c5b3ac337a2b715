use privmap::{
    map_identity, AccountDatabase, ControlFile, ErrorKind, ProcFs, UserIdentity, UserMap,
};
use std::fs;
use std::path::Path;
use tempfile::TempDir;

struct OneUser(&'static str, UserIdentity);

impl AccountDatabase for OneUser {
    fn lookup(&self, name: &str) -> privmap::reexports::nix::Result<Option<UserIdentity>> {
        Ok(if name == self.0 { Some(self.1) } else { None })
    }
}

fn fake_proc(pid: i32, files: &[ControlFile]) -> TempDir {
    let root = tempfile::tempdir().unwrap();
    let dir = root.path().join(pid.to_string());
    fs::create_dir(&dir).unwrap();
    for file in files {
        fs::write(dir.join(file.name()), "").unwrap();
    }
    root
}

fn read(root: &Path, pid: i32, file: ControlFile) -> String {
    fs::read_to_string(ProcFs::new(root).path(pid, file)).unwrap()
}

const ALL: &[ControlFile] = &[ControlFile::SetGroups, ControlFile::UidMap, ControlFile::GidMap];

#[test]
fn maps_svc_into_child_namespace() {
    let proc = fake_proc(4242, ALL);
    let id = UserMap::new(4242)
        .proc_root(proc.path())
        .user("svc")
        .caller(0, 0)
        .accounts(OneUser("svc", UserIdentity::new(1000, 1000)))
        .apply()
        .unwrap();
    assert_eq!(id, UserIdentity::new(1000, 1000));
    assert_eq!(read(proc.path(), 4242, ControlFile::SetGroups), "deny");
    assert_eq!(read(proc.path(), 4242, ControlFile::UidMap), "1000 0 1");
    assert_eq!(read(proc.path(), 4242, ControlFile::GidMap), "1000 0 1");
}

#[test]
fn old_kernel_without_setgroups() {
    let proc = fake_proc(17, &[ControlFile::UidMap, ControlFile::GidMap]);
    UserMap::new(17)
        .proc_root(proc.path())
        .caller(1000, 1000)
        .apply()
        .unwrap();
    assert_eq!(read(proc.path(), 17, ControlFile::UidMap), "0 1000 1");
    assert_eq!(read(proc.path(), 17, ControlFile::GidMap), "0 1000 1");
    assert!(!ProcFs::new(proc.path()).path(17, ControlFile::SetGroups).exists());
}

#[test]
fn vanished_process_is_a_system_error() {
    let proc = fake_proc(17, &[]);
    let err = UserMap::new(18)
        .proc_root(proc.path())
        .caller(0, 0)
        .apply()
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::SysError);
    assert_eq!(err.operation(), Some("open(uid_map)"));
}

#[test]
fn gid_map_not_written_when_uid_map_fails() {
    let proc = fake_proc(5, &[ControlFile::SetGroups, ControlFile::GidMap]);
    let err = UserMap::new(5)
        .proc_root(proc.path())
        .caller(0, 0)
        .apply()
        .unwrap_err();
    assert_eq!(err.operation(), Some("open(uid_map)"));
    assert_eq!(read(proc.path(), 5, ControlFile::GidMap), "");
}

#[test]
fn unknown_user_is_rejected_before_any_write() {
    let proc = fake_proc(9, ALL);
    let err = UserMap::new(9)
        .proc_root(proc.path())
        .user("no-such-user-xyz")
        .accounts(OneUser("svc", UserIdentity::new(1000, 1000)))
        .apply()
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::InvalidUser);
    assert_eq!(err.to_string(), "Invalid user 'no-such-user-xyz'");
    assert_eq!(read(proc.path(), 9, ControlFile::SetGroups), "");
}

#[test]
fn plain_map_identity_targets_real_proc() {
    // No such pid: the system /proc has nothing to open
    let err = map_identity(0, 0, "root", i32::MAX).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::SysError);
    assert_eq!(err.operation(), Some("open(uid_map)"));
}
