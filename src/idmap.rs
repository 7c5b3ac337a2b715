use crate::errors::*;
use crate::identity::{resolve_with, AccountDatabase, SystemAccounts, UserIdentity};
use libc::pid_t;
use nix::unistd;
use std::fmt;
use std::fs::OpenOptions;
use std::io::{self, Write};
use std::path::{Path, PathBuf};

/// A single-id line of a `uid_map` or `gid_map` file
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct IdMapLine {
    pub inside: u32,
    pub outside: u32,
}

impl IdMapLine {
    pub fn new(inside: u32, outside: u32) -> Self {
        IdMapLine { inside, outside }
    }
}

impl fmt::Display for IdMapLine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {} 1", self.inside, self.outside)
    }
}

/// Per-process user namespace control files
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ControlFile {
    SetGroups,
    UidMap,
    GidMap,
}

impl ControlFile {
    /// File name under `/proc/<pid>/`
    pub fn name(self) -> &'static str {
        match self {
            ControlFile::SetGroups => "setgroups",
            ControlFile::UidMap => "uid_map",
            ControlFile::GidMap => "gid_map",
        }
    }

    fn open_op(self) -> &'static str {
        match self {
            ControlFile::SetGroups => "open(setgroups)",
            ControlFile::UidMap => "open(uid_map)",
            ControlFile::GidMap => "open(gid_map)",
        }
    }

    fn write_op(self) -> &'static str {
        match self {
            ControlFile::SetGroups => "write(setgroups)",
            ControlFile::UidMap => "write(uid_map)",
            ControlFile::GidMap => "write(gid_map)",
        }
    }
}

/// Opens the control files of a target process for reading and writing
pub trait ControlFiles {
    type File: Write;

    fn open(&self, pid: pid_t, file: ControlFile) -> io::Result<Self::File>;
}

impl<'a, T: ControlFiles + ?Sized> ControlFiles for &'a T {
    type File = T::File;

    fn open(&self, pid: pid_t, file: ControlFile) -> io::Result<Self::File> {
        (**self).open(pid, file)
    }
}

/// Control files found under a procfs mount, `/proc` by default
#[derive(Clone, Debug)]
pub struct ProcFs {
    root: PathBuf,
}

impl ProcFs {
    pub fn new<T: AsRef<Path>>(root: T) -> Self {
        ProcFs {
            root: root.as_ref().to_owned(),
        }
    }

    pub fn path(&self, pid: pid_t, file: ControlFile) -> PathBuf {
        self.root.join(pid.to_string()).join(file.name())
    }
}

impl Default for ProcFs {
    fn default() -> Self {
        ProcFs::new("/proc")
    }
}

impl ControlFiles for ProcFs {
    type File = std::fs::File;

    fn open(&self, pid: pid_t, file: ControlFile) -> io::Result<std::fs::File> {
        OpenOptions::new()
            .read(true)
            .write(true)
            .open(self.path(pid, file))
    }
}

/// UserMap structure
///
/// Maps a user of a freshly unshared user namespace to an identity outside
/// of it. The target process must wait until `apply()` returns.
///
/// # Example
/// ```no_run
/// use privmap::UserMap;
///
/// let child_pid = 4242;
/// UserMap::new(child_pid).user("nobody").apply().unwrap();
/// ```
#[derive(Clone, Debug)]
pub struct UserMap<A = SystemAccounts, F = ProcFs> {
    pid: pid_t,
    user: Option<String>,
    caller: Option<UserIdentity>,
    accounts: A,
    files: F,
}

impl UserMap {
    /// Prepare a mapping for the user namespace of `pid`
    pub fn new(pid: pid_t) -> Self {
        UserMap {
            pid,
            user: None,
            caller: None,
            accounts: SystemAccounts,
            files: ProcFs::default(),
        }
    }
}

impl<A> UserMap<A, ProcFs> {
    /// Look for control files under `root` instead of `/proc`
    pub fn proc_root<T: AsRef<Path>>(mut self, root: T) -> Self {
        self.files = ProcFs::new(root);
        self
    }
}

impl<A: AccountDatabase, F: ControlFiles> UserMap<A, F> {
    /// Set the name of the user seen inside the namespace, `root` if unset
    pub fn user<T: AsRef<str>>(mut self, user: T) -> Self {
        self.user = Some(user.as_ref().to_owned());
        self
    }

    /// Set the identity the namespace user maps to outside, the current real ids if unset
    pub fn caller(mut self, uid: u32, gid: u32) -> Self {
        self.caller = Some(UserIdentity::new(uid, gid));
        self
    }

    /// Use another account database to resolve the user
    pub fn accounts<B: AccountDatabase>(self, accounts: B) -> UserMap<B, F> {
        UserMap {
            pid: self.pid,
            user: self.user,
            caller: self.caller,
            accounts,
            files: self.files,
        }
    }

    /// Use another source of control files
    pub fn control_files<G: ControlFiles>(self, files: G) -> UserMap<A, G> {
        UserMap {
            pid: self.pid,
            user: self.user,
            caller: self.caller,
            accounts: self.accounts,
            files,
        }
    }

    /// Apply the mapping, returning the identity the namespace user was anchored to
    pub fn apply(self) -> Result<UserIdentity, PrivMapError> {
        let user = self.user.as_deref().unwrap_or("root");
        let caller = self.caller.unwrap_or_else(|| {
            UserIdentity::new(unistd::getuid().as_raw(), unistd::getgid().as_raw())
        });
        let id = resolve_with(&self.accounts, user)?;

        // The kernel refuses gid_map from an unprivileged writer until
        // setgroups is denied, so this has to come first.
        deny_setgroups(&self.files, self.pid)?;
        write_map(
            &self.files,
            self.pid,
            ControlFile::UidMap,
            IdMapLine::new(id.uid, caller.uid),
        )?;
        write_map(
            &self.files,
            self.pid,
            ControlFile::GidMap,
            IdMapLine::new(id.gid, caller.gid),
        )?;

        tracing::info!(
            pid = self.pid,
            user,
            uid = id.uid,
            gid = id.gid,
            caller_uid = caller.uid,
            caller_gid = caller.gid,
            "mapped user namespace"
        );
        Ok(id)
    }
}

/// Map `user` inside the namespace of `pid` to `uid`/`gid` outside of it
pub fn map_identity(uid: u32, gid: u32, user: &str, pid: pid_t) -> Result<(), PrivMapError> {
    UserMap::new(pid).caller(uid, gid).user(user).apply()?;
    Ok(())
}

fn deny_setgroups<F: ControlFiles>(files: &F, pid: pid_t) -> Result<(), PrivMapError> {
    let mut file = match files.open(pid, ControlFile::SetGroups) {
        Ok(file) => file,
        Err(e) => {
            // Not present before Linux 3.19
            tracing::debug!(pid, error = %e, "setgroups control unavailable, skipping");
            return Ok(());
        }
    };
    tracing::debug!(pid, file = "setgroups", line = "deny", "writing control file");
    file.write_all(b"deny")
        .map_err(|e| PrivMapError::io(ControlFile::SetGroups.write_op(), e))
}

fn write_map<F: ControlFiles>(
    files: &F,
    pid: pid_t,
    which: ControlFile,
    line: IdMapLine,
) -> Result<(), PrivMapError> {
    let line = line.to_string();
    let mut file = files
        .open(pid, which)
        .map_err(|e| PrivMapError::io(which.open_op(), e))?;
    tracing::debug!(pid, file = which.name(), line = %line, "writing control file");
    file.write_all(line.as_bytes())
        .map_err(|e| PrivMapError::io(which.write_op(), e))
}
