use crate::errors::*;
use libc::{gid_t, uid_t};
use nix::unistd::User;

/// A fully resolved user identity: both ids are always known
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct UserIdentity {
    pub uid: uid_t,
    pub gid: gid_t,
}

impl UserIdentity {
    /// The superuser, uid 0 and gid 0
    pub const ROOT: UserIdentity = UserIdentity { uid: 0, gid: 0 };

    pub fn new(uid: uid_t, gid: gid_t) -> Self {
        UserIdentity { uid, gid }
    }

    pub fn is_root(&self) -> bool {
        self.uid == 0
    }
}

/// Source of user entries, keyed by name
///
/// `Ok(None)` means the database was reachable but holds no such user.
pub trait AccountDatabase {
    fn lookup(&self, name: &str) -> nix::Result<Option<UserIdentity>>;
}

impl<'a, T: AccountDatabase + ?Sized> AccountDatabase for &'a T {
    fn lookup(&self, name: &str) -> nix::Result<Option<UserIdentity>> {
        (**self).lookup(name)
    }
}

/// The system account database, queried through `getpwnam_r(3)`
#[derive(Default, Clone, Copy, Debug)]
pub struct SystemAccounts;

impl AccountDatabase for SystemAccounts {
    fn lookup(&self, name: &str) -> nix::Result<Option<UserIdentity>> {
        Ok(User::from_name(name)?.map(|pw| UserIdentity::new(pw.uid.as_raw(), pw.gid.as_raw())))
    }
}

/// Resolve a user name through the system account database
pub fn resolve(user: &str) -> Result<UserIdentity, PrivMapError> {
    resolve_with(&SystemAccounts, user)
}

/// Resolve a user name through `accounts`
///
/// `"root"` never reaches the database.
pub fn resolve_with<A: AccountDatabase>(accounts: &A, user: &str) -> Result<UserIdentity, PrivMapError> {
    if user == "root" {
        tracing::debug!(user, uid = 0, gid = 0, fast_path = true, "resolved user");
        return Ok(UserIdentity::ROOT);
    }
    // getpwnam() cannot be asked about these
    if user.is_empty() || user.contains('\0') {
        return Err(PrivMapError::invalid_user(user));
    }
    match accounts.lookup(user) {
        Ok(Some(id)) => {
            tracing::debug!(user, uid = id.uid, gid = id.gid, fast_path = false, "resolved user");
            Ok(id)
        }
        Ok(None) => Err(PrivMapError::invalid_user(user)),
        Err(e) => Err(PrivMapError::nix("getpwnam()", e)),
    }
}
