use crate::errors::*;
use crate::identity::{resolve_with, AccountDatabase, SystemAccounts, UserIdentity};
use libc::{gid_t, uid_t};
use nix::unistd::{self, Gid, Uid};

/// Changes the real, effective and saved ids of the calling process
pub trait Credentials {
    fn set_gid(&self, gid: gid_t) -> nix::Result<()>;
    fn set_uid(&self, uid: uid_t) -> nix::Result<()>;
}

impl<'a, T: Credentials + ?Sized> Credentials for &'a T {
    fn set_gid(&self, gid: gid_t) -> nix::Result<()> {
        (**self).set_gid(gid)
    }

    fn set_uid(&self, uid: uid_t) -> nix::Result<()> {
        (**self).set_uid(uid)
    }
}

/// `setresgid(2)` and `setresuid(2)` on the current process
#[derive(Default, Clone, Copy, Debug)]
pub struct SystemCredentials;

impl Credentials for SystemCredentials {
    fn set_gid(&self, gid: gid_t) -> nix::Result<()> {
        let gid = Gid::from_raw(gid);
        unistd::setresgid(gid, gid, gid)
    }

    fn set_uid(&self, uid: uid_t) -> nix::Result<()> {
        let uid = Uid::from_raw(uid);
        unistd::setresuid(uid, uid, uid)
    }
}

/// PrivDrop structure
///
/// Switching identity is one-way: apply it once, right before running
/// untrusted code.
///
/// # Example
/// ```no_run
/// use privmap::PrivDrop;
///
/// PrivDrop::default().user("nobody").apply().unwrap();
/// ```
#[derive(Clone, Debug)]
pub struct PrivDrop<A = SystemAccounts, C = SystemCredentials> {
    user: Option<String>,
    accounts: A,
    credentials: C,
}

impl Default for PrivDrop {
    fn default() -> Self {
        PrivDrop {
            user: None,
            accounts: SystemAccounts,
            credentials: SystemCredentials,
        }
    }
}

impl<A: AccountDatabase, C: Credentials> PrivDrop<A, C> {
    /// Set the name of a user to switch to
    pub fn user<T: AsRef<str>>(mut self, user: T) -> Self {
        self.user = Some(user.as_ref().to_owned());
        self
    }

    /// Use another account database to resolve the user
    pub fn accounts<B: AccountDatabase>(self, accounts: B) -> PrivDrop<B, C> {
        PrivDrop {
            user: self.user,
            accounts,
            credentials: self.credentials,
        }
    }

    /// Use another way of changing the process credentials
    pub fn credentials<D: Credentials>(self, credentials: D) -> PrivDrop<A, D> {
        PrivDrop {
            user: self.user,
            accounts: self.accounts,
            credentials,
        }
    }

    /// Apply the changes
    ///
    /// Returns the identity switched to, or `None` if no user was set.
    pub fn apply(self) -> Result<Option<UserIdentity>, PrivMapError> {
        let user = match self.user {
            None => return Ok(None),
            Some(ref user) => user,
        };
        let id = resolve_with(&self.accounts, user)?;
        // The group has to go first, while the old uid still allows it
        self.credentials
            .set_gid(id.gid)
            .map_err(|e| PrivMapError::nix("setresgid()", e))?;
        self.credentials
            .set_uid(id.uid)
            .map_err(|e| PrivMapError::nix("setresuid()", e))?;
        tracing::info!(user = user.as_str(), uid = id.uid, gid = id.gid, "dropped privileges");
        Ok(Some(id))
    }
}

/// Permanently switch the calling process to `user`
pub fn drop_to(user: &str) -> Result<(), PrivMapError> {
    PrivDrop::default().user(user).apply()?;
    Ok(())
}
