use std::error::Error;
use std::fmt;
use std::io;

/// Types of errors that can occur while resolving, mapping or dropping an identity
#[derive(PartialEq, Eq, Copy, Clone, Debug)]
#[non_exhaustive]
pub enum ErrorKind {
    /// The user name does not exist in the account database
    InvalidUser,
    /// A system call failed
    SysError,
}

#[derive(Debug)]
enum ErrorRepr {
    InvalidUser(String),
    FromNix(&'static str, nix::Error),
    FromIo(&'static str, io::Error),
}

/// Error type for identity resolution, namespace mapping and privilege dropping
#[derive(Debug)]
pub struct PrivMapError {
    repr: ErrorRepr,
}

impl PrivMapError {
    pub(crate) fn invalid_user<T: Into<String>>(user: T) -> PrivMapError {
        PrivMapError {
            repr: ErrorRepr::InvalidUser(user.into()),
        }
    }

    pub(crate) fn io(operation: &'static str, e: io::Error) -> PrivMapError {
        PrivMapError {
            repr: ErrorRepr::FromIo(operation, e),
        }
    }

    pub(crate) fn nix(operation: &'static str, e: nix::Error) -> PrivMapError {
        PrivMapError {
            repr: ErrorRepr::FromNix(operation, e),
        }
    }

    /// What went wrong, broadly
    pub fn kind(&self) -> ErrorKind {
        match self.repr {
            ErrorRepr::InvalidUser(_) => ErrorKind::InvalidUser,
            ErrorRepr::FromNix(..) | ErrorRepr::FromIo(..) => ErrorKind::SysError,
        }
    }

    /// Name of the failing operation, e.g. `write(uid_map)`
    pub fn operation(&self) -> Option<&'static str> {
        match self.repr {
            ErrorRepr::InvalidUser(_) => None,
            ErrorRepr::FromNix(op, _) | ErrorRepr::FromIo(op, _) => Some(op),
        }
    }

    /// The offending user name, for `InvalidUser` errors
    pub fn user(&self) -> Option<&str> {
        match self.repr {
            ErrorRepr::InvalidUser(ref user) => Some(user),
            _ => None,
        }
    }

    /// Bare OS error code, if the error came from a system call
    pub fn raw_os_error(&self) -> Option<i32> {
        match self.repr {
            ErrorRepr::InvalidUser(_) => None,
            ErrorRepr::FromNix(_, e) => Some(e as i32),
            ErrorRepr::FromIo(_, ref e) => e.raw_os_error(),
        }
    }
}

impl Error for PrivMapError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self.repr {
            ErrorRepr::FromNix(_, ref e) => Some(e),
            ErrorRepr::FromIo(_, ref e) => Some(e),
            ErrorRepr::InvalidUser(_) => None,
        }
    }
}

impl fmt::Display for PrivMapError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> Result<(), fmt::Error> {
        match self.repr {
            ErrorRepr::InvalidUser(ref user) => write!(f, "Invalid user '{}'", user),
            ErrorRepr::FromNix(op, e) => write!(f, "{}: {}", op, e.desc()),
            ErrorRepr::FromIo(op, ref e) => write!(f, "{}: {}", op, e),
        }
    }
}
