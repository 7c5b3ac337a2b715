/*!
# privmap

Identity plumbing for running a child process as another user.

## Overview

A privileged supervisor that starts sandboxed children needs two things:

- Mapping a user of a child's freshly unshared user namespace to an identity
  outside of it (`/proc/<pid>/{setgroups,uid_map,gid_map}`)
- Permanently switching its own real, effective and saved ids to a target
  user before handing control to untrusted code

Both resolve the target user the same way: `root` is always uid 0 and gid 0,
every other name goes through the system account database.

Every failure is returned to the caller. Nothing here exits the process.

## Mapping a namespace

```no_run
use privmap::UserMap;

# let child_pid = 4242;
// The child has called unshare(CLONE_NEWUSER) and waits for us
UserMap::new(child_pid)
    .user("svc")        // who the child is inside
    .caller(0, 0)       // who that is outside
    .apply()
    .unwrap_or_else(|e| panic!("Failed to map the user namespace: {}", e));
```

## Dropping privileges

```no_run
use privmap::PrivDrop;

PrivDrop::default()
    .user("nobody")
    .apply()
    .unwrap_or_else(|e| panic!("Failed to drop privileges: {}", e));

// Continue running with dropped privileges...
```

## Ordering

Both procedures depend on the order of their steps:

1. `setgroups` is denied before `gid_map` is written, since the kernel
   rejects an unprivileged `gid_map` write otherwise
2. The group ids are changed before the user ids, while the process
   still has the right to do so
*/

pub use self::errors::*;
pub use self::identity::*;
pub use self::idmap::*;
pub use self::privdrop::*;

mod errors;
mod identity;
mod idmap;
mod privdrop;

/// Reexported dependencies for use in consuming crates.
///
/// - `libc`: Low-level bindings to the C standard library
/// - `nix`: Rust friendly bindings to *nix APIs with user features
pub mod reexports {
    pub use {libc, nix};
}
