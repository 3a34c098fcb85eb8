//! Narrow wrappers around the host's external collaborators.
//!
//! Each module turns one collaborator interface (package manager, Python
//! environment tool, archive tools, privileged file operations) into
//! [`CommandSpec`](crate::command::CommandSpec)s run through the
//! [`Host`](crate::context::Host). None of them decide failure policy.

pub mod apt;
pub mod archive;
pub mod files;
pub mod python;
