//! External command execution.
//!
//! Provisioning and image builds are delegated to other programs (`openssl`,
//! `easyrsa`, `docker-compose`). They are described as [`Invocation`]s and
//! executed through a [`CommandRunner`], so pipelines can be exercised in tests
//! without the tools installed.

pub mod invocation;
pub mod runner;

pub use invocation::{CommandOutcome, Invocation};
pub use runner::{CommandRunner, SystemRunner};
