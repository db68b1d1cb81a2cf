//! Protocol negotiation
//!
//! Picks the registry API generation for a repository ([`VersionResolver`])
//! and verifies credentials against whichever generation the host speaks
//! ([`LoginNegotiator`]). Both are stateless across calls: nothing learned
//! by one call is reused by another.

pub mod handle;
pub mod login;
pub mod resolver;

pub use handle::ClientHandle;
pub use login::LoginNegotiator;
pub use resolver::VersionResolver;
