//! Auth-domain identifiers, token secrets, credentials, and user models.

pub mod claims;
pub mod credentials;
pub mod id;
pub mod secret;
pub mod user;

pub use claims::*;
pub use credentials::*;
pub use id::*;
pub use secret::*;
pub use user::*;
