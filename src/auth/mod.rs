pub mod credentials;
pub mod permissions;
pub mod user;

pub use credentials::*;
pub use permissions::*;
pub use user::*;
