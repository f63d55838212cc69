pub mod grants;
pub mod permissions;

pub use grants::*;
pub use permissions::*;
