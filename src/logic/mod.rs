pub mod calculated;
pub mod cascade;
pub mod permission;

pub use calculated::*;
pub use cascade::*;
pub use permission::*;
