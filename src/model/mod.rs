pub mod filter;
pub mod fqid;
pub mod permissions;
pub mod record;
pub mod relations;
pub mod request;
pub mod user_context;

pub use filter::*;
pub use fqid::*;
pub use permissions::*;
pub use record::*;
pub use request::*;
pub use user_context::*;
