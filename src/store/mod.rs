pub mod memory;
pub mod postgres;
pub mod traits;
pub mod transaction;

pub use memory::*;
pub use postgres::*;
pub use traits::*;
pub use transaction::*;
