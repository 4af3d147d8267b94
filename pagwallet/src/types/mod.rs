pub mod auth;
pub mod price;
pub mod rpc;
pub mod search;
pub mod token;
pub mod transaction;

pub use auth::*;
pub use price::*;
pub use rpc::*;
pub use search::*;
pub use token::*;
pub use transaction::*;
