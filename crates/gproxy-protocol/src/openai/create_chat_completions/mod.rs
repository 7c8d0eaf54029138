pub mod request;
pub mod response;
pub mod stream;
pub mod types;

pub use request::*;
pub use response::*;
pub use stream::*;
pub use types::*;
