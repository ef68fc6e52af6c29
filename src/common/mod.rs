pub mod response;

pub use response::BaseResp;
