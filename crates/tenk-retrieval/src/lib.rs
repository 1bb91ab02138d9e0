pub mod http;
pub mod mock;

pub use http::HttpRetriever;
pub use mock::StaticRetriever;
