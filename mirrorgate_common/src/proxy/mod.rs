pub mod fetcher;
pub mod service;
pub mod util;
