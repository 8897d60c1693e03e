pub mod block_parser;
pub mod nav_service;
pub mod price_service;
pub mod query_service;
