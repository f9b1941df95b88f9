pub mod batch;
pub mod converter;
pub mod processor;
pub mod stage;
pub mod storage;
