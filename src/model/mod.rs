pub mod cell;
pub mod columns;
pub mod data_core;
pub mod export;
pub mod import;
pub mod outline;
pub mod table;
pub mod tree;
pub mod visualize;
