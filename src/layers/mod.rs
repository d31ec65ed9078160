pub mod macros;
pub mod base;
pub mod manager;
pub mod marker;
pub mod tile;
