pub mod apply;
pub mod resource;
