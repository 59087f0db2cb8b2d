pub mod extract;
pub mod sections;
