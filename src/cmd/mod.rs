pub mod crack;
pub mod generate;
pub mod inspect;
