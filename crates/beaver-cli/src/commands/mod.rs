pub mod call;
pub mod inspect;
pub mod probe;
