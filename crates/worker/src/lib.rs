pub mod role;
pub mod sample;

pub use role::Role;
pub use sample::{getnum, getnum_type, sum_type, sum_workflow};
