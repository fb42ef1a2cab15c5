pub mod attendance;
pub mod error;
pub mod fetch;
pub mod join;
pub mod normalize;
pub mod output;
pub mod schedule;
