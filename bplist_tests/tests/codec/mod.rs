pub mod boundaries;
pub mod corruption;
pub mod dedup;
pub mod helpers;
pub mod round_trip;
