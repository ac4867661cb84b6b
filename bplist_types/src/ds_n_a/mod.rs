mod ordered_dict;

pub use ordered_dict::*;
