pub mod answer;
pub mod customer;
pub mod estimate;
pub mod ordered_map;
pub mod service;
