pub mod analysis;
pub mod features;
pub mod load;
