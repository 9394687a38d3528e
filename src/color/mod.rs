pub mod palette;
pub mod rgb;
