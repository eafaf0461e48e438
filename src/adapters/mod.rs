pub mod inference;
pub mod input;
pub mod output;
pub mod runpod;
