pub mod codec;
pub mod ctc;
pub mod folding;
