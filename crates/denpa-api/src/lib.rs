pub mod traits;
pub mod xtream;
