pub mod bbox;
pub mod point;
pub mod ray;
pub mod tolerance;
pub mod vector;

pub use bbox::*;
pub use point::*;
pub use ray::*;
pub use tolerance::*;
pub use vector::*;
