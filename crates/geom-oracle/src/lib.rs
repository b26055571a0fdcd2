pub mod analytic;
pub mod mock_oracle;
pub mod primitives;
pub mod traits;
pub mod types;

pub use analytic::AnalyticOracle;
pub use mock_oracle::{Fault, MockOracle};
pub use primitives::*;
pub use traits::*;
pub use types::*;
