pub mod fixtures;
pub mod mock_toolkit;
pub mod scripted_oracle;

pub use fixtures::*;
pub use mock_toolkit::MockToolkit;
pub use scripted_oracle::ScriptedOracle;
