pub mod error;
pub mod model;
pub mod schema;
pub mod time;
pub mod warn;

pub use error::{MltraceError, Result};
pub use warn::ConvertWarning;
