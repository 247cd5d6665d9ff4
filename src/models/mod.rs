pub mod result;
pub mod status;

pub use result::{TestCase, TestError, TestRunResult, TestSuite, Totals};
pub use status::{Conclusion, TestStatus};
