pub mod repository;
pub mod commit;
pub mod analysis;
pub mod report;

pub use repository::*;
pub use commit::*;
pub use analysis::*;
pub use report::*;
