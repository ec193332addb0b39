pub mod changelists;
pub mod checkin;
pub mod edit;
pub mod history;
pub mod query;
pub mod run;
pub mod status;
pub mod sync;

pub use changelists::*;
pub use checkin::*;
pub use edit::*;
pub use history::*;
pub use query::*;
pub use run::*;
pub use status::*;
pub use sync::*;
