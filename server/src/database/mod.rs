pub mod create;
pub mod quick_links;
pub mod refresh_tokens;
pub mod schedules;
pub mod users;
pub mod utils;

pub use create::*;
pub use quick_links::*;
pub use refresh_tokens::*;
pub use schedules::*;
pub use users::*;
pub use utils::*;
