pub mod login;
pub mod logout;
pub mod refresh;
pub mod register;

pub use login::handle_login;
pub use logout::handle_logout;
pub use refresh::handle_refresh;
pub use register::handle_register;
