pub mod api_error;
pub mod json_error;
pub mod jwt;
pub mod login;
pub mod quick_link;
pub mod register;
pub mod schedule;
pub mod server_config;

pub use self::api_error::ApiError;
pub use self::json_error::{ErrorResponse, MessageResponse};
pub use self::jwt::{AccessClaims, Identity, RefreshClaims};
pub use self::login::{LoginData, LoginResponse, RefreshData, RefreshResponse, UserProfile};
pub use self::quick_link::*;
pub use self::register::{MIN_PASSWORD_LEN, RegistrationData};
pub use self::schedule::*;
