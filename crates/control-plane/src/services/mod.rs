// Services layer for business logic
// Services own business logic and validation, calling storage directly

pub mod auth;
pub mod checkout;
pub mod tag;
pub mod template;
pub mod upload;
pub mod user;

pub use auth::AuthService;
pub use checkout::CheckoutService;
pub use tag::TagService;
pub use template::TemplateService;
pub use upload::{UploadKind, UploadService};
pub use user::UserService;
