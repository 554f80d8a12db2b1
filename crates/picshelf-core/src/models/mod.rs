pub mod upload;
pub mod user;

pub use upload::UploadedFile;
pub use user::{NewUser, User, UserUpdate};
