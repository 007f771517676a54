/// Data models for identity and authentication
pub mod user;

pub use user::{
    NewUser, RegisterInput, Role, SetPasswordInput, SocialUserInfo, UpdatePasswordInput, User,
};
