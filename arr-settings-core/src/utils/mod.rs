//! Utility module

pub mod html;
pub mod request_token;
