//! Paths of the storefront API, relative to the configured base URL.

pub const SIGN_IN: &str = "/auth/sign-in/";
pub const SIGN_UP: &str = "/auth/sign-up/";
pub const GOOGLE_LOGIN: &str = "/auth/google-login/";
pub const SEND_PASSCODE: &str = "/auth/send-passcode/";
pub const RESET_PASSWORD: &str = "/auth/verify-passcode-and-reset-password/";
pub const UPDATE_PASSWORD: &str = "/auth/update-password/";
pub const VALIDATE_TOKEN: &str = "/auth/validate-token/";
pub const TOKEN_REFRESH: &str = "/token/refresh/";

pub const BLOGS: &str = "/blogs-data/";
pub const PRODUCTS: &str = "/products/";
pub const SALES: &str = "/sales/";
pub const CREATE_SALE: &str = "/create-sale/";
pub const USERS: &str = "/users/";

pub fn blog_detail(id: u64) -> String {
    format!("{BLOGS}{id}/")
}

pub fn product_detail(id: u64) -> String {
    format!("{PRODUCTS}{id}/")
}
