mod admin;

pub use admin::AdminError;
