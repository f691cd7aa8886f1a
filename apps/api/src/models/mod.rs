pub mod profile;
pub mod resume;
pub mod subscription;
