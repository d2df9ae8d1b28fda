pub mod event;
pub mod subscription;
