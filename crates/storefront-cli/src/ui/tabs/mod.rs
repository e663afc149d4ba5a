//! Per-tab content renderers

pub mod home;
pub mod logout;
pub mod post_detail;
pub mod posts;
