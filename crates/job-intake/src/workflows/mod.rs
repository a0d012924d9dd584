pub mod inquiry;
pub mod recruitment;
