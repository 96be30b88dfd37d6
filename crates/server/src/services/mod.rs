pub mod access;
pub mod annotations;
pub mod certificates;
pub mod quota;
pub mod storage;
pub mod uploads;
