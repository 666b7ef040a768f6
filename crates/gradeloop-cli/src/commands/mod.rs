pub mod init;
pub mod mastery;
pub mod practice;
pub mod report;
pub mod validate;
