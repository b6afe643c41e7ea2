pub mod backup;
pub mod init;
pub mod maintenance;
pub mod misc;
pub mod notes;
pub mod shell;
