pub mod agent;
pub mod init;
pub mod supervise;
