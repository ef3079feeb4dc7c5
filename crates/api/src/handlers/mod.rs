pub mod images;
pub mod jobs;
pub mod worker;
