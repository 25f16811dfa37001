pub mod dispatcher;
pub mod model;
pub mod monitor;
pub mod scheduler;
