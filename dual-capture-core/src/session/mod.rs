mod capture_loops;
pub mod flag;
pub mod recorder;
