pub mod beat;
pub mod collector;
pub mod console_display;
pub mod curve;
pub mod engine;
pub mod event_logger;
pub mod host;
pub mod osc_sender;
pub mod params;
pub mod scheduler;
pub mod script_reader;
pub mod simulator;
pub mod types;
