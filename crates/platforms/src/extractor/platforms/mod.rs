pub mod twitter;
