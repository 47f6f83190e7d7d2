pub mod duckduckgo;
