pub mod utils;

mod api;
