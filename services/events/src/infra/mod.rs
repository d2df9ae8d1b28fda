pub mod db;
pub mod stream;
