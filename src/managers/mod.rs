pub mod rest;
pub mod upload;
