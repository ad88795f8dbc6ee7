#![forbid(unsafe_code)]

pub mod book;
pub mod cli;
pub mod compose;
pub mod config;
pub mod error;
pub mod fetch;
pub mod generate;
pub mod http;
pub mod logging;
pub mod model;
pub mod sections;
pub mod series;
pub mod service;
pub mod tmdb;
