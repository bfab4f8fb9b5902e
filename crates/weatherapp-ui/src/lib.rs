pub mod models;
pub mod services;

pub use models::main_model::{
    reduce, MainViewEffect, MainViewIntent, MainViewModel, MainViewState,
};
