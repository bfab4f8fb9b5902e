pub mod main_model;
