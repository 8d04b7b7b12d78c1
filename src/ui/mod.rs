pub mod game;
pub mod panels;
pub mod plot;
pub mod table;
