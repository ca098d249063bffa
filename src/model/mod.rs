pub mod game;
pub mod page;
