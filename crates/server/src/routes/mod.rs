pub mod coach;
pub mod health;
pub mod ws;
