pub mod add;
pub mod calculate;
pub mod portfolio;
pub mod price;
pub mod setup;
pub mod ui;
