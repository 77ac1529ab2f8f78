pub mod catalog;
pub mod history;
pub mod profile;
pub mod recommendation;
