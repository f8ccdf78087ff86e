pub mod evaluate;
pub mod projects;
pub mod scenarios;
