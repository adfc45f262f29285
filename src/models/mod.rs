// src/models/mod.rs

pub mod attempt;
pub mod badge;
pub mod challenge;
pub mod deck;
pub mod material;
pub mod question;
pub mod quiz;
pub mod shop;
pub mod tournament;
pub mod track;
pub mod user;
