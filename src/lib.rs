//! LifeOn Sim - rule-driven building simulation for a turn-based city builder

pub mod city;
pub mod core;
pub mod rules;
pub mod simulation;
pub mod spatial;
