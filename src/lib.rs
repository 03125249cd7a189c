//! Monte Carlo simulation of an income-share-agreement investment pool.
//!
//! A pool buys income-share agreements from students of a foreign study program, collects a share
//! of their earnings once they work in the host country, and reinvests the proceeds in new
//! students. Each run simulates the economy, every student's career and every contract year by
//! year, then reports the pool's return and the discounted welfare gains of the students and their
//! families.
use std::path::PathBuf;

pub mod cli;
pub mod contract;
pub mod degree;
pub mod economy;
pub mod id;
pub mod impact;
pub mod input;
pub mod log;
pub mod model;
pub mod output;
pub mod pool;
pub mod program;
pub mod settings;
pub mod simulation;
pub mod student;
pub mod units;

#[cfg(test)]
mod fixture;

/// Get config dir for program.
///
/// Falls back to the current folder if the platform has no config dir.
pub fn get_isa_impact_config_dir() -> PathBuf {
    let Some(mut config_dir) = dirs::config_dir() else {
        return PathBuf::from(".");
    };
    config_dir.push("isa_impact");

    config_dir
}
