pub mod app;
pub mod cli;
pub mod config;
pub mod diag;
pub mod emu;
pub mod exec;
pub mod topo;

#[cfg(test)]
mod test;
