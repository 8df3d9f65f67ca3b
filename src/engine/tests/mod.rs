mod common;

mod evaluator;
mod runner;
