mod fixtures;

mod builder;
mod chain;
