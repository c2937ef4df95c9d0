mod cli;
mod rest;
