#![allow(dead_code)]
#![allow(unused_imports)]
#![allow(unused_variables)]

#[macro_use]
extern crate log;

#[macro_use]
mod macros;

pub type Result<T> = anyhow::Result<T>;

pub mod aerosnap;
pub mod atoms;
pub mod config;
pub mod crossing;
pub mod display;
pub mod dnd;
pub mod event;
pub mod geometry;
pub mod grab;
pub mod headless;
pub mod hints;
pub mod indicator;
pub mod input;
pub mod interactive;
pub mod lifecycle;
pub mod monitor;
pub mod moveresize;
pub mod platform;
pub mod pointer;
pub mod queue;
pub mod registry;
pub mod selection;
pub mod transmute;
pub mod win32;
pub mod window;
