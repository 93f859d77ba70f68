#![allow(dead_code)]

pub mod records;
pub mod remote;
