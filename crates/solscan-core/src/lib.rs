pub mod analysis;
pub mod consts;
pub mod correction;
pub mod error;
pub mod filters;
pub mod frame;
pub mod io;
pub mod pipeline;
pub mod presentation;
pub mod reconstruct;
