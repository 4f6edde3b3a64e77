pub mod savgol;
pub mod transversalium;

pub use savgol::savgol_filter;
pub use transversalium::{correct_transversalium, Corrected, CorrectionProfile};
