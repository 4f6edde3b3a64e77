pub mod border;
pub mod line_fit;
pub mod polynomial;
pub mod statistics;

pub use border::{detect_border, estimate_circle, full_height_limits, vertical_limits, BorderAxis};
pub use line_fit::{fit_spectral_line, LineFit, LineFitTable, LinePosition};
pub use polynomial::Polynomial;
pub use statistics::{compute_mean_max, StatisticsImages};
