pub mod savgol;
pub mod stats;
