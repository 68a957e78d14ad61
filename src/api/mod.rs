mod predictor;

pub use predictor::{PredictionBackend, PredictorClient};
