use thiserror::Error;

#[derive(Error, Debug)]
pub enum BriefingError {
    #[error("Unknown asset: {0}")]
    UnknownAsset(String),

    #[error("Invalid price: {0}")]
    InvalidPrice(f64),
}
