//! 엔진 도메인 모델.

mod candle;
mod method;
mod series;

pub use candle::*;
pub use method::*;
pub use series::*;
