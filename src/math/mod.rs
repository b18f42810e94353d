pub mod init;
pub mod matrix;
pub mod ops;
pub mod tensor;

pub use init::{InitScheme, Initializable};
pub use matrix::Matrix;
pub use tensor::Tensor;
