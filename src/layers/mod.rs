pub mod layer;
pub mod softmax;
pub mod softmax_loss;
pub mod dense_image_data;

pub use layer::Layer;
pub use softmax::SoftmaxLayer;
pub use softmax_loss::SoftmaxWithLossLayer;
pub use dense_image_data::DenseImageDataLayer;
