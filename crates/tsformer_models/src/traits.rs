use burn::prelude::*;
use tsformer_core::SeriesClassifier;

use crate::mae::MaeClassifier;
use crate::vit::ViTClassifier;

impl<B: Backend> SeriesClassifier<B> for ViTClassifier<B> {
    fn forward(&self, x: Tensor<B, 3>) -> Tensor<B, 2> {
        ViTClassifier::forward(self, x)
    }

    fn n_classes(&self) -> usize {
        ViTClassifier::n_classes(self)
    }
}

impl<B: Backend> SeriesClassifier<B> for MaeClassifier<B> {
    fn forward(&self, x: Tensor<B, 3>) -> Tensor<B, 2> {
        MaeClassifier::forward(self, x)
    }

    fn n_classes(&self) -> usize {
        MaeClassifier::n_classes(self)
    }
}
