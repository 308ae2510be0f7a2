use std::path::Path;

use rten::Model;
use rten_tensor::prelude::*;
use rten_tensor::{NdTensor, Tensor};

use crate::classifier::{ClassifierInput, Inference};
use crate::error::{Error, Result};

/// Field classifier backed by an RTen model taking `[1, H, W, 3]` floats
pub struct RtenInference {
    key: String,
    model: Model,
}

impl RtenInference {
    pub fn load(key: &str, path: &Path) -> Result<Self> {
        let model = Model::load_file(path).map_err(|e| Error::ModelLoad {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })?;
        Ok(Self {
            key: key.to_string(),
            model,
        })
    }

    fn inference_error(&self, reason: impl ToString) -> Error {
        Error::Inference {
            key: self.key.clone(),
            reason: reason.to_string(),
        }
    }
}

impl Inference for RtenInference {
    fn infer(&self, input: &ClassifierInput) -> Result<Vec<f32>> {
        let tensor = NdTensor::from_data(input.shape(), input.data.clone());
        let output = self
            .model
            .run_one(tensor.view().into(), None)
            .map_err(|e| self.inference_error(e))?;
        let scores: Tensor<f32> = output
            .try_into()
            .map_err(|e| self.inference_error(format!("{:?}", e)))?;
        Ok(scores.iter().copied().collect())
    }
}
