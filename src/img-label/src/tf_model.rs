use std::path::Path;

use image::DynamicImage;
use log::debug;
use tensorflow::{Graph, SavedModelBundle, Session, SessionOptions, SessionRunArgs, Tensor};

use crate::error::{Error, Result};
use crate::input::{image_to_input, read_labels, scores_to_predictions, INPUT_SIZE};
use crate::model::{Model, Prediction};
use crate::timer::Timer;

const INPUT_OP: &str = "serving_default_input_1";
const OUTPUT_OP: &str = "StatefulPartitionedCall";

/// Image classifier backed by a TensorFlow SavedModel
pub struct TfModel {
    /// TensorFlow model graph
    graph: Graph,

    /// TensorFlow session
    session: Session,

    /// Class names, indexed like the model output
    labels: Vec<String>,
}

impl TfModel {
    pub fn new(export_dir: &Path, labels_path: &Path) -> Result<Self> {
        let mut t = Timer::new_start("Loading session");

        let mut graph = Graph::new();
        let session =
            SavedModelBundle::load(&SessionOptions::new(), &["serve"], &mut graph, export_dir)
                .map_err(|status| Error::ModelLoad(status.to_string()))?
                .session;

        let labels = read_labels(labels_path)?;

        t.stop();
        debug!("Loaded {} labels from {}", labels.len(), labels_path.display());

        Ok(TfModel {
            graph,
            session,
            labels,
        })
    }

    fn run(&self, input: &[f32]) -> Result<Vec<f32>> {
        let mut t = Timer::new_start("Running session");

        let input = Tensor::new(&[1, INPUT_SIZE as u64, INPUT_SIZE as u64, 3]).with_values(input)?;

        let mut args = SessionRunArgs::new();

        args.add_feed(&self.graph.operation_by_name_required(INPUT_OP)?, 0, &input);

        let result = args.request_fetch(&self.graph.operation_by_name_required(OUTPUT_OP)?, 0);

        self.session.run(&mut args)?;
        let output: Tensor<f32> = args.fetch(result)?;

        t.stop();

        Ok(output.to_vec())
    }
}

impl Model for TfModel {
    fn classify(&self, image: &DynamicImage) -> Result<Vec<Prediction>> {
        let mut t = Timer::new_start("Resizing image");
        let input = image_to_input(image);
        t.stop();

        let scores = self.run(&input)?;

        Ok(scores_to_predictions(&scores, &self.labels))
    }
}
