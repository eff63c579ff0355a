//! Conversions between images, model tensors and labels shared by the
//! model backends.

use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::Path;

use image::imageops::FilterType;
use image::DynamicImage;

use crate::error::{Error, Result};
use crate::model::{sort_predictions, Prediction};

/// Side of the square RGB input the model expects
pub const INPUT_SIZE: u32 = 224;

/// Resizes to `INPUT_SIZE` x `INPUT_SIZE` and flattens to HWC `f32` in [0, 1].
pub fn image_to_input(image: &DynamicImage) -> Vec<f32> {
    let rgb = image.to_rgb8();

    let resized = image::imageops::resize(&rgb, INPUT_SIZE, INPUT_SIZE, FilterType::Triangle);

    resized
        .into_raw()
        .iter()
        .map(|x| *x as f32 / 255f32)
        .collect()
}

/// Reads the labels file, one class name per line.
pub fn read_labels(path: &Path) -> Result<Vec<String>> {
    let file = File::open(path).map_err(Error::Labels)?;

    BufReader::new(file)
        .lines()
        .collect::<std::io::Result<Vec<_>>>()
        .map_err(Error::Labels)
}

/// Pairs output scores with labels, most probable first.
///
/// Scores without a matching label line are named by their index.
pub fn scores_to_predictions(scores: &[f32], labels: &[String]) -> Vec<Prediction> {
    let mut predictions: Vec<Prediction> = scores
        .iter()
        .enumerate()
        .map(|(i, &probability)| Prediction {
            label: labels.get(i).cloned().unwrap_or_else(|| format!("class {}", i)),
            probability,
        })
        .collect();

    sort_predictions(&mut predictions);
    predictions
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{Rgb, RgbImage};
    use std::io::Write;

    #[test]
    fn input_is_scaled_and_sized() {
        let image = DynamicImage::ImageRgb8(RgbImage::from_pixel(10, 20, Rgb([255, 0, 51])));
        let input = image_to_input(&image);

        assert_eq!(input.len(), (INPUT_SIZE * INPUT_SIZE * 3) as usize);
        assert_eq!(&input[..3], &[1.0, 0.0, 0.2]);
    }

    #[test]
    fn scores_map_to_sorted_labels() {
        let labels = vec!["background".to_owned(), "tabby".to_owned(), "Persian cat".to_owned()];
        let p = scores_to_predictions(&[0.0766, 0.05, 0.8734, 0.001], &labels);

        assert_eq!(p[0], Prediction::new("Persian cat", 0.8734));
        assert_eq!(p[1].label, "background");
        assert_eq!(p[3].label, "class 3");
    }

    #[test]
    fn labels_file_lines() {
        let path = std::env::temp_dir().join(format!("img-label-labels-{}.txt", std::process::id()));
        let mut file = File::create(&path).unwrap();
        writeln!(file, "background\ntench\ngoldfish").unwrap();

        let labels = read_labels(&path).unwrap();
        std::fs::remove_file(&path).unwrap();
        assert_eq!(labels, ["background", "tench", "goldfish"]);
    }

    #[test]
    fn missing_labels_file() {
        let err = read_labels(Path::new("/nonexistent/labels.txt")).unwrap_err();
        assert!(matches!(err, Error::Labels(_)));
    }
}
