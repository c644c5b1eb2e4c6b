//! Frame → input-tensor preprocessing shared by the ONNX backends.
//!
//! Only image preparation lives here; coordinate-system handling of model
//! *outputs* is strictly per-backend.

use image::{imageops::FilterType, RgbImage};
use ndarray::Array4;

use crate::capture::VideoFrame;

use super::model::DetectError;

/// Square input edge both landmark models were exported with.
pub(crate) const INPUT_SIZE: u32 = 224;

/// Resize the frame to the model input square and pack it as a normalized
/// NCHW tensor.
pub(crate) fn frame_to_tensor(frame: &VideoFrame) -> Result<Array4<f32>, DetectError> {
    let image = RgbImage::from_raw(frame.width, frame.height, frame.data.clone()).ok_or_else(
        || {
            DetectError::Inference(format!(
                "frame buffer does not match {}x{} RGB8",
                frame.width, frame.height
            ))
        },
    )?;

    let size = INPUT_SIZE;
    let resized = image::imageops::resize(&image, size, size, FilterType::Triangle);

    let mut input = Array4::<f32>::zeros((1, 3, size as usize, size as usize));
    for (x, y, pixel) in resized.enumerate_pixels() {
        input[[0, 0, y as usize, x as usize]] = pixel[0] as f32 / 255.0;
        input[[0, 1, y as usize, x as usize]] = pixel[1] as f32 / 255.0;
        input[[0, 2, y as usize, x as usize]] = pixel[2] as f32 / 255.0;
    }
    Ok(input)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tensor_has_nchw_shape() {
        let frame = VideoFrame {
            data: vec![255; 8 * 4 * 3],
            width: 8,
            height: 4,
            timestamp_ms: 0.0,
            frame_id: 0,
        };
        let tensor = frame_to_tensor(&frame).unwrap();
        assert_eq!(
            tensor.shape(),
            &[1, 3, INPUT_SIZE as usize, INPUT_SIZE as usize]
        );
        // White input stays white after normalization.
        assert!((tensor[[0, 0, 0, 0]] - 1.0).abs() < 1e-6);
    }

    #[test]
    fn mismatched_buffer_is_rejected() {
        let frame = VideoFrame {
            data: vec![0; 10], // not 8*4*3
            width: 8,
            height: 4,
            timestamp_ms: 0.0,
            frame_id: 0,
        };
        assert!(matches!(
            frame_to_tensor(&frame),
            Err(DetectError::Inference(_))
        ));
    }
}
