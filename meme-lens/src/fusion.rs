use crate::models::FusedScore;

/// Boost applied to the image channel before fusion.
pub const IMAGE_WEIGHT: f64 = 1.25;

/// Combine the two channel averages. Presented values are rounded to 2 decimals;
/// the final average is computed before rounding.
pub fn fuse(text_average: Option<f64>, image_average: Option<f64>) -> FusedScore {
    let image_average_weighted = image_average.map(|avg| (avg * IMAGE_WEIGHT).min(100.0));

    let final_average = match (text_average, image_average_weighted) {
        (Some(text), Some(image)) => Some((text + image) / 2.0),
        (Some(only), None) | (None, Some(only)) => Some(only),
        (None, None) => None,
    };

    FusedScore {
        text_average: text_average.map(round2),
        image_average: image_average.map(round2),
        image_average_weighted: image_average_weighted.map(round2),
        final_average: final_average.map(round2),
    }
}

fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}
