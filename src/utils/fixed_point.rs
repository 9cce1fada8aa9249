// src/utils/fixed_point.rs
use crate::utils::raster::is_nodata;

/// NoData value for int16 outputs
pub const FIXED_NODATA: i16 = -10000;

/// Scale index values into int16, masked samples become `FIXED_NODATA`
pub fn to_fixed_point(data: &[f32], scale_factor: i32) -> Vec<i16> {
    data.iter()
        .map(|&value| {
            if is_nodata(value) {
                FIXED_NODATA
            } else {
                // Clamp so the scaled value never collides with the NoData code
                let clamped = value.clamp(-0.9999, 0.9999);
                (clamped * scale_factor as f32).round() as i16
            }
        })
        .collect()
}
