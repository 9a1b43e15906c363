//! Land prices and refunds.

use claim_spatial::Aabb;

use crate::Land;

/// Cost of claiming `bounds`: one `land_price` per footprint column.
pub fn quote(bounds: &Aabb, land_price: u64) -> u64 {
    bounds.footprint_area().saturating_mul(land_price)
}

/// Amount returned when `land` is deleted: `paid * coefficient`, rounded down.
///
/// Public land always refunds nothing.
pub fn refund(land: &Land, coefficient: f64) -> u64 {
    if land.is_public() {
        return 0;
    }
    (land.paid as f64 * coefficient.clamp(0.0, 1.0)).floor() as u64
}
