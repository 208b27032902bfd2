//! Web Mercator projection into 2D world coordinates.
//!
//! World units are pixels of the slippy-map tile pyramid at [`MAP_ZOOM`],
//! with the origin on [`MAP_CENTER`] and +y pointing north (Bevy's 2D axes).

use std::f64::consts::PI;

use bevy::prelude::*;

use monitor::config::{MAP_CENTER, MAP_ZOOM};
use monitor::geometry::{GeoBounds, GeoPoint};

pub const TILE_SIZE: f64 = 256.0;

/// Latitude limit of the square Web Mercator world.
pub const MAX_LATITUDE: f64 = 85.051_128_78;

/// Width of the whole world in pixels at `zoom`.
pub fn world_size(zoom: u8) -> f64 {
    TILE_SIZE * f64::from(1u32 << zoom.min(24))
}

/// Global pixel coordinates (x east, y south) at `zoom`.
pub fn mercator_pixels(p: GeoPoint, zoom: u8) -> (f64, f64) {
    let size = world_size(zoom);
    let lat = p.lat.clamp(-MAX_LATITUDE, MAX_LATITUDE).to_radians();
    let x = (p.lon + 180.0) / 360.0 * size;
    let y = (1.0 - (lat.tan() + 1.0 / lat.cos()).ln() / PI) / 2.0 * size;
    (x, y)
}

fn inverse_pixels(x: f64, y: f64, zoom: u8) -> GeoPoint {
    let size = world_size(zoom);
    let lon = x / size * 360.0 - 180.0;
    let n = PI * (1.0 - 2.0 * y / size);
    let lat = n.sinh().atan().to_degrees();
    GeoPoint::new(lat, lon)
}

/// Maps geographic points onto the 2D scene.
#[derive(Resource, Debug, Clone, Copy, PartialEq)]
pub struct MapProjection {
    pub zoom: u8,
    origin: (f64, f64),
}

impl Default for MapProjection {
    fn default() -> Self {
        Self::centered(GeoPoint::new(MAP_CENTER.0, MAP_CENTER.1), MAP_ZOOM)
    }
}

impl MapProjection {
    pub fn centered(center: GeoPoint, zoom: u8) -> Self {
        Self {
            zoom,
            origin: mercator_pixels(center, zoom),
        }
    }

    pub fn center(&self) -> GeoPoint {
        inverse_pixels(self.origin.0, self.origin.1, self.zoom)
    }

    pub fn project(&self, p: GeoPoint) -> Vec2 {
        let (x, y) = mercator_pixels(p, self.zoom);
        Vec2::new((x - self.origin.0) as f32, (self.origin.1 - y) as f32)
    }

    pub fn unproject(&self, world: Vec2) -> GeoPoint {
        let x = self.origin.0 + f64::from(world.x);
        let y = self.origin.1 - f64::from(world.y);
        inverse_pixels(x, y, self.zoom)
    }

    pub fn project_path(&self, path: &[GeoPoint]) -> Vec<Vec2> {
        path.iter().map(|p| self.project(*p)).collect()
    }

    /// World-space rectangle covering `bounds`.
    pub fn project_bounds(&self, bounds: &GeoBounds) -> Rect {
        Rect::from_corners(self.project(bounds.min), self.project(bounds.max))
    }
}
