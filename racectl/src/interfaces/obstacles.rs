use crate::core::sensor::ProximitySensor;
use nalgebra::{Point3, Unit, Vector3};

/// ObstacleField is a proximity sensor over a set of spheres, rebuilt from the car positions every
/// step. Spheres containing the ray origin are ignored such that a car does not see its own body.
#[derive(Debug, Clone)]
pub struct ObstacleField {
    spheres: Vec<(Point3<f64>, f64)>,
}

impl ObstacleField {
    pub fn from_positions<'a, I>(positions: I, radius: f64) -> ObstacleField
    where
        I: IntoIterator<Item = &'a Point3<f64>>,
    {
        ObstacleField {
            spheres: positions.into_iter().map(|p| (*p, radius)).collect(),
        }
    }

    pub fn len(&self) -> usize {
        self.spheres.len()
    }

    pub fn is_empty(&self) -> bool {
        self.spheres.is_empty()
    }
}

/// ray_sphere returns the distance along the unit direction to the entry point of the sphere.
fn ray_sphere(origin: &Point3<f64>, direction: &Vector3<f64>, center: &Point3<f64>, radius: f64) -> Option<f64> {
    let oc = origin - center;
    let c = oc.norm_squared() - radius * radius;
    if c <= 0.0 {
        return None;
    }

    let b = direction.dot(&oc);
    let disc = b * b - c;
    if disc < 0.0 {
        return None;
    }

    let t = -b - disc.sqrt();
    if t >= 0.0 {
        Some(t)
    } else {
        None
    }
}

impl ProximitySensor for ObstacleField {
    fn raycast(&self, origin: &Point3<f64>, direction: &Unit<Vector3<f64>>, max_distance: f64) -> Option<f64> {
        self.spheres
            .iter()
            .filter_map(|(center, radius)| ray_sphere(origin, direction, center, *radius))
            .filter(|&t| t <= max_distance)
            .fold(None, |closest: Option<f64>, t| match closest {
                Some(c) if c <= t => Some(c),
                _ => Some(t),
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn nearest_sphere_in_range_is_hit() {
        let field = ObstacleField::from_positions(
            [
                Point3::new(0.0, 0.0, 5.0),
                Point3::new(0.0, 0.0, 3.0),
                Point3::new(4.0, 0.0, 0.0),
            ]
            .iter(),
            1.0,
        );

        let hit = field.raycast(&Point3::origin(), &Vector3::z_axis(), 6.0);
        assert_relative_eq!(hit.unwrap(), 2.0, epsilon = 1e-12);
        assert!(field.raycast(&Point3::origin(), &Vector3::z_axis(), 1.5).is_none());
    }

    #[test]
    fn spheres_behind_or_around_the_origin_are_ignored() {
        let field = ObstacleField::from_positions(
            [Point3::new(0.0, 0.0, -3.0), Point3::new(0.5, 0.0, 0.0)].iter(),
            1.5,
        );
        assert_eq!(field.len(), 2);
        assert!(field.raycast(&Point3::origin(), &Vector3::z_axis(), 6.0).is_none());
    }
}
