//! Resource Field Components
//!
//! Spatial distributions of a depletable, regenerating quantity. A field
//! holds a single scalar intensity; its distribution only shapes how much of
//! that scalar is reachable from a given position. Consuming anywhere lowers
//! the scalar everywhere.

use bevy_ecs::prelude::*;
use serde::{Deserialize, Serialize};

use crate::error::SimError;

/// Constants for field falloff
pub mod field_constants {
    /// Quadratic falloff constant for point fields
    pub const POINT_DECAY: f32 = 0.0001;
    /// Distance at which a point field has fallen to 10% of its intensity
    pub const POINT_INFLUENCE_RADIUS: f32 = 300.0;
    /// Default cap for field intensity
    pub const DEFAULT_MAX_INTENSITY: f32 = 1.0;
}

use field_constants::*;

/// Spatial shape of a field.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Distribution {
    /// Smooth falloff around a point with no hard cutoff
    Point { x: f32, y: f32 },
    /// Uniform over an inclusive axis-aligned rectangle
    Area {
        x: f32,
        y: f32,
        width: f32,
        height: f32,
    },
    /// Power-law falloff to zero at `radius`; `falloff` in [0, 1]
    Gradient {
        x: f32,
        y: f32,
        radius: f32,
        falloff: f32,
    },
}

impl Distribution {
    pub fn name(&self) -> &'static str {
        match self {
            Distribution::Point { .. } => "point",
            Distribution::Area { .. } => "area",
            Distribution::Gradient { .. } => "gradient",
        }
    }

    /// Representative center: the point, the area centroid, or the gradient center.
    pub fn center(&self) -> (f32, f32) {
        match *self {
            Distribution::Point { x, y } => (x, y),
            Distribution::Area {
                x,
                y,
                width,
                height,
            } => (x + width / 2.0, y + height / 2.0),
            Distribution::Gradient { x, y, .. } => (x, y),
        }
    }

    /// Fraction of the field's intensity available at (px, py), in [0, 1].
    fn factor_at(&self, px: f32, py: f32) -> f32 {
        match *self {
            Distribution::Point { x, y } => {
                let d_sq = (px - x).powi(2) + (py - y).powi(2);
                1.0 / (1.0 + d_sq * POINT_DECAY)
            }
            Distribution::Area {
                x,
                y,
                width,
                height,
            } => {
                let inside = px >= x && px <= x + width && py >= y && py <= y + height;
                if inside {
                    1.0
                } else {
                    0.0
                }
            }
            Distribution::Gradient {
                x,
                y,
                radius,
                falloff,
            } => {
                let d = ((px - x).powi(2) + (py - y).powi(2)).sqrt();
                if radius <= 0.0 || d > radius {
                    0.0
                } else {
                    (1.0 - d / radius).powf(1.0 + 3.0 * falloff)
                }
            }
        }
    }

    fn contains(&self, px: f32, py: f32) -> bool {
        match *self {
            Distribution::Point { x, y } => {
                let d_sq = (px - x).powi(2) + (py - y).powi(2);
                d_sq <= POINT_INFLUENCE_RADIUS * POINT_INFLUENCE_RADIUS
            }
            Distribution::Area { .. } => self.factor_at(px, py) > 0.0,
            Distribution::Gradient { x, y, radius, .. } => {
                let d_sq = (px - x).powi(2) + (py - y).powi(2);
                d_sq <= radius * radius
            }
        }
    }
}

/// A single resource field.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResourceField {
    pub id: String,
    /// Free-form tag such as "water" or "food"
    pub resource_type: String,
    pub distribution: Distribution,
    /// Current scalar intensity, within [0, max_intensity]
    pub intensity: f32,
    pub max_intensity: f32,
    /// Natural loss per second
    pub depletion_rate: f32,
    /// Natural gain per second
    pub regeneration_rate: f32,
    /// World time of the last update or consumption
    pub last_updated: f64,
    pub total_consumed: f32,
}

impl ResourceField {
    /// A static field at full intensity.
    pub fn new(
        id: impl Into<String>,
        resource_type: impl Into<String>,
        distribution: Distribution,
    ) -> Self {
        Self {
            id: id.into(),
            resource_type: resource_type.into(),
            distribution,
            intensity: DEFAULT_MAX_INTENSITY,
            max_intensity: DEFAULT_MAX_INTENSITY,
            depletion_rate: 0.0,
            regeneration_rate: 0.0,
            last_updated: 0.0,
            total_consumed: 0.0,
        }
    }

    pub fn point(id: impl Into<String>, resource_type: impl Into<String>, x: f32, y: f32) -> Self {
        Self::new(id, resource_type, Distribution::Point { x, y })
    }

    pub fn area(
        id: impl Into<String>,
        resource_type: impl Into<String>,
        x: f32,
        y: f32,
        width: f32,
        height: f32,
    ) -> Self {
        Self::new(
            id,
            resource_type,
            Distribution::Area {
                x,
                y,
                width,
                height,
            },
        )
    }

    pub fn gradient(
        id: impl Into<String>,
        resource_type: impl Into<String>,
        x: f32,
        y: f32,
        radius: f32,
        falloff: f32,
    ) -> Self {
        Self::new(
            id,
            resource_type,
            Distribution::Gradient {
                x,
                y,
                radius,
                falloff,
            },
        )
    }

    /// Set the intensity, clamped to [0, max_intensity].
    pub fn with_intensity(mut self, intensity: f32) -> Self {
        self.intensity = intensity.clamp(0.0, self.max_intensity.max(0.0));
        self
    }

    /// Set the cap; the current intensity is clamped to it.
    pub fn with_max_intensity(mut self, max_intensity: f32) -> Self {
        self.max_intensity = max_intensity;
        self.intensity = self.intensity.clamp(0.0, max_intensity.max(0.0));
        self
    }

    pub fn with_rates(mut self, depletion_rate: f32, regeneration_rate: f32) -> Self {
        self.depletion_rate = depletion_rate;
        self.regeneration_rate = regeneration_rate;
        self
    }

    /// Reject fields whose numbers would make the falloff or dynamics meaningless.
    pub fn validate(&self) -> Result<(), SimError> {
        let scalars = [
            self.intensity,
            self.max_intensity,
            self.depletion_rate,
            self.regeneration_rate,
        ];
        if scalars.iter().any(|v| !v.is_finite()) {
            return Err(SimError::invalid(format!(
                "field '{}' has a non-finite parameter",
                self.id
            )));
        }
        if self.max_intensity <= 0.0 {
            return Err(SimError::invalid(format!(
                "field '{}' max_intensity must be positive",
                self.id
            )));
        }
        if self.depletion_rate < 0.0 || self.regeneration_rate < 0.0 {
            return Err(SimError::invalid(format!(
                "field '{}' rates must be non-negative",
                self.id
            )));
        }
        match self.distribution {
            Distribution::Point { x, y } if !(x.is_finite() && y.is_finite()) => Err(
                SimError::invalid(format!("field '{}' has a non-finite position", self.id)),
            ),
            Distribution::Area {
                x,
                y,
                width,
                height,
            } if !(x.is_finite() && y.is_finite() && width > 0.0 && height > 0.0) => {
                Err(SimError::invalid(format!(
                    "field '{}' area must have a finite origin and positive extent",
                    self.id
                )))
            }
            Distribution::Gradient {
                x,
                y,
                radius,
                falloff,
            } if !(x.is_finite()
                && y.is_finite()
                && radius > 0.0
                && radius.is_finite()
                && (0.0..=1.0).contains(&falloff)) =>
            {
                Err(SimError::invalid(format!(
                    "field '{}' gradient needs a positive radius and falloff in [0, 1]",
                    self.id
                )))
            }
            _ => Ok(()),
        }
    }

    /// Intensity reachable at (x, y).
    pub fn intensity_at(&self, x: f32, y: f32) -> f32 {
        if self.intensity <= 0.0 {
            return 0.0;
        }
        self.intensity * self.distribution.factor_at(x, y)
    }

    /// Whether (x, y) lies within the field's influence.
    pub fn is_in_range(&self, x: f32, y: f32) -> bool {
        self.distribution.contains(x, y)
    }

    pub fn center(&self) -> (f32, f32) {
        self.distribution.center()
    }

    pub fn distance_to(&self, x: f32, y: f32) -> f32 {
        let (cx, cy) = self.center();
        ((cx - x).powi(2) + (cy - y).powi(2)).sqrt()
    }

    pub fn is_depleted(&self) -> bool {
        self.intensity <= 0.0
    }

    /// Take up to `amount` from the field at (x, y). Returns what was taken,
    /// never more than is reachable there.
    pub fn consume(&mut self, x: f32, y: f32, amount: f32, now: f64) -> f32 {
        let available = self.intensity_at(x, y);
        let requested = if amount.is_nan() { 0.0 } else { amount };
        let consumed = requested.min(available).clamp(0.0, self.intensity.max(0.0));

        self.intensity = (self.intensity - consumed).max(0.0);
        self.total_consumed += consumed;
        self.last_updated = now;
        consumed
    }

    /// Apply depletion then regeneration for `dt` seconds.
    pub fn update(&mut self, dt: f32, now: f64) {
        let dt = if dt.is_finite() { dt.max(0.0) } else { 0.0 };

        self.intensity = (self.intensity - self.depletion_rate * dt).max(0.0);
        self.intensity = (self.intensity + self.regeneration_rate * dt).min(self.max_intensity);
        self.last_updated = now;
    }
}

/// Outcome of a successful draw from the nearest field.
#[derive(Debug, Clone, PartialEq)]
pub struct Consumption {
    pub field_id: String,
    pub resource_type: String,
    pub amount: f32,
}

/// Resource: registry of all resource fields, in registration order
#[derive(Resource, Debug, Default, Clone)]
pub struct ResourceFieldSet {
    fields: Vec<ResourceField>,
}

impl ResourceFieldSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a field, replacing any field with the same id. Returns the
    /// replaced field.
    pub fn insert(&mut self, field: ResourceField) -> Option<ResourceField> {
        match self.fields.iter_mut().find(|f| f.id == field.id) {
            Some(existing) => Some(std::mem::replace(existing, field)),
            None => {
                self.fields.push(field);
                None
            }
        }
    }

    pub fn remove(&mut self, field_id: &str) -> Option<ResourceField> {
        let index = self.fields.iter().position(|f| f.id == field_id)?;
        Some(self.fields.remove(index))
    }

    pub fn get(&self, field_id: &str) -> Option<&ResourceField> {
        self.fields.iter().find(|f| f.id == field_id)
    }

    pub fn get_mut(&mut self, field_id: &str) -> Option<&mut ResourceField> {
        self.fields.iter_mut().find(|f| f.id == field_id)
    }

    pub fn iter(&self) -> impl Iterator<Item = &ResourceField> {
        self.fields.iter()
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    /// Update every field. Returns ids of fields that ran dry during this update.
    pub fn update_all(&mut self, dt: f32, now: f64) -> Vec<String> {
        let mut depleted = Vec::new();
        for field in self.fields.iter_mut() {
            let was_depleted = field.is_depleted();
            field.update(dt, now);
            if field.is_depleted() && !was_depleted {
                depleted.push(field.id.clone());
            }
        }
        depleted
    }

    fn nearest_index(&self, x: f32, y: f32, resource_type: Option<&str>) -> Option<usize> {
        let mut best: Option<(usize, f32)> = None;
        for (index, field) in self.fields.iter().enumerate() {
            if field.is_depleted() {
                continue;
            }
            if let Some(wanted) = resource_type {
                if field.resource_type != wanted {
                    continue;
                }
            }
            let distance = field.distance_to(x, y);
            if best.map_or(true, |(_, d)| distance < d) {
                best = Some((index, distance));
            }
        }
        best.map(|(index, _)| index)
    }

    /// Closest non-depleted field by distance to its center, optionally of
    /// one resource type. Ties go to the earliest registered field.
    pub fn find_nearest(
        &self,
        x: f32,
        y: f32,
        resource_type: Option<&str>,
    ) -> Option<&ResourceField> {
        let index = self.nearest_index(x, y, resource_type)?;
        Some(&self.fields[index])
    }

    pub fn find_nearest_mut(
        &mut self,
        x: f32,
        y: f32,
        resource_type: Option<&str>,
    ) -> Option<&mut ResourceField> {
        let index = self.nearest_index(x, y, resource_type)?;
        Some(&mut self.fields[index])
    }

    /// Consume from the nearest matching field. `None` when no field qualifies.
    pub fn consume_nearest(
        &mut self,
        x: f32,
        y: f32,
        resource_type: Option<&str>,
        amount: f32,
        now: f64,
    ) -> Option<Consumption> {
        let field = self.find_nearest_mut(x, y, resource_type)?;
        let amount = field.consume(x, y, amount, now);
        Some(Consumption {
            field_id: field.id.clone(),
            resource_type: field.resource_type.clone(),
            amount,
        })
    }
}
