//! Declarative control table: which control shows which field, and how.

use std::f32::consts::PI;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Axis {
    X,
    Y,
    Z,
}

impl Axis {
    pub const ALL: [Axis; 3] = [Axis::X, Axis::Y, Axis::Z];

    pub fn index(self) -> usize {
        match self {
            Axis::X => 0,
            Axis::Y => 1,
            Axis::Z => 2,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Target {
    Position(Axis),
    Rotation(Axis),
    Scale(Axis),
    Color,
}

impl Target {
    pub fn is_numeric(self) -> bool {
        !matches!(self, Target::Color)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ControlKind {
    Number,
    Slider,
    Color,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ValueRange {
    pub min: f32,
    pub max: f32,
}

impl ValueRange {
    pub const fn new(min: f32, max: f32) -> Self {
        Self { min, max }
    }

    pub fn symmetric(limit: f32) -> Self {
        Self::new(-limit, limit)
    }

    pub fn clamp(&self, value: f32) -> f32 {
        value.clamp(self.min, self.max)
    }

    pub fn is_valid(&self) -> bool {
        self.min.is_finite() && self.max.is_finite() && self.min <= self.max
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct BindingSpec {
    pub control_id: String,
    pub kind: ControlKind,
    pub target: Target,
    pub range: Option<ValueRange>,
    pub step: f32,
}

impl BindingSpec {
    pub fn new(
        control_id: impl Into<String>,
        kind: ControlKind,
        target: Target,
        range: Option<ValueRange>,
        step: f32,
    ) -> Self {
        Self {
            control_id: control_id.into(),
            kind,
            target,
            range,
            step,
        }
    }
}

pub const POSITION_RANGE: ValueRange = ValueRange::new(-10.0, 10.0);
pub const ROTATION_RANGE: ValueRange = ValueRange::new(-PI, PI);
pub const POSITION_STEP: f32 = 0.1;
pub const ROTATION_STEP: f32 = 0.1;
pub const SCALE_STEP: f32 = 0.5;
/// Color swatches have no numeric step; this only satisfies validation.
pub const COLOR_STEP: f32 = 1.0;

/// Standard inspector layout: color, position, rotation, scale.
pub fn default_table(scale_limit: f32) -> Vec<BindingSpec> {
    let mut table = vec![BindingSpec::new(
        "field01",
        ControlKind::Color,
        Target::Color,
        None,
        COLOR_STEP,
    )];
    let scale_range = ValueRange::symmetric(scale_limit.abs());
    for axis in Axis::ALL {
        let n = axis.index();
        table.push(BindingSpec::new(
            format!("field0{}", 2 + n),
            ControlKind::Number,
            Target::Position(axis),
            Some(POSITION_RANGE),
            POSITION_STEP,
        ));
    }
    for axis in Axis::ALL {
        let n = axis.index();
        table.push(BindingSpec::new(
            format!("field0{}", 5 + n),
            ControlKind::Number,
            Target::Rotation(axis),
            Some(ROTATION_RANGE),
            ROTATION_STEP,
        ));
    }
    for axis in Axis::ALL {
        let n = axis.index();
        table.push(BindingSpec::new(
            format!("range0{}", 1 + n),
            ControlKind::Slider,
            Target::Scale(axis),
            Some(scale_range),
            SCALE_STEP,
        ));
    }
    table
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::default_layout;

    #[test]
    fn default_table_covers_default_layout() {
        let table = default_table(30.0);
        let layout = default_layout();
        assert_eq!(table.len(), layout.len());
        for slot in &layout {
            assert!(
                table.iter().any(|spec| spec.control_id == slot.id),
                "no binding for {}",
                slot.id
            );
        }
    }

    #[test]
    fn default_table_ranges() {
        let table = default_table(5.0);
        let find = |target: Target| table.iter().find(|spec| spec.target == target).unwrap();

        let px = find(Target::Position(Axis::X));
        assert_eq!(px.control_id, "field02");
        assert_eq!(px.range, Some(ValueRange::new(-10.0, 10.0)));
        assert_eq!(px.step, 0.1);

        let rz = find(Target::Rotation(Axis::Z));
        assert_eq!(rz.control_id, "field07");
        assert_eq!(rz.range, Some(ValueRange::new(-PI, PI)));

        let sy = find(Target::Scale(Axis::Y));
        assert_eq!(sy.control_id, "range02");
        assert_eq!(sy.kind, ControlKind::Slider);
        assert_eq!(sy.range, Some(ValueRange::new(-5.0, 5.0)));
        assert_eq!(sy.step, 0.5);

        assert_eq!(find(Target::Color).kind, ControlKind::Color);
    }

    #[test]
    fn range_validation() {
        assert!(ValueRange::new(-1.0, 1.0).is_valid());
        assert!(ValueRange::new(2.0, 2.0).is_valid());
        assert!(!ValueRange::new(1.0, -1.0).is_valid());
        assert!(!ValueRange::new(f32::NAN, 1.0).is_valid());
        assert_eq!(ValueRange::symmetric(10.0).clamp(15.0), 10.0);
        assert_eq!(ValueRange::symmetric(10.0).clamp(-15.0), -10.0);
    }
}
