//! Value types a data source can observe.
//!
//! The set is closed: `bool`, `i32`, `f32`, `u8`, [`Vec3`], [`Rotator`] and
//! [`Transform`]. Composite values decompose into a fixed number of `f32`
//! channels, which drive both the CSV column layout and min/max aggregation.

use serde::{Deserialize, Serialize};

use crate::recorder::csv::CsvSink;
use crate::recorder::source::{Probe, SourceKind};

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Vec3 {
    pub x: f32,
    pub y: f32,
    pub z: f32,
}

impl Vec3 {
    pub const ZERO: Vec3 = Vec3 { x: 0.0, y: 0.0, z: 0.0 };
    pub const ONE: Vec3 = Vec3 { x: 1.0, y: 1.0, z: 1.0 };

    pub const fn new(x: f32, y: f32, z: f32) -> Self {
        Self { x, y, z }
    }
}

/// Euler rotation in degrees.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Rotator {
    pub pitch: f32,
    pub yaw: f32,
    pub roll: f32,
}

impl Rotator {
    pub const ZERO: Rotator = Rotator { pitch: 0.0, yaw: 0.0, roll: 0.0 };

    pub const fn new(pitch: f32, yaw: f32, roll: f32) -> Self {
        Self { pitch, yaw, roll }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Transform {
    pub location: Vec3,
    pub rotation: Rotator,
    pub scale: Vec3,
}

impl Transform {
    pub const IDENTITY: Transform = Transform {
        location: Vec3::ZERO,
        rotation: Rotator::ZERO,
        scale: Vec3::ONE,
    };
}

impl Default for Transform {
    fn default() -> Self {
        Self::IDENTITY
    }
}

/// RGBA label color. Fully transparent means "pick one for me".
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Color {
    pub r: u8,
    pub g: u8,
    pub b: u8,
    pub a: u8,
}

impl Color {
    pub const TRANSPARENT: Color = Color { r: 0, g: 0, b: 0, a: 0 };

    pub const fn rgb(r: u8, g: u8, b: u8) -> Self {
        Self { r, g, b, a: 255 }
    }

    pub fn is_transparent(&self) -> bool {
        *self == Self::TRANSPARENT
    }

    /// Fully saturated color for a hue in degrees.
    pub fn from_hue(hue: f32) -> Self {
        let h = hue.rem_euclid(360.0) / 60.0;
        let x = 1.0 - (h % 2.0 - 1.0).abs();
        let (r, g, b) = match h as u32 {
            0 => (1.0, x, 0.0),
            1 => (x, 1.0, 0.0),
            2 => (0.0, 1.0, x),
            3 => (0.0, x, 1.0),
            4 => (x, 0.0, 1.0),
            _ => (1.0, 0.0, x),
        };
        let to_u8 = |c: f32| (c * 255.0).round() as u8;
        Self::rgb(to_u8(r), to_u8(g), to_u8(b))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ValueType {
    Bool,
    Int,
    Float,
    Byte,
    Vector,
    Rotator,
    Transform,
}

const SCALAR_SUFFIXES: &[&str] = &[""];
const VECTOR_SUFFIXES: &[&str] = &[".X", ".Y", ".Z"];
const ROTATOR_SUFFIXES: &[&str] = &[".Roll", ".Pitch", ".Yaw"];
const TRANSFORM_SUFFIXES: &[&str] = &[
    ".Location.X",
    ".Location.Y",
    ".Location.Z",
    ".Rotation.Roll",
    ".Rotation.Pitch",
    ".Rotation.Yaw",
    ".Scale.X",
    ".Scale.Y",
    ".Scale.Z",
];

impl ValueType {
    pub fn is_composite(&self) -> bool {
        matches!(self, ValueType::Vector | ValueType::Rotator | ValueType::Transform)
    }

    /// Header suffix per CSV column, in column order.
    pub fn column_suffixes(&self) -> &'static [&'static str] {
        match self {
            ValueType::Bool | ValueType::Int | ValueType::Float | ValueType::Byte => SCALAR_SUFFIXES,
            ValueType::Vector => VECTOR_SUFFIXES,
            ValueType::Rotator => ROTATOR_SUFFIXES,
            ValueType::Transform => TRANSFORM_SUFFIXES,
        }
    }

    pub fn column_count(&self) -> usize {
        self.column_suffixes().len()
    }
}

/// A single observed value of any traceable type.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum TraceValue {
    Bool(bool),
    Int(i32),
    Float(f32),
    Byte(u8),
    Vector(Vec3),
    Rotator(Rotator),
    Transform(Transform),
}

impl TraceValue {
    pub fn value_type(&self) -> ValueType {
        match self {
            TraceValue::Bool(_) => ValueType::Bool,
            TraceValue::Int(_) => ValueType::Int,
            TraceValue::Float(_) => ValueType::Float,
            TraceValue::Byte(_) => ValueType::Byte,
            TraceValue::Vector(_) => ValueType::Vector,
            TraceValue::Rotator(_) => ValueType::Rotator,
            TraceValue::Transform(_) => ValueType::Transform,
        }
    }

    /// Numeric channels in CSV column order.
    pub fn channels(&self) -> Vec<f32> {
        match *self {
            TraceValue::Bool(v) => vec![v.channel(0)],
            TraceValue::Int(v) => vec![v.channel(0)],
            TraceValue::Float(v) => vec![v],
            TraceValue::Byte(v) => vec![v.channel(0)],
            TraceValue::Vector(v) => (0..3).map(|i| v.channel(i)).collect(),
            TraceValue::Rotator(v) => (0..3).map(|i| v.channel(i)).collect(),
            TraceValue::Transform(v) => (0..9).map(|i| v.channel(i)).collect(),
        }
    }
}

/// Formats a float the way the CSV export expects: shortest round-trip form,
/// with a trailing `.0` on integral values.
pub fn format_float(value: f32) -> String {
    if value.is_finite() && value.fract() == 0.0 {
        format!("{:.1}", value)
    } else {
        value.to_string()
    }
}

mod private {
    pub trait Sealed {}
    impl Sealed for bool {}
    impl Sealed for i32 {}
    impl Sealed for f32 {}
    impl Sealed for u8 {}
    impl Sealed for super::Vec3 {}
    impl Sealed for super::Rotator {}
    impl Sealed for super::Transform {}
}

/// Implemented by the seven types a data source can observe.
pub trait Traceable: private::Sealed + Copy + Default + PartialEq + Send + Sync + std::fmt::Debug + 'static {
    const VALUE_TYPE: ValueType;

    fn into_value(self) -> TraceValue;

    /// Channel `index` as `f32`; see [`ValueType::column_suffixes`] for the order.
    fn channel(&self, index: usize) -> f32;

    /// Appends the serialized column(s) of this value to the current row.
    fn write_csv(&self, sink: &mut CsvSink) {
        for i in 0..Self::VALUE_TYPE.column_count() {
            sink.push_field(&format_float(self.channel(i)));
        }
    }

    #[doc(hidden)]
    fn wrap(probe: Probe<Self>) -> SourceKind;

    #[doc(hidden)]
    fn unwrap(kind: &SourceKind) -> Option<&Probe<Self>>;
}

macro_rules! traceable {
    ($ty:ty, $variant:ident) => {
        #[doc(hidden)]
        fn wrap(probe: Probe<$ty>) -> SourceKind {
            SourceKind::$variant(probe)
        }

        #[doc(hidden)]
        fn unwrap(kind: &SourceKind) -> Option<&Probe<$ty>> {
            match kind {
                SourceKind::$variant(p) => Some(p),
                _ => None,
            }
        }
    };
}

impl Traceable for bool {
    const VALUE_TYPE: ValueType = ValueType::Bool;

    fn into_value(self) -> TraceValue {
        TraceValue::Bool(self)
    }

    fn channel(&self, _index: usize) -> f32 {
        if *self { 1.0 } else { 0.0 }
    }

    fn write_csv(&self, sink: &mut CsvSink) {
        sink.push_field(if *self { "1" } else { "0" });
    }

    traceable!(bool, Bool);
}

impl Traceable for i32 {
    const VALUE_TYPE: ValueType = ValueType::Int;

    fn into_value(self) -> TraceValue {
        TraceValue::Int(self)
    }

    fn channel(&self, _index: usize) -> f32 {
        *self as f32
    }

    fn write_csv(&self, sink: &mut CsvSink) {
        sink.push_field(&self.to_string());
    }

    traceable!(i32, Int);
}

impl Traceable for f32 {
    const VALUE_TYPE: ValueType = ValueType::Float;

    fn into_value(self) -> TraceValue {
        TraceValue::Float(self)
    }

    fn channel(&self, _index: usize) -> f32 {
        *self
    }

    traceable!(f32, Float);
}

impl Traceable for u8 {
    const VALUE_TYPE: ValueType = ValueType::Byte;

    fn into_value(self) -> TraceValue {
        TraceValue::Byte(self)
    }

    fn channel(&self, _index: usize) -> f32 {
        f32::from(*self)
    }

    fn write_csv(&self, sink: &mut CsvSink) {
        sink.push_field(&self.to_string());
    }

    traceable!(u8, Byte);
}

impl Traceable for Vec3 {
    const VALUE_TYPE: ValueType = ValueType::Vector;

    fn into_value(self) -> TraceValue {
        TraceValue::Vector(self)
    }

    fn channel(&self, index: usize) -> f32 {
        match index {
            0 => self.x,
            1 => self.y,
            _ => self.z,
        }
    }

    traceable!(Vec3, Vector);
}

impl Traceable for Rotator {
    const VALUE_TYPE: ValueType = ValueType::Rotator;

    fn into_value(self) -> TraceValue {
        TraceValue::Rotator(self)
    }

    // Roll, Pitch, Yaw
    fn channel(&self, index: usize) -> f32 {
        match index {
            0 => self.roll,
            1 => self.pitch,
            _ => self.yaw,
        }
    }

    traceable!(Rotator, Rotator);
}

impl Traceable for Transform {
    const VALUE_TYPE: ValueType = ValueType::Transform;

    fn into_value(self) -> TraceValue {
        TraceValue::Transform(self)
    }

    fn channel(&self, index: usize) -> f32 {
        match index {
            0..=2 => self.location.channel(index),
            3..=5 => self.rotation.channel(index - 3),
            _ => self.scale.channel(index - 6),
        }
    }

    traceable!(Transform, Transform);
}
