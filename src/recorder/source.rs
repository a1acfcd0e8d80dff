//! A data source samples one observed field into a fixed window of history.

use std::mem::size_of;

use crate::field::{FieldId, FieldRef, TracedField};
use crate::recorder::csv::CsvSink;
use crate::recorder::ring_buffer::{RingBuffer, Sample};
use crate::value::{Color, Rotator, TraceValue, Traceable, Transform, ValueType, Vec3};

/// Typed half of a data source: the weak field reference and its samples.
#[derive(Debug, Clone)]
pub struct Probe<T> {
    field: FieldRef<T>,
    samples: RingBuffer<Sample<T>>,
}

impl<T: Traceable> Probe<T> {
    fn new(field: FieldRef<T>, window: usize) -> Self {
        Self {
            field,
            samples: RingBuffer::new(window),
        }
    }

    fn sample(&mut self, frame: u64, elapsed_time: f32, csv: Option<&mut CsvSink>) {
        let Some(value) = self.field.read() else {
            if let Some(sink) = csv {
                for _ in 0..T::VALUE_TYPE.column_count() {
                    sink.push_empty();
                }
            }
            return;
        };

        self.samples.push(Sample {
            frame,
            elapsed_time,
            value,
        });

        if let Some(sink) = csv {
            value.write_csv(sink);
        }
    }

    fn physical_memory_size(&self) -> u64 {
        (size_of::<T>() * self.samples.capacity()) as u64
    }

    fn value_range(&self) -> Option<Vec<(f32, f32)>> {
        let first = self.samples.get(0)?;
        let channels = T::VALUE_TYPE.column_count();
        let mut range: Vec<(f32, f32)> = (0..channels)
            .map(|c| {
                let v = first.value.channel(c);
                (v, v)
            })
            .collect();
        for sample in self.samples.iter().skip(1) {
            for (c, (lo, hi)) in range.iter_mut().enumerate() {
                let v = sample.value.channel(c);
                *lo = lo.min(v);
                *hi = hi.max(v);
            }
        }
        Some(range)
    }

    pub fn field(&self) -> &FieldRef<T> {
        &self.field
    }

    pub fn samples(&self) -> &RingBuffer<Sample<T>> {
        &self.samples
    }
}

/// One probe per traceable type.
#[derive(Debug, Clone)]
pub enum SourceKind {
    Bool(Probe<bool>),
    Int(Probe<i32>),
    Float(Probe<f32>),
    Byte(Probe<u8>),
    Vector(Probe<Vec3>),
    Rotator(Probe<Rotator>),
    Transform(Probe<Transform>),
}

macro_rules! with_probe {
    ($kind:expr, $p:ident => $body:expr) => {
        match $kind {
            SourceKind::Bool($p) => $body,
            SourceKind::Int($p) => $body,
            SourceKind::Float($p) => $body,
            SourceKind::Byte($p) => $body,
            SourceKind::Vector($p) => $body,
            SourceKind::Rotator($p) => $body,
            SourceKind::Transform($p) => $body,
        }
    };
}

#[derive(Debug, Clone)]
pub struct DataSource {
    name: String,
    group: String,
    description: String,
    color: Color,
    stream_to_csv: bool,
    kind: SourceKind,
}

impl DataSource {
    /// Observes `field` with a history of `window` samples.
    pub fn new<T: Traceable>(field: &TracedField<T>, name: impl Into<String>, window: usize) -> Self {
        Self::from_ref(field.downgrade(), name, window)
    }

    pub fn from_ref<T: Traceable>(field: FieldRef<T>, name: impl Into<String>, window: usize) -> Self {
        Self {
            name: name.into(),
            group: String::new(),
            description: String::new(),
            color: Color::TRANSPARENT,
            stream_to_csv: true,
            kind: T::wrap(Probe::new(field, window)),
        }
    }

    pub fn with_group(mut self, group: impl Into<String>) -> Self {
        self.group = group.into();
        self
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    pub fn with_color(mut self, color: Color) -> Self {
        self.color = color;
        self
    }

    pub fn with_csv(mut self, stream_to_csv: bool) -> Self {
        self.stream_to_csv = stream_to_csv;
        self
    }

    /// Records the field's current value. An invalid field records nothing and
    /// writes empty CSV columns in its place.
    pub fn sample(&mut self, frame: u64, elapsed_time: f32, csv: Option<&mut CsvSink>) {
        let csv = if self.stream_to_csv { csv } else { None };
        with_probe!(&mut self.kind, p => p.sample(frame, elapsed_time, csv))
    }

    pub fn clear(&mut self) {
        with_probe!(&mut self.kind, p => p.samples.clear())
    }

    /// Bytes reserved for the full window, independent of how much is filled.
    pub fn physical_memory_size(&self) -> u64 {
        with_probe!(&self.kind, p => p.physical_memory_size())
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn group(&self) -> &str {
        &self.group
    }

    pub fn description(&self) -> &str {
        &self.description
    }

    pub fn color(&self) -> Color {
        self.color
    }

    pub fn set_color(&mut self, color: Color) {
        self.color = color;
    }

    pub(crate) fn set_group(&mut self, group: String) {
        self.group = group;
    }

    pub fn streams_to_csv(&self) -> bool {
        self.stream_to_csv
    }

    pub fn value_type(&self) -> ValueType {
        match &self.kind {
            SourceKind::Bool(_) => ValueType::Bool,
            SourceKind::Int(_) => ValueType::Int,
            SourceKind::Float(_) => ValueType::Float,
            SourceKind::Byte(_) => ValueType::Byte,
            SourceKind::Vector(_) => ValueType::Vector,
            SourceKind::Rotator(_) => ValueType::Rotator,
            SourceKind::Transform(_) => ValueType::Transform,
        }
    }

    /// Identity of the observed field; two sources with the same id are duplicates.
    pub fn field_id(&self) -> FieldId {
        with_probe!(&self.kind, p => p.field.id())
    }

    pub fn is_observing(&self) -> bool {
        with_probe!(&self.kind, p => p.field.is_valid())
    }

    pub fn window_size(&self) -> usize {
        with_probe!(&self.kind, p => p.samples.capacity())
    }

    pub fn sample_count(&self) -> usize {
        with_probe!(&self.kind, p => p.samples.len())
    }

    pub fn frame_at(&self, index: usize) -> Option<u64> {
        with_probe!(&self.kind, p => p.samples.get(index).map(|s| s.frame))
    }

    pub fn elapsed_time_at(&self, index: usize) -> Option<f32> {
        with_probe!(&self.kind, p => p.samples.get(index).map(|s| s.elapsed_time))
    }

    pub fn value_at(&self, index: usize) -> Option<TraceValue> {
        with_probe!(&self.kind, p => p.samples.get(index).map(|s| s.value.into_value()))
    }

    pub fn latest(&self) -> Option<TraceValue> {
        self.sample_count()
            .checked_sub(1)
            .and_then(|i| self.value_at(i))
    }

    /// Per-channel `(min, max)` over the retained window, `None` when empty.
    pub fn value_range(&self) -> Option<Vec<(f32, f32)>> {
        with_probe!(&self.kind, p => p.value_range())
    }

    /// Typed access to the samples when `T` matches the observed type.
    pub fn samples<T: Traceable>(&self) -> Option<&RingBuffer<Sample<T>>> {
        T::unwrap(&self.kind).map(|p| p.samples())
    }

    pub fn kind(&self) -> &SourceKind {
        &self.kind
    }
}
