use serde::{Deserialize, Serialize};
use tether_bindables::{AggregateBindable, Bindable, BindableDouble, BindableError, ReadBindable};
use tracing::debug;

/// Properties of an audio component that can be adjusted
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum AdjustableProperty {
    /// Loudness, `0..=1`
    Volume,
    /// Stereo balance, `-1..=1` with 0 centered
    Balance,
    /// Playback rate affecting pitch. 1 is the original rate.
    Frequency,
    /// Playback rate preserving pitch. 1 is the original rate.
    Tempo,
}

impl AdjustableProperty {
    pub const ALL: [AdjustableProperty; 4] = [Self::Volume, Self::Balance, Self::Frequency, Self::Tempo];

    /// The value that leaves an aggregate unchanged when combined into it
    pub fn identity(self) -> f64 {
        match self {
            Self::Balance => 0.0,
            Self::Volume | Self::Frequency | Self::Tempo => 1.0,
        }
    }

    /// Balance adjustments add up, the others multiply
    pub fn combine(self, a: f64, b: f64) -> f64 {
        match self {
            Self::Balance => a + b,
            Self::Volume | Self::Frequency | Self::Tempo => a * b,
        }
    }

    fn index(self) -> usize {
        match self {
            Self::Volume => 0,
            Self::Balance => 1,
            Self::Frequency => 2,
            Self::Tempo => 3,
        }
    }
}

/// Anything exposing aggregated audio adjustments
pub trait AggregateAudioAdjustment {
    fn aggregate(&self, property: AdjustableProperty) -> ReadBindable<f64>;

    fn aggregate_volume(&self) -> ReadBindable<f64> { self.aggregate(AdjustableProperty::Volume) }

    fn aggregate_balance(&self) -> ReadBindable<f64> { self.aggregate(AdjustableProperty::Balance) }

    fn aggregate_frequency(&self) -> ReadBindable<f64> { self.aggregate(AdjustableProperty::Frequency) }

    fn aggregate_tempo(&self) -> ReadBindable<f64> { self.aggregate(AdjustableProperty::Tempo) }
}

/// The adjustable volume, balance, frequency and tempo of an audio component.
///
/// Each property has an aggregate combining the component's own value with any number of
/// external adjustments, including the aggregates of a parent component (a mixer, a track
/// group) via [`AudioAdjustments::bind_adjustments`].
pub struct AudioAdjustments {
    properties: [BindableDouble; 4],
    aggregates: [AggregateBindable<f64>; 4],
}

impl Default for AudioAdjustments {
    fn default() -> Self { Self::new() }
}

impl AudioAdjustments {
    pub fn new() -> Self {
        let properties = AdjustableProperty::ALL.map(|property| BindableDouble::new(property.identity()));
        for (property, min, max) in [(AdjustableProperty::Volume, 0.0, 1.0), (AdjustableProperty::Balance, -1.0, 1.0)] {
            let bindable = &properties[property.index()];
            bindable.set_min_value(min).expect("identity values are within range");
            bindable.set_max_value(max).expect("identity values are within range");
        }

        let aggregates = AdjustableProperty::ALL.map(|property| {
            let aggregate = AggregateBindable::new(move |a: &f64, b: &f64| property.combine(*a, *b), Bindable::new(property.identity()));
            aggregate.add_source(&properties[property.index()]).expect("a fresh aggregate accepts its own property");
            aggregate
        });
        Self { properties, aggregates }
    }

    pub fn property(&self, property: AdjustableProperty) -> &BindableDouble { &self.properties[property.index()] }

    pub fn volume(&self) -> &BindableDouble { self.property(AdjustableProperty::Volume) }

    pub fn balance(&self) -> &BindableDouble { self.property(AdjustableProperty::Balance) }

    pub fn frequency(&self) -> &BindableDouble { self.property(AdjustableProperty::Frequency) }

    pub fn tempo(&self) -> &BindableDouble { self.property(AdjustableProperty::Tempo) }

    fn aggregator(&self, property: AdjustableProperty) -> &AggregateBindable<f64> { &self.aggregates[property.index()] }

    pub fn add_adjustment(&self, property: AdjustableProperty, adjustment: impl Into<ReadBindable<f64>>) -> Result<(), BindableError> {
        self.aggregator(property).add_source(adjustment)
    }

    pub fn remove_adjustment(&self, property: AdjustableProperty, adjustment: impl Into<ReadBindable<f64>>) -> Result<(), BindableError> {
        self.aggregator(property).remove_source(adjustment)
    }

    /// Removes every external adjustment of `property`, keeping the component's own value
    pub fn remove_all_adjustments(&self, property: AdjustableProperty) -> Result<(), BindableError> {
        let aggregate = self.aggregator(property);
        aggregate.remove_all_sources()?;
        aggregate.add_source(self.property(property))
    }

    /// Adds every aggregate of `component` as an adjustment of the matching property
    pub fn bind_adjustments(&self, component: &impl AggregateAudioAdjustment) -> Result<(), BindableError> {
        for property in AdjustableProperty::ALL {
            self.add_adjustment(property, component.aggregate(property))?;
        }
        debug!("bound audio adjustments");
        Ok(())
    }

    pub fn unbind_adjustments(&self, component: &impl AggregateAudioAdjustment) -> Result<(), BindableError> {
        for property in AdjustableProperty::ALL {
            self.remove_adjustment(property, component.aggregate(property))?;
        }
        debug!("unbound audio adjustments");
        Ok(())
    }
}

impl AggregateAudioAdjustment for AudioAdjustments {
    fn aggregate(&self, property: AdjustableProperty) -> ReadBindable<f64> { self.aggregator(property).result() }
}

impl std::fmt::Debug for AudioAdjustments {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AudioAdjustments")
            .field("volume", &self.aggregate_volume().value())
            .field("balance", &self.aggregate_balance().value())
            .field("frequency", &self.aggregate_frequency().value())
            .field("tempo", &self.aggregate_tempo().value())
            .finish()
    }
}
