//! Station samples
//!
//! Date-stamped measurement records and the station directory mapping
//! station ids to geographic coordinates. Invalid samples (missing or
//! non-finite values) are filtered out before any interpolator is
//! built; projection into pixel space is an opaque closure supplied by
//! the map-rendering collaborator.

use std::collections::HashMap;
use std::f64::consts::TAU;

use serde::{Deserialize, Serialize};
use windfield_core::{Error, Result, Vector2};

use crate::interpolation::SamplePoint;

/// One measuring station as delivered by the directory feed:
/// `[id, name, address, longitude, latitude]`.
#[derive(Debug, Clone, Deserialize)]
pub struct StationRow(pub u64, pub String, pub String, pub f64, pub f64);

#[derive(Debug, Clone, PartialEq)]
pub struct Station {
    pub station_id: u64,
    pub name: String,
    pub address: String,
    pub longitude: f64,
    pub latitude: f64,
}

/// Directory of stations keyed by id.
#[derive(Debug, Clone, Default)]
pub struct StationDirectory {
    stations: HashMap<u64, Station>,
}

impl StationDirectory {
    pub fn from_rows(rows: Vec<StationRow>) -> Self {
        let stations = rows
            .into_iter()
            .map(|StationRow(station_id, name, address, longitude, latitude)| {
                (
                    station_id,
                    Station {
                        station_id,
                        name,
                        address,
                        longitude,
                        latitude,
                    },
                )
            })
            .collect();
        Self { stations }
    }

    pub fn get(&self, station_id: u64) -> Option<&Station> {
        self.stations.get(&station_id)
    }

    /// All stations, in no defined order.
    pub fn stations(&self) -> impl Iterator<Item = &Station> {
        self.stations.values()
    }

    pub fn len(&self) -> usize {
        self.stations.len()
    }

    pub fn is_empty(&self) -> bool {
        self.stations.is_empty()
    }
}

/// A dated batch of samples. Absent feeds deserialize to an empty batch.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SampleSet<S> {
    #[serde(default)]
    pub date: Option<String>,
    #[serde(default = "Vec::new")]
    pub samples: Vec<S>,
}

/// A wind measurement: meteorological direction (degrees, 0 = from the
/// north) and speed in m/s. Either field may be missing in the feed.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WindSample {
    #[serde(rename = "stationId")]
    pub station_id: u64,
    #[serde(rename = "wd", default)]
    pub direction: Option<f64>,
    #[serde(rename = "wv", default)]
    pub speed: Option<f64>,
}

impl WindSample {
    /// The (direction, speed) pair if both are present and finite.
    pub fn wind(&self) -> Option<(f64, f64)> {
        match (self.direction, self.speed) {
            (Some(d), Some(s)) if d.is_finite() && s.is_finite() => Some((d, s)),
            _ => None,
        }
    }
}

/// A scalar measurement of whatever quantity the overlay displays.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScalarSample {
    #[serde(rename = "stationId")]
    pub station_id: u64,
    #[serde(default)]
    pub value: Option<f64>,
}

impl ScalarSample {
    pub fn finite_value(&self) -> Option<f64> {
        self.value.filter(|v| v.is_finite())
    }
}

/// Convert a meteorological wind vector to pixel space.
///
/// Direction is where the wind comes *from*: wind from the NW at speed 2
/// becomes a vector pointing to the SE. The meridional component is
/// negated once more because pixel y grows downwards.
/// See <http://mst.nerc.ac.uk/wind_vect_convs.html>.
pub fn componentize(direction_deg: f64, speed: f64) -> Vector2 {
    let phi = direction_deg / 360.0 * TAU;
    let u = -speed * phi.sin(); // zonal velocity
    let v = -speed * phi.cos(); // meridional velocity
    Vector2::new(u, -v)
}

/// Convert samples to points in pixel space, extracting a value from
/// each sample or dropping it when the transform declines. Samples from
/// unknown stations are dropped too.
pub fn build_points<S, V, P, T>(
    stations: &StationDirectory,
    samples: &[S],
    project: P,
    transform: T,
) -> Vec<SamplePoint<V>>
where
    P: Fn(f64, f64) -> (f64, f64),
    T: Fn(&S) -> Option<(u64, V)>,
{
    samples
        .iter()
        .filter_map(|sample| {
            let (station_id, value) = transform(sample)?;
            let station = stations.get(station_id)?;
            let (x, y) = project(station.longitude, station.latitude);
            Some(SamplePoint { x, y, value })
        })
        .collect()
}

/// Pixel-space wind vectors for every valid wind sample.
///
/// # Errors
/// [`Error::NoValidSamples`] when filtering leaves nothing.
pub fn wind_points<P>(
    stations: &StationDirectory,
    samples: &[WindSample],
    project: P,
) -> Result<Vec<SamplePoint<Vector2>>>
where
    P: Fn(f64, f64) -> (f64, f64),
{
    let points = build_points(stations, samples, project, |sample: &WindSample| {
        sample
            .wind()
            .map(|(d, s)| (sample.station_id, componentize(d, s)))
    });
    if points.is_empty() {
        return Err(Error::NoValidSamples);
    }
    Ok(points)
}

/// Pixel-space scalar values for every valid scalar sample.
///
/// # Errors
/// [`Error::NoValidSamples`] when filtering leaves nothing.
pub fn scalar_points<P>(
    stations: &StationDirectory,
    samples: &[ScalarSample],
    project: P,
) -> Result<Vec<SamplePoint>>
where
    P: Fn(f64, f64) -> (f64, f64),
{
    let points = build_points(stations, samples, project, |sample: &ScalarSample| {
        sample.finite_value().map(|v| (sample.station_id, v))
    });
    if points.is_empty() {
        return Err(Error::NoValidSamples);
    }
    Ok(points)
}
