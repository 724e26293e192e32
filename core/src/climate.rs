//! External climate data: the adapter seam and the snapshot it feeds.
//!
//! The remote data client is an external collaborator. The core only
//! needs the four readings below and treats every failed call as
//! "no update this cycle": the last-known reading is kept.
//!
//! RULE: refresh results are merged into `GameState.environmental_snapshot`
//! field by field. A completed fetch never replaces the whole state, so a
//! late completion cannot clobber resources changed by an intervening turn.
//! Last completed merge wins.

use crate::{error::FetchError, state::GameState, types::Year};
use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SeaLevelReading {
    /// Metres above the 1993 baseline.
    pub current_rise: f64,
    /// Millimetres per year.
    pub trend:        f64,
    pub source:       String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TemperatureReading {
    /// Degrees C above the pre-industrial mean.
    pub anomaly: f64,
    /// Degrees C per decade.
    pub trend:   f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Co2Reading {
    /// Parts per million.
    pub level: f64,
    pub trend: f64,
}

/// A real-world event reported by the data provider.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClimateEventReport {
    pub title:     String,
    pub kind:      String,
    /// Severity in [0, 1].
    pub magnitude: f64,
    pub date:      DateTime<Utc>,
}

/// Last-known external trend data.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct EnvironmentalSnapshot {
    #[serde(default)]
    pub sea_level:     Option<SeaLevelReading>,
    #[serde(default)]
    pub temperature:   Option<TemperatureReading>,
    #[serde(default)]
    pub co2:           Option<Co2Reading>,
    #[serde(default)]
    pub recent_events: Vec<ClimateEventReport>,
    #[serde(default)]
    pub last_updated:  Option<DateTime<Utc>>,
}

/// The result of one refresh cycle. `None` means "no update".
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SnapshotUpdate {
    pub sea_level:     Option<SeaLevelReading>,
    pub temperature:   Option<TemperatureReading>,
    pub co2:           Option<Co2Reading>,
    pub recent_events: Option<Vec<ClimateEventReport>>,
    pub completed_at:  DateTime<Utc>,
}

impl SnapshotUpdate {
    pub fn is_empty(&self) -> bool {
        self.sea_level.is_none()
            && self.temperature.is_none()
            && self.co2.is_none()
            && self.recent_events.is_none()
    }
}

impl EnvironmentalSnapshot {
    /// Fold a completed update in. Fields the update lacks keep their
    /// last-known value.
    pub fn merge(&mut self, update: SnapshotUpdate) {
        if update.is_empty() {
            return;
        }
        if let Some(v) = update.sea_level     { self.sea_level = Some(v); }
        if let Some(v) = update.temperature   { self.temperature = Some(v); }
        if let Some(v) = update.co2           { self.co2 = Some(v); }
        if let Some(v) = update.recent_events { self.recent_events = v; }
        self.last_updated = Some(update.completed_at);
    }
}

impl GameState {
    /// Merge a completed refresh into the live snapshot.
    pub fn merge_snapshot(&mut self, update: SnapshotUpdate) {
        if update.is_empty() {
            return;
        }
        self.environmental_snapshot
            .get_or_insert_with(EnvironmentalSnapshot::default)
            .merge(update);
    }
}

/// The remote data provider. Every call may fail independently.
pub trait ClimateDataSource {
    fn name(&self) -> &str;
    fn fetch_sea_level(&mut self) -> Result<SeaLevelReading, FetchError>;
    fn fetch_temperature(&mut self) -> Result<TemperatureReading, FetchError>;
    fn fetch_co2(&mut self) -> Result<Co2Reading, FetchError>;
    fn fetch_recent_events(&mut self, limit: usize) -> Result<Vec<ClimateEventReport>, FetchError>;
}

/// What one refresh cycle managed to fetch.
#[derive(Debug, Clone, Default)]
pub struct RefreshReport {
    pub updated:  Vec<&'static str>,
    pub failures: Vec<FetchError>,
}

/// Query every reading once. Failures are logged and reported, never raised.
pub fn fetch_update(source: &mut dyn ClimateDataSource, event_limit: usize) -> (SnapshotUpdate, RefreshReport) {
    let mut report = RefreshReport::default();
    let mut update = SnapshotUpdate {
        completed_at: Utc::now(),
        ..SnapshotUpdate::default()
    };

    update.sea_level = keep(source.fetch_sea_level(), "sea_level", &mut report);
    update.temperature = keep(source.fetch_temperature(), "temperature", &mut report);
    update.co2 = keep(source.fetch_co2(), "co2", &mut report);
    update.recent_events = keep(source.fetch_recent_events(event_limit), "recent_events", &mut report);

    (update, report)
}

fn keep<T>(result: Result<T, FetchError>, field: &'static str, report: &mut RefreshReport) -> Option<T> {
    match result {
        Ok(value) => {
            report.updated.push(field);
            Some(value)
        }
        Err(e) => {
            log::warn!("climate refresh: keeping last-known {field}: {e}");
            report.failures.push(e);
            None
        }
    }
}

/// Fetch and merge in one step, for hosts without an async runtime.
pub fn refresh_snapshot(
    state:       &mut GameState,
    source:      &mut dyn ClimateDataSource,
    event_limit: usize,
) -> RefreshReport {
    let (update, report) = fetch_update(source, event_limit);
    state.merge_snapshot(update);
    log::debug!(
        "climate refresh from {}: {} updated, {} failed",
        source.name(), report.updated.len(), report.failures.len()
    );
    report
}

/// Offline provider serving fixed reference figures. Used when no
/// remote client is configured and as the runner's default.
#[derive(Debug, Clone, Default)]
pub struct FallbackClimateData;

impl ClimateDataSource for FallbackClimateData {
    fn name(&self) -> &str { "fallback" }

    fn fetch_sea_level(&mut self) -> Result<SeaLevelReading, FetchError> {
        Ok(SeaLevelReading {
            current_rise: 0.08,
            trend:        3.4,
            source:       "satellite altimetry (fallback)".into(),
        })
    }

    fn fetch_temperature(&mut self) -> Result<TemperatureReading, FetchError> {
        Ok(TemperatureReading { anomaly: 1.1, trend: 0.02 })
    }

    fn fetch_co2(&mut self) -> Result<Co2Reading, FetchError> {
        Ok(Co2Reading { level: 420.0, trend: 2.5 })
    }

    fn fetch_recent_events(&mut self, limit: usize) -> Result<Vec<ClimateEventReport>, FetchError> {
        let now = Utc::now();
        let events = vec![
            ClimateEventReport {
                title:     "Sea Level Rise - Global Trend".into(),
                kind:      "Sea Level".into(),
                magnitude: 0.8,
                date:      now,
            },
            ClimateEventReport {
                title:     "Extreme Weather Events".into(),
                kind:      "Severe Storms".into(),
                magnitude: 0.6,
                date:      now - Duration::days(2),
            },
        ];
        Ok(events
            .into_iter()
            .filter(|e| e.magnitude > MIN_REPORTED_MAGNITUDE)
            .take(limit)
            .collect())
    }
}

/// Events at or below this magnitude are noise and not reported.
pub const MIN_REPORTED_MAGNITUDE: f64 = 0.3;

struct Cached<T> {
    value:      T,
    fetched_at: DateTime<Utc>,
}

/// Holds each successful reading for `ttl` before asking the inner source again.
pub struct CachedClimateData<S: ClimateDataSource> {
    inner:       S,
    ttl:         Duration,
    sea_level:   Option<Cached<SeaLevelReading>>,
    temperature: Option<Cached<TemperatureReading>>,
    co2:         Option<Cached<Co2Reading>>,
    events:      Option<(usize, Cached<Vec<ClimateEventReport>>)>,
}

pub const DEFAULT_CACHE_TTL_MINUTES: i64 = 30;

impl<S: ClimateDataSource> CachedClimateData<S> {
    pub fn new(inner: S) -> Self {
        Self::with_ttl(inner, Duration::minutes(DEFAULT_CACHE_TTL_MINUTES))
    }

    pub fn with_ttl(inner: S, ttl: Duration) -> Self {
        Self {
            inner,
            ttl,
            sea_level: None,
            temperature: None,
            co2: None,
            events: None,
        }
    }

    pub fn inner(&self) -> &S {
        &self.inner
    }

    fn fresh<T: Clone>(&self, entry: &Option<Cached<T>>) -> Option<T> {
        entry
            .as_ref()
            .filter(|c| Utc::now() - c.fetched_at < self.ttl)
            .map(|c| c.value.clone())
    }
}

fn cache<T: Clone>(slot: &mut Option<Cached<T>>, value: &T) {
    *slot = Some(Cached { value: value.clone(), fetched_at: Utc::now() });
}

impl<S: ClimateDataSource> ClimateDataSource for CachedClimateData<S> {
    fn name(&self) -> &str { self.inner.name() }

    fn fetch_sea_level(&mut self) -> Result<SeaLevelReading, FetchError> {
        if let Some(v) = self.fresh(&self.sea_level) {
            return Ok(v);
        }
        let v = self.inner.fetch_sea_level()?;
        cache(&mut self.sea_level, &v);
        Ok(v)
    }

    fn fetch_temperature(&mut self) -> Result<TemperatureReading, FetchError> {
        if let Some(v) = self.fresh(&self.temperature) {
            return Ok(v);
        }
        let v = self.inner.fetch_temperature()?;
        cache(&mut self.temperature, &v);
        Ok(v)
    }

    fn fetch_co2(&mut self) -> Result<Co2Reading, FetchError> {
        if let Some(v) = self.fresh(&self.co2) {
            return Ok(v);
        }
        let v = self.inner.fetch_co2()?;
        cache(&mut self.co2, &v);
        Ok(v)
    }

    fn fetch_recent_events(&mut self, limit: usize) -> Result<Vec<ClimateEventReport>, FetchError> {
        // Cached per limit, a different limit refetches.
        if let Some((cached_limit, entry)) = &self.events {
            if *cached_limit == limit && Utc::now() - entry.fetched_at < self.ttl {
                return Ok(entry.value.clone());
            }
        }
        let v = self.inner.fetch_recent_events(limit)?;
        self.events = Some((limit, Cached { value: v.clone(), fetched_at: Utc::now() }));
        Ok(v)
    }
}

/// Projected sea-level table used when no external reading is available.
const SEA_LEVEL_TABLE: &[(Year, f64)] = &[
    (2020, 0.00), (2025, 0.02), (2030, 0.05), (2035, 0.08),
    (2040, 0.12), (2045, 0.16), (2050, 0.20), (2055, 0.25),
    (2060, 0.30), (2070, 0.40), (2080, 0.55), (2090, 0.70),
    (2100, 0.85),
];

/// Sea-level rise in metres for the state's current year.
///
/// With a reading: `current_rise + (year - reference_year) * trend / 1000`.
/// Without one: the last table row at or before the year.
pub fn projected_sea_level(state: &GameState, reference_year: Year) -> f64 {
    if let Some(reading) = state
        .environmental_snapshot
        .as_ref()
        .and_then(|s| s.sea_level.as_ref())
    {
        let years_ahead = f64::from(state.current_year - reference_year);
        return reading.current_rise + years_ahead * (reading.trend / 1000.0);
    }
    SEA_LEVEL_TABLE
        .iter()
        .rev()
        .find(|(year, _)| state.current_year >= *year)
        .map(|(_, rise)| *rise)
        .unwrap_or(0.0)
}
