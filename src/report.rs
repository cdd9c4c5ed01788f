//! Reporting helpers for search results.
//!
//! Formats the best tour leg by leg and exports it to CSV or JSON.

use crate::distance::{DistanceResolver, DistanceSource};
use crate::error::Result;
use crate::solution::{SearchResult, Tour, TrialStatistics};
use serde::Serialize;
use std::fs::File;
use std::path::Path;

/// One leg of a tour
#[derive(Debug, Clone, Serialize)]
pub struct Leg<'a> {
    pub leg: usize,
    pub from: &'a str,
    pub to: &'a str,
    pub km: f64,
    pub source: DistanceSource,
}

/// Legs of `tour` with their resolved distances
pub fn legs<'a>(resolver: &'a DistanceResolver, tour: &Tour) -> Vec<Leg<'a>> {
    let network = resolver.network();
    tour.nodes()
        .windows(2)
        .enumerate()
        .map(|(i, pair)| Leg {
            leg: i + 1,
            from: network.name(pair[0]),
            to: network.name(pair[1]),
            km: resolver.distance(pair[0], pair[1]),
            source: resolver.distance_source(pair[0], pair[1]),
        })
        .collect()
}

/// Human readable leg-by-leg table of the best tour
pub fn leg_table(resolver: &DistanceResolver, result: &SearchResult) -> String {
    let tour = match &result.tour {
        Some(tour) => tour,
        None => return "No valid tour found.\n".to_string(),
    };

    let network = resolver.network();
    let origin = network.name(network.origin());
    let mut report = String::new();
    report.push_str(&format!(
        "=== Best Tour ({} -> All {} nodes -> {}) ===\n",
        origin,
        network.len(),
        origin
    ));

    let mut total = 0.0;
    for leg in legs(resolver, tour) {
        let marker = match leg.source {
            DistanceSource::Same | DistanceSource::Road => "",
            DistanceSource::Estimate => " (est.)",
            DistanceSource::Fallback => " (unknown)",
        };
        report.push_str(&format!(
            "{:2}. {:<18} -> {:<18} : {:7.1} km{}\n",
            leg.leg, leg.from, leg.to, leg.km, marker
        ));
        total += leg.km;
    }

    report.push_str(&format!("\nTotal distance: {:.1} km\n", total));
    report.push_str(&format!("Nodes visited: {}\n", tour.len().saturating_sub(1)));
    report
}

/// Write the legs of the best tour as CSV
pub fn export_legs_csv<P: AsRef<Path>>(path: P, resolver: &DistanceResolver, result: &SearchResult) -> Result<()> {
    let file = File::create(path)?;
    let mut writer = csv::Writer::from_writer(file);

    if let Some(tour) = &result.tour {
        for leg in legs(resolver, tour) {
            writer.serialize(leg)?;
        }
    }

    writer.flush()?;
    Ok(())
}

#[derive(Debug, Serialize)]
struct ResultDocument<'a> {
    network: &'a str,
    origin: &'a str,
    /// `None` when no tour was found
    distance_km: Option<f64>,
    tour: Vec<&'a str>,
    trials: usize,
    improved_trials: usize,
    statistics: Option<&'a TrialStatistics>,
}

/// Serialise the result with node names to pretty JSON
pub fn result_json(resolver: &DistanceResolver, result: &SearchResult) -> Result<String> {
    let network = resolver.network();
    let document = ResultDocument {
        network: &network.name,
        origin: network.name(network.origin()),
        distance_km: result.distance.is_finite().then_some(result.distance),
        tour: result.tour.as_ref().map(|t| t.names(network)).unwrap_or_default(),
        trials: result.trials,
        improved_trials: result.improved_trials,
        statistics: result.statistics.as_ref(),
    };
    Ok(serde_json::to_string_pretty(&document)?)
}

/// Write [`result_json`] to a file
pub fn export_json<P: AsRef<Path>>(path: P, resolver: &DistanceResolver, result: &SearchResult) -> Result<()> {
    std::fs::write(path, result_json(resolver, result)?)?;
    Ok(())
}
