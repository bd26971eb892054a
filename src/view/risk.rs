//! Risk cards for the prediction page. Scores are precomputed upstream and
//! only formatted here.

use serde::Serialize;

use crate::source::Prediction;

const HIGH_RISK_THRESHOLD: f64 = 0.6;
const HIGH_RISK_COLOR: &str = "#ff4d4d";
const ELEVATED_RISK_COLOR: &str = "#ffcc00";

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RiskCard {
    pub location: String,
    pub risk_score: f64,
    pub fill_percent: f64,
    pub bar_color: &'static str,
    pub score_label: String,
}

impl RiskCard {
    /// `None` for a non-finite score. Finite scores are clamped to `[0, 1]`.
    pub fn from_prediction(prediction: &Prediction) -> Option<Self> {
        if !prediction.risk_score.is_finite() {
            return None;
        }
        let risk_score = prediction.risk_score.clamp(0.0, 1.0);
        Some(Self {
            location: prediction.location.clone(),
            risk_score,
            fill_percent: risk_score * 100.0,
            bar_color: if risk_score > HIGH_RISK_THRESHOLD {
                HIGH_RISK_COLOR
            } else {
                ELEVATED_RISK_COLOR
            },
            score_label: format!("{:.2}/10", risk_score * 10.0),
        })
    }
}

/// Cards in the order the prediction service ranked them.
pub fn risk_cards(predictions: &[Prediction]) -> Vec<RiskCard> {
    predictions
        .iter()
        .filter_map(|prediction| {
            let card = RiskCard::from_prediction(prediction);
            if card.is_none() {
                tracing::debug!("skipping prediction with non-finite score: {}", prediction.location);
            }
            card
        })
        .collect()
}
