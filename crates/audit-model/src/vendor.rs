//! Vendor compliance risk

use crate::error::SchemaError;
use indexmap::IndexMap;
use serde::Serialize;
use std::str::FromStr;

/// Coarse vendor risk classification
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
pub enum RiskBucket {
    /// Compliant vendor
    Low,
    /// Watch list
    Medium,
    /// Likely non-compliant
    High,
}

impl RiskBucket {
    /// Wire label
    #[inline]
    #[must_use]
    pub fn label(self) -> &'static str {
        match self {
            Self::Low => "Low",
            Self::Medium => "Medium",
            Self::High => "High",
        }
    }
}

impl FromStr for RiskBucket {
    type Err = SchemaError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "Low" => Ok(Self::Low),
            "Medium" => Ok(Self::Medium),
            "High" => Ok(Self::High),
            other => Err(SchemaError::UnknownRiskBucket(other.to_string())),
        }
    }
}

/// Vendor risk profile, fetched independently of any audit result
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct VendorRisk {
    /// 0 (compliant) to 100 (maximum risk)
    pub compliance_score: u8,
    /// Bucket derived by the engine
    pub risk_bucket: RiskBucket,
    /// Feature name to weight in [0, 1], wire order preserved
    pub feature_importance: IndexMap<String, f64>,
}

impl VendorRisk {
    /// Validate and build a vendor risk profile
    ///
    /// Fractional scores are rounded to the nearest integer.
    ///
    /// # Errors
    /// - `SchemaError::ScoreOutOfRange` if the score is not within 0..=100
    /// - `SchemaError::WeightOutOfRange` if any weight is not within [0, 1]
    pub fn new(
        score: f64,
        risk_bucket: RiskBucket,
        feature_importance: IndexMap<String, f64>,
    ) -> Result<Self, SchemaError> {
        if !score.is_finite() || !(0.0..=100.0).contains(&score) {
            return Err(SchemaError::ScoreOutOfRange(score));
        }
        if let Some((feature, weight)) = feature_importance
            .iter()
            .find(|(_, w)| !w.is_finite() || !(0.0..=1.0).contains(*w))
        {
            return Err(SchemaError::WeightOutOfRange {
                feature: feature.clone(),
                weight: *weight,
            });
        }

        #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
        let compliance_score = score.round() as u8;

        Ok(Self {
            compliance_score,
            risk_bucket,
            feature_importance,
        })
    }

    /// Feature with the highest weight
    #[must_use]
    pub fn dominant_feature(&self) -> Option<(&str, f64)> {
        self.feature_importance
            .iter()
            .max_by(|a, b| a.1.total_cmp(b.1))
            .map(|(k, v)| (k.as_str(), *v))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn weights() -> IndexMap<String, f64> {
        IndexMap::from([
            ("circular_trading_involvement".to_string(), 0.45),
            ("network_risk_propagation".to_string(), 0.35),
            ("historical_mismatches".to_string(), 0.20),
        ])
    }

    #[test]
    fn vendor_risk_rounds_score() {
        let risk = VendorRisk::new(82.6, RiskBucket::High, weights()).unwrap();
        assert_eq!(risk.compliance_score, 83);
        assert_eq!(
            risk.dominant_feature().map(|(k, _)| k),
            Some("circular_trading_involvement")
        );
    }

    #[test]
    fn vendor_risk_rejects_out_of_range() {
        assert!(matches!(
            VendorRisk::new(100.5, RiskBucket::High, weights()),
            Err(SchemaError::ScoreOutOfRange(_))
        ));

        let mut bad = weights();
        bad.insert("oops".to_string(), 1.5);
        assert!(matches!(
            VendorRisk::new(50.0, RiskBucket::Medium, bad),
            Err(SchemaError::WeightOutOfRange { .. })
        ));
    }

    #[test]
    fn bucket_parse() {
        assert_eq!(RiskBucket::from_str("Medium").unwrap(), RiskBucket::Medium);
        assert!(RiskBucket::from_str("Severe").is_err());
    }
}
