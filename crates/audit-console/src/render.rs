//! Terminal rendering and the headless animator

use audit_core::{
    AnimationHandle, Animator, CycleFlag, DerivedMetrics, Easing, NodeHighlight, RigPart, Vec3,
};
use audit_model::VendorRisk;
use std::fmt::Write as _;
use std::time::Duration;

/// Animator with no surface: logs the move and finishes at once
#[derive(Debug, Default)]
pub(crate) struct HeadlessAnimator;

struct Done;

impl AnimationHandle for Done {
    fn cancel(&mut self) {}

    fn is_finished(&self) -> bool {
        true
    }
}

impl Animator for HeadlessAnimator {
    fn animate_to(
        &self,
        part: RigPart,
        target: Vec3,
        duration: Duration,
        easing: Easing,
    ) -> Box<dyn AnimationHandle> {
        tracing::debug!(?part, ?target, ?duration, ?easing, "camera rig move");
        Box::new(Done)
    }

    fn set_auto_rotate(&self, enabled: bool) {
        tracing::debug!(enabled, "auto-rotate");
    }
}

/// Analysis report for the terminal
pub(crate) fn analysis_report(
    invoice: &str,
    risk: &str,
    explanation: &str,
    metrics: &DerivedMetrics,
    highlights: &[NodeHighlight],
) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "Invoice      {invoice}");
    let _ = writeln!(out, "Risk         {risk}");
    let _ = writeln!(out, "Exposure     {}", metrics.total_exposure_formatted);
    let _ = writeln!(out, "Reconcile    {}", metrics.reconciliation_headline);
    if metrics.has_cycle {
        let _ = writeln!(out, "Pattern      circular trading");
    }
    let _ = writeln!(out, "Path         {}", metrics.path_summary.render());

    if !metrics.rows.is_empty() {
        let _ = writeln!(out);
        for row in &metrics.rows {
            let severity = row.severity.map_or("-", |s| s.label());
            let _ = writeln!(out, "  [{severity:>8}] {:<40} {}", row.root_cause, row.exposure);
        }
    }

    let flagged: Vec<String> = highlights
        .iter()
        .filter(|h| h.in_path || h.cycle != CycleFlag::NotMember)
        .map(|h| {
            let mark = match h.cycle {
                CycleFlag::Member => " (cycle)",
                CycleFlag::Unknown => " (cycle?)",
                CycleFlag::NotMember => "",
            };
            format!("{}{mark}", h.node)
        })
        .collect();
    if !flagged.is_empty() {
        let _ = writeln!(out);
        let _ = writeln!(out, "Nodes        {}", flagged.join(", "));
    }

    let _ = writeln!(out);
    let _ = writeln!(out, "{explanation}");
    let _ = writeln!(out);
    let _ = write!(out, "Action       {}", metrics.action_plan);
    out
}

/// Vendor profile for the terminal
pub(crate) fn vendor_report(gstin: &str, profile: &VendorRisk) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "Vendor       {gstin}");
    let _ = writeln!(out, "Score        {}/100", profile.compliance_score);
    let _ = write!(out, "Bucket       {}", profile.risk_bucket.label());
    for (feature, weight) in &profile.feature_importance {
        let _ = write!(out, "\n  {feature:<32} {:>5.1}%", weight * 100.0);
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use audit_core::{compute, highlight_nodes, DisplayConfig};
    use audit_model::RiskBucket;
    use audit_test_utils::{critical_result, demo_registry, vendor_profile};

    #[test]
    fn analysis_report_lists_exposure_and_action() {
        let result = critical_result();
        let metrics = compute(&result, &DisplayConfig::default());
        let highlights = highlight_nodes(&demo_registry(), Some(&result), None);

        let text = analysis_report(
            "INV-BD-1",
            &result.overall_risk,
            &result.explanation,
            &metrics,
            &highlights,
        );
        assert!(text.contains("₹1,45,000"));
        assert!(text.contains("1 discrepancy flag(s) found"));
        assert!(text.contains("Taxpayer:GSTIN_D"));
        assert!(text.contains("Issue show-cause notice"));
        assert!(!text.contains("(cycle"));
    }

    #[test]
    fn vendor_report_shows_weights() {
        let text = vendor_report("GSTIN_B", &vendor_profile(81.0, RiskBucket::High));
        assert!(text.contains("81/100"));
        assert!(text.contains("circular_trading_involvement"));
        assert!(text.contains("45.0%"));
    }

    #[test]
    fn headless_handles_are_finished() {
        let handle = HeadlessAnimator.animate_to(
            RigPart::Camera,
            Vec3::ZERO,
            Duration::from_millis(1),
            Easing::Linear,
        );
        assert!(handle.is_finished());
    }
}
