//! Circuit dispatch.
//!
//! Every family implements [`Evaluate`]; [`CircuitParameters`] is the
//! closed set of configurations a bench session can pick from.

use crate::amplifier::Amplifier;
use crate::calculus::CalculusStage;
use crate::comparator::Comparator;
use crate::config::LabConfig;
use crate::filter::ActiveFilter;
use crate::oscillator::{AstableMultivibrator, SineOscillator};
use crate::rectifier::PrecisionRectifier;
use crate::response::ResponseResult;
use crate::schmitt::SchmittTrigger;
use crate::shaping::WaveShaper;
use crate::waveform::Stimulus;

/// A circuit that maps a sampled input onto a clipped output trace.
///
/// Implementations never fail: degenerate component values are reported
/// through `ResponseResult::fault`.
pub trait Evaluate {
    /// Display name, e.g. "Inverting Amplifier".
    fn label(&self) -> &'static str;
    fn evaluate(&self, input: &Stimulus, config: &LabConfig) -> ResponseResult;
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum CircuitParameters {
    Amplifier(Amplifier),
    Filter(ActiveFilter),
    Calculus(CalculusStage),
    Rectifier(PrecisionRectifier),
    Comparator(Comparator),
    Schmitt(SchmittTrigger),
    Shaper(WaveShaper),
    SineOscillator(SineOscillator),
    Astable(AstableMultivibrator),
}

impl CircuitParameters {
    fn as_evaluator(&self) -> &dyn Evaluate {
        match self {
            Self::Amplifier(c) => c,
            Self::Filter(c) => c,
            Self::Calculus(c) => c,
            Self::Rectifier(c) => c,
            Self::Comparator(c) => c,
            Self::Schmitt(c) => c,
            Self::Shaper(c) => c,
            Self::SineOscillator(c) => c,
            Self::Astable(c) => c,
        }
    }

    /// Oscillators generate their own signal and ignore the stimulus.
    pub fn takes_input(&self) -> bool {
        !matches!(self, Self::SineOscillator(_) | Self::Astable(_))
    }
}

impl Evaluate for CircuitParameters {
    fn label(&self) -> &'static str {
        self.as_evaluator().label()
    }

    fn evaluate(&self, input: &Stimulus, config: &LabConfig) -> ResponseResult {
        let label = self.label();
        let result = self.as_evaluator().evaluate(input, config);
        tracing::debug!(
            circuit = label,
            samples = result.output.len(),
            valid = result.is_valid(),
            clipped = result.is_clipped(),
            "evaluated"
        );
        result
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::metrics::keys;
    use crate::rectifier::RectifierKind;
    use crate::waveform::WaveformSpec;

    fn sine() -> Stimulus {
        Stimulus::generate(WaveformSpec::sine(1.0, 100.0), &LabConfig::default())
    }

    #[test]
    fn test_dispatch_matches_direct_call() {
        let config = LabConfig::default();
        let amp = Amplifier::inverting(10.0, 50.0);
        let direct = amp.evaluate(&sine(), &config);
        let dispatched = CircuitParameters::Amplifier(amp).evaluate(&sine(), &config);
        assert_eq!(direct, dispatched);
        assert_eq!(CircuitParameters::Amplifier(amp).label(), "Inverting Amplifier");
    }

    #[test]
    fn test_labels() {
        let rect = CircuitParameters::Rectifier(PrecisionRectifier::new(RectifierKind::FullWave));
        assert_eq!(rect.label(), "Full Wave Rectifier");
        let schmitt = CircuitParameters::Schmitt(SchmittTrigger::new(10.0, 1.0));
        assert_eq!(schmitt.label(), "Schmitt Trigger");
        let wien = CircuitParameters::SineOscillator(SineOscillator::wien_bridge(10.0, 0.1));
        assert_eq!(wien.label(), "Wien Bridge Oscillator");
        let follower = CircuitParameters::Amplifier(Amplifier::follower());
        assert_eq!(follower.label(), "Voltage Follower");
        let non_inv = CircuitParameters::Amplifier(Amplifier::non_inverting(10.0, 50.0));
        assert_eq!(non_inv.label(), "Non-Inverting Amplifier");
    }

    #[test]
    fn test_oscillators_ignore_stimulus() {
        let config = LabConfig::default();
        let osc = CircuitParameters::SineOscillator(SineOscillator::wien_bridge(10.0, 0.1));
        assert!(!osc.takes_input());

        let quiet = Stimulus::generate(WaveformSpec::sine(0.0, 0.0), &config);
        let a = osc.evaluate(&sine(), &config);
        let b = osc.evaluate(&quiet, &config);
        assert_eq!(a, b);
        assert!(a.metrics.get_number(keys::FREQUENCY_HZ).unwrap() > 159.0);
    }

    #[test]
    fn test_every_result_carries_common_metrics() {
        let config = LabConfig::default();
        let circuits = [
            CircuitParameters::Amplifier(Amplifier::follower()),
            CircuitParameters::Rectifier(PrecisionRectifier::new(RectifierKind::HalfWave)),
            CircuitParameters::Schmitt(SchmittTrigger::new(10.0, 1.0)),
            CircuitParameters::Astable(AstableMultivibrator::new(10.0, 0.1, 10.0, 10.0)),
        ];
        for c in &circuits {
            let r = c.evaluate(&sine(), &config);
            for key in [keys::OUTPUT_AMPLITUDE_V, keys::IS_CLIPPED, keys::IS_VALID] {
                assert!(r.metrics.get(key).is_some(), "{} missing {key}", c.label());
            }
        }
    }
}
