//! The point logger: the reference stage implementation. Runs only in the
//! reverse pass, always accepts, and writes one line per analyzed trial
//! through the `log` facade.

use harmony_model::config::{ConfigStore, OptionInfo};
use harmony_model::model::{Space, Value};
use harmony_strategy::{Flow, FlowStatus};

use crate::error::SessionError;
use crate::pipeline::Stage;
use crate::trial::Trial;

#[derive(Debug, Default)]
pub struct PointLogger {
    prefix: String,
}

impl PointLogger {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

impl Stage for PointLogger {
    fn name(&self) -> &str {
        "point_logger"
    }

    fn init(&mut self, _space: &Space, config: &mut ConfigStore) -> Result<(), SessionError> {
        config.register(&[OptionInfo::new("LOG_PREFIX", "", "text prepended to each point-log line")]);
        self.prefix = config.get_or("LOG_PREFIX", "");
        Ok(())
    }

    fn analyze(&mut self, flow: &mut Flow, trial: &Trial) -> Result<(), SessionError> {
        flow.status = FlowStatus::Accept;
        if let Some(perf) = &trial.perf {
            let point = trial.point.terms.iter().map(format_term).collect::<Vec<_>>().join(", ");
            let objs = perf.objectives().iter().map(|o| format_real(*o)).collect::<Vec<_>>().join(", ");
            log::info!(
                "{}Point #{}: ({}) => ({}) => {}",
                self.prefix,
                trial.point.id,
                point,
                objs,
                format_real(perf.unify())
            );
        }
        Ok(())
    }
}

fn format_term(v: &Value) -> String {
    match v {
        Value::Real(x) => format_real(*x),
        Value::Int(_) | Value::Enum(_) => v.to_string(),
    }
}

/// Render a real number both in decimal and as a canonical hex real, the
/// `%a`-equivalent Rust's `std` has no formatter for: `<decimal> (<hex>)`.
/// The hex form is an exact, loss-free rendering of the `f64`'s bit
/// pattern, unlike the decimal form which is merely round-trippable.
fn format_real(v: f64) -> String {
    format!("{v} ({})", format_hex_float(v))
}

/// `printf("%a", v)`-equivalent: `[-]0x1.<52-bit mantissa as 13 hex
/// digits>p<unbiased exponent>` for normal values, with the usual special
/// cases for zero, subnormals, infinities, and NaN.
fn format_hex_float(v: f64) -> String {
    if v.is_nan() {
        return "nan".to_string();
    }
    if v.is_infinite() {
        return if v.is_sign_negative() { "-inf".to_string() } else { "inf".to_string() };
    }
    let bits = v.to_bits();
    let sign = if bits >> 63 == 1 { "-" } else { "" };
    let biased_exp = (bits >> 52) & 0x7ff;
    let mantissa = bits & 0x000f_ffff_ffff_ffff;
    if biased_exp == 0 && mantissa == 0 {
        return format!("{sign}0x0p+0");
    }
    let (leading_bit, exponent) = if biased_exp == 0 {
        (0u64, -1022i64)
    } else {
        (1u64, biased_exp as i64 - 1023)
    };
    format!("{sign}0x{leading_bit}.{mantissa:013x}p{exponent:+}")
}

#[cfg(test)]
mod tests {
    use super::*;
    use harmony_model::model::{Dimension, Performance, Point};

    fn space() -> Space {
        Space::new(vec![Dimension::integer("x", 0, 10, 1).unwrap()]).unwrap()
    }

    #[test]
    fn always_accepts() {
        let mut stage = PointLogger::new();
        let mut config = ConfigStore::new();
        stage.init(&space(), &mut config).unwrap();
        let mut trial = Trial::new(Point::new(1, vec![harmony_model::model::Value::Int(4)]));
        trial.perf = Some(Performance::new(vec![16.0]));
        let mut flow = Flow::accept();
        stage.analyze(&mut flow, &trial).unwrap();
        assert_eq!(flow.status, FlowStatus::Accept);
    }

    #[test]
    fn reads_log_prefix_from_config() {
        let mut stage = PointLogger::new();
        let mut config = ConfigStore::new();
        config.set("LOG_PREFIX", "[bench] ");
        stage.init(&space(), &mut config).unwrap();
        assert_eq!(stage.prefix, "[bench] ");
    }

    #[test]
    fn skips_trials_without_a_reported_performance() {
        let mut stage = PointLogger::new();
        let mut config = ConfigStore::new();
        stage.init(&space(), &mut config).unwrap();
        let trial = Trial::new(Point::new(1, vec![harmony_model::model::Value::Int(4)]));
        let mut flow = Flow::accept();
        stage.analyze(&mut flow, &trial).unwrap();
        assert_eq!(flow.status, FlowStatus::Accept);
    }

    #[test]
    fn hex_float_round_trips_through_the_bit_pattern() {
        // 1.0 is the exact midpoint: mantissa all zero, unbiased exponent 0.
        assert_eq!(format_hex_float(1.0), "0x1.0000000000000p+0");
        assert_eq!(format_hex_float(-1.0), "-0x1.0000000000000p+0");
        assert_eq!(format_hex_float(0.0), "0x0p+0");
        assert_eq!(format_hex_float(-0.0), "-0x0p+0");

        for v in [0.1_f64, -3.5, 1e300, -1e-300, f64::MIN_POSITIVE, 4.2] {
            let rendered = format_hex_float(v);
            let (mantissa_part, exp_part) = rendered.split_once('p').unwrap();
            let hex_digits = mantissa_part.trim_start_matches('-').trim_start_matches("0x");
            let (lead, frac) = hex_digits.split_once('.').unwrap();
            let lead_bit: u64 = lead.parse().unwrap();
            let mantissa = u64::from_str_radix(frac, 16).unwrap();
            let exponent: i64 = exp_part.parse().unwrap();
            let biased_exp = if lead_bit == 0 { 0u64 } else { (exponent + 1023) as u64 };
            let bits = (u64::from(v.is_sign_negative()) << 63) | (biased_exp << 52) | mantissa;
            assert_eq!(f64::from_bits(bits), v, "hex rendering of {v} did not round-trip");
        }
    }

    #[test]
    fn logged_real_values_carry_a_hex_component() {
        let decimal_and_hex = format_real(0.1);
        assert!(decimal_and_hex.starts_with("0.1"));
        assert!(decimal_and_hex.contains("0x1."));
    }
}
