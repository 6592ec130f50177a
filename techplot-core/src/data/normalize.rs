//! Rescale a series to its first observation so differently-sized series
//! start at 1.0 and can share an axis.

#[derive(Debug, thiserror::Error, PartialEq)]
pub enum NormalizeError {
    #[error("degenerate series '{series}': base value is zero")]
    ZeroBase { series: String },

    #[error("degenerate series '{series}': base value {value} is not finite")]
    NonFiniteBase { series: String, value: f64 },

    #[error("degenerate series '{series}': no observations")]
    NoObservations { series: String },
}

/// Divide every present cell by the first present cell.
///
/// Absent cells stay absent. A zero, non-finite or missing base is an error
/// rather than a line of `inf`/`NaN`.
pub fn normalize(series: &str, values: &[Option<f64>]) -> Result<Vec<Option<f64>>, NormalizeError> {
    let base = values
        .iter()
        .flatten()
        .copied()
        .next()
        .ok_or_else(|| NormalizeError::NoObservations {
            series: series.to_string(),
        })?;

    if !base.is_finite() {
        return Err(NormalizeError::NonFiniteBase {
            series: series.to_string(),
            value: base,
        });
    }
    if base == 0.0 {
        return Err(NormalizeError::ZeroBase {
            series: series.to_string(),
        });
    }

    Ok(values.iter().map(|v| v.map(|x| x / base)).collect())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ratio_to_first_value() {
        let out = normalize("port", &[Some(100.0), Some(110.0), Some(105.0)]).unwrap();
        assert_eq!(out, vec![Some(1.0), Some(1.1), Some(1.05)]);
    }

    #[test]
    fn zero_base_is_reported() {
        let err = normalize("performance.daily_portvals", &[Some(0.0), Some(5.0)]).unwrap_err();
        assert_eq!(
            err,
            NormalizeError::ZeroBase {
                series: "performance.daily_portvals".into()
            }
        );
    }

    #[test]
    fn leading_gap_uses_first_present_value() {
        let out = normalize("price", &[None, Some(50.0), None, Some(75.0)]).unwrap();
        assert_eq!(out, vec![None, Some(1.0), None, Some(1.5)]);
    }

    #[test]
    fn all_absent_is_degenerate() {
        let err = normalize("price", &[None, None]).unwrap_err();
        assert!(matches!(err, NormalizeError::NoObservations { .. }));
    }

    #[test]
    fn negative_base_keeps_sign_convention() {
        let out = normalize("pnl", &[Some(-2.0), Some(-4.0)]).unwrap();
        assert_eq!(out, vec![Some(1.0), Some(2.0)]);
    }
}
