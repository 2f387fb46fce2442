//! Experiment scaling driven by a concrete spec's scaling variants.
//!
//! Input variables are scalars or grouped per-dimension vectors (e.g. the
//! `px, py, pz` process grid). Each experiment after the first multiplies
//! scalars by the factor and scales exactly one dimension of every grouped
//! variable; dimensions are visited round-robin starting from the smallest
//! dimension of the scaling variable.

use crate::spec::ConcreteSpec;
use serde::{Deserialize, Serialize};
use tracing::debug;

#[derive(Debug, thiserror::Error)]
pub enum ScalingError {
    #[error("invalid scaling variable '{0}'")]
    UnknownVariable(String),

    #[error("grouped variable {names:?} has {values} values for {} names", .names.len())]
    LengthMismatch { names: Vec<String>, values: usize },

    #[error("grouped variable has no dimensions")]
    EmptyGroup,

    #[error("variables to be scaled have different dimensions ({expected} and {found})")]
    DimensionMismatch { expected: usize, found: usize },

    #[error("spec {spec} has no integer variant '{variant}'")]
    MissingVariant { spec: String, variant: String },

    #[error("scaling '{name}' overflows")]
    Overflow { name: String },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ScalingVariable {
    Grouped { names: Vec<String>, values: Vec<i64> },
    Scalar { name: String, value: i64 },
}

impl ScalingVariable {
    fn matches(&self, key: &str) -> bool {
        match self {
            ScalingVariable::Scalar { name, .. } => name == key,
            ScalingVariable::Grouped { names, .. } => names.iter().any(|n| n == key),
        }
    }

    fn label(&self) -> String {
        match self {
            ScalingVariable::Scalar { name, .. } => name.clone(),
            ScalingVariable::Grouped { names, .. } => names.join(","),
        }
    }
}

/// Variables file accepted by `experiment scale`.
#[derive(Debug, Clone, Deserialize)]
pub struct ScalingInput {
    /// Defaults to the first variable.
    #[serde(default)]
    pub scaling_variable: Option<String>,

    pub variables: Vec<ScalingVariable>,
}

/// Value series of one output variable, one entry per experiment.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ScaledVariable {
    pub name: String,
    pub values: Vec<i64>,
}

/// Dimension visiting order: start at the smallest dimension of the scaling
/// variable and wrap around.
pub fn configure_scaling_policy(
    variables: &[ScalingVariable],
    scaling_variable: &str,
) -> Result<Vec<usize>, ScalingError> {
    let n_dims = variables
        .iter()
        .find_map(|v| match v {
            ScalingVariable::Grouped { values, .. } => Some(values.len()),
            ScalingVariable::Scalar { .. } => None,
        })
        .unwrap_or(1);

    let scaling = variables
        .iter()
        .find(|v| v.matches(scaling_variable))
        .ok_or_else(|| ScalingError::UnknownVariable(scaling_variable.to_string()))?;

    let min_dim = match scaling {
        ScalingVariable::Grouped { values, .. } => values
            .iter()
            .enumerate()
            .min_by_key(|(i, v)| (**v, *i))
            .map(|(i, _)| i)
            .unwrap_or(0),
        ScalingVariable::Scalar { .. } => 0,
    };

    Ok((0..n_dims).map(|i| (min_dim + i) % n_dims).collect())
}

fn check_shapes(variables: &[ScalingVariable]) -> Result<(), ScalingError> {
    let mut n_dims: Option<usize> = None;
    for variable in variables {
        if let ScalingVariable::Grouped { names, values } = variable {
            if values.is_empty() && names.is_empty() {
                return Err(ScalingError::EmptyGroup);
            }
            if names.len() != values.len() {
                return Err(ScalingError::LengthMismatch {
                    names: names.clone(),
                    values: values.len(),
                });
            }
            match n_dims {
                None => n_dims = Some(values.len()),
                Some(expected) if expected != values.len() => {
                    return Err(ScalingError::DimensionMismatch {
                        expected,
                        found: values.len(),
                    });
                }
                Some(_) => {}
            }
        }
    }
    Ok(())
}

/// Produce `num_exprs` values for every input name.
pub fn scale_experiment_variables(
    variables: &[ScalingVariable],
    scaling_factor: i64,
    num_exprs: usize,
    scaling_variable: Option<&str>,
) -> Result<Vec<ScaledVariable>, ScalingError> {
    let Some(first) = variables.first() else {
        return Ok(Vec::new());
    };
    check_shapes(variables)?;

    let key = match scaling_variable {
        Some(key) => key.to_string(),
        None => match first {
            ScalingVariable::Scalar { name, .. } => name.clone(),
            ScalingVariable::Grouped { names, .. } => names.first().cloned().unwrap_or_default(),
        },
    };
    let order = configure_scaling_policy(variables, &key)?;
    debug!(scaling_variable = %key, ?order, "scaling order");

    let mut out = Vec::new();
    for variable in variables {
        let (names, initial): (Vec<String>, Vec<i64>) = match variable {
            ScalingVariable::Scalar { name, value } => (vec![name.clone()], vec![*value]),
            ScalingVariable::Grouped { names, values } => (names.clone(), values.clone()),
        };

        let mut series: Vec<Vec<i64>> = initial.iter().map(|v| vec![*v]).collect();
        for exp in 0..num_exprs.saturating_sub(1) {
            let scaled_dim = if series.len() == 1 {
                0
            } else {
                order[exp % order.len()]
            };
            for (dim, values) in series.iter_mut().enumerate() {
                let last = values.last().copied().unwrap_or_default();
                let next = if dim == scaled_dim {
                    last.checked_mul(scaling_factor)
                        .ok_or_else(|| ScalingError::Overflow {
                            name: variable.label(),
                        })?
                } else {
                    last
                };
                values.push(next);
            }
        }

        out.extend(
            names
                .into_iter()
                .zip(series)
                .map(|(name, values)| ScaledVariable { name, values }),
        );
    }
    Ok(out)
}

/// Factor and experiment count read from a concrete spec.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ScalingPlan {
    pub factor: i64,
    pub iterations: usize,
}

impl ScalingPlan {
    pub const FACTOR_VARIANT: &'static str = "scaling-factor";
    pub const ITERATIONS_VARIANT: &'static str = "scaling-iterations";

    pub fn from_spec(spec: &ConcreteSpec) -> Result<Self, ScalingError> {
        let read = |variant: &str| {
            spec.value(variant)
                .and_then(|v| v.trim().parse::<i64>().ok())
                .ok_or_else(|| ScalingError::MissingVariant {
                    spec: spec.to_string(),
                    variant: variant.to_string(),
                })
        };

        let factor = read(Self::FACTOR_VARIANT)?;
        let iterations = usize::try_from(read(Self::ITERATIONS_VARIANT)?).map_err(|_| {
            ScalingError::MissingVariant {
                spec: spec.to_string(),
                variant: Self::ITERATIONS_VARIANT.to_string(),
            }
        })?;
        Ok(Self { factor, iterations })
    }

    pub fn scale(&self, input: &ScalingInput) -> Result<Vec<ScaledVariable>, ScalingError> {
        scale_experiment_variables(
            &input.variables,
            self.factor,
            self.iterations,
            input.scaling_variable.as_deref(),
        )
    }
}
