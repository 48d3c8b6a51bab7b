// ============================================================
// Layer 5 — Learning-Rate Schedules
// ============================================================
// Epoch-level schedules. burn's `Optimizer::step` takes the
// learning rate as an argument on every call, so a schedule is
// just a value the training loop reads before each step and
// advances once per epoch:
//
//   step         lr = base * gamma^(epoch / step_size)
//   exponential  lr = base * gamma^epoch
//   cosine       lr = eta_min + (base - eta_min) * (1 + cos(pi * epoch / t_max)) / 2

use std::{fmt, str::FromStr};

use serde::{Deserialize, Serialize};

/// Scheduler selection knob of the training configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SchedulerKind {
    None,
    Step,
    Exponential,
    Cosine,
}

impl FromStr for SchedulerKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "none"        => Ok(Self::None),
            "step"        => Ok(Self::Step),
            "exponential" => Ok(Self::Exponential),
            "cosine"      => Ok(Self::Cosine),
            other => Err(format!("unknown scheduler '{other}' (none|step|exponential|cosine)")),
        }
    }
}

impl fmt::Display for SchedulerKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::None        => "none",
            Self::Step        => "step",
            Self::Exponential => "exponential",
            Self::Cosine      => "cosine",
        };
        f.write_str(s)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum LrPolicy {
    Step { step_size: usize, gamma: f64 },
    Exponential { gamma: f64 },
    Cosine { t_max: usize, eta_min: f64 },
}

/// A learning-rate schedule advanced once per epoch.
#[derive(Debug, Clone, PartialEq)]
pub struct LrSchedule {
    base_lr: f64,
    policy:  LrPolicy,
    epoch:   usize,
}

impl LrSchedule {
    pub fn new(base_lr: f64, policy: LrPolicy) -> Self {
        Self { base_lr, policy, epoch: 0 }
    }

    /// Learning rate for the current epoch.
    pub fn lr(&self) -> f64 {
        let e = self.epoch;
        match self.policy {
            LrPolicy::Step { step_size, gamma } => {
                self.base_lr * gamma.powi((e / step_size.max(1)) as i32)
            }
            LrPolicy::Exponential { gamma } => self.base_lr * gamma.powi(e as i32),
            LrPolicy::Cosine { t_max, eta_min } => {
                let t = e.min(t_max.max(1)) as f64 / t_max.max(1) as f64;
                eta_min + (self.base_lr - eta_min) * (1.0 + (std::f64::consts::PI * t).cos()) / 2.0
            }
        }
    }

    /// Advance one epoch.
    pub fn step(&mut self) {
        self.epoch += 1;
    }
}
