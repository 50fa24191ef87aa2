//! Look-away integration for the active question.
//!
//! The accumulator owns a counter for the current *activation* (one continuous
//! period during which a question is displayed). Every sample carries the
//! activation it was captured under, so a sample whose processing finishes after
//! the user navigated away is still attributed to the question it belongs to.

use chrono::{DateTime, Utc};

use crate::model::QuestionIndex;

/// Seconds credited for one `look_away == true` sample.
pub const SAMPLE_QUANTUM_SECS: u32 = 1;

/// A question plus the generation counter of the period it was shown in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Activation {
    question: QuestionIndex,
    epoch: u64,
}

impl Activation {
    #[must_use]
    pub fn question(&self) -> QuestionIndex {
        self.question
    }

    #[must_use]
    pub fn epoch(&self) -> u64 {
        self.epoch
    }
}

/// One classifier decision for one sampling tick.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AttentionSample {
    pub activation: Activation,
    pub look_away: bool,
    pub captured_at: DateTime<Utc>,
}

/// Look-away seconds handed back when an activation ends.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Checkpoint {
    pub question: QuestionIndex,
    pub look_away_secs: u32,
}

/// What the accumulator did with a sample.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SampleOutcome {
    /// Look-away sample for the live activation; `elapsed_secs` is the new total.
    Counted {
        question: QuestionIndex,
        elapsed_secs: u32,
    },
    /// Subject was attentive; nothing added.
    Attentive { question: QuestionIndex },
    /// Sample belongs to an activation that already ended. The caller credits
    /// `question` directly when `look_away` is set.
    Stale {
        question: QuestionIndex,
        look_away: bool,
    },
}

/// Running look-away counter for the active question.
#[derive(Debug, Default)]
pub struct LookAwayAccumulator {
    current: Option<Activation>,
    elapsed_secs: u32,
    next_epoch: u64,
}

impl LookAwayAccumulator {
    /// A suspended accumulator with no active question.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn activation(&self) -> Option<Activation> {
        self.current
    }

    #[must_use]
    pub fn elapsed_secs(&self) -> u32 {
        self.elapsed_secs
    }

    /// Start counting for `question` from zero.
    ///
    /// Returns the outgoing activation's counter, if there was one. Ending the old
    /// activation and starting the new one happen in the same call, so no sample can
    /// fall between them.
    pub fn activate(&mut self, question: QuestionIndex) -> (Activation, Option<Checkpoint>) {
        let checkpoint = self.take_checkpoint();
        let activation = Activation {
            question,
            epoch: self.next_epoch,
        };
        self.next_epoch = self.next_epoch.wrapping_add(1);
        self.current = Some(activation);
        (activation, checkpoint)
    }

    /// Stop counting. Later samples for the ended activation come back as `Stale`.
    pub fn suspend(&mut self) -> Option<Checkpoint> {
        self.take_checkpoint()
    }

    /// Integrate one sample.
    pub fn record(&mut self, sample: &AttentionSample) -> SampleOutcome {
        let question = sample.activation.question;
        if self.current != Some(sample.activation) {
            return SampleOutcome::Stale {
                question,
                look_away: sample.look_away,
            };
        }
        if !sample.look_away {
            return SampleOutcome::Attentive { question };
        }
        self.elapsed_secs = self.elapsed_secs.saturating_add(SAMPLE_QUANTUM_SECS);
        SampleOutcome::Counted {
            question,
            elapsed_secs: self.elapsed_secs,
        }
    }

    fn take_checkpoint(&mut self) -> Option<Checkpoint> {
        let outgoing = self.current.take()?;
        let look_away_secs = std::mem::take(&mut self.elapsed_secs);
        Some(Checkpoint {
            question: outgoing.question,
            look_away_secs,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::time::fixed_now;
    use std::collections::HashMap;

    fn sample(activation: Activation, look_away: bool) -> AttentionSample {
        AttentionSample {
            activation,
            look_away,
            captured_at: fixed_now(),
        }
    }

    #[test]
    fn counts_only_look_away_samples() {
        let mut acc = LookAwayAccumulator::new();
        let (a, prev) = acc.activate(QuestionIndex::new(0));
        assert!(prev.is_none());

        assert_eq!(
            acc.record(&sample(a, true)),
            SampleOutcome::Counted {
                question: QuestionIndex::new(0),
                elapsed_secs: 1
            }
        );
        assert_eq!(
            acc.record(&sample(a, false)),
            SampleOutcome::Attentive {
                question: QuestionIndex::new(0)
            }
        );
        acc.record(&sample(a, true));
        assert_eq!(acc.elapsed_secs(), 2);
    }

    #[test]
    fn activation_change_checkpoints_and_resets() {
        let mut acc = LookAwayAccumulator::new();
        let (a0, _) = acc.activate(QuestionIndex::new(0));
        for _ in 0..3 {
            acc.record(&sample(a0, true));
        }

        let (a1, checkpoint) = acc.activate(QuestionIndex::new(1));
        assert_eq!(
            checkpoint,
            Some(Checkpoint {
                question: QuestionIndex::new(0),
                look_away_secs: 3
            })
        );
        assert_eq!(acc.elapsed_secs(), 0);
        assert_ne!(a0.epoch(), a1.epoch());
    }

    #[test]
    fn late_sample_is_stale_and_keeps_its_question() {
        let mut acc = LookAwayAccumulator::new();
        let (a0, _) = acc.activate(QuestionIndex::new(0));
        acc.activate(QuestionIndex::new(1));

        assert_eq!(
            acc.record(&sample(a0, true)),
            SampleOutcome::Stale {
                question: QuestionIndex::new(0),
                look_away: true
            }
        );
        assert_eq!(acc.elapsed_secs(), 0);
    }

    #[test]
    fn revisiting_a_question_starts_a_new_activation() {
        let mut acc = LookAwayAccumulator::new();
        let (first, _) = acc.activate(QuestionIndex::new(0));
        acc.activate(QuestionIndex::new(1));
        let (again, _) = acc.activate(QuestionIndex::new(0));

        assert_eq!(first.question(), again.question());
        assert!(matches!(
            acc.record(&sample(first, true)),
            SampleOutcome::Stale { .. }
        ));
        assert!(matches!(
            acc.record(&sample(again, true)),
            SampleOutcome::Counted { elapsed_secs: 1, .. }
        ));
    }

    #[test]
    fn suspended_accumulator_treats_samples_as_stale() {
        let mut acc = LookAwayAccumulator::new();
        let (a, _) = acc.activate(QuestionIndex::new(4));
        acc.record(&sample(a, true));
        let checkpoint = acc.suspend().unwrap();
        assert_eq!(checkpoint.look_away_secs, 1);
        assert!(acc.activation().is_none());
        assert!(matches!(
            acc.record(&sample(a, true)),
            SampleOutcome::Stale { .. }
        ));
        assert!(acc.suspend().is_none());
    }

    #[test]
    fn navigation_conserves_look_away_time() {
        // Deterministic pseudo-random walk over five questions.
        let mut state: u64 = 0x2545_f491_4f6c_dd1d;
        let mut next = || {
            state ^= state << 13;
            state ^= state >> 7;
            state ^= state << 17;
            state
        };

        let mut acc = LookAwayAccumulator::new();
        let mut credited: HashMap<QuestionIndex, u32> = HashMap::new();
        let mut observed = 0_u32;
        let mut stale_pool: Vec<Activation> = Vec::new();
        let (mut current, _) = acc.activate(QuestionIndex::new(0));

        for _ in 0..2_000 {
            match next() % 10 {
                0 => {
                    let q = current.question();
                    let target = if next() % 2 == 0 {
                        q.next().filter(|n| n.value() < 5).unwrap_or(q)
                    } else {
                        q.prev().unwrap_or(q)
                    };
                    stale_pool.push(current);
                    let (activation, checkpoint) = acc.activate(target);
                    if let Some(cp) = checkpoint {
                        *credited.entry(cp.question).or_default() += cp.look_away_secs;
                    }
                    current = activation;
                }
                1 if !stale_pool.is_empty() => {
                    let old = stale_pool[(next() as usize) % stale_pool.len()];
                    observed += 1;
                    if let SampleOutcome::Stale { question, look_away } =
                        acc.record(&sample(old, true))
                    {
                        assert!(look_away);
                        *credited.entry(question).or_default() += SAMPLE_QUANTUM_SECS;
                    } else {
                        panic!("old activation must be stale");
                    }
                }
                n => {
                    let look_away = n % 2 == 0;
                    if look_away {
                        observed += 1;
                    }
                    acc.record(&sample(current, look_away));
                }
            }
        }
        if let Some(cp) = acc.suspend() {
            *credited.entry(cp.question).or_default() += cp.look_away_secs;
        }

        assert_eq!(credited.values().sum::<u32>(), observed);
    }
}
