//! Cooperative Scheduler (SPEC_FULL.md §4.7).
//!
//! The optimizer runs as a resumable state machine rather than on an
//! async executor: there is exactly one thread of computation (§5),
//! so `OptimizerDriver::step` simply returns control to its caller
//! once its wall-clock budget is spent, and is re-entered to continue.
//! Ordering is FIFO — categories complete in the order they were
//! queued, and a category's own four phases always run in order.

use std::collections::VecDeque;
use std::time::{Duration, Instant};

use crate::optimizer::{
    phase_a_redundancy, phase_b_merge, phase_c_merge_if_domain, phase_c_merge_resource_type,
    SearchWindow,
};
use crate::rule::Rule;

const YIELD_BUDGET: Duration = Duration::from_millis(100);

#[derive(Clone, Copy)]
enum Phase {
    A,
    B,
    CResourceType,
    CIfDomain,
    Done,
}

struct PendingCategory {
    rules: Vec<Rule>,
    phase: Phase,
}

/// Result of a single `OptimizerDriver::step` call.
pub enum StepOutcome {
    /// The time budget elapsed mid-category; call `step` again to continue.
    Yielded,
    /// Every category has passed through all four phases.
    Finished(Vec<Rule>),
}

/// Drives the optimizer's four phases across a sequence of rule
/// categories, yielding to its caller after ~100ms of work.
pub struct OptimizerDriver {
    queue: VecDeque<PendingCategory>,
    finished: Vec<Rule>,
    window: SearchWindow,
}

impl OptimizerDriver {
    pub fn new(categories: Vec<Vec<Rule>>, window: SearchWindow) -> Self {
        let queue = categories
            .into_iter()
            .map(|rules| PendingCategory { rules, phase: Phase::A })
            .collect();
        Self {
            queue,
            finished: Vec::new(),
            window,
        }
    }

    /// Run mergeable-group units of work until the time budget is
    /// spent or every category is done.
    pub fn step(&mut self) -> StepOutcome {
        let started = Instant::now();

        while let Some(mut category) = self.queue.pop_front() {
            loop {
                match category.phase {
                    Phase::A => {
                        category.rules = phase_a_redundancy(std::mem::take(&mut category.rules));
                        category.phase = Phase::B;
                    }
                    Phase::B => {
                        category.rules =
                            phase_b_merge(std::mem::take(&mut category.rules), self.window);
                        category.phase = Phase::CResourceType;
                    }
                    Phase::CResourceType => {
                        category.rules =
                            phase_c_merge_resource_type(std::mem::take(&mut category.rules));
                        category.phase = Phase::CIfDomain;
                    }
                    Phase::CIfDomain => {
                        category.rules =
                            phase_c_merge_if_domain(std::mem::take(&mut category.rules));
                        category.phase = Phase::Done;
                    }
                    Phase::Done => break,
                }

                log::trace!(
                    "optimizer phase step completed, {} rules remaining in category",
                    category.rules.len()
                );

                if started.elapsed() >= YIELD_BUDGET {
                    if matches!(category.phase, Phase::Done) {
                        self.finished.extend(category.rules);
                    } else {
                        self.queue.push_front(category);
                    }
                    return StepOutcome::Yielded;
                }
            }

            self.finished.extend(category.rules);
        }

        StepOutcome::Finished(std::mem::take(&mut self.finished))
    }

    /// Drive the optimizer to completion without cooperative yielding.
    /// Used by callers that embed the compiler synchronously (the CLI)
    /// rather than interleaving it with other work.
    pub fn run_to_completion(mut self) -> Vec<Rule> {
        loop {
            match self.step() {
                StepOutcome::Finished(rules) => return rules,
                StepOutcome::Yielded => continue,
            }
        }
    }
}

/// Optimize one category synchronously, without scheduling. A thin
/// convenience wrapper for callers (and tests) that don't need the
/// cooperative driver.
pub fn optimize_category(rules: Vec<Rule>, window: SearchWindow) -> Vec<Rule> {
    let rules = phase_a_redundancy(rules);
    let rules = phase_b_merge(rules, window);
    let rules = phase_c_merge_resource_type(rules);
    phase_c_merge_if_domain(rules)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rule::{Action, Trigger};

    fn block_rule(url_filter: &str) -> Rule {
        Rule::new(Trigger::new(url_filter), Action::block())
    }

    #[test]
    fn driver_runs_all_phases_to_completion() {
        let categories = vec![vec![
            block_rule("/ad"),
            block_rule("/ads"),
            block_rule("/advertisement"),
        ]];
        let driver = OptimizerDriver::new(categories, SearchWindow::Exhaustive);
        let result = driver.run_to_completion();
        assert_eq!(result.len(), 1);
        assert_eq!(result[0].trigger.url_filter, "/ad");
    }

    #[test]
    fn driver_preserves_category_order() {
        let categories = vec![
            vec![block_rule("/one")],
            vec![block_rule("/two")],
        ];
        let driver = OptimizerDriver::new(categories, SearchWindow::Exhaustive);
        let result = driver.run_to_completion();
        assert_eq!(result[0].trigger.url_filter, "/one");
        assert_eq!(result[1].trigger.url_filter, "/two");
    }
}
