//! Check Runner
//!
//! Holds the check set explicitly and executes it over one batch:
//!
//! 1. Parse every timestamp field the checks read into a [`TimestampCache`].
//! 2. Run every check in parallel against the shared, read-only context.
//! 3. Hand the results, keyed by check name, to the report aggregator.
//!
//! # Usage
//!
//! ```ignore
//! let runner = Runner::standard(DqConfig::default());
//! let report = runner.run(&records);
//! println!("{}", report.format_summary());
//! ```

use crate::quality::cardinality::CardinalityCheck;
use crate::quality::check::{Check, CheckContext, CheckResult};
use crate::quality::config::DqConfig;
use crate::quality::integrity::{DuplicateIdCheck, MalformedJsonCheck};
use crate::quality::profile::{CurrencyCheck, IdentityNullsCheck, TimestampParseCheck};
use crate::quality::records::RecordSet;
use crate::quality::report::Report;
use crate::quality::revenue::{RevenueCheck, ValueTypeCheck};
use crate::quality::sequence::SequenceCheck;
use crate::quality::structural::{NullCountsCheck, RequiredFieldsCheck};
use crate::quality::timestamp::TimestampCache;
use crate::quality::volume::VolumeCheck;
use rayon::prelude::*;
use std::collections::BTreeMap;
use std::time::Instant;
use tracing::{debug, info};

pub struct Runner {
    config: DqConfig,
    checks: Vec<Box<dyn Check>>,
}

impl Runner {
    /// Runner with no checks.
    pub fn new(config: DqConfig) -> Self {
        Self {
            config,
            checks: Vec::new(),
        }
    }

    /// Runner with the full, fixed check set.
    pub fn standard(config: DqConfig) -> Self {
        Self::new(config)
            .with_check(RequiredFieldsCheck)
            .with_check(NullCountsCheck)
            .with_check(ValueTypeCheck)
            .with_check(TimestampParseCheck)
            .with_check(DuplicateIdCheck)
            .with_check(RevenueCheck)
            .with_check(SequenceCheck)
            .with_check(VolumeCheck)
            .with_check(CardinalityCheck)
            .with_check(MalformedJsonCheck)
            .with_check(CurrencyCheck)
            .with_check(IdentityNullsCheck)
    }

    pub fn with_check(mut self, check: impl Check + 'static) -> Self {
        self.checks.push(Box::new(check));
        self
    }

    pub fn config(&self) -> &DqConfig {
        &self.config
    }

    pub fn check_names(&self) -> Vec<&'static str> {
        self.checks.iter().map(|check| check.name()).collect()
    }

    /// Run every check and return the raw results keyed by check name.
    pub fn run_checks(&self, records: &RecordSet) -> BTreeMap<String, CheckResult> {
        let start = Instant::now();
        debug!(checks = ?self.check_names(), "running checks");
        let timestamps = TimestampCache::build(records, self.config.timestamp_fields());
        let ctx = CheckContext::new(records, &timestamps, &self.config);

        let results: BTreeMap<String, CheckResult> = self
            .checks
            .par_iter()
            .map(|check| {
                let check_start = Instant::now();
                let result = check.run(&ctx);
                debug!(
                    check = check.name(),
                    elapsed_us = check_start.elapsed().as_micros() as u64,
                    flagged = ?result.rows().map(<[usize]>::len),
                    "check complete"
                );
                (check.name().to_string(), result)
            })
            .collect();

        info!(
            rows = records.len(),
            checks = results.len(),
            elapsed_ms = start.elapsed().as_millis() as u64,
            "checks executed"
        );
        results
    }

    /// Run every check and aggregate the verdict.
    pub fn run(&self, records: &RecordSet) -> Report {
        Report::aggregate(self.run_checks(records))
    }
}
