//! JSON reporter for run results

use crate::runner::RunResults;
use anyhow::Result;

/// JSON format reporter
pub struct JsonReporter;

impl JsonReporter {
    /// Format run results as JSON
    ///
    /// # Arguments
    ///
    /// * `results` - The run results to format
    /// * `pretty` - Whether to pretty-print the JSON
    pub fn format(results: &RunResults, pretty: bool) -> Result<String> {
        let output = if pretty {
            serde_json::to_string_pretty(results)?
        } else {
            serde_json::to_string(results)?
        };
        Ok(output)
    }
}
